//! The scheduled train entity and station-stop materialization.

use std::collections::HashSet;

use tracing::warn;

use crate::command::CommandToken;
use crate::descriptor::dispose::DisposeDirective;
use crate::descriptor::stop::{SignalHold, StationStopSpec};
use crate::route::{PlatformId, RouteGraph, SectionId, SignalId};
use crate::stock::CarDescriptor;

/// How a train relates to the predecessor it is formed out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormLink {
    #[default]
    None,
    Formed,
    Triggered,
    Detached,
}

/// A station stop resolved onto the train's route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationStop {
    pub station: String,
    pub platform: PlatformId,
    pub arrival: Option<u32>,
    pub departure: Option<u32>,
    /// Subpath and element index of the platform section on the route.
    pub subpath: usize,
    pub route_index: usize,
    pub section: SectionId,
    pub exit_signal: Option<SignalId>,
    /// True when the train must hold its exit signal while stopped.
    pub hold_signal: bool,
    pub commands: Vec<CommandToken>,
}

/// A queued detach of a run-round train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachOrder {
    /// Detach at the start of the route rather than on arrival.
    pub at_start: bool,
    pub trigger_time: Option<u32>,
    /// Number of the synthesized train the detached portion becomes.
    pub formed_train: usize,
    pub reverse: bool,
}

/// A free-form command anchored to a route position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredCommand {
    pub command: CommandToken,
    pub subpath: usize,
    /// `None` anchors the command before the first section of the subpath.
    pub section: Option<SectionId>,
}

/// A runnable train: the player train (number 0) or an AI train.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTrain {
    pub number: usize,
    pub name: String,
    pub cars: Vec<CarDescriptor>,
    pub length_m: f64,
    /// Permitted speed in m/s.
    pub max_speed: f64,
    pub route: RouteGraph,
    /// Seconds since midnight; synthesized legs may start untimed.
    pub start_time: Option<u32>,
    /// Resolved stops, time-sorted.
    pub stops: Vec<StationStop>,
    pub holding_signals: HashSet<SignalId>,
    pub formed_of: Option<usize>,
    pub formed_of_kind: FormLink,
    pub forms: Option<usize>,
    pub forms_static: bool,
    pub set_stop: bool,
    pub forms_at_station: bool,
    pub attach_to: Option<usize>,
    pub stable_call_on: bool,
    pub detach_orders: Vec<DetachOrder>,
    pub commands: Vec<AnchoredCommand>,
    /// Directive carried over from the descriptor, consumed by disposition
    /// resolution.
    pub(crate) dispose: Option<DisposeDirective>,
}

impl ScheduledTrain {
    pub fn new(number: usize, name: String, route: RouteGraph) -> Self {
        let max_speed = route.line_speed;
        Self {
            number,
            name,
            cars: Vec::new(),
            length_m: 0.0,
            max_speed,
            route,
            start_time: None,
            stops: Vec::new(),
            holding_signals: HashSet::new(),
            formed_of: None,
            formed_of_kind: FormLink::None,
            forms: None,
            forms_static: false,
            set_stop: false,
            forms_at_station: false,
            attach_to: None,
            stable_call_on: false,
            detach_orders: Vec::new(),
            commands: Vec::new(),
            dispose: None,
        }
    }

    /// Resolve one stop spec onto this train's route. The search starts at
    /// the position of the last resolved stop so repeated station visits on
    /// later subpaths resolve in travel order. Returns false when the
    /// station has no platform on the route.
    pub fn add_station_stop(&mut self, spec: &StationStopSpec) -> bool {
        let Some(platform) = self.route.platform(&spec.station) else {
            warn!(train = %self.name, station = %spec.station, "station not on route, stop dropped");
            return false;
        };
        let platform = platform.clone();

        let (start_subpath, start_index) = self
            .stops
            .last()
            .map_or((0, 0), |stop| (stop.subpath, stop.route_index));

        let mut location = None;
        'subpaths: for (subpath_index, subpath) in
            self.route.subpaths.iter().enumerate().skip(start_subpath)
        {
            let from = if subpath_index == start_subpath {
                start_index
            } else {
                0
            };
            for &section in &platform.sections {
                if let Some(index) = subpath.route_index(section, from) {
                    location = Some((subpath_index, index, section));
                    break 'subpaths;
                }
            }
        }
        let Some((subpath, route_index, section)) = location else {
            warn!(train = %self.name, station = %spec.station, "platform section not on route, stop dropped");
            return false;
        };

        let hold_signal = spec.hold != SignalHold::None
            || spec.commands.iter().any(|c| c.name == "forcehold");
        if hold_signal {
            if let Some(signal) = platform.exit_signal {
                self.holding_signals.insert(signal);
            }
        }

        self.stops.push(StationStop {
            station: spec.station.clone(),
            platform: platform.id,
            arrival: spec.arrival,
            departure: spec.departure,
            subpath,
            route_index,
            section,
            exit_signal: platform.exit_signal,
            hold_signal,
            commands: spec.commands.clone(),
        });
        true
    }

    /// Stable sort of stops by arrival time, falling back to departure;
    /// untimed (command-only) stops sort last.
    pub fn sort_stops(&mut self) {
        self.stops
            .sort_by_key(|stop| stop.arrival.or(stop.departure).unwrap_or(u32::MAX));
    }

    /// Anchor a free-form command before the first section of the route.
    pub fn anchor_command(&mut self, command: CommandToken) {
        self.commands.push(AnchoredCommand {
            command,
            subpath: 0,
            section: None,
        });
    }
}
