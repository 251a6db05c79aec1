//! Station stop cell parsing.
//!
//! A stop cell is `time-part[$command[$command...]]`. The time part is either
//! a single time (arrival equals departure, a pass-through stop) or
//! `arrival-departure`. A cell with no parsable time still produces a stop
//! when it carries at least one command.

use tracing::{debug, warn};

use crate::command::CommandToken;
use crate::grid::station::{HoldState, StationInfo};
use crate::timeofday::parse_time_of_day;

/// Signal-hold behavior of one stop, seeded from the station row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalHold {
    #[default]
    None,
    Normal,
    Forced,
}

/// A parsed station stop for one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationStopSpec {
    /// Station name, lower-cased (matches the route platform index keys).
    pub station: String,
    pub arrival: Option<u32>,
    pub departure: Option<u32>,
    pub hold: SignalHold,
    pub commands: Vec<CommandToken>,
}

impl StationStopSpec {
    /// True when at least one of arrival/departure parsed.
    pub fn has_time(&self) -> bool {
        self.arrival.is_some() || self.departure.is_some()
    }
}

/// Parse one stop cell for the given station. Returns `None` when the cell
/// carries neither a valid time nor any command.
pub fn parse_stop_cell(cell: &str, station: &StationInfo) -> Option<StationStopSpec> {
    let (time_part, command_part) = match cell.split_once('$') {
        Some((time, commands)) => (time, Some(commands)),
        None => (cell, None),
    };

    let time_part = time_part.trim();
    let (arrival_raw, departure_raw) = match time_part.split_once('-') {
        Some((arrival, departure)) => (arrival, departure),
        None => (time_part, time_part),
    };
    let arrival = parse_time_of_day(arrival_raw).ok();
    let departure = parse_time_of_day(departure_raw).ok();

    let mut commands = Vec::new();
    if let Some(command_part) = command_part {
        for fragment in command_part.split('$') {
            if fragment.trim().is_empty() {
                continue;
            }
            match CommandToken::parse(fragment) {
                Ok(command) => commands.push(command),
                Err(_) => warn!(station = %station.name, fragment, "skipping empty stop command"),
            }
        }
    }
    // The synthetic token goes after the cell's own commands.
    if station.hold == HoldState::ForceHold {
        commands.push(CommandToken::bare("forcehold"));
    }

    if arrival.is_none() && departure.is_none() && commands.is_empty() {
        debug!(station = %station.name, cell, "stop cell has no time and no commands, dropped");
        return None;
    }

    Some(StationStopSpec {
        station: station.name.clone(),
        arrival,
        departure,
        hold: match station.hold {
            HoldState::Hold => SignalHold::Normal,
            _ => SignalHold::None,
        },
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str) -> StationInfo {
        StationInfo::new(name)
    }

    fn at(h: u32, m: u32) -> Option<u32> {
        Some(h * 3600 + m * 60)
    }

    #[test]
    fn arrival_departure_pair() {
        let stop = parse_stop_cell("10:00-10:05", &station("york")).unwrap();
        assert_eq!(stop.arrival, at(10, 0));
        assert_eq!(stop.departure, at(10, 5));
        assert!(stop.has_time());
    }

    #[test]
    fn single_time_is_pass_through() {
        let stop = parse_stop_cell("10:00", &station("york")).unwrap();
        assert_eq!(stop.arrival, at(10, 0));
        assert_eq!(stop.departure, at(10, 0));
    }

    #[test]
    fn half_valid_pair_still_times() {
        let stop = parse_stop_cell("xx:xx-10:05", &station("york")).unwrap();
        assert_eq!(stop.arrival, None);
        assert_eq!(stop.departure, at(10, 5));
        assert!(stop.has_time());
    }

    #[test]
    fn command_only_stop_survives() {
        let stop = parse_stop_cell("$forcehold", &station("york")).unwrap();
        assert!(!stop.has_time());
        assert_eq!(stop.commands.len(), 1);
        assert_eq!(stop.commands[0].name, "forcehold");
    }

    #[test]
    fn no_time_no_commands_dropped() {
        assert!(parse_stop_cell("soon", &station("york")).is_none());
    }

    #[test]
    fn commands_after_time() {
        let stop = parse_stop_cell("10:00-10:05 $hold $terminal", &station("york")).unwrap();
        assert!(stop.has_time());
        assert_eq!(stop.commands.len(), 2);
        assert_eq!(stop.commands[0].name, "hold");
        assert_eq!(stop.commands[1].name, "terminal");
    }

    #[test]
    fn hold_state_seeded_from_station() {
        let mut info = station("york");
        info.hold = HoldState::Hold;
        let stop = parse_stop_cell("10:00", &info).unwrap();
        assert_eq!(stop.hold, SignalHold::Normal);
        assert!(stop.commands.is_empty());
    }

    #[test]
    fn force_hold_station_injects_synthetic_command() {
        let mut info = station("york");
        info.hold = HoldState::ForceHold;
        let stop = parse_stop_cell("10:00", &info).unwrap();
        assert_eq!(stop.commands[0].name, "forcehold");
        // The seed state covers only the plain hold keyword.
        assert_eq!(stop.hold, SignalHold::None);
    }

    #[test]
    fn synthetic_force_hold_follows_cell_commands() {
        let mut info = station("york");
        info.hold = HoldState::ForceHold;
        let stop = parse_stop_cell("10:00 $hold $terminal", &info).unwrap();
        let names: Vec<&str> = stop.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["hold", "terminal", "forcehold"]);
    }
}
