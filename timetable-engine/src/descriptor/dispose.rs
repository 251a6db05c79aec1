//! Dispose directive parsing.
//!
//! The `#dispose` cell of a train column holds one `$`-prefixed command
//! selecting what the train does after completing its route: form a
//! successor, trigger one, go static, or stable (park the consist and bring
//! it back later). Target resolution happens later, in the disposition
//! resolver; this module only builds the structured directive.

use tracing::warn;

use crate::command::CommandToken;
use crate::route::PathKey;
use crate::timeofday::parse_time_of_day;

/// How a successor train is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Immediate consist hand-off.
    Formed,
    /// Event-based activation with an explicit consist copy decision.
    Triggered,
}

/// Where a run-round maneuver is spliced into a stabling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunRoundPosition {
    /// On the inbound leg's arrival.
    In,
    /// At the start of the outbound leg.
    Out,
    /// At the start of the stabled (inbound) leg; also the default outside a
    /// stabling context.
    #[default]
    Stable,
}

/// A run-round maneuver attached to a dispose directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRound {
    pub path: PathKey,
    pub time: Option<u32>,
    pub position: RunRoundPosition,
}

/// `$forms` / `$triggers`: hand the train over to a named successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormsDirective {
    pub kind: FormKind,
    /// Raw target reference; normalized during resolution.
    pub target: String,
    pub set_stop: bool,
    pub at_station: bool,
    pub run_round: Option<RunRound>,
}

/// What happens at the end of a stabling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StableTermination {
    Forms(String),
    Triggers(String),
    Static,
}

/// `$stable`: park the consist via an outbound leg and, unless terminating
/// static, bring it back on an inbound leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableDirective {
    pub out_path: PathKey,
    pub out_time: Option<u32>,
    pub in_path: Option<PathKey>,
    pub in_time: Option<u32>,
    pub termination: StableTermination,
    pub call_on: bool,
    pub run_round: Option<RunRound>,
    pub set_stop: bool,
}

/// A parsed dispose directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisposeDirective {
    Forms(FormsDirective),
    Static,
    Stable(StableDirective),
}

/// Parse a `#dispose` cell. A malformed or unrecognized directive is logged
/// and dropped; the train itself stays valid.
pub fn parse_dispose(cell: &str, train: &str) -> Option<DisposeDirective> {
    let command = match CommandToken::parse(cell) {
        Ok(command) => command,
        Err(_) => {
            warn!(train, cell, "empty dispose directive");
            return None;
        }
    };

    match command.name.as_str() {
        "$forms" => parse_forms(&command, FormKind::Formed, train),
        "$triggers" => parse_forms(&command, FormKind::Triggered, train),
        "$static" => Some(DisposeDirective::Static),
        "$stable" => parse_stable(&command, train),
        other => {
            warn!(train, keyword = other, "unknown dispose directive");
            None
        }
    }
}

fn parse_forms(command: &CommandToken, kind: FormKind, train: &str) -> Option<DisposeDirective> {
    let Some(target) = command.value() else {
        warn!(train, "dispose directive names no target train");
        return None;
    };
    Some(DisposeDirective::Forms(FormsDirective {
        kind,
        target: target.to_string(),
        set_stop: command.has_qualifier("setstop"),
        at_station: command.has_qualifier("atstation"),
        run_round: parse_run_round(command, train),
    }))
}

fn parse_stable(command: &CommandToken, train: &str) -> Option<DisposeDirective> {
    let termination = if command.has_qualifier("static") {
        StableTermination::Static
    } else if let Some(target) = command.qualifier("forms").and_then(|q| q.value()) {
        StableTermination::Forms(target.to_string())
    } else if let Some(target) = command.qualifier("triggers").and_then(|q| q.value()) {
        StableTermination::Triggers(target.to_string())
    } else {
        warn!(train, "stable directive has no forms/triggers/static termination");
        return None;
    };

    let Some(out_path) = command.qualifier("out_path").and_then(|q| q.value()) else {
        warn!(train, "stable directive has no out_path");
        return None;
    };
    let in_path = command.qualifier("in_path").and_then(|q| q.value());
    if in_path.is_none() && termination != StableTermination::Static {
        warn!(train, "stable directive has no in_path");
        return None;
    }

    Some(DisposeDirective::Stable(StableDirective {
        out_path: PathKey::new(out_path),
        out_time: qualifier_time(command, "out_time", train),
        in_path: in_path.map(PathKey::new),
        in_time: qualifier_time(command, "in_time", train),
        termination,
        call_on: command.has_qualifier("callon"),
        run_round: parse_run_round(command, train),
        // Stabling cycles default to stopping the reformed train.
        set_stop: true,
    }))
}

fn parse_run_round(command: &CommandToken, train: &str) -> Option<RunRound> {
    let path = command.qualifier("runround").and_then(|q| q.value())?;
    let position = match command.qualifier("rrpos").and_then(|q| q.value()) {
        Some("in") => RunRoundPosition::In,
        Some("out") => RunRoundPosition::Out,
        Some("stable") | None => RunRoundPosition::Stable,
        Some(other) => {
            warn!(train, position = other, "unknown rrpos value, using default");
            RunRoundPosition::Stable
        }
    };
    Some(RunRound {
        path: PathKey::new(path),
        time: qualifier_time(command, "rrtime", train),
        position,
    })
}

fn qualifier_time(command: &CommandToken, name: &str, train: &str) -> Option<u32> {
    let raw = command.qualifier(name).and_then(|q| q.value())?;
    match parse_time_of_day(raw) {
        Ok(seconds) => Some(seconds),
        Err(_) => {
            warn!(train, qualifier = name, value = raw, "unparsable time in dispose directive");
            None
        }
    }
}
