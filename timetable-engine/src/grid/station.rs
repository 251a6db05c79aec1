//! Per-station information collected from station rows.

use tracing::debug;

use crate::command::CommandToken;

/// Signal-hold behavior declared for a station row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldState {
    #[default]
    NoHold,
    Hold,
    ForceHold,
}

/// One station row of the timetable: its name and any hold annotation folded
/// in from additional-station-info columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationInfo {
    /// Station name, trimmed and lower-cased.
    pub name: String,
    pub hold: HoldState,
}

impl StationInfo {
    /// Build station info from a station-row cell. The cell may carry
    /// in-line commands after the name, `name[$command...]`.
    pub fn new(cell: &str) -> Self {
        let mut fragments = cell.split('$');
        let name = fragments.next().unwrap_or_default();
        let mut station = Self {
            name: name.trim().to_lowercase(),
            hold: HoldState::NoHold,
        };
        for fragment in fragments {
            match CommandToken::parse(fragment) {
                Ok(command) => station.apply_command(&command),
                Err(_) => {
                    debug!(station = %station.name, "skipping empty station command");
                }
            }
        }
        station
    }

    /// Apply a station-level command. Only the hold keywords are recognized;
    /// anything else is ignored so future keywords do not break old files.
    pub fn apply_command(&mut self, command: &CommandToken) {
        match command.name.as_str() {
            "hold" => self.hold = HoldState::Hold,
            "nohold" => self.hold = HoldState::NoHold,
            "forcehold" => self.hold = HoldState::ForceHold,
            other => {
                debug!(station = %self.name, command = other, "ignoring unknown station command");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_normalized() {
        let station = StationInfo::new("  Newcastle Central ");
        assert_eq!(station.name, "newcastle central");
        assert_eq!(station.hold, HoldState::NoHold);
    }

    #[test]
    fn in_cell_commands_split_from_name() {
        let station = StationInfo::new("York $hold");
        assert_eq!(station.name, "york");
        assert_eq!(station.hold, HoldState::Hold);
    }

    #[test]
    fn hold_keywords() {
        let mut station = StationInfo::new("york");
        station.apply_command(&CommandToken::bare("hold"));
        assert_eq!(station.hold, HoldState::Hold);
        station.apply_command(&CommandToken::bare("forcehold"));
        assert_eq!(station.hold, HoldState::ForceHold);
        station.apply_command(&CommandToken::bare("nohold"));
        assert_eq!(station.hold, HoldState::NoHold);
    }

    #[test]
    fn unknown_command_ignored() {
        let mut station = StationInfo::new("york");
        station.apply_command(&CommandToken::bare("terminal"));
        assert_eq!(station.hold, HoldState::NoHold);
    }
}
