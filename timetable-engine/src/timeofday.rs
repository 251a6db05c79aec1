//! Time-of-day parsing for timetable cells.
//!
//! Timetable times are wall-clock values in `HH:MM` or `HH:MM:SS` form. The
//! engine works in integer seconds since midnight, so times sort and compare
//! cheaply when ordering station stops and start times.

use chrono::{NaiveTime, Timelike};

/// Error returned when a cell fragment is not a recognizable time of day.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time of day: {0:?}")]
pub struct TimeParseError(pub String);

/// Parse `HH:MM[:SS]` into seconds since midnight.
///
/// # Examples
///
/// ```
/// use timetable_engine::timeofday::parse_time_of_day;
///
/// assert_eq!(parse_time_of_day("06:30"), Ok(6 * 3600 + 30 * 60));
/// assert_eq!(parse_time_of_day("23:59:59"), Ok(86_399));
/// assert!(parse_time_of_day("half past six").is_err());
/// ```
pub fn parse_time_of_day(raw: &str) -> Result<u32, TimeParseError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map(|t| t.num_seconds_from_midnight())
        .map_err(|_| TimeParseError(raw.to_string()))
}

/// Render seconds since midnight as `HH:MM:SS`, for logs and summaries.
pub fn format_time_of_day(seconds: u32) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}
