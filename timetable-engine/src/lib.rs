//! Timetable processing and train scheduling engine.
//!
//! Parses declarative, spreadsheet-like timetable files into a set of
//! scheduled trains: each train carries a route reference, a consist, a
//! station-stop plan and an optional dispose directive controlling what the
//! train does once it completes its route (forming a successor, stabling,
//! running round, or going static).

pub mod command;
pub mod descriptor;
pub mod files;
pub mod grid;
pub mod mock;
pub mod process;
pub mod route;
pub mod schedule;
pub mod stock;
pub mod timeofday;
