//! Timetable grids: the raw 2-D cell representation and its classification.

pub mod classify;
pub mod reader;
pub mod station;

pub use classify::{ColumnKind, GridLayout, LayoutError, RowKind, classify, fold_continuations};
pub use reader::{GridReadError, TimetableGrid};
pub use station::{HoldState, StationInfo};
