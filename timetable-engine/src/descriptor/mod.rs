//! Train descriptors: the fully-parsed form of one timetable column.

pub mod builder;
pub mod dispose;
pub mod stop;

pub use builder::{TrainDescriptor, build_descriptors};
pub use dispose::{
    DisposeDirective, FormKind, FormsDirective, RunRound, RunRoundPosition, StableDirective,
    StableTermination, parse_dispose,
};
pub use stop::{SignalHold, StationStopSpec, parse_stop_cell};
