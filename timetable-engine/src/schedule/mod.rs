//! Scheduled trains: the runnable output entities and the passes that
//! produce them.

pub mod dispose;
pub mod reduce;
pub mod train;

pub use dispose::{formed_reverse, resolve_dispositions};
pub use reduce::{PlayerKey, ReduceError, reduce, select_player};
pub use train::{AnchoredCommand, DetachOrder, FormLink, ScheduledTrain, StationStop};
