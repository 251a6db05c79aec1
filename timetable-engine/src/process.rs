//! Pipeline orchestration: file set to finished schedule.
//!
//! Per file: raw grid, classification, continuation folding, descriptor
//! building. Across the set: route pre-processing, player selection,
//! reduction to scheduled trains, disposition resolution. A file that fails
//! classification contributes zero trains but does not stop the set.

use std::path::Path;

use tracing::{info, warn};

use crate::descriptor::builder::{TrainDescriptor, build_descriptors};
use crate::files::{FileSetError, resolve_file_set};
use crate::grid::classify::{classify, fold_continuations};
use crate::grid::reader::{GridReadError, TimetableGrid};
use crate::route::{RouteCache, RouteError, RouteService};
use crate::schedule::dispose::resolve_dispositions;
use crate::schedule::reduce::{PlayerKey, ReduceError, reduce, select_player};
use crate::schedule::train::ScheduledTrain;
use crate::stock::ConsistService;

/// Fatal errors aborting a whole timetable load.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    FileSet(#[from] FileSetError),
    #[error(transparent)]
    Grid(#[from] GridReadError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Player(#[from] ReduceError),
}

/// The finished schedule: the player train (number 0) and every AI train,
/// including trains synthesized by disposition resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableSchedule {
    pub player: ScheduledTrain,
    pub trains: Vec<ScheduledTrain>,
}

/// The timetable engine's entry point, parameterized over the route and
/// consist services the surrounding system provides.
pub struct TimetableProcessor<'a> {
    routes: &'a dyn RouteService,
    consists: &'a dyn ConsistService,
}

impl<'a> TimetableProcessor<'a> {
    pub fn new(routes: &'a dyn RouteService, consists: &'a dyn ConsistService) -> Self {
        Self { routes, consists }
    }

    /// Process a timetable or timetable-list file.
    pub fn process(&self, path: &Path, selector: &str) -> Result<TimetableSchedule, ProcessError> {
        let set = resolve_file_set(path)?;
        let mut grids = Vec::with_capacity(set.files.len());
        for file in &set.files {
            grids.push(TimetableGrid::from_file(file)?);
        }
        self.process_grids(grids, selector)
    }

    /// Process already-read grids. Used by the binary for stdin input and by
    /// tests.
    pub fn process_grids(
        &self,
        grids: Vec<TimetableGrid>,
        selector: &str,
    ) -> Result<TimetableSchedule, ProcessError> {
        let key = PlayerKey::parse(selector)?;

        let mut descriptors: Vec<TrainDescriptor> = Vec::new();
        let mut cache = RouteCache::new();
        for mut grid in grids {
            match classify(&grid) {
                Ok(layout) => {
                    fold_continuations(&mut grid, &layout);
                    let built = build_descriptors(&grid, &layout, self.consists, &mut cache);
                    info!(file = %grid.file_name, trains = built.len(), "timetable file parsed");
                    descriptors.extend(built);
                }
                Err(error) => {
                    warn!(file = %grid.file_name, %error, "timetable file rejected");
                }
            }
        }

        cache.preprocess(self.routes)?;

        let player_descriptor = select_player(&mut descriptors, &key)?;
        let mut player = reduce(&player_descriptor, 0, &cache)?;

        let mut trains = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            trains.push(reduce(descriptor, index + 1, &cache)?);
        }

        resolve_dispositions(&mut trains, &mut player, &mut cache, self.routes);

        info!(
            player = %player.name,
            trains = trains.len(),
            "timetable processing complete"
        );
        Ok(TimetableSchedule { player, trains })
    }
}
