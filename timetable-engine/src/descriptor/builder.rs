//! Train descriptor builder: one classified train column in, one descriptor
//! out.

use tracing::warn;

use crate::command::CommandToken;
use crate::descriptor::dispose::{DisposeDirective, parse_dispose};
use crate::descriptor::stop::{StationStopSpec, parse_stop_cell};
use crate::grid::classify::GridLayout;
use crate::grid::reader::TimetableGrid;
use crate::route::{PathKey, RouteCache};
use crate::stock::{ConsistService, TrainSet, build_train_set, parse_consist_refs};
use crate::timeofday::parse_time_of_day;

/// The fully-parsed form of one train column, ready for scheduling.
///
/// Descriptors that fail the validity rules (unparsable start time, empty or
/// unloadable consist, missing path) are never emitted; the train is logged
/// and dropped while its siblings continue.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainDescriptor {
    /// Header text of the train column, original case.
    pub raw_name: String,
    /// Full train name, `"{raw_name}:{timetable description}"`.
    pub name: String,
    pub description: String,
    /// Start time in seconds since midnight.
    pub start_time: u32,
    /// Raw `#direction` cell, when present.
    pub direction: Option<String>,
    pub path_key: PathKey,
    pub train_set: TrainSet,
    /// Stops in row order; duplicate station rows overwrite in place.
    pub stops: Vec<StationStopSpec>,
    /// Free-form commands from `#note` rows, in file order.
    pub commands: Vec<CommandToken>,
    pub dispose: Option<DisposeDirective>,
}

/// Build descriptors for every train column of a classified grid. Path keys
/// are registered in the route cache for the later pre-processing batch.
pub fn build_descriptors(
    grid: &TimetableGrid,
    layout: &GridLayout,
    consists: &dyn ConsistService,
    routes: &mut RouteCache,
) -> Vec<TrainDescriptor> {
    let mut descriptors = Vec::with_capacity(layout.train_columns.len());
    for (train, &column) in layout.train_columns.iter().enumerate() {
        let header = &layout.train_headers[train];
        if let Some(descriptor) = build_descriptor(grid, layout, column, header, consists, routes) {
            descriptors.push(descriptor);
        }
    }
    descriptors
}

fn build_descriptor(
    grid: &TimetableGrid,
    layout: &GridLayout,
    column: usize,
    header: &str,
    consists: &dyn ConsistService,
    routes: &mut RouteCache,
) -> Option<TrainDescriptor> {
    let file = grid.file_name.as_str();
    let name = format!("{header}:{}", layout.description);

    let consist_cell = grid.cell(layout.consist_row, column);
    let consist_refs = parse_consist_refs(consist_cell);
    if consist_refs.is_empty() {
        warn!(file, train = header, "train has no consist reference, dropped");
        return None;
    }
    let train_set = match build_train_set(&consist_refs, consists) {
        Ok(set) => set,
        Err(error) => {
            warn!(file, train = header, %error, "consist load failed, train dropped");
            return None;
        }
    };
    if train_set.cars.is_empty() {
        warn!(file, train = header, "train consist has no cars, dropped");
        return None;
    }

    let path_cell = grid.cell(layout.path_row, column).trim();
    if path_cell.is_empty() {
        warn!(file, train = header, "train has no path reference, dropped");
        return None;
    }
    let path_key = PathKey::new(path_cell);
    routes.register(&path_key);

    // The start cell may carry trailing commands; the time is the part
    // before any command marker.
    let start_cell = grid.cell(layout.start_row, column);
    let start_raw = start_cell.split('$').next().unwrap_or_default().trim();
    let start_time = match parse_time_of_day(start_raw) {
        Ok(seconds) => seconds,
        Err(_) => {
            warn!(file, train = header, cell = start_cell, "unparsable start time, train dropped");
            return None;
        }
    };

    let dispose = layout.dispose_row.and_then(|row| {
        let cell = grid.cell(row, column).trim();
        if cell.is_empty() {
            None
        } else {
            parse_dispose(cell, header)
        }
    });

    let direction = layout.direction_row.and_then(|row| {
        let cell = grid.cell(row, column).trim();
        if cell.is_empty() {
            None
        } else {
            Some(cell.to_string())
        }
    });

    let mut stops: Vec<StationStopSpec> = Vec::new();
    for (&row, station) in &layout.stations {
        let cell = grid.cell(row, column);
        if cell.trim().is_empty() {
            continue;
        }
        let Some(spec) = parse_stop_cell(cell, station) else {
            continue;
        };
        if let Some(existing) = stops.iter_mut().find(|s| s.station == spec.station) {
            warn!(file, train = header, station = %spec.station, "duplicate station row, later entry overwrites");
            *existing = spec;
        } else {
            stops.push(spec);
        }
    }

    let mut commands = Vec::new();
    for &row in &layout.note_rows {
        for fragment in grid.cell(row, column).split('$') {
            if fragment.trim().is_empty() {
                continue;
            }
            match CommandToken::parse(fragment) {
                Ok(command) => commands.push(command),
                Err(_) => warn!(file, train = header, fragment, "skipping empty note command"),
            }
        }
    }

    Some(TrainDescriptor {
        raw_name: header.to_string(),
        name,
        description: layout.description.clone(),
        start_time,
        direction,
        path_key,
        train_set,
        stops,
        commands,
        dispose,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::dispose::FormKind;
    use crate::grid::classify::classify;
    use crate::mock::MockConsistService;

    fn build(text: &str) -> (Vec<TrainDescriptor>, RouteCache) {
        let grid = TimetableGrid::parse("test_tt", text).unwrap();
        let layout = classify(&grid).unwrap();
        let mut routes = RouteCache::new();
        let descriptors =
            build_descriptors(&grid, &layout, &MockConsistService::permissive(), &mut routes);
        (descriptors, routes)
    }

    const TWO_TRAINS: &str = "\
;#comment;0600;0700
#comment;weekday;;
newcastle;;06:10-06:12;
york;;07:00;07:05-07:10
#consist;;set_a;set_b
#path;;north.pat;south.pat
#start;;06:00;07:00
#dispose;;$forms=0700;";

    #[test]
    fn descriptors_built_in_column_order() {
        let (descriptors, _) = build(TWO_TRAINS);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].raw_name, "0600");
        assert_eq!(descriptors[0].name, "0600:weekday");
        assert_eq!(descriptors[0].start_time, 6 * 3600);
        assert_eq!(descriptors[0].stops.len(), 2);
        assert_eq!(descriptors[0].stops[0].station, "newcastle");
        assert_eq!(descriptors[1].stops.len(), 1);
        assert_eq!(descriptors[1].stops[0].station, "york");
    }

    #[test]
    fn dispose_attached_only_where_present() {
        let (descriptors, _) = build(TWO_TRAINS);
        match &descriptors[0].dispose {
            Some(DisposeDirective::Forms(forms)) => {
                assert_eq!(forms.kind, FormKind::Formed);
                assert_eq!(forms.target, "0700");
            }
            other => panic!("expected forms directive, got {other:?}"),
        }
        assert!(descriptors[1].dispose.is_none());
    }

    #[test]
    fn path_keys_registered_for_preprocessing() {
        let (_, mut routes) = build(TWO_TRAINS);
        let service = crate::mock::MockRouteService::permissive();
        routes.preprocess(&service).unwrap();
        routes.load(&PathKey::new("north.pat")).unwrap();
        routes.load(&PathKey::new("south.pat")).unwrap();
    }

    #[test]
    fn bad_start_time_drops_only_that_train() {
        let text = "\
;;0600;0700
newcastle;;06:10;07:10
#consist;;set_a;set_b
#path;;north.pat;south.pat
#start;;late;07:00";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].raw_name, "0700");
    }

    #[test]
    fn missing_consist_drops_train() {
        let text = "\
;;0600;0700
newcastle;;06:10;07:10
#consist;;;set_b
#path;;north.pat;south.pat
#start;;06:00;07:00";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].raw_name, "0700");
    }

    #[test]
    fn duplicate_station_row_last_write_wins() {
        let text = "\
;;0600
york;;07:00
York;;08:00
#consist;;set_a
#path;;north.pat
#start;;06:00";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors[0].stops.len(), 1);
        assert_eq!(descriptors[0].stops[0].arrival, Some(8 * 3600));
    }

    #[test]
    fn note_rows_feed_freeform_commands() {
        let text = "\
;;0600
york;;07:00
#consist;;set_a
#path;;north.pat
#start;;06:00
#note;;$speed=25$nopassingspeed";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors[0].commands.len(), 2);
        assert_eq!(descriptors[0].commands[0].name, "speed");
        assert_eq!(descriptors[0].commands[0].value(), Some("25"));
        assert_eq!(descriptors[0].commands[1].name, "nopassingspeed");
    }

    #[test]
    fn direction_row_recorded() {
        let text = "\
;;0600
york;;07:00
#consist;;set_a
#path;;north.pat
#start;;06:00
#direction;;up";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors[0].direction.as_deref(), Some("up"));
    }

    #[test]
    fn unknown_dispose_keyword_keeps_train() {
        let text = "\
;;0600
york;;07:00
#consist;;set_a
#path;;north.pat
#start;;06:00
#dispose;;$vanish";
        let (descriptors, _) = build(text);
        assert_eq!(descriptors.len(), 1);
        assert!(descriptors[0].dispose.is_none());
    }
}
