//! Player-train selection and descriptor-to-train reduction.

use tracing::debug;

use crate::descriptor::builder::TrainDescriptor;
use crate::route::{RouteCache, RouteError};
use crate::schedule::train::ScheduledTrain;

/// Errors from player selection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("invalid player train selector {0:?}, expected \"description:train\"")]
    BadSelector(String),
    #[error("player train {description}:{name} not found in timetable set")]
    PlayerNotFound { description: String, name: String },
}

/// The `description:train` key selecting the player train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerKey {
    pub description: String,
    pub name: String,
}

impl PlayerKey {
    pub fn parse(raw: &str) -> Result<Self, ReduceError> {
        match raw.split_once(':') {
            Some((description, name)) if !description.is_empty() && !name.is_empty() => Ok(Self {
                description: description.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ReduceError::BadSelector(raw.to_string())),
        }
    }
}

/// Remove and return the player train's descriptor. The match is exact and
/// case-sensitive on both description and train name; no match aborts the
/// whole timetable load.
pub fn select_player(
    descriptors: &mut Vec<TrainDescriptor>,
    key: &PlayerKey,
) -> Result<TrainDescriptor, ReduceError> {
    let position = descriptors
        .iter()
        .position(|d| d.description == key.description && d.raw_name == key.name)
        .ok_or_else(|| ReduceError::PlayerNotFound {
            description: key.description.clone(),
            name: key.name.clone(),
        })?;
    Ok(descriptors.remove(position))
}

/// Turn one descriptor into a scheduled train: load a fresh route copy,
/// resolve stops against its platform index, and anchor free-form commands
/// at the route start.
pub fn reduce(
    descriptor: &TrainDescriptor,
    number: usize,
    routes: &RouteCache,
) -> Result<ScheduledTrain, RouteError> {
    let route = routes.load(&descriptor.path_key)?;
    let mut train = ScheduledTrain::new(number, descriptor.name.clone(), route);
    train.start_time = Some(descriptor.start_time);
    train.cars = descriptor.train_set.cars.clone();
    train.length_m = descriptor.train_set.length_m;
    if let Some(velocity) = descriptor.train_set.max_velocity {
        train.max_speed = train.max_speed.min(velocity);
    }

    for spec in &descriptor.stops {
        // Unknown stations are logged inside add_station_stop; the train
        // keeps its remaining stops.
        train.add_station_stop(spec);
    }
    train.sort_stops();

    for command in &descriptor.commands {
        train.anchor_command(command.clone());
    }
    train.dispose = descriptor.dispose.clone();

    debug!(train = %train.name, number, stops = train.stops.len(), "train scheduled");
    Ok(train)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::classify::classify;
    use crate::grid::reader::TimetableGrid;
    use crate::descriptor::builder::build_descriptors;
    use crate::mock::{MockConsistService, MockRouteService};

    fn descriptors(text: &str) -> (Vec<TrainDescriptor>, RouteCache) {
        let grid = TimetableGrid::parse("test_tt", text).unwrap();
        let layout = classify(&grid).unwrap();
        let mut routes = RouteCache::new();
        let list =
            build_descriptors(&grid, &layout, &MockConsistService::permissive(), &mut routes);
        routes.preprocess(&MockRouteService::permissive()).unwrap();
        (list, routes)
    }

    const SET: &str = "\
;#comment;0600;0700
#comment;weekday;;
newcastle;;06:10-06:12;
york;;06:40;07:10
carlisle;;06:55;
#consist;;set_a;set_b
#path;;north.pat;south.pat
#start;;06:00;07:00";

    #[test]
    fn selector_is_exact_and_case_sensitive() {
        let (mut list, _) = descriptors(SET);
        let key = PlayerKey::parse("weekday:0600").unwrap();
        let player = select_player(&mut list, &key).unwrap();
        assert_eq!(player.raw_name, "0600");
        assert_eq!(list.len(), 1);

        let (mut list, _) = descriptors(SET);
        let key = PlayerKey::parse("weekday:0600 ").unwrap();
        assert!(matches!(
            select_player(&mut list, &key),
            Err(ReduceError::PlayerNotFound { .. })
        ));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn bad_selector_rejected() {
        assert!(matches!(
            PlayerKey::parse("no-colon"),
            Err(ReduceError::BadSelector(_))
        ));
        assert!(PlayerKey::parse(":train").is_err());
    }

    #[test]
    fn reduce_resolves_known_stops_and_drops_unknown() {
        let (list, routes) = descriptors(SET);
        let train = reduce(&list[0], 1, &routes).unwrap();
        // carlisle is not on the mock route; newcastle and york are.
        assert_eq!(train.stops.len(), 2);
        assert_eq!(train.stops[0].station, "newcastle");
        assert_eq!(train.stops[1].station, "york");
        assert_eq!(train.number, 1);
        assert_eq!(train.start_time, Some(6 * 3600));
    }

    #[test]
    fn reduce_caps_speed_at_consist_velocity() {
        let (list, routes) = descriptors(SET);
        let train = reduce(&list[0], 1, &routes).unwrap();
        // Mock consists declare 45 m/s; the mock route line speed is 40.
        assert!((train.max_speed - 40.0).abs() < 1e-9);
        assert_eq!(train.cars.len(), 2);
    }

    #[test]
    fn freeform_commands_anchor_at_route_start() {
        let text = "\
;;0600
york;;06:40
#consist;;set_a
#path;;north.pat
#start;;06:00
#note;;$speed=25";
        let (list, routes) = descriptors(text);
        let train = reduce(&list[0], 1, &routes).unwrap();
        assert_eq!(train.commands.len(), 1);
        assert_eq!(train.commands[0].subpath, 0);
        assert_eq!(train.commands[0].section, None);
        assert_eq!(train.commands[0].command.name, "speed");
    }
}
