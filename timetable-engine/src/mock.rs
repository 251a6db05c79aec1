//! In-memory route and consist services, used by the test suite and by the
//! timetable checker binary, which validates timetable files without a real
//! route installation.

use std::collections::HashMap;

use crate::route::{
    Platform, PlatformId, RouteElement, RouteError, RouteGraph, RouteService, SectionId, SignalId,
    Subpath, TrackDirection,
};
use crate::stock::{CarDescriptor, Consist, ConsistError, ConsistService};

/// A single-subpath route visiting the given stations in order, with one
/// platform section and exit signal per station.
pub fn straight_route(stations: &[&str]) -> RouteGraph {
    let mut elements = Vec::new();
    let mut platforms = HashMap::new();
    for (i, station) in stations.iter().enumerate() {
        let approach = SectionId((i * 2) as u32);
        let platform_section = SectionId((i * 2 + 1) as u32);
        elements.push(RouteElement {
            section: approach,
            direction: TrackDirection::Forward,
        });
        elements.push(RouteElement {
            section: platform_section,
            direction: TrackDirection::Forward,
        });
        platforms.insert(
            station.trim().to_lowercase(),
            Platform {
                id: PlatformId(i as u32),
                sections: vec![platform_section],
                exit_signal: Some(SignalId(i as u32)),
            },
        );
    }
    RouteGraph {
        subpaths: vec![Subpath { elements }],
        reversals: Vec::new(),
        platforms,
        line_speed: 40.0,
    }
}

/// Route service backed by an explicit key-to-route map, with an optional
/// fallback route served for any unknown key.
#[derive(Debug, Default)]
pub struct MockRouteService {
    routes: HashMap<String, RouteGraph>,
    fallback: Option<RouteGraph>,
}

impl MockRouteService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that answers every key with a straight three-station route
    /// (newcastle, york, durham).
    pub fn permissive() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Some(straight_route(&["newcastle", "york", "durham"])),
        }
    }

    pub fn insert(&mut self, key: &crate::route::PathKey, route: RouteGraph) {
        self.routes.insert(key.as_str().to_string(), route);
    }

    pub fn with_route(mut self, key: &crate::route::PathKey, route: RouteGraph) -> Self {
        self.insert(key, route);
        self
    }
}

impl RouteService for MockRouteService {
    fn parse_route(&self, key: &crate::route::PathKey) -> Result<RouteGraph, RouteError> {
        if let Some(route) = self.routes.get(key.as_str()) {
            return Ok(route.clone());
        }
        self.fallback
            .clone()
            .ok_or_else(|| RouteError::Unknown(key.clone()))
    }
}

/// Consist service backed by an explicit file map, with an optional default
/// consist served for any unknown file.
#[derive(Debug, Default)]
pub struct MockConsistService {
    consists: HashMap<String, Consist>,
    fallback: Option<Consist>,
}

impl MockConsistService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that answers every file with a two-car consist.
    pub fn permissive() -> Self {
        Self {
            consists: HashMap::new(),
            fallback: Some(default_consist()),
        }
    }

    pub fn insert(&mut self, file: &str, consist: Consist) {
        self.consists.insert(file.to_string(), consist);
    }
}

impl ConsistService for MockConsistService {
    fn load_consist(&self, file: &str) -> Result<Consist, ConsistError> {
        if let Some(consist) = self.consists.get(file) {
            return Ok(consist.clone());
        }
        self.fallback
            .clone()
            .ok_or_else(|| ConsistError::NotFound(file.to_string()))
    }
}

fn default_consist() -> Consist {
    Consist {
        cars: vec![
            CarDescriptor {
                folder: "stock".into(),
                name: "loco".into(),
                flipped: false,
                length_m: 20.0,
            },
            CarDescriptor {
                folder: "stock".into(),
                name: "coach".into(),
                flipped: false,
                length_m: 23.0,
            },
        ],
        max_velocity: Some(45.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::PathKey;

    #[test]
    fn straight_route_indexes_platforms() {
        let route = straight_route(&["Alpha", "beta"]);
        assert_eq!(route.subpaths[0].elements.len(), 4);
        let platform = route.platform("ALPHA").unwrap();
        assert_eq!(platform.sections, vec![SectionId(1)]);
        assert!(route.platform("gamma").is_none());
    }

    #[test]
    fn strict_service_rejects_unknown_keys() {
        let service = MockRouteService::new();
        assert!(service.parse_route(&PathKey::new("ghost")).is_err());
        let service = MockRouteService::permissive();
        assert!(service.parse_route(&PathKey::new("ghost")).is_ok());
    }

    #[test]
    fn reversal_points_default_empty() {
        let route = straight_route(&["alpha"]);
        assert_eq!(route.valid_reversal_count(), 0);
    }
}
