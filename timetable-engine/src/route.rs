//! Route graphs, the route-parsing service seam, and the shared route cache.
//!
//! Routes are parsed once per unique path key during a pre-processing pass
//! and handed out as independent clones afterwards: per-train route state
//! (reversal flags, traversal position) is mutated during scheduling, so the
//! cached parse is never aliased.

use std::collections::HashMap;
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;

use tracing::debug;

/// Identifier of one track section in the route network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u32);

/// Identifier of a signal controlling a section exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalId(pub u32);

/// Identifier of a station platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformId(pub u32);

/// Travel direction over a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDirection {
    Forward,
    Reverse,
}

/// One element of a subpath: a section traversed in a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteElement {
    pub section: SectionId,
    pub direction: TrackDirection,
}

/// A contiguous run of route elements between reversal points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subpath {
    pub elements: Vec<RouteElement>,
}

impl Subpath {
    /// Index of the first occurrence of `section` at or after `from`.
    pub fn route_index(&self, section: SectionId, from: usize) -> Option<usize> {
        self.elements
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, element)| element.section == section)
            .map(|(index, _)| index)
    }
}

/// A reversal point between two subpaths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversalPoint {
    /// Invalid reversal points are kept for indexing but do not flip train
    /// orientation.
    pub valid: bool,
}

/// A station platform on a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub id: PlatformId,
    /// Sections the platform spans, in track order.
    pub sections: Vec<SectionId>,
    /// Signal protecting the platform exit, when one exists.
    pub exit_signal: Option<SignalId>,
}

/// A parsed route: ordered subpaths, reversal info, and the platform index
/// keyed by lower-cased station name.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteGraph {
    pub subpaths: Vec<Subpath>,
    pub reversals: Vec<ReversalPoint>,
    pub platforms: HashMap<String, Platform>,
    /// Route line speed limit in m/s.
    pub line_speed: f64,
}

impl RouteGraph {
    /// Platform lookup by station name, case-insensitive.
    pub fn platform(&self, station: &str) -> Option<&Platform> {
        self.platforms.get(&station.trim().to_lowercase())
    }

    pub fn first_subpath(&self) -> Option<&Subpath> {
        self.subpaths.first()
    }

    pub fn last_subpath(&self) -> Option<&Subpath> {
        self.subpaths.last()
    }

    /// Number of reversal points that actually flip train orientation.
    pub fn valid_reversal_count(&self) -> usize {
        self.reversals.iter().filter(|r| r.valid).count()
    }
}

/// Normalized route-path key. Comparison is case-insensitive; a missing
/// extension defaults to `.pat`.
///
/// # Examples
///
/// ```
/// use timetable_engine::route::PathKey;
///
/// assert_eq!(PathKey::new("North Main"), PathKey::new("north main.pat"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().to_lowercase();
        if trimmed.contains('.') {
            Self(trimmed)
        } else {
            Self(format!("{trimmed}.pat"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error resolving or parsing a route path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route path for {0}")]
    Unknown(PathKey),
    #[error("route path {key} failed to parse: {reason}")]
    Parse { key: PathKey, reason: String },
}

/// External route/path parser.
pub trait RouteService {
    fn parse_route(&self, key: &PathKey) -> Result<RouteGraph, RouteError>;
}

/// Deduplicated store of parsed routes.
///
/// Keys are registered while train descriptors are built, parsed in one
/// batch by [`RouteCache::preprocess`], then served as clones. Keys first
/// seen later (stabling and run-round paths) go through
/// [`RouteCache::fetch`], which parses and caches on demand.
#[derive(Debug, Default)]
pub struct RouteCache {
    entries: BTreeMap<PathKey, Option<RouteGraph>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key for the pre-processing batch. Idempotent.
    pub fn register(&mut self, key: &PathKey) {
        if let Entry::Vacant(slot) = self.entries.entry(key.clone()) {
            slot.insert(None);
        }
    }

    /// Parse every registered key once. Must run after all descriptors are
    /// built and before any train consumes a route. Any unresolvable key
    /// aborts the whole load.
    pub fn preprocess(&mut self, service: &dyn RouteService) -> Result<(), RouteError> {
        for (key, slot) in self.entries.iter_mut() {
            if slot.is_none() {
                debug!(path = %key, "parsing route path");
                *slot = Some(service.parse_route(key)?);
            }
        }
        Ok(())
    }

    /// A fresh copy of a cached route.
    pub fn load(&self, key: &PathKey) -> Result<RouteGraph, RouteError> {
        self.entries
            .get(key)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or_else(|| RouteError::Unknown(key.clone()))
    }

    /// A fresh copy of the route for `key`, parsing and caching it if this
    /// is the first time the key is seen.
    pub fn fetch(
        &mut self,
        key: &PathKey,
        service: &dyn RouteService,
    ) -> Result<RouteGraph, RouteError> {
        if let Some(Some(route)) = self.entries.get(key) {
            return Ok(route.clone());
        }
        let route = service.parse_route(key)?;
        self.entries.insert(key.clone(), Some(route.clone()));
        Ok(route)
    }
}
