//! Rolling stock: consist references, the consist-loading service seam, and
//! assembly of a train's car list.
//!
//! A `#consist` cell may reference several consists, `+`-separated or
//! `<bracketed>`, each optionally followed by `$reverse`. A reversed consist
//! contributes its cars in reverse order with each car's orientation flipped.

use tracing::warn;

/// One vehicle of a consist.
#[derive(Debug, Clone, PartialEq)]
pub struct CarDescriptor {
    pub folder: String,
    pub name: String,
    /// True when the car faces backwards relative to its consist definition.
    pub flipped: bool,
    pub length_m: f64,
}

/// A loaded consist file.
#[derive(Debug, Clone, PartialEq)]
pub struct Consist {
    pub cars: Vec<CarDescriptor>,
    /// Declared maximum speed in m/s, if the consist file carries one.
    pub max_velocity: Option<f64>,
}

/// Error loading a consist file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistError {
    #[error("consist file {0} not found")]
    NotFound(String),
    #[error("consist file {file} is malformed: {reason}")]
    Malformed { file: String, reason: String },
}

/// External rolling-stock loader.
pub trait ConsistService {
    fn load_consist(&self, file: &str) -> Result<Consist, ConsistError>;
}

/// A single consist reference extracted from a `#consist` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistRef {
    /// Consist file name with the `.con` extension applied.
    pub file: String,
    pub reversed: bool,
}

/// Parse a `#consist` cell into its ordered reference list.
///
/// # Examples
///
/// ```
/// use timetable_engine::stock::parse_consist_refs;
///
/// let refs = parse_consist_refs("<loco set>$reverse+coaches");
/// assert_eq!(refs[0].file, "loco set.con");
/// assert!(refs[0].reversed);
/// assert_eq!(refs[1].file, "coaches.con");
/// assert!(!refs[1].reversed);
/// ```
pub fn parse_consist_refs(cell: &str) -> Vec<ConsistRef> {
    let mut refs: Vec<ConsistRef> = Vec::new();
    let mut rest = cell.trim();

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('+') {
            rest = stripped.trim_start();
            continue;
        }
        if let Some(flag_rest) = strip_prefix_ignore_case(rest, "$reverse") {
            if let Some(last) = refs.last_mut() {
                last.reversed = true;
            } else {
                warn!(cell, "$reverse with no preceding consist reference");
            }
            rest = flag_rest.trim_start();
            continue;
        }
        let (name, remainder) = if let Some(inner) = rest.strip_prefix('<') {
            match inner.split_once('>') {
                Some((name, after)) => (name, after),
                None => (inner, ""),
            }
        } else {
            let end = rest.find(['+', '$']).unwrap_or(rest.len());
            rest.split_at(end)
        };
        let name = name.trim();
        if !name.is_empty() {
            refs.push(ConsistRef {
                file: with_consist_extension(name),
                reversed: false,
            });
        }
        rest = remainder.trim_start();
    }

    refs
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

fn with_consist_extension(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{name}.con")
    }
}

/// The assembled rolling stock of one train.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainSet {
    pub cars: Vec<CarDescriptor>,
    pub length_m: f64,
    /// Minimum declared max speed across the referenced consists, if any
    /// declared one.
    pub max_velocity: Option<f64>,
}

/// Load every referenced consist and assemble the train's car list.
pub fn build_train_set(
    refs: &[ConsistRef],
    service: &dyn ConsistService,
) -> Result<TrainSet, ConsistError> {
    let mut set = TrainSet::default();
    for consist_ref in refs {
        let consist = service.load_consist(&consist_ref.file)?;
        if consist_ref.reversed {
            for car in consist.cars.into_iter().rev() {
                set.length_m += car.length_m;
                set.cars.push(CarDescriptor {
                    flipped: !car.flipped,
                    ..car
                });
            }
        } else {
            for car in consist.cars {
                set.length_m += car.length_m;
                set.cars.push(car);
            }
        }
        if let Some(velocity) = consist.max_velocity {
            set.max_velocity = Some(match set.max_velocity {
                Some(current) => current.min(velocity),
                None => velocity,
            });
        }
    }
    Ok(set)
}
