//! Timetable file set resolution.
//!
//! A timetable invocation names either a single timetable file
//! (`.timetable_or` / `.timetable-or`) or a list file
//! (`.timetablelist_or` / `.timetablelist-or`) whose lines name timetable
//! files relative to the list file's directory. A leading `#` line in a list
//! file is the set's description.

use std::fs;
use std::path::{Path, PathBuf};

/// Error resolving a timetable file set.
#[derive(Debug, thiserror::Error)]
pub enum FileSetError {
    #[error("unrecognized timetable file extension on {0}")]
    UnknownExtension(String),
    #[error("failed to read timetable list {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The expanded set of timetable files to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableSet {
    /// Set description from the list file, when one was given.
    pub description: Option<String>,
    pub files: Vec<PathBuf>,
}

/// Expand a timetable or timetable-list path into the individual timetable
/// files it names. An unrecognized extension is fatal: the caller has
/// nothing sensible to fall back to.
pub fn resolve_file_set(path: &Path) -> Result<TimetableSet, FileSetError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "timetable_or" | "timetable-or" => Ok(TimetableSet {
            description: None,
            files: vec![path.to_path_buf()],
        }),
        "timetablelist_or" | "timetablelist-or" => expand_list(path),
        _ => Err(FileSetError::UnknownExtension(path.display().to_string())),
    }
}

fn expand_list(path: &Path) -> Result<TimetableSet, FileSetError> {
    let text = fs::read_to_string(path).map_err(|source| FileSetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut description = None;
    let mut files = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if description.is_none() {
                description = Some(rest.trim().to_string());
            }
            continue;
        }
        files.push(base.join(line));
    }

    Ok(TimetableSet { description, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn single_file_resolves_to_itself() {
        let set = resolve_file_set(Path::new("/data/morning.timetable_or")).unwrap();
        assert_eq!(set.files, vec![PathBuf::from("/data/morning.timetable_or")]);
        assert_eq!(set.description, None);

        let set = resolve_file_set(Path::new("/data/morning.timetable-or")).unwrap();
        assert_eq!(set.files.len(), 1);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(resolve_file_set(Path::new("/data/x.Timetable_OR")).is_ok());
    }

    #[test]
    fn unknown_extension_is_fatal() {
        assert!(matches!(
            resolve_file_set(Path::new("/data/morning.txt")),
            Err(FileSetError::UnknownExtension(_))
        ));
        assert!(resolve_file_set(Path::new("/data/noext")).is_err());
    }

    #[test]
    fn list_file_expands_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let list_path = dir.path().join("all.timetablelist_or");
        let mut list = std::fs::File::create(&list_path).unwrap();
        writeln!(list, "#Weekday service").unwrap();
        writeln!(list, "morning.timetable_or").unwrap();
        writeln!(list).unwrap();
        writeln!(list, "evening.timetable_or").unwrap();
        drop(list);

        let set = resolve_file_set(&list_path).unwrap();
        assert_eq!(set.description.as_deref(), Some("Weekday service"));
        assert_eq!(
            set.files,
            vec![
                dir.path().join("morning.timetable_or"),
                dir.path().join("evening.timetable_or"),
            ]
        );
    }

    #[test]
    fn unreadable_list_is_fatal() {
        assert!(matches!(
            resolve_file_set(Path::new("/nonexistent/x.timetablelist_or")),
            Err(FileSetError::Io { .. })
        ));
    }
}
