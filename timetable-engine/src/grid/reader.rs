//! Raw timetable grid reader.
//!
//! A timetable file declares its own cell separator: the first character of
//! the first line is the separator for the whole file. Every line is split on
//! it, and short rows are padded with empty cells to the header width, so the
//! grid downstream code sees is rectangular.

use std::fs;
use std::path::Path;

/// Error reading or decoding a raw timetable grid.
#[derive(Debug, thiserror::Error)]
pub enum GridReadError {
    #[error("failed to read timetable file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timetable file {0} is empty")]
    Empty(String),
}

/// A rectangular grid of raw cell strings. Row 0 is the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableGrid {
    /// Source file name (stem only), used in diagnostics and as the default
    /// timetable description.
    pub file_name: String,
    rows: Vec<Vec<String>>,
}

impl TimetableGrid {
    /// Parse grid text. The first character of the first line is taken as the
    /// cell separator.
    pub fn parse(file_name: &str, text: &str) -> Result<Self, GridReadError> {
        let mut lines = text.lines();
        let first = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| GridReadError::Empty(file_name.to_string()))?;
        let separator = first
            .chars()
            .next()
            .ok_or_else(|| GridReadError::Empty(file_name.to_string()))?;

        let split = |line: &str| -> Vec<String> {
            line.split(separator).map(str::to_string).collect()
        };

        let header = split(first);
        let width = header.len();
        let mut rows = vec![header];
        for line in lines {
            let mut cells = split(line);
            cells.resize(width, String::new());
            cells.truncate(width);
            rows.push(cells);
        }

        Ok(Self {
            file_name: file_name.to_string(),
            rows,
        })
    }

    /// Read and parse a timetable file from disk.
    pub fn from_file(path: &Path) -> Result<Self, GridReadError> {
        let text = fs::read_to_string(path).map_err(|source| GridReadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(&stem, &text)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Cell text at (row, column). Out-of-range access returns the empty
    /// string, so callers never index-panic on a ragged source file.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map_or("", String::as_str)
    }

    /// Space-append text onto an existing cell, used when folding
    /// continuation columns into their owning train column.
    pub fn append_to_cell(&mut self, row: usize, column: usize, text: &str) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            if cell.is_empty() {
                cell.push_str(text);
            } else {
                cell.push(' ');
                cell.push_str(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_character_selects_separator() {
        let grid = TimetableGrid::parse("tt", ";;1Z20\n#start;;06:30").unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell(0, 2), "1Z20");
        assert_eq!(grid.cell(1, 0), "#start");
        assert_eq!(grid.cell(1, 2), "06:30");
    }

    #[test]
    fn tab_separator() {
        let grid = TimetableGrid::parse("tt", "\t\ttrain\n#path\t\troute.pat").unwrap();
        assert_eq!(grid.cell(1, 2), "route.pat");
    }

    #[test]
    fn short_rows_padded_to_header_width() {
        let grid = TimetableGrid::parse("tt", ";;a;b\n#start;06:00").unwrap();
        assert_eq!(grid.column_count(), 4);
        assert_eq!(grid.cell(1, 3), "");
    }

    #[test]
    fn overlong_rows_truncated_to_header_width() {
        let grid = TimetableGrid::parse("tt", ";;a\n#start;06:00;x;surplus").unwrap();
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.cell(1, 2), "x");
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(
            TimetableGrid::parse("tt", ""),
            Err(GridReadError::Empty(_))
        ));
    }

    #[test]
    fn append_joins_with_space() {
        let mut grid = TimetableGrid::parse("tt", ";;a\nstation;10:00;").unwrap();
        grid.append_to_cell(1, 1, "$hold");
        assert_eq!(grid.cell(1, 1), "10:00 $hold");
        grid.append_to_cell(1, 2, "06:00");
        assert_eq!(grid.cell(1, 2), "06:00");
    }
}
