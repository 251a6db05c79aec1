//! Grid classification: column kinds, row kinds, anchor rows and the
//! continuation cross-reference.
//!
//! Classification is a pure function of the grid. Continuation folding, which
//! rewrites train cells in place, is a separate step so that classification
//! can be re-run on the same grid with identical results.

use std::collections::BTreeMap;

use tracing::warn;

use crate::command::CommandToken;
use crate::grid::reader::TimetableGrid;
use crate::grid::station::StationInfo;

/// Classification of one header column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Column 0: station names and row keywords.
    StationLabel,
    /// Extra station information ($hold and friends) following column 0.
    AddStationInfo,
    Comment,
    /// Defines a train; payload is the train's ordinal in this file.
    TrainDefinition(usize),
    /// Continuation of a train column; payload is the owning column index.
    TrainAddInfo(usize),
    Invalid,
}

/// Classification of one row, keyed by its column-0 cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    TrainHeader,
    StationStop,
    AddStationInfo,
    ConsistRef,
    PathRef,
    StartTime,
    DisposeDirective,
    Direction,
    Notes,
    Comment,
    Invalid,
}

/// Error rejecting a whole timetable file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("timetable {file} has no {keyword} row")]
    MissingAnchor { file: String, keyword: &'static str },
    #[error("timetable {0} has no usable rows")]
    EmptyGrid(String),
}

/// The classified shape of one timetable grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: Vec<ColumnKind>,
    pub rows: Vec<RowKind>,
    /// Column index of each train, in train-ordinal order.
    pub train_columns: Vec<usize>,
    /// Header text of each train column, trimmed, original case.
    pub train_headers: Vec<String>,
    /// Continuation column -> owning train column.
    pub continuations: BTreeMap<usize, usize>,
    /// Station row -> station info, with hold annotations folded in.
    pub stations: BTreeMap<usize, StationInfo>,
    pub consist_row: usize,
    pub path_row: usize,
    pub start_row: usize,
    pub dispose_row: Option<usize>,
    pub direction_row: Option<usize>,
    pub note_rows: Vec<usize>,
    /// Timetable description: the cell where the first `#comment` row and
    /// column cross, falling back to the file name.
    pub description: String,
}

/// Classify a grid into column kinds, row kinds and anchors.
///
/// Rejects the file when any of the `#consist`, `#path`, `#start` anchor rows
/// is missing. Optional anchors (`#dispose`, `#direction`, `#note`) are
/// recorded when present.
pub fn classify(grid: &TimetableGrid) -> Result<GridLayout, LayoutError> {
    if grid.row_count() < 2 || grid.column_count() == 0 {
        return Err(LayoutError::EmptyGrid(grid.file_name.clone()));
    }

    let columns = classify_columns(grid);
    let rows = classify_rows(grid);

    let consist_row = rows.anchor(RowKind::ConsistRef).ok_or_else(|| missing(grid, "#consist"))?;
    let path_row = rows.anchor(RowKind::PathRef).ok_or_else(|| missing(grid, "#path"))?;
    let start_row = rows.anchor(RowKind::StartTime).ok_or_else(|| missing(grid, "#start"))?;
    let dispose_row = rows.anchor(RowKind::DisposeDirective);
    let direction_row = rows.anchor(RowKind::Direction);

    let description = match (rows.comment_row, columns.comment_column) {
        (Some(row), Some(column)) if !grid.cell(row, column).trim().is_empty() => {
            grid.cell(row, column).trim().to_string()
        }
        _ => grid.file_name.clone(),
    };

    let mut stations = rows.stations;
    fold_station_info(grid, &columns.kinds, &mut stations);

    Ok(GridLayout {
        columns: columns.kinds,
        rows: rows.kinds,
        train_columns: columns.train_columns,
        train_headers: columns.train_headers,
        continuations: columns.continuations,
        stations,
        consist_row,
        path_row,
        start_row,
        dispose_row,
        direction_row,
        note_rows: rows.note_rows,
        description,
    })
}

fn missing(grid: &TimetableGrid, keyword: &'static str) -> LayoutError {
    warn!(file = %grid.file_name, keyword, "rejecting timetable: mandatory row missing");
    LayoutError::MissingAnchor {
        file: grid.file_name.clone(),
        keyword,
    }
}

struct ColumnPass {
    kinds: Vec<ColumnKind>,
    train_columns: Vec<usize>,
    train_headers: Vec<String>,
    continuations: BTreeMap<usize, usize>,
    comment_column: Option<usize>,
}

fn classify_columns(grid: &TimetableGrid) -> ColumnPass {
    let mut pass = ColumnPass {
        kinds: vec![ColumnKind::StationLabel],
        train_columns: Vec::new(),
        train_headers: Vec::new(),
        continuations: BTreeMap::new(),
        comment_column: None,
    };

    for col in 1..grid.column_count() {
        let header = grid.cell(0, col).trim();
        let kind = if header.is_empty() {
            // An empty header continues the previous column.
            match pass.kinds[col - 1] {
                ColumnKind::StationLabel | ColumnKind::AddStationInfo => ColumnKind::AddStationInfo,
                ColumnKind::TrainDefinition(_) => ColumnKind::TrainAddInfo(col - 1),
                ColumnKind::TrainAddInfo(owner) => ColumnKind::TrainAddInfo(owner),
                ColumnKind::Comment => ColumnKind::Comment,
                ColumnKind::Invalid => ColumnKind::Invalid,
            }
        } else if header.eq_ignore_ascii_case("#comment") {
            if pass.comment_column.is_none() {
                pass.comment_column = Some(col);
            }
            ColumnKind::Comment
        } else if header.starts_with('#') {
            warn!(file = %grid.file_name, column = col, header, "ignoring unknown column keyword");
            ColumnKind::Invalid
        } else {
            pass.train_columns.push(col);
            pass.train_headers.push(header.to_string());
            ColumnKind::TrainDefinition(pass.train_columns.len() - 1)
        };
        if let ColumnKind::TrainAddInfo(owner) = kind {
            pass.continuations.insert(col, owner);
        }
        pass.kinds.push(kind);
    }

    pass
}

struct RowPass {
    kinds: Vec<RowKind>,
    stations: BTreeMap<usize, StationInfo>,
    consist_row: Option<usize>,
    path_row: Option<usize>,
    start_row: Option<usize>,
    dispose_row: Option<usize>,
    direction_row: Option<usize>,
    note_rows: Vec<usize>,
    comment_row: Option<usize>,
}

impl RowPass {
    fn anchor(&self, kind: RowKind) -> Option<usize> {
        match kind {
            RowKind::ConsistRef => self.consist_row,
            RowKind::PathRef => self.path_row,
            RowKind::StartTime => self.start_row,
            RowKind::DisposeDirective => self.dispose_row,
            RowKind::Direction => self.direction_row,
            _ => None,
        }
    }
}

fn classify_rows(grid: &TimetableGrid) -> RowPass {
    let mut pass = RowPass {
        kinds: vec![RowKind::TrainHeader],
        stations: BTreeMap::new(),
        consist_row: None,
        path_row: None,
        start_row: None,
        dispose_row: None,
        direction_row: None,
        note_rows: Vec::new(),
        comment_row: None,
    };

    for row in 1..grid.row_count() {
        let cell = grid.cell(row, 0);
        // Keyword rows may carry /-qualifiers; the keyword is the part
        // before the first slash.
        let keyword = cell.split('/').next().unwrap_or_default().trim();

        let kind = if keyword.is_empty() {
            match pass.kinds[row - 1] {
                RowKind::StationStop | RowKind::AddStationInfo => RowKind::AddStationInfo,
                _ => RowKind::Comment,
            }
        } else {
            match keyword.to_lowercase().as_str() {
                "#consist" => anchor_row(grid, row, &mut pass.consist_row, RowKind::ConsistRef),
                "#path" => anchor_row(grid, row, &mut pass.path_row, RowKind::PathRef),
                "#start" => anchor_row(grid, row, &mut pass.start_row, RowKind::StartTime),
                "#dispose" => {
                    anchor_row(grid, row, &mut pass.dispose_row, RowKind::DisposeDirective)
                }
                "#direction" => anchor_row(grid, row, &mut pass.direction_row, RowKind::Direction),
                "#note" => {
                    pass.note_rows.push(row);
                    RowKind::Notes
                }
                "#comment" => {
                    if pass.comment_row.is_none() {
                        pass.comment_row = Some(row);
                    }
                    RowKind::Comment
                }
                other if other.starts_with('#') => {
                    warn!(file = %grid.file_name, row, keyword = other, "ignoring unknown row keyword");
                    RowKind::Invalid
                }
                _ => {
                    // The full cell, not the keyword: station names may carry
                    // in-line commands whose qualifiers use '/'.
                    pass.stations.insert(row, StationInfo::new(cell));
                    RowKind::StationStop
                }
            }
        };
        pass.kinds.push(kind);
    }

    pass
}

fn anchor_row(grid: &TimetableGrid, row: usize, slot: &mut Option<usize>, kind: RowKind) -> RowKind {
    if slot.is_some() {
        warn!(file = %grid.file_name, row, "duplicate anchor row ignored");
        RowKind::Comment
    } else {
        *slot = Some(row);
        kind
    }
}

/// Fold `$`-delimited commands from additional-station-info columns into each
/// station row's info record.
fn fold_station_info(
    grid: &TimetableGrid,
    columns: &[ColumnKind],
    stations: &mut BTreeMap<usize, StationInfo>,
) {
    for (&row, station) in stations.iter_mut() {
        for (col, kind) in columns.iter().enumerate() {
            if *kind != ColumnKind::AddStationInfo {
                continue;
            }
            for fragment in grid.cell(row, col).split('$').skip(1) {
                match CommandToken::parse(fragment) {
                    Ok(command) => station.apply_command(&command),
                    Err(_) => {
                        warn!(file = %grid.file_name, station = %station.name, "skipping empty station command");
                    }
                }
            }
        }
    }
}

/// Flatten each train's continuation columns into its owning column: for
/// every station row, non-empty continuation cells are space-appended onto
/// the owner's cell. Run once, before building train descriptors.
pub fn fold_continuations(grid: &mut TimetableGrid, layout: &GridLayout) {
    for (&add_col, &owner_col) in &layout.continuations {
        for (row, kind) in layout.rows.iter().enumerate() {
            if *kind != RowKind::StationStop {
                continue;
            }
            let extra = grid.cell(row, add_col).trim().to_string();
            if !extra.is_empty() {
                grid.append_to_cell(row, owner_col, &extra);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::station::HoldState;

    fn grid(text: &str) -> TimetableGrid {
        TimetableGrid::parse("test_tt", text).unwrap()
    }

    const BASIC: &str = "\
;#comment;1Z20;2A10
#comment;morning;;
newcastle;;10:00;10:30
#consist;;set_a;set_b
#path;;north.pat;south.pat
#start;;09:00;09:15";

    #[test]
    fn columns_and_rows_classified() {
        let layout = classify(&grid(BASIC)).unwrap();
        assert_eq!(layout.columns[0], ColumnKind::StationLabel);
        assert_eq!(layout.columns[1], ColumnKind::Comment);
        assert_eq!(layout.columns[2], ColumnKind::TrainDefinition(0));
        assert_eq!(layout.columns[3], ColumnKind::TrainDefinition(1));
        assert_eq!(layout.train_headers, vec!["1Z20", "2A10"]);
        assert_eq!(layout.rows[2], RowKind::StationStop);
        assert_eq!(layout.consist_row, 3);
        assert_eq!(layout.path_row, 4);
        assert_eq!(layout.start_row, 5);
        assert_eq!(layout.stations[&2].name, "newcastle");
    }

    #[test]
    fn classification_is_idempotent() {
        let g = grid(BASIC);
        let first = classify(&g).unwrap();
        let second = classify(&g).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_start_anchor_rejects_file() {
        let text = "\
;;1Z20
newcastle;;10:00
#consist;;set_a
#path;;north.pat";
        match classify(&grid(text)) {
            Err(LayoutError::MissingAnchor { keyword, .. }) => assert_eq!(keyword, "#start"),
            other => panic!("expected missing anchor, got {other:?}"),
        }
    }

    #[test]
    fn empty_train_header_becomes_continuation() {
        let text = "\
;;1Z20;;
newcastle;;A;B
#consist;;set_a;
#path;;north.pat;
#start;;09:00;";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.columns[2], ColumnKind::TrainDefinition(0));
        assert_eq!(layout.columns[3], ColumnKind::TrainAddInfo(2));
        assert_eq!(layout.columns[4], ColumnKind::TrainAddInfo(2));
        assert_eq!(layout.continuations[&3], 2);
        assert_eq!(layout.continuations[&4], 2);
    }

    #[test]
    fn continuation_folding_concatenates_station_cells() {
        let text = "\
;;1Z20;
newcastle;;A;B
#consist;;set_a;ignored
#path;;north.pat;
#start;;09:00;";
        let mut g = grid(text);
        let layout = classify(&g).unwrap();
        fold_continuations(&mut g, &layout);
        assert_eq!(g.cell(1, 2), "A B");
        // Non-station rows are untouched.
        assert_eq!(g.cell(2, 2), "set_a");
    }

    #[test]
    fn unknown_keywords_flagged_invalid() {
        let text = "\
;;1Z20;#bogus
newcastle;;10:00;
#frobnicate;;x;
#consist;;set_a;
#path;;north.pat;
#start;;09:00;";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.columns[3], ColumnKind::Invalid);
        assert_eq!(layout.rows[2], RowKind::Invalid);
        assert_eq!(layout.train_columns, vec![2]);
    }

    #[test]
    fn station_hold_commands_folded_in() {
        let text = "\
;;1Z20
newcastle;$hold;10:00
york;$forcehold;11:00
durham;$waitsignal;12:00
#consist;;set_a
#path;;north.pat
#start;;09:00";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.stations[&1].hold, HoldState::Hold);
        assert_eq!(layout.stations[&2].hold, HoldState::ForceHold);
        assert_eq!(layout.stations[&3].hold, HoldState::NoHold);
    }

    #[test]
    fn station_label_cell_commands_split_from_name() {
        let text = "\
;;1Z20
york $hold;;10:00
#consist;;set_a
#path;;north.pat
#start;;09:00";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.stations[&1].name, "york");
        assert_eq!(layout.stations[&1].hold, HoldState::Hold);
    }

    #[test]
    fn description_read_from_comment_intersection() {
        let layout = classify(&grid(BASIC)).unwrap();
        assert_eq!(layout.description, "morning");
    }

    #[test]
    fn description_falls_back_to_file_name() {
        let text = "\
;;1Z20
newcastle;;10:00
#consist;;set_a
#path;;north.pat
#start;;09:00";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.description, "test_tt");
    }

    #[test]
    fn empty_station_label_continues_station_rows() {
        let text = "\
;;1Z20
newcastle;;10:00
;$hold;
#consist;;set_a
#path;;north.pat
#start;;09:00";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.rows[2], RowKind::AddStationInfo);
    }

    #[test]
    fn duplicate_anchor_row_ignored() {
        let text = "\
;;1Z20
newcastle;;10:00
#consist;;set_a
#consist;;set_b
#path;;north.pat
#start;;09:00";
        let layout = classify(&grid(text)).unwrap();
        assert_eq!(layout.consist_row, 2);
        assert_eq!(layout.rows[3], RowKind::Comment);
    }
}
