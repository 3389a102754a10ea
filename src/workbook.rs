//! In-memory workbook model: an ordered collection of sparse sheets.
//!
//! Sheets are addressed by name only. Positional index is deliberately not
//! part of the API because it shifts under add/remove/reorder; the name is
//! the stable identifier a caller can hold across mutations.

use crate::error::{EngineError, Result};
use crate::model::{CellValue, SheetMeta, WorkbookMetadataResponse};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single cell: its value plus the one style attribute the engine models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Cell {
    pub value: CellValue,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fill: Option<String>,
}

/// A conceptually infinite 1-based grid with sparse storage. Keys are
/// `(row, col)` so iteration is row-major, which the column resolver and
/// find/replace scans rely on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sheet {
    #[serde(default)]
    pub hidden: bool,
    #[serde(with = "cell_records")]
    cells: BTreeMap<(u32, u32), Cell>,
    used_rows: u32,
    used_cols: u32,
}

static NULL_VALUE: CellValue = CellValue::Null;

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used_rows(&self) -> u32 {
        self.used_rows
    }

    pub fn used_columns(&self) -> u32 {
        self.used_cols
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Reading an unset position yields `Null`, never an error.
    pub fn value_at(&self, row: u32, col: u32) -> &CellValue {
        self.cells
            .get(&(row, col))
            .map(|cell| &cell.value)
            .unwrap_or(&NULL_VALUE)
    }

    pub fn fill_at(&self, row: u32, col: u32) -> Option<&str> {
        self.cells.get(&(row, col)).and_then(|c| c.fill.as_deref())
    }

    /// Write a value, keeping any fill annotation already on the cell.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        debug_assert!(row >= 1 && col >= 1, "cell coordinates are 1-based");
        self.touch(row, col);
        self.cells.entry((row, col)).or_default().value = value;
    }

    pub fn set_fill(&mut self, row: u32, col: u32, color: &str) {
        debug_assert!(row >= 1 && col >= 1, "cell coordinates are 1-based");
        self.touch(row, col);
        self.cells.entry((row, col)).or_default().fill = Some(color.to_string());
    }

    fn touch(&mut self, row: u32, col: u32) {
        if row > self.used_rows {
            self.used_rows = row;
        }
        if col > self.used_cols {
            self.used_cols = col;
        }
    }

    /// Highest populated column within one row (0 when the row is empty).
    pub fn highest_used_column_in_row(&self, row: u32) -> u32 {
        self.cells
            .range((row, 1)..=(row, u32::MAX))
            .map(|((_, col), _)| *col)
            .max()
            .unwrap_or(0)
    }

    /// Row-major iteration over populated cells.
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u32, &Cell)> {
        self.cells.iter().map(|((r, c), cell)| (*r, *c, cell))
    }

    pub fn iter_column(&self, col: u32) -> impl Iterator<Item = (u32, &Cell)> {
        self.cells
            .iter()
            .filter(move |((_, c), _)| *c == col)
            .map(|((r, _), cell)| (*r, cell))
    }

    /// Snapshot of one row's content across columns `1..=width`, preserving
    /// sparseness so a write-back restores the exact same gaps.
    pub fn row_snapshot(&self, row: u32, width: u32) -> Vec<Option<Cell>> {
        (1..=width)
            .map(|col| self.cells.get(&(row, col)).cloned())
            .collect()
    }

    /// Overwrite one row's content from a snapshot produced by
    /// [`Sheet::row_snapshot`]. `None` entries clear the position.
    pub fn write_row(&mut self, row: u32, snapshot: &[Option<Cell>]) {
        for (idx, entry) in snapshot.iter().enumerate() {
            let col = idx as u32 + 1;
            match entry {
                Some(cell) => {
                    self.touch(row, col);
                    self.cells.insert((row, col), cell.clone());
                }
                None => {
                    self.cells.remove(&(row, col));
                }
            }
        }
    }
}

/// Ordered sequence of named sheets. Names are unique and case-sensitive;
/// tab order is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Workbook {
    sheets: IndexMap<String, Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sheet at the end of the tab order, replacing any sheet that
    /// already carries the name.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        self.sheets.entry(name.into()).or_default()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets.get(name).ok_or_else(|| EngineError::SheetNotFound {
            sheet: name.to_string(),
            available: self.sheet_names(),
        })
    }

    pub fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        let available = self.sheet_names();
        self.sheets.get_mut(name).ok_or(EngineError::SheetNotFound {
            sheet: name.to_string(),
            available,
        })
    }

    /// Resolve an action's target: the named sheet, or the first sheet in
    /// tab order when no name was supplied.
    pub fn target_sheet_mut(&mut self, name: Option<&str>) -> Result<&mut Sheet> {
        match name {
            Some(name) => self.sheet_mut(name),
            None => match self.sheets.get_index_mut(0) {
                Some((_, sheet)) => Ok(sheet),
                None => Err(EngineError::SheetNotFound {
                    sheet: "(first sheet)".to_string(),
                    available: Vec::new(),
                }),
            },
        }
    }

    /// Metadata listing: hidden sheets excluded, tab order preserved.
    /// `sheetId` is the sheet name, the only stable identifier.
    pub fn metadata(&self) -> WorkbookMetadataResponse {
        let sheets = self
            .sheets
            .iter()
            .filter(|(_, sheet)| !sheet.hidden)
            .map(|(name, sheet)| SheetMeta {
                sheet_id: name.clone(),
                name: name.clone(),
                total_rows: sheet.used_rows(),
                total_cols: sheet.used_columns(),
            })
            .collect();
        WorkbookMetadataResponse { sheets }
    }
}

/// Snapshot serde for the sparse cell map. JSON object keys must be strings,
/// so the map is persisted as a flat record list instead.
mod cell_records {
    use super::Cell;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct CellRecord {
        r: u32,
        c: u32,
        #[serde(flatten)]
        cell: Cell,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<(u32, u32), Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let records: Vec<CellRecord> = cells
            .iter()
            .map(|((r, c), cell)| CellRecord {
                r: *r,
                c: *c,
                cell: cell.clone(),
            })
            .collect();
        records.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(u32, u32), Cell>, D::Error> {
        let records = Vec::<CellRecord>::deserialize(deserializer)?;
        Ok(records
            .into_iter()
            .map(|record| ((record.r, record.c), record.cell))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;
    use assert_matches::assert_matches;

    fn sheet_with(cells: &[(u32, u32, CellValue)]) -> Sheet {
        let mut sheet = Sheet::new();
        for (row, col, value) in cells {
            sheet.set_value(*row, *col, value.clone());
        }
        sheet
    }

    #[test]
    fn test_unset_position_reads_null() {
        let sheet = Sheet::new();
        assert_eq!(*sheet.value_at(100, 100), CellValue::Null);
    }

    #[test]
    fn test_used_extents_track_highest_write() {
        let sheet = sheet_with(&[
            (1, 1, CellValue::Text("a".into())),
            (7, 3, CellValue::Number(1.0)),
        ]);
        assert_eq!(sheet.used_rows(), 7);
        assert_eq!(sheet.used_columns(), 3);
    }

    #[test]
    fn test_fill_preserved_across_value_write() {
        let mut sheet = Sheet::new();
        sheet.set_fill(2, 2, "FFFF00");
        sheet.set_value(2, 2, CellValue::Number(9.0));
        assert_eq!(sheet.fill_at(2, 2), Some("FFFF00"));
    }

    #[test]
    fn test_row_snapshot_write_back_preserves_gaps() {
        let mut sheet = sheet_with(&[
            (2, 1, CellValue::Text("left".into())),
            (2, 3, CellValue::Text("right".into())),
        ]);
        let snapshot = sheet.row_snapshot(2, 3);
        assert!(snapshot[1].is_none());
        sheet.write_row(3, &snapshot);
        assert_eq!(*sheet.value_at(3, 1), CellValue::Text("left".into()));
        assert_eq!(*sheet.value_at(3, 2), CellValue::Null);
        assert_eq!(*sheet.value_at(3, 3), CellValue::Text("right".into()));
    }

    #[test]
    fn test_highest_used_column_in_row() {
        let sheet = sheet_with(&[
            (1, 2, CellValue::Text("B1".into())),
            (1, 5, CellValue::Text("E1".into())),
            (2, 9, CellValue::Text("I2".into())),
        ]);
        assert_eq!(sheet.highest_used_column_in_row(1), 5);
        assert_eq!(sheet.highest_used_column_in_row(3), 0);
    }

    #[test]
    fn test_sheet_lookup_errors_list_available() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("Data");
        workbook.add_sheet("Summary");
        let err = workbook.sheet("Nope").unwrap_err();
        assert_matches!(err, EngineError::SheetNotFound { ref available, .. }
            if available == &vec!["Data".to_string(), "Summary".to_string()]);
    }

    #[test]
    fn test_target_sheet_defaults_to_first_tab() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("First").set_value(1, 1, CellValue::Number(1.0));
        workbook.add_sheet("Second");
        let sheet = workbook.target_sheet_mut(None).expect("first sheet");
        assert_eq!(*sheet.value_at(1, 1), CellValue::Number(1.0));
    }

    #[test]
    fn test_metadata_excludes_hidden_preserves_order() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("Visible").set_value(3, 2, CellValue::Number(1.0));
        workbook.add_sheet("Secret").hidden = true;
        workbook.add_sheet("Tail");
        let meta = workbook.metadata();
        let names: Vec<&str> = meta.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Visible", "Tail"]);
        assert_eq!(meta.sheets[0].total_rows, 3);
        assert_eq!(meta.sheets[0].total_cols, 2);
        assert_eq!(meta.sheets[0].sheet_id, "Visible");
    }

    #[test]
    fn test_snapshot_serde_preserves_sparse_cells() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_sheet("Data");
        sheet.set_value(1, 1, CellValue::Text("Name".into()));
        sheet.set_value(500, 40, CellValue::Number(12.5));
        sheet.set_fill(500, 40, "FF0000");

        let encoded = serde_json::to_string(&workbook).expect("serialize");
        let decoded: Workbook = serde_json::from_str(&encoded).expect("deserialize");
        let sheet = decoded.sheet("Data").expect("sheet survives");
        assert_eq!(*sheet.value_at(500, 40), CellValue::Number(12.5));
        assert_eq!(sheet.fill_at(500, 40), Some("FF0000"));
        assert_eq!(sheet.used_rows(), 500);
        assert_eq!(*sheet.value_at(2, 2), CellValue::Null);
    }
}
