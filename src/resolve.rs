//! Header-text column resolution.
//!
//! Actions refer to columns by the header text a user sees, not by index.
//! Resolution scans a bounded band of top rows so a stray matching value
//! deep in the data region can never be mistaken for a header.

use crate::workbook::Sheet;
use std::collections::HashMap;

/// Where a header was found. `header_row` is the boundary below which
/// row-oriented actions treat rows as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub column: u32,
    pub header_row: u32,
}

/// Locate a column whose header text equals `name`, comparing trimmed and
/// case-insensitively. Scans rows `1..=scan_depth` (capped at the used row
/// count) in row-major order and stops at the first hit.
pub fn resolve_column(sheet: &Sheet, name: &str, scan_depth: u32) -> Option<ResolvedColumn> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let row_limit = sheet.used_rows().min(scan_depth);
    for (row, col, cell) in sheet.iter_cells() {
        if row > row_limit {
            break;
        }
        if cell.value.display_text().trim().to_lowercase() == needle {
            return Some(ResolvedColumn {
                column: col,
                header_row: row,
            });
        }
    }
    None
}

/// Map from lowercased, trimmed header text to column index, built from
/// row 1. On duplicate header text the leftmost column wins.
pub fn header_map(sheet: &Sheet) -> HashMap<String, u32> {
    let mut map = HashMap::new();
    for (row, col, cell) in sheet.iter_cells() {
        if row > 1 {
            break;
        }
        let text = cell.value.display_text().trim().to_lowercase();
        if !text.is_empty() {
            map.entry(text).or_insert(col);
        }
    }
    map
}
