//! The action executor: applies the seven mutation actions to a sheet.
//!
//! Each action either succeeds or fails with a typed error before any
//! write, except where its contract states otherwise. Batches are a
//! pipeline: each step runs against the state the previous step committed,
//! and a failing step rolls back only its own effect.

use crate::error::{EngineError, Result};
use crate::formula;
use crate::model::{
    Action, ActionOutcome, BatchResponse, CellValue, SortOrder, UpdateOperation,
};
use crate::resolve::{header_map, resolve_column};
use crate::utils::parse_cell_address;
use crate::workbook::{Cell, Sheet, Workbook};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Loose value equality: native equality, or both sides render to the same
/// non-empty text after trimming and lowercasing. This is how text "5000"
/// finds the number 5000.
pub fn loose_match(a: &CellValue, b: &CellValue) -> bool {
    if a == b {
        return true;
    }
    let left = a.display_text().trim().to_lowercase();
    let right = b.display_text().trim().to_lowercase();
    !left.is_empty() && left == right
}

/// Apply one action to its target sheet (the first sheet when the action
/// names none).
pub fn apply(workbook: &mut Workbook, action: &Action, scan_depth: u32) -> Result<()> {
    let sheet = workbook.target_sheet_mut(action.sheet_name())?;
    match action {
        Action::AddColumn {
            column_name,
            formula_template,
            ..
        } => add_column(sheet, column_name, formula_template),
        Action::HighlightRows {
            condition, color, ..
        } => highlight_rows(sheet, condition, color, scan_depth),
        Action::SortData { column, order, .. } => sort_data(sheet, column, *order, scan_depth),
        Action::UpdateRowValues {
            filter_column,
            filter_value,
            operation,
            value,
            target_column,
            ..
        } => update_row_values(
            sheet,
            filter_column,
            filter_value,
            *operation,
            value,
            target_column.as_deref(),
            scan_depth,
        ),
        Action::UpdateKeyValue {
            key_column,
            key_value,
            value_column,
            new_value,
            ..
        } => update_key_value(
            sheet,
            key_column,
            key_value,
            value_column.as_deref(),
            new_value,
            scan_depth,
        ),
        Action::SetCell { address, value, .. } => set_cell(sheet, address, value),
        Action::FindAndReplace {
            find_value,
            replace_value,
            column,
            ..
        } => find_and_replace(sheet, find_value, replace_value, column.as_deref(), scan_depth),
    }
}

/// Apply an ordered list of actions as a pipeline. Steps after a failure do
/// not run and do not appear in the results; a failing step's partial
/// effect is discarded while earlier steps stay committed.
pub fn apply_batch(workbook: &mut Workbook, actions: &[Action], scan_depth: u32) -> BatchResponse {
    let mut results = Vec::with_capacity(actions.len());
    let mut success = true;
    for action in actions {
        let name = action.as_ref().to_string();
        let mut scratch = workbook.clone();
        match apply(&mut scratch, action, scan_depth) {
            Ok(()) => {
                debug!(action = %name, "action applied");
                *workbook = scratch;
                results.push(ActionOutcome {
                    action: name,
                    success: true,
                    error: None,
                });
            }
            Err(err) => {
                warn!(action = %name, error = %err, "action failed, stopping batch");
                results.push(ActionOutcome {
                    action: name,
                    success: false,
                    error: Some(err.to_string()),
                });
                success = false;
                break;
            }
        }
    }
    BatchResponse { success, results }
}

/// Append a computed column after the highest used column in row 1. Every
/// data row gets a formula cell produced by rewriting the template against
/// the row-1 headers (the fresh header included).
fn add_column(sheet: &mut Sheet, column_name: &str, formula_template: &str) -> Result<()> {
    let new_col = sheet.highest_used_column_in_row(1) + 1;
    sheet.set_value(1, new_col, CellValue::Text(column_name.to_string()));
    let headers = header_map(sheet);
    for row in 2..=sheet.used_rows() {
        let text = formula::rewrite(&headers, formula_template, row);
        sheet.set_value(
            row,
            new_col,
            CellValue::Formula { text, cached: None },
        );
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum CmpOp {
    Ge,
    Le,
    Ne,
    Gt,
    Lt,
    Eq,
}

impl CmpOp {
    fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Eq => lhs == rhs,
        }
    }
}

/// Split a `<column><op><number>` condition. Operators are tried in order,
/// two-character forms first, and the first one found as a substring wins.
fn parse_condition(condition: &str) -> Result<(String, CmpOp, f64)> {
    const OPERATORS: [(&str, CmpOp); 6] = [
        (">=", CmpOp::Ge),
        ("<=", CmpOp::Le),
        ("!=", CmpOp::Ne),
        (">", CmpOp::Gt),
        ("<", CmpOp::Lt),
        ("=", CmpOp::Eq),
    ];
    for (token, op) in OPERATORS {
        if let Some(pos) = condition.find(token) {
            let name = condition[..pos].trim().to_string();
            let raw = condition[pos + token.len()..].trim();
            let threshold = raw.parse::<f64>().map_err(|_| {
                EngineError::InvalidOperation(format!(
                    "condition threshold is not a number: {raw:?}"
                ))
            })?;
            if name.is_empty() {
                return Err(EngineError::InvalidOperation(format!(
                    "condition has no column name: {condition:?}"
                )));
            }
            return Ok((name, op, threshold));
        }
    }
    Err(EngineError::InvalidOperation(format!(
        "no comparison operator in condition: {condition:?}"
    )))
}

/// Paint the fill color across every row below the header whose target cell
/// satisfies the condition. An unresolvable column is a deliberate no-op.
fn highlight_rows(sheet: &mut Sheet, condition: &str, color: &str, scan_depth: u32) -> Result<()> {
    let (column_name, op, threshold) = parse_condition(condition)?;
    let Some(hit) = resolve_column(sheet, &column_name, scan_depth) else {
        debug!(column = %column_name, "highlight column not found, skipping");
        return Ok(());
    };
    let width = sheet.used_columns();
    for row in hit.header_row + 1..=sheet.used_rows() {
        let Some(value) = sheet.value_at(row, hit.column).as_number() else {
            continue;
        };
        if op.eval(value, threshold) {
            for col in 1..=width {
                sheet.set_fill(row, col, color);
            }
        }
    }
    Ok(())
}

/// Sort key for one row. Numeric comparison is used only when the value
/// coerces to a real number and its textual form is non-empty; otherwise
/// the keys compare as lowercased text. Null keys sort after everything.
fn compare_keys(a: &CellValue, b: &CellValue, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let ordering = match (sort_number(a), sort_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => {
            let left = a.display_text().to_lowercase();
            let right = b.display_text().to_lowercase();
            left.cmp(&right)
        }
    };
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn sort_number(value: &CellValue) -> Option<f64> {
    if value.display_text().trim().is_empty() {
        return None;
    }
    value.as_number().filter(|n| !n.is_nan())
}

/// Permute the content of the data rows below the header by the sort key.
/// Row count, row numbers, and the header row itself never change.
fn sort_data(sheet: &mut Sheet, column: &str, order: SortOrder, scan_depth: u32) -> Result<()> {
    let hit = resolve_column(sheet, column, scan_depth).ok_or_else(|| {
        EngineError::ColumnNotFound {
            column: column.to_string(),
        }
    })?;
    let width = sheet.used_columns();
    let rows: Vec<u32> = (hit.header_row + 1..=sheet.used_rows()).collect();
    let mut entries: Vec<(Vec<Option<Cell>>, CellValue)> = rows
        .iter()
        .map(|&row| {
            let snapshot = sheet.row_snapshot(row, width);
            let key = sheet.value_at(row, hit.column).clone();
            (snapshot, key)
        })
        .collect();
    // Stable, so equal keys keep their original relative order.
    entries.sort_by(|a, b| compare_keys(&a.1, &b.1, order));
    for (row, (snapshot, _)) in rows.into_iter().zip(entries) {
        sheet.write_row(row, &snapshot);
    }
    Ok(())
}

fn arithmetic(op: UpdateOperation, current: f64, operand: f64) -> Option<f64> {
    match op {
        UpdateOperation::Set => None,
        UpdateOperation::Add => Some(current + operand),
        UpdateOperation::Subtract => Some(current - operand),
        UpdateOperation::Multiply => Some(current * operand),
        UpdateOperation::Divide => {
            if operand == 0.0 {
                None
            } else {
                Some(current / operand)
            }
        }
    }
}

/// Update cells in every row whose filter cell loose-matches `filter_value`.
/// With a resolvable target column only that cell changes; otherwise the
/// arithmetic applies across the row, skipping non-numeric cells and the
/// filter column itself.
fn update_row_values(
    sheet: &mut Sheet,
    filter_column: &str,
    filter_value: &serde_json::Value,
    operation: UpdateOperation,
    value: &serde_json::Value,
    target_column: Option<&str>,
    scan_depth: u32,
) -> Result<()> {
    let filter = resolve_column(sheet, filter_column, scan_depth).ok_or_else(|| {
        EngineError::ColumnNotFound {
            column: filter_column.to_string(),
        }
    })?;
    let target = target_column.and_then(|name| resolve_column(sheet, name, scan_depth));
    if operation == UpdateOperation::Set && target.is_none() {
        // A SET without a concrete target would overwrite whole rows.
        return Err(EngineError::InvalidOperation(
            "SET requires a resolvable targetColumn".to_string(),
        ));
    }
    let operand = match operation {
        UpdateOperation::Set => None,
        _ => Some(CellValue::from_json(value).as_number().ok_or_else(|| {
            EngineError::InvalidOperation(format!(
                "arithmetic operand is not a number: {value}"
            ))
        })?),
    };
    let needle = CellValue::from_json(filter_value);
    let mut matched = 0usize;
    for row in 1..=sheet.used_rows() {
        if row == filter.header_row {
            continue;
        }
        if !loose_match(sheet.value_at(row, filter.column), &needle) {
            continue;
        }
        matched += 1;
        match (target, operand) {
            (Some(t), _) => {
                let next = match operand {
                    None => CellValue::from_json(value),
                    Some(operand) => {
                        let Some(current) = sheet.value_at(row, t.column).as_number() else {
                            continue;
                        };
                        match arithmetic(operation, current, operand) {
                            Some(result) => CellValue::Number(result),
                            None => continue,
                        }
                    }
                };
                if *sheet.value_at(row, t.column) != next {
                    sheet.set_value(row, t.column, next);
                }
            }
            (None, Some(operand)) => {
                for col in 1..=sheet.used_columns() {
                    if col == filter.column {
                        continue;
                    }
                    let Some(current) = sheet.value_at(row, col).as_number() else {
                        continue;
                    };
                    let Some(result) = arithmetic(operation, current, operand) else {
                        continue;
                    };
                    let next = CellValue::Number(result);
                    if *sheet.value_at(row, col) != next {
                        sheet.set_value(row, col, next);
                    }
                }
            }
            (None, None) => unreachable!("SET without target rejected above"),
        }
    }
    if matched == 0 {
        return Err(EngineError::NoMatchingRows(format!(
            "no rows matched {filter_value} in column {filter_column:?}"
        )));
    }
    Ok(())
}

/// Key-value update for label/value tables. Unlike the other actions this
/// scans the header row too, and a row matches when the key cell OR the
/// current target cell loose-matches `key_value`. The target defaults to
/// the column right of the key.
fn update_key_value(
    sheet: &mut Sheet,
    key_column: &str,
    key_value: &serde_json::Value,
    value_column: Option<&str>,
    new_value: &serde_json::Value,
    scan_depth: u32,
) -> Result<()> {
    let key = resolve_column(sheet, key_column, scan_depth).ok_or_else(|| {
        EngineError::ColumnNotFound {
            column: key_column.to_string(),
        }
    })?;
    let target_col = value_column
        .and_then(|name| resolve_column(sheet, name, scan_depth))
        .map(|hit| hit.column)
        .unwrap_or(key.column + 1);
    let needle = CellValue::from_json(key_value);
    let replacement = CellValue::from_json(new_value);
    let mut updated = 0usize;
    for row in 1..=sheet.used_rows() {
        let key_hit = loose_match(sheet.value_at(row, key.column), &needle);
        let value_hit = loose_match(sheet.value_at(row, target_col), &needle);
        if key_hit || value_hit {
            sheet.set_value(row, target_col, replacement.clone());
            updated += 1;
        }
    }
    if updated == 0 {
        return Err(EngineError::NoMatchingRows(format!(
            "no rows matched {key_value} in column {key_column:?}"
        )));
    }
    Ok(())
}

fn set_cell(sheet: &mut Sheet, address: &str, value: &serde_json::Value) -> Result<()> {
    let (row, col) = parse_cell_address(address)
        .ok_or_else(|| EngineError::InvalidAddress(address.to_string()))?;
    sheet.set_value(row, col, CellValue::from_json(value));
    Ok(())
}

/// Replace every non-empty cell that loose-matches `find_value`. A supplied
/// column must resolve; there is no silent fallback to a whole-sheet scan.
fn find_and_replace(
    sheet: &mut Sheet,
    find_value: &serde_json::Value,
    replace_value: &serde_json::Value,
    column: Option<&str>,
    scan_depth: u32,
) -> Result<()> {
    let column_filter = match column {
        Some(name) => Some(
            resolve_column(sheet, name, scan_depth)
                .ok_or_else(|| EngineError::ColumnNotFound {
                    column: name.to_string(),
                })?
                .column,
        ),
        None => None,
    };
    let needle = CellValue::from_json(find_value);
    let targets: Vec<(u32, u32)> = sheet
        .iter_cells()
        .filter(|(_, col, cell)| {
            column_filter.map_or(true, |c| *col == c)
                && !cell.value.is_null()
                && loose_match(&cell.value, &needle)
        })
        .map(|(row, col, _)| (row, col))
        .collect();
    if targets.is_empty() {
        return Err(EngineError::NoMatchingRows(format!(
            "no cells matched {find_value}"
        )));
    }
    let replacement = CellValue::from_json(replace_value);
    for (row, col) in targets {
        sheet.set_value(row, col, replacement.clone());
    }
    Ok(())
}
