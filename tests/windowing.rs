// =============================================================================
// Windowed Read and Cell Write Tests
// =============================================================================
// The rendering contract: dense rectangles with exact clamped dimensions,
// read-only coercion, and stable virtual coordinates.

use chrono::NaiveDate;
use gridbook::model::{CellValue, CellWriteParams, Scalar, WindowParams};
use gridbook::window::{self, VirtualBounds};
use gridbook::workbook::Workbook;
use gridbook::EngineError;
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn single_row_workbook() -> Workbook {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Data");
    sheet.set_value(1, 1, CellValue::Text("x".into()));
    sheet.set_value(1, 2, CellValue::Text("y".into()));
    workbook
}

fn params(sheet: &str, rows: (u32, u32), cols: (u32, u32)) -> WindowParams {
    WindowParams {
        sheet_name: sheet.into(),
        row_start: rows.0,
        row_end: rows.1,
        col_start: cols.0,
        col_end: cols.1,
    }
}

// =============================================================================
// Dense Rectangle Contract
// =============================================================================

#[test]
fn test_read_past_populated_extent_pads_null() {
    let workbook = single_row_workbook();
    let response = window::read_window(
        &workbook,
        &params("Data", (1, 2), (1, 2)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(
        serde_json::to_value(&response.data).expect("encode"),
        json!([["x", "y"], [null, null]])
    );
}

#[test]
fn test_dimensions_exact_for_sparse_sheet() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Sparse");
    sheet.set_value(1, 1, CellValue::Number(1.0));
    sheet.set_value(50, 90, CellValue::Number(2.0));
    let response = window::read_window(
        &workbook,
        &params("Sparse", (1, 50), (1, 90)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(response.data.len(), 50);
    assert!(response.data.iter().all(|row| row.len() == 90));
    assert_eq!(response.data[49][89], Scalar::Number(2.0));
    assert_eq!(response.data[25][40], Scalar::Null);
}

#[test]
fn test_column_alignment_preserved_for_gappy_rows() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Data");
    sheet.set_value(1, 1, CellValue::Text("left".into()));
    sheet.set_value(1, 4, CellValue::Text("right".into()));
    let response = window::read_window(
        &workbook,
        &params("Data", (1, 1), (1, 4)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(
        serde_json::to_value(&response.data).expect("encode"),
        json!([["left", null, null, "right"]])
    );
}

// =============================================================================
// Virtual Bounds
// =============================================================================

#[test]
fn test_request_beyond_virtual_ceiling_is_clamped() {
    let workbook = single_row_workbook();
    let response = window::read_window(
        &workbook,
        &params("Data", (990, 2000), (95, 400)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(response.meta.window.row_end, 1000);
    assert_eq!(response.meta.window.col_end, 100);
    assert_eq!(response.data.len(), 11);
    assert_eq!(response.data[0].len(), 6);
    assert_eq!(response.meta.total_rows, 1000);
    assert_eq!(response.meta.total_columns, 100);
}

#[test]
fn test_virtual_totals_independent_of_populated_extent() {
    let mut workbook = Workbook::new();
    workbook.add_sheet("Tiny").set_value(1, 1, CellValue::Number(1.0));
    let response = window::read_window(
        &workbook,
        &params("Tiny", (1, 1), (1, 1)),
        VirtualBounds { rows: 64, cols: 8 },
    )
    .expect("read succeeds");
    assert_eq!(response.meta.total_rows, 64);
    assert_eq!(response.meta.total_columns, 8);
}

#[test]
fn test_zero_or_inverted_bounds_rejected() {
    let workbook = single_row_workbook();
    for bad in [
        params("Data", (0, 1), (1, 1)),
        params("Data", (1, 1), (0, 1)),
        params("Data", (5, 2), (1, 1)),
        params("Data", (1, 1), (4, 2)),
    ] {
        let err =
            window::read_window(&workbook, &bad, VirtualBounds::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange(_)));
    }
}

// =============================================================================
// Read Coercion
// =============================================================================

#[test]
fn test_date_formula_richtext_coercion() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Data");
    let date = NaiveDate::from_ymd_opt(2024, 3, 15)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date");
    sheet.set_value(1, 1, CellValue::Date(date));
    sheet.set_value(
        1,
        2,
        CellValue::Formula {
            text: "SUM(A1:A9)".into(),
            cached: Some(Box::new(CellValue::Number(42.0))),
        },
    );
    sheet.set_value(
        1,
        3,
        CellValue::Formula {
            text: "COUNT(B:B)".into(),
            cached: None,
        },
    );
    let response = window::read_window(
        &workbook,
        &params("Data", (1, 1), (1, 3)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(response.data[0][0], Scalar::Text("2024-03-15T00:00:00".into()));
    assert_eq!(response.data[0][1], Scalar::Number(42.0));
    assert_eq!(response.data[0][2], Scalar::Text("COUNT(B:B)".into()));
}

#[test]
fn test_coercion_never_touches_stored_values() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Data");
    let formula = CellValue::Formula {
        text: "A1*2".into(),
        cached: Some(Box::new(CellValue::Number(8.0))),
    };
    sheet.set_value(1, 1, formula.clone());
    window::read_window(
        &workbook,
        &params("Data", (1, 1), (1, 1)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(
        *workbook.sheet("Data").expect("sheet").value_at(1, 1),
        formula,
        "read coercion must not rewrite the cell"
    );
}

// =============================================================================
// Cell Writes
// =============================================================================

#[test]
fn test_write_then_read_back() {
    let mut workbook = single_row_workbook();
    window::write_cell(
        &mut workbook,
        &CellWriteParams {
            sheet_name: "Data".into(),
            row: 2,
            col: 2,
            value: json!(12.5),
        },
    )
    .expect("write succeeds");
    let response = window::read_window(
        &workbook,
        &params("Data", (2, 2), (2, 2)),
        VirtualBounds::default(),
    )
    .expect("read succeeds");
    assert_eq!(response.data[0][0], Scalar::Number(12.5));
}

#[test]
fn test_write_to_unknown_sheet_lists_names() {
    let mut workbook = single_row_workbook();
    let err = window::write_cell(
        &mut workbook,
        &CellWriteParams {
            sheet_name: "Ghost".into(),
            row: 1,
            col: 1,
            value: json!(1),
        },
    )
    .unwrap_err();
    match err {
        EngineError::SheetNotFound { available, .. } => {
            assert_eq!(available, vec!["Data".to_string()]);
        }
        other => panic!("expected SheetNotFound, got {other:?}"),
    }
}
