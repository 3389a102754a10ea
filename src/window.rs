//! Windowed reads and the raw single-cell write path.
//!
//! Reads serve a dense rectangle of coerced primitives clamped to virtual
//! bounds, so a renderer can page through a stable coordinate space no
//! matter how the underlying sheet grows. The coercion is read-only and
//! never touches the write path.

use crate::error::{EngineError, Result};
use crate::model::{
    CellValue, CellWriteParams, CellWriteResponse, Scalar, WindowBounds, WindowMeta,
    WindowParams, WindowResponse,
};
use crate::workbook::Workbook;

/// Fixed ceiling for window requests, independent of any sheet's populated
/// extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualBounds {
    pub rows: u32,
    pub cols: u32,
}

impl Default for VirtualBounds {
    fn default() -> Self {
        Self {
            rows: 1000,
            cols: 100,
        }
    }
}

fn coerce(value: &CellValue) -> Scalar {
    match value {
        CellValue::Null => Scalar::Null,
        CellValue::Number(n) => Scalar::Number(*n),
        CellValue::Text(s) => Scalar::Text(s.clone()),
        CellValue::Date(d) => Scalar::Text(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
        CellValue::Formula { text, cached } => match cached.as_deref() {
            Some(cached) => coerce(cached),
            None => Scalar::Text(text.clone()),
        },
        CellValue::RichText(runs) => {
            Scalar::Text(runs.iter().map(|run| run.text.as_str()).collect())
        }
    }
}

/// Read a bounded rectangle. The response is dense: every requested
/// position yields a value, unset ones as `null`, and the dimensions equal
/// the clamped window exactly.
pub fn read_window(
    workbook: &Workbook,
    params: &WindowParams,
    bounds: VirtualBounds,
) -> Result<WindowResponse> {
    if params.row_start < 1 || params.col_start < 1 {
        return Err(EngineError::InvalidRange(format!(
            "window start must be >= 1, got row {} col {}",
            params.row_start, params.col_start
        )));
    }
    if params.row_start > params.row_end || params.col_start > params.col_end {
        return Err(EngineError::InvalidRange(format!(
            "window start must not exceed end: rows {}..{}, cols {}..{}",
            params.row_start, params.row_end, params.col_start, params.col_end
        )));
    }
    let sheet = workbook.sheet(&params.sheet_name)?;

    let row_end = params.row_end.min(bounds.rows);
    let col_end = params.col_end.min(bounds.cols);
    let row_start = params.row_start.min(row_end);
    let col_start = params.col_start.min(col_end);

    let data: Vec<Vec<Scalar>> = (row_start..=row_end)
        .map(|row| {
            (col_start..=col_end)
                .map(|col| coerce(sheet.value_at(row, col)))
                .collect()
        })
        .collect();

    Ok(WindowResponse {
        data,
        meta: WindowMeta {
            total_rows: bounds.rows,
            total_columns: bounds.cols,
            sheet_name: params.sheet_name.clone(),
            window: WindowBounds {
                row_start,
                row_end,
                col_start,
                col_end,
            },
        },
    })
}

/// Write one raw value. The sheet is addressed by name only, and no read
/// coercion is applied.
pub fn write_cell(workbook: &mut Workbook, params: &CellWriteParams) -> Result<CellWriteResponse> {
    if params.row < 1 || params.col < 1 {
        return Err(EngineError::InvalidRange(format!(
            "cell coordinates must be >= 1, got row {} col {}",
            params.row, params.col
        )));
    }
    let sheet = workbook.sheet_mut(&params.sheet_name)?;
    sheet.set_value(params.row, params.col, CellValue::from_json(&params.value));
    Ok(CellWriteResponse { ok: true })
}
