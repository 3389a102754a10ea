//! Boundary shapes: workbook identifiers, cell values, actions, and the
//! window/batch/metadata request and response types.
//!
//! Field names on the response types are part of the wire contract a
//! rendering client depends on; do not rename them casually.

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Opaque stable identifier for a workbook snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(transparent)]
pub struct WorkbookId(pub String);

impl WorkbookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkbookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkbookId {
    fn from(s: &str) -> Self {
        WorkbookId(s.to_string())
    }
}

/// One run of a rich-text cell. Style fidelity beyond plain text is not
/// modeled; reads concatenate the run texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RichTextRun {
    pub text: String,
}

/// The closed union of values a cell may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
    Formula {
        text: String,
        cached: Option<Box<CellValue>>,
    },
    RichText(Vec<RichTextRun>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Convert an untyped JSON value from the boundary into a cell value.
    /// Total: anything without a natural cell shape becomes text.
    pub fn from_json(value: &serde_json::Value) -> CellValue {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            serde_json::Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Numeric coercion. `None` when the value has no numeric reading.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Formula { cached, .. } => {
                cached.as_deref().and_then(CellValue::as_number)
            }
            _ => None,
        }
    }

    /// Display-text coercion. Numbers render the way a grid shows them:
    /// integral values without a trailing `.0`.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%dT%H:%M:%S").to_string(),
            CellValue::Formula { text, cached } => match cached.as_deref() {
                Some(value) => value.display_text(),
                None => text.clone(),
            },
            CellValue::RichText(runs) => runs.iter().map(|run| run.text.as_str()).collect(),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A coerced primitive as delivered inside a window read. Serializes as a
/// bare JSON primitive (`null`, number, string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Null,
}

/// Sort direction for `SortData`. Only flips the relative order of two
/// defined keys; undefined keys always sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Arithmetic (or overwrite) operation for `UpdateRowValues`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum UpdateOperation {
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

/// One validated mutation action. The wire shape is
/// `{"action": <name>, "params": {...}}`; upstream validation guarantees the
/// shape, the executor enforces the semantics (column exists, etc.).
///
/// Every action accepts an optional `sheetName`; absent means the workbook's
/// first sheet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, strum::AsRefStr)]
#[serde(tag = "action", content = "params", rename_all_fields = "camelCase")]
pub enum Action {
    AddColumn {
        #[serde(default)]
        sheet_name: Option<String>,
        column_name: String,
        formula_template: String,
    },
    HighlightRows {
        #[serde(default)]
        sheet_name: Option<String>,
        condition: String,
        #[serde(default = "default_highlight_color")]
        color: String,
    },
    SortData {
        #[serde(default)]
        sheet_name: Option<String>,
        column: String,
        #[serde(default)]
        order: SortOrder,
    },
    UpdateRowValues {
        #[serde(default)]
        sheet_name: Option<String>,
        filter_column: String,
        filter_value: serde_json::Value,
        operation: UpdateOperation,
        value: serde_json::Value,
        #[serde(default)]
        target_column: Option<String>,
    },
    UpdateKeyValue {
        #[serde(default)]
        sheet_name: Option<String>,
        key_column: String,
        key_value: serde_json::Value,
        #[serde(default)]
        value_column: Option<String>,
        new_value: serde_json::Value,
    },
    SetCell {
        #[serde(default)]
        sheet_name: Option<String>,
        address: String,
        value: serde_json::Value,
    },
    FindAndReplace {
        #[serde(default)]
        sheet_name: Option<String>,
        find_value: serde_json::Value,
        replace_value: serde_json::Value,
        #[serde(default)]
        column: Option<String>,
    },
}

impl Action {
    pub fn sheet_name(&self) -> Option<&str> {
        match self {
            Action::AddColumn { sheet_name, .. }
            | Action::HighlightRows { sheet_name, .. }
            | Action::SortData { sheet_name, .. }
            | Action::UpdateRowValues { sheet_name, .. }
            | Action::UpdateKeyValue { sheet_name, .. }
            | Action::SetCell { sheet_name, .. }
            | Action::FindAndReplace { sheet_name, .. } => sheet_name.as_deref(),
        }
    }
}

fn default_highlight_color() -> String {
    "FFFF00".to_string()
}

/// Per-step record in a batch response. This is the batch's observable
/// contract: action name, success flag, error message on failure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActionOutcome {
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchResponse {
    /// True only if every step succeeded.
    pub success: bool,
    pub results: Vec<ActionOutcome>,
}

/// A bounded rectangular read request over one sheet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowParams {
    pub sheet_name: String,
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WindowMeta {
    /// Virtual row ceiling, independent of the sheet's populated extent.
    pub total_rows: u32,
    pub total_columns: u32,
    pub sheet_name: String,
    /// The bounds actually served after clamping.
    pub window: WindowBounds,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WindowResponse {
    /// Dense rows × columns of coerced primitives; dimensions always equal
    /// the clamped window, never sparse.
    pub data: Vec<Vec<Scalar>>,
    pub meta: WindowMeta,
}

/// Raw single-cell write request. The value is written without coercion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CellWriteParams {
    pub sheet_name: String,
    pub row: u32,
    pub col: u32,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CellWriteResponse {
    pub ok: bool,
}

/// Per-sheet entry in the workbook metadata listing. `sheetId` is the sheet
/// name: the only stable identifier, since positional index shifts under
/// add/remove/reorder.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetMeta {
    pub sheet_id: String,
    pub name: String,
    pub total_rows: u32,
    pub total_cols: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkbookMetadataResponse {
    pub sheets: Vec<SheetMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_wire_shape() {
        let raw = json!({
            "action": "SortData",
            "params": { "column": "Revenue", "order": "desc" }
        });
        let action: Action = serde_json::from_value(raw).expect("deserialize action");
        match &action {
            Action::SortData { column, order, sheet_name } => {
                assert_eq!(column, "Revenue");
                assert_eq!(*order, SortOrder::Desc);
                assert!(sheet_name.is_none());
            }
            other => panic!("unexpected action variant: {:?}", other),
        }
        assert_eq!(action.as_ref(), "SortData");
    }

    #[test]
    fn test_update_operation_tokens() {
        let op: UpdateOperation = serde_json::from_value(json!("SET")).expect("SET");
        assert_eq!(op, UpdateOperation::Set);
        let op: UpdateOperation = serde_json::from_value(json!("/")).expect("divide");
        assert_eq!(op, UpdateOperation::Divide);
        assert!(serde_json::from_value::<UpdateOperation>(json!("%")).is_err());
    }

    #[test]
    fn test_highlight_default_color() {
        let raw = json!({
            "action": "HighlightRows",
            "params": { "condition": "Revenue > 150" }
        });
        let action: Action = serde_json::from_value(raw).expect("deserialize");
        match action {
            Action::HighlightRows { color, .. } => assert_eq!(color, "FFFF00"),
            other => panic!("unexpected action variant: {:?}", other),
        }
    }

    #[test]
    fn test_scalar_serializes_as_primitive() {
        assert_eq!(serde_json::to_value(Scalar::Null).expect("null"), json!(null));
        assert_eq!(
            serde_json::to_value(Scalar::Number(3.5)).expect("number"),
            json!(3.5)
        );
        assert_eq!(
            serde_json::to_value(Scalar::Text("x".into())).expect("text"),
            json!("x")
        );
    }

    #[test]
    fn test_window_meta_field_names() {
        let meta = WindowMeta {
            total_rows: 1000,
            total_columns: 100,
            sheet_name: "Data".into(),
            window: WindowBounds {
                row_start: 1,
                row_end: 2,
                col_start: 1,
                col_end: 2,
            },
        };
        let value = serde_json::to_value(&meta).expect("serialize meta");
        assert!(value.get("totalRows").is_some());
        assert!(value.get("totalColumns").is_some());
        assert!(value.get("sheetName").is_some());
        assert!(value["window"].get("rowStart").is_some());
    }

    #[test]
    fn test_display_text_of_numbers() {
        assert_eq!(CellValue::Number(5000.0).display_text(), "5000");
        assert_eq!(CellValue::Number(2.5).display_text(), "2.5");
    }

    #[test]
    fn test_from_json_total() {
        assert_eq!(CellValue::from_json(&json!(null)), CellValue::Null);
        assert_eq!(CellValue::from_json(&json!(7)), CellValue::Number(7.0));
        assert_eq!(
            CellValue::from_json(&json!(true)),
            CellValue::Text("true".into())
        );
    }
}
