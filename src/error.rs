//! Typed error taxonomy for the action engine.
//!
//! Every failure the engine surfaces is a local, recoverable condition; the
//! caller decides whether to retry, rephrase, or give up. Batch execution
//! records these per step instead of propagating them as faults.

use crate::model::WorkbookId;

/// All errors the engine can report to a caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No header cell matched the requested column name within the scan depth.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },

    /// The workbook has no sheet with the given name.
    #[error("sheet '{sheet}' not found (available: {})", available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    /// An action scanned the sheet but zero rows or cells qualified.
    #[error("no matching rows: {0}")]
    NoMatchingRows(String),

    /// A cell reference did not parse as column letters + row digits.
    #[error("invalid cell address '{0}'")]
    InvalidAddress(String),

    /// An unsupported operator or arithmetic token was supplied.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Window bounds violate start >= 1 or start <= end.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// No snapshot exists for the workbook identifier.
    #[error("workbook '{0}' not found")]
    WorkbookNotFound(WorkbookId),

    #[error("storage I/O: {0}")]
    Storage(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Error category for logging and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::ColumnNotFound { .. }
            | EngineError::SheetNotFound { .. }
            | EngineError::WorkbookNotFound(_) => "resource_not_found",
            EngineError::NoMatchingRows(_) => "no_match",
            EngineError::InvalidAddress(_)
            | EngineError::InvalidOperation(_)
            | EngineError::InvalidRange(_) => "validation_error",
            EngineError::Storage(_) => "io_error",
            EngineError::Snapshot(_) => "encoding_error",
            EngineError::Config(_) => "config_error",
        }
    }

    /// Whether retrying the same request unchanged could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_not_found_lists_available() {
        let err = EngineError::SheetNotFound {
            sheet: "Missing".into(),
            available: vec!["Data".into(), "Summary".into()],
        };
        let message = err.to_string();
        assert!(message.contains("Missing"));
        assert!(message.contains("Data, Summary"));
    }

    #[test]
    fn test_categories() {
        let err = EngineError::ColumnNotFound {
            column: "Revenue".into(),
        };
        assert_eq!(err.category(), "resource_not_found");
        assert_eq!(
            EngineError::InvalidAddress("??".into()).category(),
            "validation_error"
        );
        assert_eq!(
            EngineError::NoMatchingRows("nothing qualified".into()).category(),
            "no_match"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(
            EngineError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk"))
                .is_retryable()
        );
        assert!(!EngineError::InvalidRange("start > end".into()).is_retryable());
    }
}
