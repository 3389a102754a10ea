//! Cell-grid action engine for tabular workbooks.
//!
//! The crate applies structured mutation actions (sort, highlight, computed
//! columns, targeted updates) to sparse sheets addressed by header text,
//! serves bounded windowed reads for rendering, and persists workbook
//! snapshots behind an LRU session cache.

pub mod actions;
pub mod config;
pub mod error;
pub mod formula;
pub mod logging;
pub mod model;
pub mod resolve;
pub mod session;
pub mod store;
pub mod utils;
pub mod window;
pub mod workbook;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use model::{
    Action, ActionOutcome, BatchResponse, CellValue, CellWriteParams, CellWriteResponse,
    Scalar, SortOrder, UpdateOperation, WindowParams, WindowResponse, WorkbookId,
    WorkbookMetadataResponse,
};
pub use session::{CacheStats, EngineState};
pub use store::{JsonSnapshotStore, SnapshotStore};
pub use window::VirtualBounds;
pub use workbook::{Cell, Sheet, Workbook};
