//! Engine configuration: defaults, optional TOML file, environment
//! overrides. Precedence is env > file > default.

use crate::error::{EngineError, Result};
use crate::window::VirtualBounds;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CACHE_CAPACITY: usize = 5;
const DEFAULT_SCAN_DEPTH: u32 = 20;
const DEFAULT_VIRTUAL_ROWS: u32 = 1000;
const DEFAULT_VIRTUAL_COLS: u32 = 100;

const ENV_WORKSPACE: &str = "GRIDBOOK_WORKSPACE";
const ENV_CACHE_CAPACITY: &str = "GRIDBOOK_CACHE_CAPACITY";
const ENV_SCAN_DEPTH: &str = "GRIDBOOK_SCAN_DEPTH";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding workbook snapshots.
    pub workspace_root: PathBuf,
    /// Maximum number of open workbook sessions kept in memory.
    pub cache_capacity: usize,
    /// How many top rows the column resolver scans for headers.
    pub scan_depth: u32,
    /// Fixed ceiling for window reads.
    pub virtual_bounds: VirtualBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            scan_depth: DEFAULT_SCAN_DEPTH,
            virtual_bounds: VirtualBounds {
                rows: DEFAULT_VIRTUAL_ROWS,
                cols: DEFAULT_VIRTUAL_COLS,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    workspace_root: Option<PathBuf>,
    cache_capacity: Option<usize>,
    scan_depth: Option<u32>,
    virtual_rows: Option<u32>,
    virtual_cols: Option<u32>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        return Err(EngineError::Config(format!(
            "config file {path:?} does not exist"
        )));
    }
    let contents = fs::read_to_string(path)?;
    toml::from_str(&contents)
        .map_err(|err| EngineError::Config(format!("failed to parse {path:?}: {err}")))
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| EngineError::Config(format!("{name} is not valid: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

impl EngineConfig {
    /// Resolve the effective configuration from an optional TOML file plus
    /// environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };
        let defaults = EngineConfig::default();

        let workspace_root = std::env::var(ENV_WORKSPACE)
            .ok()
            .map(PathBuf::from)
            .or(file.workspace_root)
            .unwrap_or(defaults.workspace_root);
        let cache_capacity = env_parsed::<usize>(ENV_CACHE_CAPACITY)?
            .or(file.cache_capacity)
            .unwrap_or(defaults.cache_capacity)
            .max(1);
        let scan_depth = env_parsed::<u32>(ENV_SCAN_DEPTH)?
            .or(file.scan_depth)
            .unwrap_or(defaults.scan_depth)
            .max(1);
        let virtual_bounds = VirtualBounds {
            rows: file.virtual_rows.unwrap_or(defaults.virtual_bounds.rows).max(1),
            cols: file.virtual_cols.unwrap_or(defaults.virtual_bounds.cols).max(1),
        };

        Ok(Self {
            workspace_root,
            cache_capacity,
            scan_depth,
            virtual_bounds,
        })
    }

    pub fn ensure_workspace_root(&self) -> Result<()> {
        if !self.workspace_root.is_dir() {
            return Err(EngineError::Config(format!(
                "workspace root {:?} is not a directory",
                self.workspace_root
            )));
        }
        Ok(())
    }
}
