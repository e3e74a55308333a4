//! Configuration management for LineTable
//!
//! Holds the storage root and the row-count threshold that selects the
//! update strategy. Can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [database]
//! location = "/var/lib/linetable"
//! max-rows-in-memory = 1000
//! sync-writes = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TableError, TableResult};

/// Default row-count threshold for the in-memory update strategy
pub const DEFAULT_MAX_ROWS_IN_MEMORY: u64 = 1000;

/// LineTable configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Directory holding one file per table
    pub location: PathBuf,
    /// Tables with fewer rows than this are updated in memory;
    /// larger ones are rebuilt through a temporary file
    pub max_rows_in_memory: u64,
    /// Durable-sync the table file after every insert and in-place update
    pub sync_writes: bool,
}

#[derive(Deserialize)]
struct ConfigFile {
    database: Config,
}

impl Config {
    /// Configuration rooted at `location` with default tuning.
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Updates on tables with fewer rows than this are done in memory; larger
    /// tables are rebuilt through a temporary file. 0 always rebuilds.
    pub fn with_max_rows_in_memory(mut self, rows: u64) -> Self {
        self.max_rows_in_memory = rows;
        self
    }

    /// Durably sync the table file after every insert and in-memory update.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Parse the `[database]` table of a TOML document and validate it.
    pub fn from_toml_str(text: &str) -> TableResult<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| TableError::InvalidConfig(e.to_string()))?;
        file.database.validate()?;
        Ok(file.database)
    }

    /// Read and parse a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> TableResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TableError::io(path, "Failed to read configuration", e))?;
        Self::from_toml_str(&text)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> TableResult<()> {
        if self.location.as_os_str().is_empty() {
            return Err(TableError::InvalidConfig("location must not be empty".into()));
        }
        Ok(())
    }

    /// Path of the file backing `table`.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.location.join(table)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: PathBuf::from("data"),
            max_rows_in_memory: DEFAULT_MAX_ROWS_IN_MEMORY,
            sync_writes: false,
        }
    }
}
