//! `Database` trait and its file-backed implementation.

use tracing::info;

use linetable_core::{Config, RowId, TableRegistry, TableResult};

/// Record operations addressed by table name.
///
/// Implementations are shared between request handlers, so every method
/// takes `&self`.
pub trait Database: Send + Sync {
    /// Append `values` to `table` and return the assigned row id.
    fn insert(&self, table: &str, values: &[String]) -> TableResult<RowId>;

    /// Fetch the fields stored at `row_id`.
    fn select(&self, table: &str, row_id: RowId) -> TableResult<Vec<String>>;

    /// Replace the fields stored at `row_id`.
    fn update(&self, table: &str, row_id: RowId, values: &[String]) -> TableResult<()>;
}

/// Database backed by one LineTable file per table.
pub struct FileDatabase {
    registry: TableRegistry,
}

impl FileDatabase {
    /// Open a database rooted at `config.location`. Tables are opened lazily.
    pub fn open(config: Config) -> TableResult<Self> {
        info!(
            location = %config.location.display(),
            max_rows_in_memory = config.max_rows_in_memory,
            sync_writes = config.sync_writes,
            "constructing file database"
        );
        Ok(Self {
            registry: TableRegistry::new(config)?,
        })
    }

    /// Get a reference to the underlying registry.
    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for FileDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDatabase")
            .field("location", &self.registry.config().location)
            .field("tables", &self.registry.len())
            .finish()
    }
}

impl Database for FileDatabase {
    fn insert(&self, table: &str, values: &[String]) -> TableResult<RowId> {
        self.registry.resolve(table)?.insert(values)
    }

    fn select(&self, table: &str, row_id: RowId) -> TableResult<Vec<String>> {
        self.registry.resolve(table)?.select(row_id)
    }

    fn update(&self, table: &str, row_id: RowId, values: &[String]) -> TableResult<()> {
        self.registry.resolve(table)?.update(row_id, values)
    }
}
