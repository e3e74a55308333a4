//! Table registry: maps table names to lazily opened `TableFile`s.
//!
//! Exactly one `TableFile` exists per name for the registry's lifetime. Each
//! name owns a `OnceCell` that is opened outside the map lock: callers racing
//! on the same new name wait for a single open, while other tables stay
//! reachable. A failed open leaves the slot empty, so it is retried and never
//! counted as an opened table.
//!
//! Handles are never evicted.

use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::error::{TableError, TableResult};
use crate::table::TableFile;

/// Check a table name against `[A-Za-z0-9_.-]+`.
///
/// `.` and `..` match the character set but name directories, so they are
/// rejected as well.
pub fn validate_table_name(name: &str) -> TableResult<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    if !valid {
        debug!(name, "invalid table name");
        return Err(TableError::InvalidTableName { name: name.to_string() });
    }
    Ok(())
}

type TableCell = Arc<OnceCell<Arc<TableFile>>>;

/// Concurrent name -> table map.
pub struct TableRegistry {
    config: Config,
    tables: RwLock<HashMap<String, TableCell>>,
}

impl TableRegistry {
    /// Create an empty registry. Fails if `config` does not validate.
    pub fn new(config: Config) -> TableResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Return the table named `name`, opening it on first access.
    pub fn resolve(&self, name: &str) -> TableResult<Arc<TableFile>> {
        validate_table_name(name)?;

        // A failed open leaves the slot empty; the next caller retries it.
        let cell = self.cell(name);
        let table = cell.get_or_try_init(|| TableFile::open(name, &self.config).map(Arc::new))?;
        Ok(Arc::clone(table))
    }

    /// The slot for `name`, inserted empty if missing. The map lock is only
    /// held for the lookup.
    fn cell(&self, name: &str) -> TableCell {
        if let Some(cell) = self.tables.read().get(name) {
            return Arc::clone(cell);
        }
        Arc::clone(self.tables.write().entry(name.to_string()).or_default())
    }

    /// Registry configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of tables opened so far.
    pub fn len(&self) -> usize {
        self.tables.read().values().filter(|c| c.get().is_some()).count()
    }

    /// Returns true if no table has been opened.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the opened tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .iter()
            .filter(|(_, c)| c.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("location", &self.config.location)
            .field("tables", &self.len())
            .finish()
    }
}
