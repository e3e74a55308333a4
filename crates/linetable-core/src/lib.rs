//! LineTable Core: line-per-record table files
//!
//! Each table is one flat text file holding one record per line. A record is
//! an ordered list of string fields packed into a single escaped line, and a
//! row id is simply the record's 0-based line number.
//!
//! # Architecture
//!
//! - **Codec**: lossless field-list <-> line packing, no I/O
//! - **Table engine**: one file + row counter + reader/writer lock per table;
//!   appends on insert, rewrites in memory or rebuilds through a temporary
//!   file on update, and reports row-count/line-count mismatches as corruption
//! - **Registry**: validates table names and opens each table exactly once

pub mod codec;
pub mod config;
pub mod error;
pub mod platform_durability;
pub mod registry;
pub mod table;

// Re-export key types for convenience
pub use config::Config;
pub use error::{TableError, TableResult};
pub use registry::{validate_table_name, TableRegistry};
pub use table::{RowId, TableFile};
