//! LineTable database facade
//!
//! Exposes the three record operations of a LineTable store by table name:
//!
//! | Operation | Input                          | Output         |
//! |-----------|--------------------------------|----------------|
//! | insert    | table, fields                  | new row id     |
//! | select    | table, row id                  | fields         |
//! | update    | table, row id, fields          | (none)         |
//!
//! A request-handling layer (HTTP or otherwise) drives the `Database` trait
//! and turns failures into responses with [`Status`] and [`ErrorMessage`]:
//! a missing row maps to a "not found" response distinct from internal
//! errors such as corruption or I/O failure.

pub mod db;
pub mod status;

pub use db::{Database, FileDatabase};
pub use status::{ErrorMessage, Status};

pub use linetable_core::{Config, RowId, TableError, TableResult};
