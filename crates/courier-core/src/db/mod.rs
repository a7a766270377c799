//! Database layer for Courier

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LibSqlRecordStore, RecordStore, StatusCounts, SyncTransition};
