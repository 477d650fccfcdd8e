//! Shared data models.

pub mod database;
pub mod query;

// Re-export commonly used types
pub use database::DbType;
pub use query::{display_params, RecordedQuery, SelectResult, SqlParam};
