//! Utility functions and helpers.

pub mod sql_format;
pub mod sql_validator;

// Re-export commonly used types
pub use sql_format::{format_fname, format_sql, html_escape};
pub use sql_validator::SqlValidator;
