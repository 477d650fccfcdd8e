//! Shared building blocks for the SQL debug panel.
//!
//! - `config`: environment-driven application configuration
//! - `errors`: the application error type and its HTTP mapping
//! - `models`: recorded queries, bound parameters, replay results
//! - `response`: JSON response envelope
//! - `utils`: SQL classification and display helpers

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
pub mod utils;
