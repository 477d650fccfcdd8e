//! Database backend models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Database backend, derived from the connection URL scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL / MariaDB.
    MySQL,
    /// PostgreSQL.
    Postgres,
    /// Embedded SQLite.
    SQLite,
}

impl DbType {
    /// Detects the backend from a database URL such as `postgres://...` or `sqlite::memory:`.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?.to_ascii_lowercase();
        match scheme.as_str() {
            "mysql" | "mariadb" => Some(DbType::MySQL),
            "postgres" | "postgresql" => Some(DbType::Postgres),
            "sqlite" => Some(DbType::SQLite),
            _ => None,
        }
    }

    /// Prefix that turns a statement into a query plan request for this backend.
    pub fn explain_prefix(&self) -> &'static str {
        match self {
            DbType::SQLite => "EXPLAIN QUERY PLAN\n",
            DbType::MySQL | DbType::Postgres => "EXPLAIN\n",
        }
    }

    /// Prepends the backend's EXPLAIN clause to a statement.
    pub fn explain(&self, statement: &str) -> String {
        format!("{}{}", self.explain_prefix(), statement)
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
        }
    }
}
