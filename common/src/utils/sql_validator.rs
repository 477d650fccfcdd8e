//! SQL statement classification.
//!
//! Decides which recorded statements may be replayed from the debug panel.

/// Classifies SQL statements.
pub struct SqlValidator;

impl SqlValidator {
    /// Checks if the SQL is a SELECT query.
    ///
    /// Surrounding whitespace is ignored and the comparison is
    /// case-insensitive. Only the leading keyword is inspected.
    pub fn is_select(sql: &str) -> bool {
        sql.trim()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"))
    }
}
