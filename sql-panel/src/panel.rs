//! Toolbar panels.
//!
//! A [`Panel`] contributes one entry to the debug toolbar. The only panel
//! shipped here is [`SqlQueriesPanel`], which lists the statements recorded
//! during the current request.

use std::time::Duration;

use axum::http::{request, response};

use common::models::{display_params, RecordedQuery};
use common::utils::{format_fname, format_sql};

use crate::availability::Availability;
use crate::recorder;
use crate::render;
use crate::signer::{dump_query, QuerySigner};
use crate::state::AppState;

/// A pluggable toolbar entry.
pub trait Panel: Send + Sync {
    /// Stable identifier.
    fn name(&self) -> &'static str;

    /// Whether the panel has a body to show.
    fn has_content(&self) -> bool;

    fn nav_title(&self) -> String;

    fn nav_subtitle(&self) -> String;

    fn title(&self) -> String;

    /// Link target for panels that open elsewhere. Empty when the panel
    /// renders inline.
    fn url(&self) -> String;

    /// Panel body as an HTML fragment.
    fn content(&self) -> String;

    fn process_request(&self, _parts: &request::Parts) {}

    fn process_response(&self, _parts: &response::Parts) {}
}

/// One rendered line of the queries table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub duration: Duration,
    /// Pretty-printed statement.
    pub sql: String,
    pub params: String,
    /// Replay token, present for SELECT statements only.
    pub signed_query: Option<String>,
    pub location_long: String,
    pub location: String,
}

/// Lists the SQL statements executed while handling the current request.
pub struct SqlQueriesPanel {
    availability: Availability,
    signer: QuerySigner,
    toolbar_prefix: String,
}

impl SqlQueriesPanel {
    pub fn new(availability: Availability, signer: QuerySigner, toolbar_prefix: impl Into<String>) -> Self {
        Self {
            availability,
            signer,
            toolbar_prefix: toolbar_prefix.into(),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Availability::detect(state),
            state.signer.clone(),
            state.config.toolbar_prefix.clone(),
        )
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    /// Queries recorded in the current request scope.
    ///
    /// Empty unless database support is compiled in and an extension is
    /// registered, whatever the log holds.
    pub fn get_queries(&self) -> Vec<RecordedQuery> {
        if !self.availability.can_read_queries() {
            return Vec::new();
        }
        recorder::recorded_queries()
    }

    /// Table rows for the recorded queries, in execution order.
    pub fn rows(&self) -> Vec<QueryRow> {
        self.get_queries().iter().map(|q| self.row(q)).collect()
    }

    fn row(&self, query: &RecordedQuery) -> QueryRow {
        QueryRow {
            duration: query.duration,
            sql: format_sql(&query.statement),
            params: display_params(&query.parameters),
            signed_query: dump_query(&self.signer, &query.statement, &query.parameters),
            location_long: query.location.clone(),
            location: format_fname(&query.location),
        }
    }
}

impl Panel for SqlQueriesPanel {
    fn name(&self) -> &'static str {
        "SQL"
    }

    fn has_content(&self) -> bool {
        !self.get_queries().is_empty() || !self.availability.is_available()
    }

    fn nav_title(&self) -> String {
        "SQL".to_string()
    }

    fn nav_subtitle(&self) -> String {
        let count = self.get_queries().len();
        if count == 0 && !self.availability.is_available() {
            return "Unavailable".to_string();
        }
        match count {
            1 => "1 query".to_string(),
            n => format!("{} queries", n),
        }
    }

    fn title(&self) -> String {
        "SQL queries".to_string()
    }

    fn url(&self) -> String {
        String::new()
    }

    fn content(&self) -> String {
        let rows = self.rows();
        if rows.is_empty() && !self.availability.is_available() {
            render::render_unavailable(&self.availability)
        } else {
            render::render_queries(&rows, &self.toolbar_prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::QueryLog;
    use common::models::SqlParam;

    const AVAILABLE: Availability = Availability {
        library_available: true,
        extension_used: true,
        recording_enabled: true,
    };

    fn panel(availability: Availability) -> SqlQueriesPanel {
        SqlQueriesPanel::new(availability, QuerySigner::new("panel-secret"), "/_debug_toolbar")
    }

    fn query(statement: &str) -> RecordedQuery {
        RecordedQuery::new(
            statement,
            vec![SqlParam::Int(1)],
            Duration::from_millis(2),
            "src/handlers.rs:42:10",
        )
    }

    fn log_of(statements: &[&str]) -> QueryLog {
        let log = QueryLog::new();
        for s in statements {
            log.push(query(s));
        }
        log
    }

    #[test]
    fn test_static_labels() {
        let p = panel(AVAILABLE);
        assert_eq!(p.name(), "SQL");
        assert_eq!(p.nav_title(), "SQL");
        assert_eq!(p.title(), "SQL queries");
        assert_eq!(p.url(), "");
    }

    #[tokio::test]
    async fn test_three_queries_in_order() {
        let log = log_of(&[
            "SELECT * FROM alpha WHERE id = ?",
            "SELECT * FROM beta WHERE id = ?",
            "UPDATE gamma SET n = ?",
        ]);
        let p = panel(AVAILABLE);

        let (subtitle, rows, content) =
            recorder::scope(log, async { (p.nav_subtitle(), p.rows(), p.content()) }).await;

        assert_eq!(subtitle, "3 queries");
        assert_eq!(rows.len(), 3);
        assert!(rows[0].sql.contains("alpha"));
        assert!(rows[1].sql.contains("beta"));
        assert!(rows[2].sql.contains("gamma"));

        let alpha = content.find("alpha").unwrap();
        let beta = content.find("beta").unwrap();
        let gamma = content.find("gamma").unwrap();
        assert!(alpha < beta && beta < gamma);
    }

    #[tokio::test]
    async fn test_single_query_subtitle() {
        let p = panel(AVAILABLE);
        let subtitle = recorder::scope(log_of(&["SELECT 1"]), async { p.nav_subtitle() }).await;
        assert_eq!(subtitle, "1 query");
    }

    #[tokio::test]
    async fn test_available_but_empty() {
        let p = panel(AVAILABLE);
        let (subtitle, has_content) =
            recorder::scope(QueryLog::new(), async { (p.nav_subtitle(), p.has_content()) }).await;
        assert_eq!(subtitle, "0 queries");
        assert!(!has_content);
    }

    #[tokio::test]
    async fn test_unavailable_without_extension_whatever_the_log_holds() {
        let p = panel(Availability {
            extension_used: false,
            ..AVAILABLE
        });
        let log = log_of(&["SELECT 1", "SELECT 2"]);

        let (queries, subtitle, has_content, content) = recorder::scope(log, async {
            (p.get_queries(), p.nav_subtitle(), p.has_content(), p.content())
        })
        .await;

        assert!(queries.is_empty());
        assert_eq!(subtitle, "Unavailable");
        assert!(has_content);
        assert!(content.contains("sqlp-unavailable"));
        assert!(!content.contains("sqlp-queries"));
    }

    #[tokio::test]
    async fn test_unavailable_without_library_whatever_the_log_holds() {
        let p = panel(Availability {
            library_available: false,
            ..AVAILABLE
        });

        let (queries, subtitle, content) = recorder::scope(log_of(&["SELECT 1"]), async {
            (p.get_queries(), p.nav_subtitle(), p.content())
        })
        .await;

        assert!(queries.is_empty());
        assert_eq!(subtitle, "Unavailable");
        assert!(content.contains("sqlp-unavailable"));
        assert!(content.contains("Database support is not compiled in"));
        assert!(!content.contains("No database extension is registered"));
    }

    #[tokio::test]
    async fn test_recording_off_still_lists_logged_queries() {
        let p = panel(Availability {
            recording_enabled: false,
            ..AVAILABLE
        });
        let (subtitle, content) =
            recorder::scope(log_of(&["SELECT 1"]), async { (p.nav_subtitle(), p.content()) }).await;
        assert_eq!(subtitle, "1 query");
        assert!(content.contains("sqlp-queries"));
    }

    #[tokio::test]
    async fn test_tokens_only_for_select_rows() {
        let p = panel(AVAILABLE);
        let log = log_of(&["SELECT * FROM users WHERE id = ?", "DELETE FROM users WHERE id = ?"]);
        let rows = recorder::scope(log, async { p.rows() }).await;

        let token = rows[0].signed_query.as_deref().unwrap();
        let (statement, params) = crate::signer::load_query(&QuerySigner::new("panel-secret"), token).unwrap();
        assert_eq!(statement, "SELECT * FROM users WHERE id = ?");
        assert_eq!(params, vec![SqlParam::Int(1)]);
        assert!(rows[1].signed_query.is_none());
        assert_eq!(rows[0].params, "[1]");
        assert_eq!(rows[0].location, "src/handlers.rs:42:10");
    }

    #[test]
    fn test_outside_scope_has_no_queries() {
        let p = panel(AVAILABLE);
        assert!(p.get_queries().is_empty());
    }
}
