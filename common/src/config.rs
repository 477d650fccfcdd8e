//! Application configuration.
//!
//! Values are read from environment variables. Binaries load `.env` first, so
//! anything set there is visible here too.

use uuid::Uuid;

/// Default path prefix for the toolbar's own endpoints.
pub const DEFAULT_TOOLBAR_PREFIX: &str = "/_debug_toolbar";

/// Application configuration shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service, used in logs and response metadata.
    pub service_name: String,

    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Debug mode. The toolbar is only injected when this is on.
    pub debug: bool,

    /// Secret used to sign replayable query tokens.
    pub secret_key: String,

    /// Explicitly enables query recording (`RECORD_QUERIES`).
    pub record_queries: bool,

    /// Database URL for the recording extension.
    pub database_url: Option<String>,

    /// Maximum pool size.
    pub max_connections: u32,

    /// Pool acquire timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Path prefix under which the toolbar endpoints are mounted.
    pub toolbar_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "sql-panel".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            debug: false,
            secret_key: Uuid::new_v4().to_string(),
            record_queries: false,
            database_url: None,
            max_connections: 5,
            connect_timeout_secs: 10,
            toolbar_prefix: DEFAULT_TOOLBAR_PREFIX.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from the process environment and sets the service name.
    pub fn load_with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
            ..Self::load()
        }
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secret_key = match lookup("SECRET_KEY").filter(|v| !v.is_empty()) {
            Some(key) => key,
            None => {
                tracing::warn!("SECRET_KEY not set, using a random per-process key");
                defaults.secret_key
            }
        };

        Self {
            service_name: defaults.service_name,
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("SERVER_PORT"), defaults.port),
            debug: lookup("DEBUG").map(|v| parse_bool(&v)).unwrap_or(defaults.debug),
            secret_key,
            record_queries: lookup("RECORD_QUERIES")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.record_queries),
            database_url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), defaults.max_connections),
            connect_timeout_secs: parse_or(
                lookup("DB_CONNECT_TIMEOUT"),
                defaults.connect_timeout_secs,
            ),
            toolbar_prefix: lookup("TOOLBAR_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.toolbar_prefix),
        }
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Interprets common truthy spellings (`1`, `true`, `yes`, `on`).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Leading slash, no trailing slash. The root (`/` or empty) becomes `""`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert!(!config.record_queries);
        assert!(config.database_url.is_none());
        assert!(!config.secret_key.is_empty());
        assert_eq!(config.toolbar_prefix, "/_debug_toolbar");
    }

    #[test]
    fn test_reads_flags_and_values() {
        let config = config_from(&[
            ("DEBUG", "True"),
            ("RECORD_QUERIES", "on"),
            ("SECRET_KEY", "s3cret"),
            ("SERVER_PORT", "9000"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("TOOLBAR_PREFIX", "debug/"),
        ]);
        assert!(config.debug);
        assert!(config.record_queries);
        assert_eq!(config.secret_key, "s3cret");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.toolbar_prefix, "/debug");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/_debug_toolbar/"), "/_debug_toolbar");
        assert_eq!(normalize_prefix("tools/debug"), "/tools/debug");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("  "), "");
    }

    #[test]
    fn test_unparsable_port_falls_back() {
        let config = config_from(&[("SERVER_PORT", "eighty")]);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }
}
