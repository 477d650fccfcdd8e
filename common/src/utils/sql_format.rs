//! Display helpers for the SQL panel.

use std::path::Path;

use sqlformat::{FormatOptions, QueryParams};

/// Pretty-prints a statement with upper-cased keywords.
pub fn format_sql(statement: &str) -> String {
    let options = FormatOptions {
        uppercase: Some(true),
        ..FormatOptions::default()
    };
    sqlformat::format(statement, &QueryParams::None, &options)
}

/// Shortens a `file:line:column` call-site for display.
///
/// Values already wrapped in `<...>` or `{...}` are returned unchanged.
/// Dependency sources under the cargo registry and standard library sources
/// are reduced to `<crate-version/path>`. Absolute paths under the current
/// directory become relative. Anything else is returned as is.
pub fn format_fname(value: &str) -> String {
    if value.starts_with('{') || value.starts_with('<') {
        return value.to_string();
    }

    const REGISTRY: &str = "/registry/src/";
    if let Some(idx) = value.find(REGISTRY) {
        let rest = &value[idx + REGISTRY.len()..];
        // first component is the index directory
        if let Some((_, tail)) = rest.split_once('/') {
            return format!("<{}>", tail);
        }
    }

    if let Some(rest) = value.strip_prefix("/rustc/") {
        if let Some((_, tail)) = rest.split_once('/') {
            return format!("<{}>", tail);
        }
    }

    let path = Path::new(value);
    if path.is_absolute() {
        if let Ok(cwd) = std::env::current_dir() {
            if let Ok(relative) = path.strip_prefix(&cwd) {
                return relative.display().to_string();
            }
        }
    }

    value.to_string()
}

/// Simple HTML escape.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
