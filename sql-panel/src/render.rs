//! HTML fragments for the SQL panel and the replay endpoint.

use std::time::Duration;

use common::models::{display_params, SelectResult, SqlParam};
use common::utils::html_escape;

use crate::availability::Availability;
use crate::panel::{Panel, QueryRow};

/// Milliseconds with two decimals.
pub fn format_millis(duration: Duration) -> String {
    format!("{:.2}", duration.as_secs_f64() * 1000.0)
}

/// Table of recorded queries, one row per query.
pub fn render_queries(rows: &[QueryRow], toolbar_prefix: &str) -> String {
    let body: String = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let actions = match &row.signed_query {
                Some(token) => {
                    let duration = row.duration.as_secs_f64();
                    format!(
                        r#"<a class="sqlp-replay" href="{prefix}/sql/select?query={token}&amp;duration={duration}">Select</a>
<a class="sqlp-replay" href="{prefix}/sql/explain?query={token}&amp;duration={duration}">Explain</a>"#,
                        prefix = html_escape(toolbar_prefix),
                        token = token,
                        duration = duration,
                    )
                }
                None => String::new(),
            };

            format!(
                r#"<tr class="sqlp-query">
<td>{index}</td>
<td>{duration}&nbsp;ms</td>
<td>{actions}</td>
<td><pre class="sqlp-sql">{sql}</pre><div class="sqlp-params">{params}</div></td>
<td title="{location_long}">{location}</td>
</tr>
"#,
                index = idx + 1,
                duration = format_millis(row.duration),
                actions = actions,
                sql = html_escape(&row.sql),
                params = html_escape(&row.params),
                location_long = html_escape(&row.location_long),
                location = html_escape(&row.location),
            )
        })
        .collect();

    format!(
        r#"<table class="sqlp-queries">
<thead><tr><th>#</th><th>Time</th><th>Action</th><th>Query</th><th>Location</th></tr></thead>
<tbody>
{}</tbody>
</table>"#,
        body
    )
}

/// Explanation shown when live query data cannot be collected.
pub fn render_unavailable(availability: &Availability) -> String {
    let check = |ok: bool| if ok { "yes" } else { "no" };

    let mut hints = Vec::new();
    if !availability.library_available {
        hints.push("Database support is not compiled in. Build with the <code>database</code> feature.");
    }
    if !availability.extension_used {
        hints.push("No database extension is registered on this application.");
    }
    if !availability.recording_enabled {
        hints.push(
            "Query recording is off. Set <code>RECORD_QUERIES=1</code>, or run in debug mode \
             with an extension in <code>DebugAuto</code> recording mode.",
        );
    }
    let hints: String = hints
        .iter()
        .map(|h| format!("<li>{}</li>", h))
        .collect();

    format!(
        r#"<div class="sqlp-unavailable">
<h4>SQL query recording is unavailable</h4>
<table>
<tr><th>Database support compiled in</th><td>{}</td></tr>
<tr><th>Extension registered</th><td>{}</td></tr>
<tr><th>Recording enabled</th><td>{}</td></tr>
</table>
<ul>{}</ul>
</div>"#,
        check(availability.library_available),
        check(availability.extension_used),
        check(availability.recording_enabled),
        hints
    )
}

/// Result of replaying or explaining a statement.
pub fn render_select(result: &SelectResult, sql: &str, params: &[SqlParam], duration_secs: f64) -> String {
    let headers: String = result
        .headers
        .iter()
        .map(|h| format!("<th>{}</th>", html_escape(h)))
        .collect();

    let rows: String = result
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|value| format!("<td>{}</td>", html_escape(&display_value(value))))
                .collect();
            format!("<tr>{}</tr>\n", cells)
        })
        .collect();

    let body = if result.rows.is_empty() {
        "<p class=\"sqlp-empty\">No rows.</p>".to_string()
    } else {
        format!(
            "<table class=\"sqlp-result\">\n<thead><tr>{}</tr></thead>\n<tbody>\n{}</tbody>\n</table>",
            headers, rows
        )
    };

    format!(
        r#"<div class="sqlp-select">
<dl>
<dt>Executed SQL</dt><dd><pre class="sqlp-sql">{sql}</pre></dd>
<dt>Parameters</dt><dd>{params}</dd>
<dt>Original time</dt><dd>{duration}&nbsp;ms</dd>
</dl>
{body}
</div>"#,
        sql = html_escape(sql),
        params = html_escape(&display_params(params)),
        duration = format!("{:.2}", duration_secs * 1000.0),
        body = body,
    )
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Toolbar markup: a nav entry per panel plus the content of panels that have any.
pub fn render_toolbar(panels: &[Box<dyn Panel>]) -> String {
    let sections: String = panels
        .iter()
        .map(|panel| {
            let content = if panel.has_content() {
                format!(
                    "<div class=\"sqlp-panel-content\">\n<h3>{}</h3>\n{}\n</div>",
                    html_escape(&panel.title()),
                    panel.content()
                )
            } else {
                String::new()
            };
            format!(
                r#"<section class="sqlp-panel" id="sqlp-panel-{id}">
<div class="sqlp-nav"><strong>{title}</strong> <small>{subtitle}</small></div>
{content}
</section>
"#,
                id = panel.name().to_ascii_lowercase(),
                title = html_escape(&panel.nav_title()),
                subtitle = html_escape(&panel.nav_subtitle()),
                content = content,
            )
        })
        .collect();

    format!("<div id=\"sqlp-toolbar\">\n{}</div>", sections)
}
