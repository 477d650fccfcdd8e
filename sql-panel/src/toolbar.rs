//! Debug toolbar middleware.
//!
//! Gives every request an id and a tracing span, runs the handler inside a
//! fresh query log scope and, in debug mode, injects the panels into HTML
//! responses. Requests under the toolbar prefix pass straight through.

use axum::{
    body::Body,
    extract::State,
    http::{header, header::HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::Instrument;
use uuid::Uuid;

use common::errors::AppError;

use crate::panel::{Panel, SqlQueriesPanel};
use crate::recorder::{self, QueryLog};
use crate::render;
use crate::state::AppState;

/// Header name for request ID.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID stored in request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Toolbar middleware, installed with `middleware::from_fn_with_state`.
pub async fn toolbar_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // reuse the caller's id when present
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = handle(state, req, next).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response
}

async fn handle(state: AppState, req: Request<Body>, next: Next) -> Response {
    if is_toolbar_path(req.uri().path(), &state.config.toolbar_prefix) {
        return next.run(req).await;
    }

    let panels: Vec<Box<dyn Panel>> = vec![Box::new(SqlQueriesPanel::from_state(&state))];

    recorder::scope(QueryLog::new(), async move {
        let (parts, body) = req.into_parts();
        for panel in &panels {
            panel.process_request(&parts);
        }
        let response = next.run(Request::from_parts(parts, body)).await;

        let (parts, body) = response.into_parts();
        for panel in &panels {
            panel.process_response(&parts);
        }
        let response = Response::from_parts(parts, body);

        if !state.config.debug || !is_html(&response) {
            return response;
        }

        match inject_toolbar(response, &render::render_toolbar(&panels)).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    })
    .await
}

/// The prefix itself or anything below it. An empty prefix mounts the
/// toolbar endpoints at the root, so only `/sql/...` belongs to it then.
fn is_toolbar_path(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return path.starts_with("/sql/");
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Inserts `toolbar` before the last `</body>`, or appends it.
async fn inject_toolbar(response: Response, toolbar: &str) -> Result<Response, AppError> {
    let (mut parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| AppError::Internal(format!("failed to read response body: {}", e)))?
        .to_bytes();

    let mut html = String::from_utf8_lossy(&bytes).into_owned();
    match html.rfind("</body>") {
        Some(idx) => html.insert_str(idx, toolbar),
        None => html.push_str(toolbar),
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    tracing::debug!(bytes = html.len(), "toolbar injected");
    Ok(Response::from_parts(parts, Body::from(html)))
}
