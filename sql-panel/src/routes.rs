//! 路由模块

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::toolbar::toolbar_middleware;

/// Toolbar endpoints under `prefix` plus the health check.
pub fn router(prefix: &str) -> Router<AppState> {
    let router = Router::new().route("/api/health", get(handlers::health_check));

    #[cfg(feature = "database")]
    let router = router
        .route(
            &format!("{}/sql/select", prefix),
            get(handlers::sql_select).post(handlers::sql_select),
        )
        .route(
            &format!("{}/sql/explain", prefix),
            get(handlers::sql_explain).post(handlers::sql_explain),
        );
    #[cfg(not(feature = "database"))]
    let _ = prefix;

    router
}

/// Wraps an application router with the toolbar middleware and binds the state.
pub fn with_toolbar(router: Router<AppState>, state: AppState) -> Router {
    router
        .layer(middleware::from_fn_with_state(state.clone(), toolbar_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
