//! Handler模块

use axum::{extract::State, Json};
#[cfg(feature = "database")]
use axum::{extract::Query, response::Html};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[cfg(feature = "database")]
use common::errors::{AppError, AppResult};
use common::response::ApiResponse;
#[cfg(feature = "database")]
use common::utils::format_sql;

use crate::availability::Availability;
#[cfg(feature = "database")]
use crate::render;
#[cfg(feature = "database")]
use crate::signer::load_query;
use crate::state::AppState;

/// 重放请求参数
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReplayParams {
    /// 签名后的查询令牌
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,

    /// 原始执行耗时（秒），仅用于回显
    #[validate(range(min = 0.0, message = "duration must not be negative"))]
    pub duration: f64,
}

/// 重放 SELECT 语句
#[cfg(feature = "database")]
#[utoipa::path(
    get,
    path = "/_debug_toolbar/sql/select",
    tag = "sql",
    params(ReplayParams),
    responses(
        (status = 200, description = "查询结果 HTML 片段", body = String, content_type = "text/html"),
        (status = 400, description = "参数校验失败"),
        (status = 406, description = "令牌无效或不是 SELECT 语句"),
        (status = 500, description = "未注册数据库扩展")
    )
)]
pub async fn sql_select(
    State(state): State<AppState>,
    Query(params): Query<ReplayParams>,
) -> AppResult<Html<String>> {
    replay(&state, params, false).await
}

/// 对 SELECT 语句执行 EXPLAIN
#[cfg(feature = "database")]
#[utoipa::path(
    get,
    path = "/_debug_toolbar/sql/explain",
    tag = "sql",
    params(ReplayParams),
    responses(
        (status = 200, description = "执行计划 HTML 片段", body = String, content_type = "text/html"),
        (status = 400, description = "参数校验失败"),
        (status = 406, description = "令牌无效或不是 SELECT 语句"),
        (status = 500, description = "未注册数据库扩展")
    )
)]
pub async fn sql_explain(
    State(state): State<AppState>,
    Query(params): Query<ReplayParams>,
) -> AppResult<Html<String>> {
    replay(&state, params, true).await
}

#[cfg(feature = "database")]
async fn replay(state: &AppState, params: ReplayParams, explain: bool) -> AppResult<Html<String>> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if !params.duration.is_finite() {
        return Err(AppError::Validation("duration must be finite".into()));
    }

    let (statement, bound) = load_query(&state.signer, &params.query)?;
    let database = state.database()?;

    let statement = if explain {
        database.db_type().explain(&statement)
    } else {
        statement
    };

    tracing::info!(explain, db_type = %database.db_type(), "replaying recorded query");
    let result = database.fetch_result(&statement, &bound).await?;

    Ok(Html(render::render_select(
        &result,
        &format_sql(&statement),
        &bound,
        params.duration,
    )))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = ApiResponse<HealthResponse>)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let service = state.config.service_name.clone();
    let health = HealthResponse {
        status: "healthy".to_string(),
        service: service.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        panel_available: Availability::detect(&state).is_available(),
    };
    Json(ApiResponse::ok_with_service(health, service))
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// SQL 面板能否采集实时数据
    pub panel_available: bool,
}
