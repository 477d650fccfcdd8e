//! SQL 调试面板演示服务
//!
//! 启动一个带调试工具栏的示例应用：
//! - 首页执行几条查询并返回 HTML 页面
//! - 调试模式下工具栏注入到页面中
//! - 通过工具栏链接重放或 EXPLAIN 记录的 SELECT 语句

use std::time::Duration;

use axum::{extract::State, response::Html, routing::get, Json, Router};
use common::config::AppConfig;
use common::errors::AppResult;
use common::models::SqlParam;
use sql_panel::availability::RecordingMode;
use sql_panel::db::Database;
use sql_panel::handlers;
use sql_panel::routes;
use sql_panel::state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "sql-panel";
const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SQL 调试面板 API",
        version = "0.1.0",
        description = "SQL 查询记录与重放"
    ),
    paths(
        handlers::sql_select,
        handlers::sql_explain,
        handlers::health_check,
    ),
    components(schemas(handlers::HealthResponse)),
    tags(
        (name = "sql", description = "查询重放端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 连接数据库并写入示例数据
    let url = config
        .database_url
        .clone()
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let database = Database::connect(
        &url,
        RecordingMode::DebugAuto,
        config.max_connections,
        Duration::from_secs(config.connect_timeout_secs),
    )
    .await?;
    seed(&database).await?;

    // 创建应用状态
    let state = AppState::new(config.clone()).with_database(database);

    // 创建路由
    let app = create_router(state);

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, debug = config.debug, "启动服务");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = routes::router(&state.config.toolbar_prefix)
        .route("/", get(index))
        .route("/api-docs/openapi.json", get(openapi_json));

    routes::with_toolbar(router, state).layer(cors)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn seed(db: &Database) -> AppResult<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS users (\
         id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT NOT NULL, visits INTEGER NOT NULL DEFAULT 0)",
        &[],
    )
    .await?;

    let users = [("alice", "alice@example.com"), ("bob", "bob@example.com"), ("carol", "carol@example.com")];
    for (name, email) in users {
        db.execute(
            "INSERT INTO users (name, email) VALUES (?, ?)",
            &[SqlParam::from(name), SqlParam::from(email)],
        )
        .await?;
    }
    info!(rows = users.len(), "示例数据已写入");
    Ok(())
}

/// 示例首页：执行两条查询和一条更新
async fn index(State(state): State<AppState>) -> AppResult<Html<String>> {
    let db = state.database()?;

    let visitor = [SqlParam::from("alice")];
    db.execute("UPDATE users SET visits = visits + 1 WHERE name = ?", &visitor)
        .await?;
    let me = db
        .fetch_result("SELECT id, name, email, visits FROM users WHERE name = ?", &visitor)
        .await?;
    let all = db
        .fetch_result("SELECT id, name FROM users ORDER BY id", &[])
        .await?;

    let visits = me
        .rows
        .first()
        .and_then(|row| row.get(3))
        .cloned()
        .unwrap_or_default();
    let names: String = all
        .rows
        .iter()
        .filter_map(|row| row.get(1).and_then(|v| v.as_str()))
        .map(|name| format!("<li>{}</li>", common::utils::html_escape(name)))
        .collect();

    Ok(Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>SQL panel demo</title></head>\n<body>\n\
         <h1>Users</h1>\n<p>alice has visited {} times.</p>\n<ul>{}</ul>\n</body>\n</html>",
        visits, names
    )))
}

/// Load .env file from the working directory (best-effort, no error if missing).
fn load_dotenv() {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            // the real environment wins
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value.trim().trim_matches('"'));
            }
        }
    }
}
