//! Recording database extension.
//!
//! Keeps one typed `sqlx` pool per backend. Statements issued through
//! [`Database`] are timed and, when recording is on, appended to the current
//! request's query log together with the caller's source location.

use std::future::Future;
use std::panic::Location;
use std::time::{Duration, Instant};

use serde_json::Value;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{Column, MySql, MySqlPool, PgPool, Postgres, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

use common::errors::{AppError, AppResult};
use common::models::{DbType, RecordedQuery, SelectResult, SqlParam};

use crate::availability::RecordingMode;
use crate::recorder;

/// Connection pool for one of the supported backends.
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
}

/// Database extension registered on the application state.
#[derive(Clone, Debug)]
pub struct Database {
    pool: DatabasePool,
    mode: RecordingMode,
    recording: bool,
}

macro_rules! bind_params {
    ($db:ty, $sql:expr, $params:expr) => {{
        let mut query = sqlx::query::<$db>($sql);
        for param in $params {
            query = match param {
                SqlParam::Null => query.bind(None::<String>),
                SqlParam::Bool(v) => query.bind(*v),
                SqlParam::Int(v) => query.bind(*v),
                SqlParam::Float(v) => query.bind(*v),
                SqlParam::Text(v) | SqlParam::Opaque(v) => query.bind(v.clone()),
                SqlParam::Bytes(v) => query.bind(v.clone()),
            };
        }
        query
    }};
}

impl Database {
    /// Connects a pool for `url`.
    ///
    /// SQLite pools are pinned to a single long-lived connection so that
    /// in-memory databases survive between statements.
    pub async fn connect(
        url: &str,
        mode: RecordingMode,
        max_connections: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        let db_type = DbType::from_url(url).ok_or_else(|| {
            AppError::DatabaseConnection("unsupported database URL scheme".into())
        })?;

        let pool = match db_type {
            DbType::MySQL => MySqlPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabasePool::MySQL),
            DbType::Postgres => PgPoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabasePool::Postgres),
            DbType::SQLite => SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .acquire_timeout(timeout)
                .connect(url)
                .await
                .map(DatabasePool::SQLite),
        }
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;

        tracing::info!(db_type = %db_type, mode = ?mode, "database pool connected");
        Ok(Self::from_pool(pool, mode))
    }

    /// Wraps an existing pool. Recording starts off.
    pub fn from_pool(pool: DatabasePool, mode: RecordingMode) -> Self {
        Self {
            pool,
            mode,
            recording: false,
        }
    }

    /// Turns recording on or off.
    pub fn with_recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    pub fn db_type(&self) -> DbType {
        match self.pool {
            DatabasePool::MySQL(_) => DbType::MySQL,
            DatabasePool::Postgres(_) => DbType::Postgres,
            DatabasePool::SQLite(_) => DbType::SQLite,
        }
    }

    pub fn mode(&self) -> RecordingMode {
        self.mode
    }

    /// Executes a statement and returns the number of affected rows.
    #[track_caller]
    pub fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [SqlParam],
    ) -> impl Future<Output = AppResult<u64>> + Send + 'a {
        let location = Location::caller();
        async move {
            let started = Instant::now();
            let result = match &self.pool {
                DatabasePool::MySQL(pool) => bind_params!(MySql, sql, params)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected()),
                DatabasePool::Postgres(pool) => bind_params!(Postgres, sql, params)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected()),
                DatabasePool::SQLite(pool) => bind_params!(Sqlite, sql, params)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected()),
            };
            let affected = result.map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            self.record(sql, params, started.elapsed(), location);
            Ok(affected)
        }
    }

    /// Runs a query and decodes the rows into headers and JSON values.
    #[track_caller]
    pub fn fetch_result<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [SqlParam],
    ) -> impl Future<Output = AppResult<SelectResult>> + Send + 'a {
        let location = Location::caller();
        async move {
            let started = Instant::now();
            let result = match &self.pool {
                DatabasePool::MySQL(pool) => bind_params!(MySql, sql, params)
                    .fetch_all(pool)
                    .await
                    .map(|rows| to_select_result(&rows, decode_mysql)),
                DatabasePool::Postgres(pool) => bind_params!(Postgres, sql, params)
                    .fetch_all(pool)
                    .await
                    .map(|rows| to_select_result(&rows, decode_postgres)),
                DatabasePool::SQLite(pool) => bind_params!(Sqlite, sql, params)
                    .fetch_all(pool)
                    .await
                    .map(|rows| to_select_result(&rows, decode_sqlite)),
            };
            let result = result.map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
            self.record(sql, params, started.elapsed(), location);
            Ok(result)
        }
    }

    fn record(&self, sql: &str, params: &[SqlParam], duration: Duration, location: &Location<'_>) {
        if !self.recording {
            return;
        }
        recorder::record(RecordedQuery::new(
            sql,
            params.to_vec(),
            duration,
            location.to_string(),
        ));
    }
}

/// Converts rows into column headers plus JSON values.
fn to_select_result<R: Row>(rows: &[R], decode: fn(&R, usize) -> Value) -> SelectResult {
    let headers = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode(row, i)).collect())
        .collect();

    SelectResult { headers, rows }
}

/// Tries each type in order; the first one the column accepts wins.
macro_rules! decode_first {
    ($row:expr, $index:expr; $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            if let Ok(value) = $row.try_get::<Option<$ty>, _>($index) {
                return value.map($conv).unwrap_or(Value::Null);
            }
        )+
    };
}

fn decode_mysql(row: &MySqlRow, index: usize) -> Value {
    decode_first!(row, index;
        i64 => Value::from,
        u64 => Value::from,
        f64 => float_value,
        f32 => |v| float_value(f64::from(v)),
        Decimal => |v| Value::String(v.to_string()),
        String => Value::String,
        NaiveDateTime => |v| Value::String(v.to_string()),
        DateTime<Utc> => |v| Value::String(v.to_rfc3339()),
        NaiveDate => |v| Value::String(v.to_string()),
        NaiveTime => |v| Value::String(v.to_string()),
        Vec<u8> => bytes_value,
        JsonValue => |v| v,
    );
    unsupported(row, index)
}

fn decode_postgres(row: &PgRow, index: usize) -> Value {
    decode_first!(row, index;
        i16 => Value::from,
        i32 => Value::from,
        i64 => Value::from,
        f32 => |v| float_value(f64::from(v)),
        f64 => float_value,
        Decimal => |v| Value::String(v.to_string()),
        bool => Value::Bool,
        String => Value::String,
        NaiveDateTime => |v| Value::String(v.to_string()),
        DateTime<Utc> => |v| Value::String(v.to_rfc3339()),
        NaiveDate => |v| Value::String(v.to_string()),
        NaiveTime => |v| Value::String(v.to_string()),
        Uuid => |v| Value::String(v.to_string()),
        JsonValue => |v| v,
        Vec<u8> => bytes_value,
    );
    unsupported(row, index)
}

/// SQLite values are decoded by their storage class; the declared column
/// type only distinguishes BOOLEAN from INTEGER.
fn decode_sqlite(row: &SqliteRow, index: usize) -> Value {
    let storage = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return unsupported(row, index),
    };
    let declared = row.column(index).type_info().name();

    let value = match storage.as_str() {
        "INTEGER" if declared == "BOOLEAN" => row.try_get_unchecked::<bool, _>(index).map(Value::Bool),
        "INTEGER" => row.try_get_unchecked::<i64, _>(index).map(Value::from),
        "REAL" => row.try_get_unchecked::<f64, _>(index).map(float_value),
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).map(bytes_value),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };
    value.unwrap_or_else(|_| unsupported(row, index))
}

fn float_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

fn bytes_value(bytes: Vec<u8>) -> Value {
    Value::String(SqlParam::Bytes(bytes).to_string())
}

/// Placeholder for a column no decoder accepts. The row is kept.
fn unsupported<R: Row>(row: &R, index: usize) -> Value
where
    usize: sqlx::ColumnIndex<R>,
{
    let type_name = row.column(index).type_info().name().to_string();
    tracing::debug!(column = index, type_name = %type_name, "column type not decodable");
    Value::String(format!("<unsupported {}>", type_name))
}
