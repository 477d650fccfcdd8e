//! SQL query models.
//!
//! A [`RecordedQuery`] is captured for every statement executed through the
//! recording database extension while a request is being served.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// A single bound statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlParam {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point. Only finite values serialize.
    Float(#[serde(serialize_with = "serialize_finite")] f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A value bound by its textual form whose original type is not kept.
    /// Never serializes, so statements using it cannot be replayed.
    #[serde(skip_deserializing)]
    Opaque(#[serde(serialize_with = "reject_opaque")] String),
}

fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(serde::ser::Error::custom(format!(
            "non-finite float {} cannot be serialized",
            value
        )))
    }
}

fn reject_opaque<S: Serializer>(value: &str, _serializer: S) -> Result<S::Ok, S::Error> {
    Err(serde::ser::Error::custom(format!(
        "opaque parameter {:?} cannot be serialized",
        value
    )))
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Null => write!(f, "NULL"),
            SqlParam::Bool(b) => write!(f, "{}", b),
            SqlParam::Int(i) => write!(f, "{}", i),
            SqlParam::Float(v) => write!(f, "{}", v),
            SqlParam::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            SqlParam::Bytes(bytes) => {
                write!(f, "x'")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "'")
            }
            SqlParam::Opaque(s) => write!(f, "<{}>", s),
        }
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v as i64)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(v: Vec<u8>) -> Self {
        SqlParam::Bytes(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Renders a parameter list as `[a, b, c]`.
pub fn display_params(params: &[SqlParam]) -> String {
    let parts: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// One executed statement, captured during a request.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    /// Statement text as executed.
    pub statement: String,

    /// Positional parameters bound to the statement.
    pub parameters: Vec<SqlParam>,

    /// Wall-clock execution time.
    pub duration: Duration,

    /// Call site that issued the statement (`file:line:column`).
    pub location: String,

    /// When execution started.
    pub started_at: DateTime<Utc>,
}

impl RecordedQuery {
    /// Creates a record that started now.
    pub fn new(
        statement: impl Into<String>,
        parameters: Vec<SqlParam>,
        duration: Duration,
        location: impl Into<String>,
    ) -> Self {
        Self {
            statement: statement.into(),
            parameters,
            duration,
            location: location.into(),
            started_at: Utc::now(),
        }
    }
}

/// Rows returned by replaying a statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectResult {
    /// Column names, in result order. Empty when no rows came back.
    pub headers: Vec<String>,

    /// Row values, one inner vector per row.
    pub rows: Vec<Vec<serde_json::Value>>,
}
