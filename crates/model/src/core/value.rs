use crate::records::row::Row;
use base64::{Engine, engine::general_purpose::STANDARD};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value as Json;
use std::fmt;

/// Integer cell kept as its exact decimal text.
///
/// Produced instead of [`Value::Int64`] when integer widening is requested, so
/// callers decide how to narrow the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrappedInt(String);

impl WrappedInt {
    pub fn new(raw: impl Into<String>) -> Self {
        WrappedInt(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn to_i128(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl fmt::Display for WrappedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed result cell, decoded from the raw `{"v": ...}` payload using the
/// column schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    WrappedInt(WrappedInt),
    Float64(f64),
    Numeric(BigDecimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Json(Json),
    Geography(String),
    Interval(String),
    /// `None` bounds are `UNBOUNDED`.
    Range {
        start: Option<Box<Value>>,
        end: Option<Box<Value>>,
    },
    Array(Vec<Value>),
    Record(Row),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::WrappedInt(v) => v.to_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            Value::WrappedInt(v) => v.as_str().parse().ok(),
            Value::Numeric(v) => v.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) | Value::Geography(v) | Value::Interval(v) => Some(v),
            Value::WrappedInt(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            Value::Record(row) => Some(row),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) | Value::WrappedInt(_) => "INT64",
            Value::Float64(_) => "FLOAT64",
            Value::Numeric(_) => "NUMERIC",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Date(_) => "DATE",
            Value::DateTime(_) => "DATETIME",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Json(_) => "JSON",
            Value::Geography(_) => "GEOGRAPHY",
            Value::Interval(_) => "INTERVAL",
            Value::Range { .. } => "RANGE",
            Value::Array(_) => "ARRAY",
            Value::Record(_) => "STRUCT",
        }
    }

    /// Plain JSON rendering. Numbers that do not fit a JSON double losslessly
    /// (wrapped integers, numerics) are rendered as strings.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int64(v) => Json::from(*v),
            Value::WrappedInt(v) => Json::String(v.to_string()),
            Value::Float64(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or_else(|| Json::String(non_finite_text(*v).to_string())),
            Value::Numeric(v) => Json::String(v.to_string()),
            Value::String(v) | Value::Geography(v) | Value::Interval(v) => Json::String(v.clone()),
            Value::Bytes(v) => Json::String(STANDARD.encode(v)),
            Value::Date(v) => Json::String(v.to_string()),
            Value::DateTime(v) => Json::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Time(v) => Json::String(v.to_string()),
            Value::Timestamp(v) => Json::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Json(v) => v.clone(),
            Value::Range { start, end } => serde_json::json!({
                "start": start.as_ref().map(|v| v.to_json()),
                "end": end.as_ref().map(|v| v.to_json()),
            }),
            Value::Array(values) => Json::Array(values.iter().map(Value::to_json).collect()),
            Value::Record(row) => row.to_json(),
        }
    }
}

/// Service spelling of non-finite floats.
fn non_finite_text(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::String(v) => write!(f, "{v}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}
