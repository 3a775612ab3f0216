//! Turns raw `{f: [{v: ..}]}` rows into typed [`Row`]s, driven by the schema.

use crate::error::DecodeError;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use model::{
    core::value::{Value, WrappedInt},
    pagination::options::DecodeOptions,
    records::row::Row,
    schema::{FieldSchema, FieldType, TableSchema},
};
use serde_json::Value as Json;
use std::str::FromStr;

const UNBOUNDED: &str = "UNBOUNDED";

pub fn merge_schema_with_rows(
    schema: &TableSchema,
    rows: &[Json],
    options: DecodeOptions,
) -> Result<Vec<Row>, DecodeError> {
    rows.iter()
        .map(|raw| decode_record(&schema.fields, raw, "", options))
        .collect()
}

fn decode_record(
    fields: &[FieldSchema],
    raw: &Json,
    parent: &str,
    options: DecodeOptions,
) -> Result<Row, DecodeError> {
    let cells = match raw.get("f") {
        Some(Json::Array(cells)) => cells.as_slice(),
        _ => {
            return Err(DecodeError::UnexpectedShape {
                column: parent.to_string(),
                expected: "record with 'f' cells",
                found: raw.to_string(),
            });
        }
    };

    if cells.len() != fields.len() {
        return Err(DecodeError::CellCount {
            expected: fields.len(),
            found: cells.len(),
        });
    }

    let mut row = Row::with_capacity(fields.len());
    for (field, cell) in fields.iter().zip(cells) {
        let value = decode_field(field, cell.get("v").unwrap_or(&Json::Null), options)?;
        row.push(field.name.clone(), value);
    }
    Ok(row)
}

fn decode_field(field: &FieldSchema, raw: &Json, options: DecodeOptions) -> Result<Value, DecodeError> {
    if !field.is_repeated() {
        return decode_scalar(field, &field.field_type, raw, options);
    }

    match raw {
        // Repeated columns never come back null, but treat it as empty anyway.
        Json::Null => Ok(Value::Array(Vec::new())),
        Json::Array(items) => items
            .iter()
            .map(|item| {
                let inner = item.get("v").unwrap_or(&Json::Null);
                decode_scalar(field, &field.field_type, inner, options)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(shape_error(field, "array", other)),
    }
}

fn decode_scalar(
    field: &FieldSchema,
    field_type: &FieldType,
    raw: &Json,
    options: DecodeOptions,
) -> Result<Value, DecodeError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if *field_type == FieldType::Record {
        return decode_record(&field.fields, raw, &field.name, options).map(Value::Record);
    }

    let text = scalar_text(field, raw)?;
    let invalid = || DecodeError::InvalidValue {
        column: field.name.clone(),
        field_type: field_type.as_str().to_string(),
        raw: text.to_string(),
    };

    let value = match field_type {
        FieldType::Integer => {
            if options.wrap_integers {
                Value::WrappedInt(WrappedInt::new(text))
            } else {
                Value::Int64(text.parse().map_err(|_| invalid())?)
            }
        }
        FieldType::Float => Value::Float64(parse_float(text).ok_or_else(invalid)?),
        FieldType::Numeric | FieldType::BigNumeric => {
            Value::Numeric(BigDecimal::from_str(text).map_err(|_| invalid())?)
        }
        FieldType::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        FieldType::Bytes => Value::Bytes(BASE64.decode(text).map_err(|_| invalid())?),
        FieldType::Date => {
            Value::Date(NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?)
        }
        FieldType::DateTime => Value::DateTime(parse_datetime(text).ok_or_else(invalid)?),
        FieldType::Time => {
            Value::Time(NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|_| invalid())?)
        }
        FieldType::Timestamp => {
            Value::Timestamp(parse_timestamp(text, options.int64_timestamp).ok_or_else(invalid)?)
        }
        FieldType::Json => {
            if options.parse_json {
                Value::Json(serde_json::from_str(text).map_err(|_| invalid())?)
            } else {
                Value::String(text.to_string())
            }
        }
        FieldType::Geography => Value::Geography(text.to_string()),
        FieldType::Interval => Value::Interval(text.to_string()),
        FieldType::Range => decode_range(field, text, options).ok_or_else(invalid)?,
        FieldType::String | FieldType::Record | FieldType::Other(_) => {
            Value::String(text.to_string())
        }
    };

    Ok(value)
}

fn scalar_text<'a>(field: &FieldSchema, raw: &'a Json) -> Result<&'a str, DecodeError> {
    match raw {
        Json::String(text) => Ok(text),
        other => Err(shape_error(field, "string", other)),
    }
}

fn shape_error(field: &FieldSchema, expected: &'static str, found: &Json) -> DecodeError {
    DecodeError::UnexpectedShape {
        column: field.name.clone(),
        expected,
        found: found.to_string(),
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => text.parse().ok(),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Timestamps arrive as int64 microseconds when requested with
/// `formatOptions.useInt64Timestamp`, otherwise as float seconds (`1.7E9`).
fn parse_timestamp(text: &str, int64_timestamp: bool) -> Option<DateTime<chrono::Utc>> {
    if int64_timestamp && let Ok(micros) = text.parse::<i64>() {
        return DateTime::from_timestamp_micros(micros);
    }

    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

/// `[start, end)` where either bound may be `UNBOUNDED`.
fn decode_range(field: &FieldSchema, text: &str, options: DecodeOptions) -> Option<Value> {
    let inner = text.trim().strip_prefix('[')?.strip_suffix(')')?;
    let (start, end) = inner.split_once(',')?;
    let element_type = field
        .range_element_type
        .as_ref()
        .map(|r| r.element_type.clone())
        .unwrap_or(FieldType::String);

    let bound = |raw: &str| -> Option<Option<Box<Value>>> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(UNBOUNDED) || raw.eq_ignore_ascii_case("NULL") {
            return Some(None);
        }
        decode_scalar(field, &element_type, &Json::String(raw.to_string()), options)
            .ok()
            .map(|v| Some(Box::new(v)))
    };

    Some(Value::Range {
        start: bound(start)?,
        end: bound(end)?,
    })
}
