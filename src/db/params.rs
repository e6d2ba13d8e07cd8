//! Parameter coercion shared by both driver backends.
//!
//! Statements are prepared before anything is bound, and each [`Value`] is
//! converted to the type the server inferred for its placeholder. A backend
//! only maps its own type descriptors to [`ParamType`] and encodes the
//! resulting [`Param`]; the conversion rules live here once.

use super::numeric::PgNumeric;
use super::Value;
use crate::error::{Result, WardenError};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::str::FromStr;

/// Placeholder types the coercion table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamType {
    Bool,
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Numeric,
    /// Any type that takes plain text: text, varchar, bpchar, name, unknown.
    Text,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    /// json or jsonb.
    Json,
    Bytea,
    Other,
}

/// A parameter converted to the type of its placeholder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Oid(u32),
    Float4(f32),
    Float8(f64),
    Numeric(PgNumeric),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// Coerces every parameter to its placeholder's type.
///
/// `types` holds the inferred type of each placeholder and the server's name
/// for it, used in error messages.
pub(crate) fn coerce_params(types: &[(ParamType, &str)], params: &[Value]) -> Result<Vec<Param>> {
    if types.len() != params.len() {
        return Err(WardenError::query(format!(
            "statement expects {} parameters, {} given",
            types.len(),
            params.len()
        )));
    }

    types
        .iter()
        .zip(params)
        .enumerate()
        .map(|(i, ((ty, name), value))| {
            coerce_param(value, *ty).ok_or_else(|| {
                WardenError::query(format!(
                    "cannot bind {} to parameter ${} of type {}",
                    value_kind(value),
                    i + 1,
                    name
                ))
            })
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "a boolean",
        Value::Int(_) => "an integer",
        Value::Float(_) => "a float",
        Value::Decimal(_) => "a decimal",
        Value::String(_) => "text",
        Value::Bytes(_) => "bytes",
    }
}

/// Converts `value` into something that encodes as `ty`, if possible.
pub(crate) fn coerce_param(value: &Value, ty: ParamType) -> Option<Param> {
    use ParamType as T;

    let param = match (value, ty) {
        (Value::Null, _) => Param::Null,

        (Value::Bytes(b), T::Bytea) => Param::Bytes(b.clone()),
        (Value::Bytes(_), _) => return None,
        (other, T::Text) => Param::Text(other.to_display_string()),

        (Value::Bool(b), T::Bool) => Param::Bool(*b),
        (Value::String(s), T::Bool) => Param::Bool(parse_bool(s)?),

        (Value::Int(i), T::Int2) => Param::Int2(i16::try_from(*i).ok()?),
        (Value::Int(i), T::Int4) => Param::Int4(i32::try_from(*i).ok()?),
        (Value::Int(i), T::Int8) => Param::Int8(*i),
        (Value::Int(i), T::Oid) => Param::Oid(u32::try_from(*i).ok()?),
        (Value::Int(i), T::Float4) => Param::Float4(*i as f32),
        (Value::Int(i), T::Float8) => Param::Float8(*i as f64),
        (Value::Float(f), T::Float4) => Param::Float4(*f as f32),
        (Value::Float(f), T::Float8) => Param::Float8(*f),
        (Value::Decimal(s) | Value::String(s), T::Int2) => Param::Int2(s.trim().parse().ok()?),
        (Value::Decimal(s) | Value::String(s), T::Int4) => Param::Int4(s.trim().parse().ok()?),
        (Value::Decimal(s) | Value::String(s), T::Int8) => Param::Int8(s.trim().parse().ok()?),
        (Value::Decimal(s) | Value::String(s), T::Oid) => Param::Oid(s.trim().parse().ok()?),
        (Value::Decimal(s) | Value::String(s), T::Float4) => {
            Param::Float4(s.trim().parse().ok()?)
        }
        (Value::Decimal(s) | Value::String(s), T::Float8) => {
            Param::Float8(s.trim().parse().ok()?)
        }

        (Value::Int(i), T::Numeric) => Param::Numeric(PgNumeric(i.to_string())),
        (Value::Float(f), T::Numeric) if f.is_finite() => Param::Numeric(PgNumeric(f.to_string())),
        (Value::Decimal(s) | Value::String(s), T::Numeric) => {
            BigDecimal::from_str(s.trim()).ok()?;
            Param::Numeric(PgNumeric(s.trim().to_string()))
        }

        (Value::String(s), T::Date) => {
            Param::Date(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?)
        }
        (Value::String(s), T::Time) => Param::Time(parse_time(s)?),
        (Value::String(s), T::Timestamp) => Param::Timestamp(parse_timestamp(s)?),
        (Value::String(s), T::TimestampTz) => Param::TimestampTz(
            DateTime::parse_from_rfc3339(s.trim())
                .ok()?
                .with_timezone(&Utc),
        ),
        (Value::String(s), T::Json) => Param::Json(serde_json::from_str(s).ok()?),

        _ => return None,
    };

    Some(param)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
