//! Neutral scalar values exchanged between the engine and visitors.
//!
//! Visitors never see a record's Rust types. On the read path they receive a
//! [`ValueRef`] borrowed from the field; on the write path they hand a
//! [`Value`] (or raw text) to a [`ScalarSlot`](crate::visitor::ScalarSlot),
//! which converts it into the field's declared type.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use std::fmt;

/// Kind of a scalar field, independent of nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Str,
    Int,
    Bool,
    Float,
    Timestamp,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Str => "string",
            ScalarKind::Int => "int",
            ScalarKind::Bool => "bool",
            ScalarKind::Float => "float",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl FieldType {
    pub const fn required(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            kind: self.kind,
            nullable: true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// A field value borrowed from a record (read path).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Str(&'a str),
    Int(i64),
    Bool(bool),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Null,
}

impl ValueRef<'_> {
    pub fn to_value(self) -> Value {
        match self {
            ValueRef::Str(s) => Value::Str(s.to_string()),
            ValueRef::Int(i) => Value::Int(i),
            ValueRef::Bool(b) => Value::Bool(b),
            ValueRef::Float(x) => Value::Float(x),
            ValueRef::Timestamp(t) => Value::Timestamp(t),
            ValueRef::Null => Value::Null,
        }
    }
}

/// An owned value handed to a field (write path), also used for filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Str(s) => ValueRef::Str(s),
            Value::Int(i) => ValueRef::Int(*i),
            Value::Bool(b) => ValueRef::Bool(*b),
            Value::Float(x) => ValueRef::Float(*x),
            Value::Timestamp(t) => ValueRef::Timestamp(*t),
            Value::Null => ValueRef::Null,
        }
    }

    /// Short tag name used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

/// Drop sub-millisecond precision; stored timestamps hold whole milliseconds.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = at.nanosecond();
    at.with_nanosecond(nanos - nanos % 1_000_000).unwrap_or(at)
}

/// Whether `at` survives storage unchanged.
pub fn is_millisecond_precise(at: DateTime<Utc>) -> bool {
    at.nanosecond() % 1_000_000 == 0
}

/// A Rust type that can back a scalar field.
///
/// `from_value` hands the value back when its kind is incompatible with the
/// type; `parse_text` returns `None` when the text does not parse.
pub trait FieldValue: Sized + Send + Sync + 'static {
    const TYPE: FieldType;

    fn to_value_ref(&self) -> ValueRef<'_>;

    fn from_value(value: Value) -> Result<Self, Value>;

    fn parse_text(text: &str) -> Option<Self>;
}

impl FieldValue for String {
    const TYPE: FieldType = FieldType::required(ScalarKind::Str);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Str(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl FieldValue for i64 {
    const TYPE: FieldType = FieldType::required(ScalarKind::Int);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FieldValue for i32 {
    const TYPE: FieldType = FieldType::required(ScalarKind::Int);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| Value::Int(i)),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FieldValue for bool {
    const TYPE: FieldType = FieldType::required(ScalarKind::Bool);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    const TYPE: FieldType = FieldType::required(ScalarKind::Float);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }
}

impl FieldValue for DateTime<Utc> {
    const TYPE: FieldType = FieldType::required(ScalarKind::Timestamp);

    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Timestamp(t) => Ok(truncate_to_millis(t)),
            other => Err(other),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(truncate_to_millis(parsed.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }
        let secs: i64 = text.parse().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const TYPE: FieldType = T::TYPE.nullable();

    fn to_value_ref(&self) -> ValueRef<'_> {
        match self {
            Some(inner) => inner.to_value_ref(),
            None => ValueRef::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(None);
        }
        T::parse_text(text).map(Some)
    }
}
