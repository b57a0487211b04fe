//! The scalar value domain shared by every subsystem: a small tagged union
//! (`Value`) with its associated type tag (`SqlType`).
//!
//! Comparisons and equality are only defined between values of the same
//! tag. Rather than panicking on a tag mismatch, these helpers return
//! `None` so that callers which know the field name involved (filter, join,
//! aggregate) can raise a `TypeMismatch` error with useful context.

use std::cmp::Ordering;

/// The type tag of a `Value`. Every column in a `TupleDesc` carries exactly
/// one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    Int,
    Double,
    Text,
}

/// A scalar field value: the runtime counterpart of `SqlType`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Double(f64),
    Text(String),
}

impl Value {
    /// The type tag of this value.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::Int(_) => SqlType::Int,
            Value::Double(_) => SqlType::Double,
            Value::Text(_) => SqlType::Text,
        }
    }

    /// Compares two values of the same tag. Returns `None` across tags.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Tests equality of two values of the same tag. Returns `None` across tags.
    pub fn eq_same_type(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a == b),
            (Value::Double(a), Value::Double(b)) => Some(a == b),
            (Value::Text(a), Value::Text(b)) => Some(a == b),
            _ => None,
        }
    }

    /// Adds two numeric values of the same tag, promoting `Int + Int` to
    /// `Int` and `Double + Double` to `Double`. `None` for `Text` or a tag
    /// mismatch.
    pub fn add_same_type(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(a + b)),
            (Value::Double(a), Value::Double(b)) => Some(Value::Double(a + b)),
            _ => None,
        }
    }

    /// Widens a numeric value to `f64`. `None` for `Text`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Text(_) => None,
        }
    }
}
