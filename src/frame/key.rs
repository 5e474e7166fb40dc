//! Key types that can label the rows and columns of a table.
//!
//! Every key type supplies a *codec*: a mapping to a hashable code that the
//! index stores in its key-to-slot map. Primitive keys code to themselves,
//! doubles code to a canonical bit pattern, and temporal keys code to an
//! integer count (Julian day, Unix nanoseconds). One generic [`Index`] serves
//! all of them without boxing primitive keys.
//!
//! [`Index`]: crate::frame::index::Index

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

use time::{Date, PrimitiveDateTime};

use crate::frame::Value;

/// Runtime tag for a key type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Int,
    Long,
    Double,
    Str,
    Date,
    DateTime,
    Object,
}

impl KeyType {
    pub fn tag(self) -> u8 {
        match self {
            KeyType::Int => 1,
            KeyType::Long => 2,
            KeyType::Double => 3,
            KeyType::Str => 4,
            KeyType::Date => 5,
            KeyType::DateTime => 6,
            KeyType::Object => 7,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(KeyType::Int),
            2 => Some(KeyType::Long),
            3 => Some(KeyType::Double),
            4 => Some(KeyType::Str),
            5 => Some(KeyType::Date),
            6 => Some(KeyType::DateTime),
            7 => Some(KeyType::Object),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyType::Int => "int",
            KeyType::Long => "long",
            KeyType::Double => "double",
            KeyType::Str => "string",
            KeyType::Date => "date",
            KeyType::DateTime => "datetime",
            KeyType::Object => "object",
        }
    }
}

/// A type usable as a row or column key
pub trait IndexKey: Clone + Debug + Send + Sync + 'static {
    /// Hashable code the key is stored under
    type Code: Eq + Hash + Clone + Debug + Send + Sync;

    const KEY_TYPE: KeyType;

    /// Maps the key to its code. Distinct keys must map to distinct codes.
    fn code(&self) -> Self::Code;

    /// Code for lookups; keys that are their own code borrow instead of
    /// cloning.
    fn code_ref(&self) -> Cow<'_, Self::Code> {
        Cow::Owned(self.code())
    }

    /// Total order used by ascending/descending index sorts
    fn compare(&self, other: &Self) -> Ordering;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

impl IndexKey for i32 {
    type Code = i32;
    const KEY_TYPE: KeyType = KeyType::Int;

    fn code(&self) -> i32 {
        *self
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl IndexKey for i64 {
    type Code = i64;
    const KEY_TYPE: KeyType = KeyType::Long;

    fn code(&self) -> i64 {
        *self
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::Long(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Long(v) => Some(*v),
            Value::Int(v) => Some(*v as i64),
            _ => None,
        }
    }
}

impl IndexKey for f64 {
    type Code = u64;
    const KEY_TYPE: KeyType = KeyType::Double;

    /// `-0.0` and `0.0` share a code, as do all NaN payloads.
    fn code(&self) -> u64 {
        if *self == 0.0 {
            0
        } else if self.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.to_bits()
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl IndexKey for String {
    type Code = String;
    const KEY_TYPE: KeyType = KeyType::Str;

    fn code(&self) -> String {
        self.clone()
    }

    fn code_ref(&self) -> Cow<'_, String> {
        Cow::Borrowed(self)
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl IndexKey for Date {
    type Code = i32;
    const KEY_TYPE: KeyType = KeyType::Date;

    fn code(&self) -> i32 {
        self.to_julian_day()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }
}

impl IndexKey for PrimitiveDateTime {
    type Code = i128;
    const KEY_TYPE: KeyType = KeyType::DateTime;

    fn code(&self) -> i128 {
        self.assume_utc().unix_timestamp_nanos()
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

/// Generic object keys hash by value equality
impl IndexKey for Value {
    type Code = Value;
    const KEY_TYPE: KeyType = KeyType::Object;

    fn code(&self) -> Value {
        self.clone()
    }

    fn code_ref(&self) -> Cow<'_, Value> {
        Cow::Borrowed(self)
    }

    fn compare(&self, other: &Self) -> Ordering {
        compare_values(self, other)
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Long(_) | Value::Double(_) => 2,
        Value::Str(_) => 3,
        Value::Date(_) => 4,
        Value::DateTime(_) => 5,
    }
}

/// Orders values by kind first, then by content. Numbers of different widths
/// compare numerically.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Long(x), Value::Long(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}
