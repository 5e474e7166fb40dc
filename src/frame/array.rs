use std::cmp::Ordering;

use crate::frame::key::compare_values;
use crate::frame::{FrameError, Result, Value};

/// Element type of a [`TypedArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayType {
    Boolean,
    Int,
    Long,
    Double,
    Str,
    Object,
}

impl ArrayType {
    /// Stable tag used by the binary layout
    pub fn tag(self) -> u8 {
        match self {
            ArrayType::Boolean => 1,
            ArrayType::Int => 2,
            ArrayType::Long => 3,
            ArrayType::Double => 4,
            ArrayType::Str => 5,
            ArrayType::Object => 6,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ArrayType::Boolean),
            2 => Some(ArrayType::Int),
            3 => Some(ArrayType::Long),
            4 => Some(ArrayType::Double),
            5 => Some(ArrayType::Str),
            6 => Some(ArrayType::Object),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayType::Boolean => "boolean",
            ArrayType::Int => "int",
            ArrayType::Long => "long",
            ArrayType::Double => "double",
            ArrayType::Str => "string",
            ArrayType::Object => "object",
        }
    }
}

/// Dense, growable storage for one column (or one row) of a table.
///
/// Slots are addressed physically: the position a key was assigned in its
/// index. Unused slots past the live length of the index hold the type's
/// default (`false`, `0`, `NaN`, `None`, `Value::Null`).
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Boolean(Vec<bool>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Double(Vec<f64>),
    Str(Vec<Option<String>>),
    Object(Vec<Value>),
}

macro_rules! each_variant {
    ($array:expr, $values:ident => $body:expr) => {
        match $array {
            TypedArray::Boolean($values) => $body,
            TypedArray::Int($values) => $body,
            TypedArray::Long($values) => $body,
            TypedArray::Double($values) => $body,
            TypedArray::Str($values) => $body,
            TypedArray::Object($values) => $body,
        }
    };
}

macro_rules! each_variant_map {
    ($array:expr, $values:ident => $body:expr) => {
        match $array {
            TypedArray::Boolean($values) => TypedArray::Boolean($body),
            TypedArray::Int($values) => TypedArray::Int($body),
            TypedArray::Long($values) => TypedArray::Long($body),
            TypedArray::Double($values) => TypedArray::Double($body),
            TypedArray::Str($values) => TypedArray::Str($body),
            TypedArray::Object($values) => TypedArray::Object($body),
        }
    };
}

impl TypedArray {
    /// Allocates `len` default-filled slots
    pub fn new(array_type: ArrayType, len: usize) -> Self {
        match array_type {
            ArrayType::Boolean => TypedArray::Boolean(vec![false; len]),
            ArrayType::Int => TypedArray::Int(vec![0; len]),
            ArrayType::Long => TypedArray::Long(vec![0; len]),
            ArrayType::Double => TypedArray::Double(vec![f64::NAN; len]),
            ArrayType::Str => TypedArray::Str(vec![None; len]),
            ArrayType::Object => TypedArray::Object(vec![Value::Null; len]),
        }
    }

    pub fn array_type(&self) -> ArrayType {
        match self {
            TypedArray::Boolean(_) => ArrayType::Boolean,
            TypedArray::Int(_) => ArrayType::Int,
            TypedArray::Long(_) => ArrayType::Long,
            TypedArray::Double(_) => ArrayType::Double,
            TypedArray::Str(_) => ArrayType::Str,
            TypedArray::Object(_) => ArrayType::Object,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy with fresh backing storage
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Copies the slots named by `indices`, in that order, into a new array.
    pub fn gather(&self, indices: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&slot) = indices.iter().find(|&&slot| slot >= len) {
            return Err(FrameError::OutOfBounds { slot, len });
        }
        Ok(each_variant_map!(self, values => {
            indices.iter().map(|&i| values[i].clone()).collect()
        }))
    }

    /// Grows the array to at least `capacity` slots; never shrinks.
    pub fn expand(&mut self, capacity: usize) {
        if capacity <= self.len() {
            return;
        }
        match self {
            TypedArray::Boolean(values) => values.resize(capacity, false),
            TypedArray::Int(values) => values.resize(capacity, 0),
            TypedArray::Long(values) => values.resize(capacity, 0),
            TypedArray::Double(values) => values.resize(capacity, f64::NAN),
            TypedArray::Str(values) => values.resize(capacity, None),
            TypedArray::Object(values) => values.resize(capacity, Value::Null),
        }
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.len();
        for slot in [a, b] {
            if slot >= len {
                return Err(FrameError::OutOfBounds { slot, len });
            }
        }
        each_variant!(self, values => values.swap(a, b));
        Ok(())
    }

    /// Orders two slots of this array. Doubles use a total order, strings
    /// place `None` first, object values compare by kind then content.
    pub fn compare_slots(&self, a: usize, b: usize) -> Ordering {
        match self {
            TypedArray::Boolean(values) => values[a].cmp(&values[b]),
            TypedArray::Int(values) => values[a].cmp(&values[b]),
            TypedArray::Long(values) => values[a].cmp(&values[b]),
            TypedArray::Double(values) => values[a].total_cmp(&values[b]),
            TypedArray::Str(values) => values[a].cmp(&values[b]),
            TypedArray::Object(values) => compare_values(&values[a], &values[b]),
        }
    }

    fn mismatch(&self, requested: &'static str) -> FrameError {
        FrameError::TypeMismatch {
            requested,
            actual: self.array_type().name(),
        }
    }

    fn out_of_bounds(&self, slot: usize) -> FrameError {
        FrameError::OutOfBounds {
            slot,
            len: self.len(),
        }
    }

    pub fn get_bool(&self, slot: usize) -> Result<bool> {
        match self {
            TypedArray::Boolean(values) => {
                values.get(slot).copied().ok_or_else(|| self.out_of_bounds(slot))
            }
            _ => Err(self.mismatch("boolean")),
        }
    }

    pub fn get_int(&self, slot: usize) -> Result<i32> {
        match self {
            TypedArray::Int(values) => {
                values.get(slot).copied().ok_or_else(|| self.out_of_bounds(slot))
            }
            _ => Err(self.mismatch("int")),
        }
    }

    /// Reads a long, widening from int storage
    pub fn get_long(&self, slot: usize) -> Result<i64> {
        match self {
            TypedArray::Long(values) => {
                values.get(slot).copied().ok_or_else(|| self.out_of_bounds(slot))
            }
            TypedArray::Int(values) => values
                .get(slot)
                .map(|&v| v as i64)
                .ok_or_else(|| self.out_of_bounds(slot)),
            _ => Err(self.mismatch("long")),
        }
    }

    /// Reads a double, widening from int and long storage
    pub fn get_double(&self, slot: usize) -> Result<f64> {
        match self {
            TypedArray::Double(values) => {
                values.get(slot).copied().ok_or_else(|| self.out_of_bounds(slot))
            }
            TypedArray::Int(values) => values
                .get(slot)
                .map(|&v| v as f64)
                .ok_or_else(|| self.out_of_bounds(slot)),
            TypedArray::Long(values) => values
                .get(slot)
                .map(|&v| v as f64)
                .ok_or_else(|| self.out_of_bounds(slot)),
            _ => Err(self.mismatch("double")),
        }
    }

    /// Reads any slot as a dynamic [`Value`]
    pub fn get_value(&self, slot: usize) -> Result<Value> {
        if slot >= self.len() {
            return Err(self.out_of_bounds(slot));
        }
        Ok(match self {
            TypedArray::Boolean(values) => Value::Bool(values[slot]),
            TypedArray::Int(values) => Value::Int(values[slot]),
            TypedArray::Long(values) => Value::Long(values[slot]),
            TypedArray::Double(values) => Value::Double(values[slot]),
            TypedArray::Str(values) => match &values[slot] {
                Some(s) => Value::Str(s.clone()),
                None => Value::Null,
            },
            TypedArray::Object(values) => values[slot].clone(),
        })
    }

    pub fn get_str(&self, slot: usize) -> Result<Option<&str>> {
        match self {
            TypedArray::Str(values) => values
                .get(slot)
                .map(|v| v.as_deref())
                .ok_or_else(|| self.out_of_bounds(slot)),
            _ => Err(self.mismatch("string")),
        }
    }

    pub fn set_bool(&mut self, slot: usize, value: bool) -> Result<()> {
        let err = self.out_of_bounds(slot);
        match self {
            TypedArray::Boolean(values) => {
                *values.get_mut(slot).ok_or(err)? = value;
                Ok(())
            }
            _ => Err(self.mismatch("boolean")),
        }
    }

    pub fn set_int(&mut self, slot: usize, value: i32) -> Result<()> {
        let err = self.out_of_bounds(slot);
        match self {
            TypedArray::Int(values) => *values.get_mut(slot).ok_or(err)? = value,
            TypedArray::Long(values) => *values.get_mut(slot).ok_or(err)? = value as i64,
            TypedArray::Double(values) => *values.get_mut(slot).ok_or(err)? = value as f64,
            _ => return Err(self.mismatch("int")),
        }
        Ok(())
    }

    pub fn set_long(&mut self, slot: usize, value: i64) -> Result<()> {
        let err = self.out_of_bounds(slot);
        match self {
            TypedArray::Long(values) => *values.get_mut(slot).ok_or(err)? = value,
            TypedArray::Double(values) => *values.get_mut(slot).ok_or(err)? = value as f64,
            _ => return Err(self.mismatch("long")),
        }
        Ok(())
    }

    pub fn set_double(&mut self, slot: usize, value: f64) -> Result<()> {
        let err = self.out_of_bounds(slot);
        match self {
            TypedArray::Double(values) => {
                *values.get_mut(slot).ok_or(err)? = value;
                Ok(())
            }
            _ => Err(self.mismatch("double")),
        }
    }

    /// Stores a dynamic value, converting it to the array's element type.
    pub fn set_value(&mut self, slot: usize, value: Value) -> Result<()> {
        if let TypedArray::Object(values) = self {
            let len = values.len();
            let cell = values
                .get_mut(slot)
                .ok_or(FrameError::OutOfBounds { slot, len })?;
            *cell = value;
            return Ok(());
        }
        if let TypedArray::Str(values) = self {
            let len = values.len();
            let text = match value {
                Value::Str(s) => Some(s),
                Value::Null => None,
                other => {
                    return Err(FrameError::TypeMismatch {
                        requested: other.type_name(),
                        actual: "string",
                    });
                }
            };
            let cell = values
                .get_mut(slot)
                .ok_or(FrameError::OutOfBounds { slot, len })?;
            *cell = text;
            return Ok(());
        }
        match value {
            Value::Bool(v) => self.set_bool(slot, v),
            Value::Int(v) => self.set_int(slot, v),
            Value::Long(v) => self.set_long(slot, v),
            Value::Double(v) => self.set_double(slot, v),
            Value::Null if matches!(self, TypedArray::Double(_)) => {
                self.set_double(slot, f64::NAN)
            }
            other => Err(FrameError::TypeMismatch {
                requested: other.type_name(),
                actual: self.array_type().name(),
            }),
        }
    }
}

impl From<Vec<bool>> for TypedArray {
    fn from(values: Vec<bool>) -> Self {
        TypedArray::Boolean(values)
    }
}

impl From<Vec<i32>> for TypedArray {
    fn from(values: Vec<i32>) -> Self {
        TypedArray::Int(values)
    }
}

impl From<Vec<i64>> for TypedArray {
    fn from(values: Vec<i64>) -> Self {
        TypedArray::Long(values)
    }
}

impl From<Vec<f64>> for TypedArray {
    fn from(values: Vec<f64>) -> Self {
        TypedArray::Double(values)
    }
}

impl From<Vec<Option<String>>> for TypedArray {
    fn from(values: Vec<Option<String>>) -> Self {
        TypedArray::Str(values)
    }
}

impl From<Vec<Value>> for TypedArray {
    fn from(values: Vec<Value>) -> Self {
        TypedArray::Object(values)
    }
}
