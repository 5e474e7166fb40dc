use time::{Date, PrimitiveDateTime};

use crate::frame::config::FrameConfig;
use crate::frame::index::Index;
use crate::frame::key::{IndexKey, KeyType};
use crate::frame::{FrameError, Result, Value};

/// Builds indexes. Static key types dispatch through [`IndexKey`]'s codec;
/// key types only known at runtime go through [`DynIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexFactory {
    config: FrameConfig,
}

/// An index whose key type is chosen at runtime
#[derive(Debug, Clone)]
pub enum DynIndex {
    Int(Index<i32>),
    Long(Index<i64>),
    Double(Index<f64>),
    Str(Index<String>),
    Date(Index<Date>),
    DateTime(Index<PrimitiveDateTime>),
    Object(Index<Value>),
}

macro_rules! dispatch {
    ($self:expr, $index:ident => $body:expr) => {
        match $self {
            DynIndex::Int($index) => $body,
            DynIndex::Long($index) => $body,
            DynIndex::Double($index) => $body,
            DynIndex::Str($index) => $body,
            DynIndex::Date($index) => $body,
            DynIndex::DateTime($index) => $body,
            DynIndex::Object($index) => $body,
        }
    };
}

fn convert<K: IndexKey>(value: &Value) -> Result<K> {
    K::from_value(value).ok_or_else(|| FrameError::TypeMismatch {
        requested: K::KEY_TYPE.name(),
        actual: value.type_name(),
    })
}

fn convert_all<K: IndexKey>(values: &[Value]) -> Result<Vec<K>> {
    values.iter().map(convert::<K>).collect()
}

impl IndexFactory {
    pub fn new(config: FrameConfig) -> Self {
        IndexFactory { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Index over `keys` in insertion order
    pub fn create<K: IndexKey, I: IntoIterator<Item = K>>(&self, keys: I) -> Result<Index<K>> {
        Index::new(keys)
    }

    /// Empty index sized by the configured initial capacity
    pub fn empty<K: IndexKey>(&self) -> Index<K> {
        Index::with_capacity(self.config.initial_capacity)
    }

    pub fn with_capacity<K: IndexKey>(&self, capacity: usize) -> Index<K> {
        Index::with_capacity(capacity)
    }

    /// Index over the integers `start..end`; empty when `end <= start`
    pub fn range(&self, start: i32, end: i32) -> Result<Index<i32>> {
        Index::new(start..end)
    }

    /// Runtime-typed index; every value must convert to `key_type`.
    pub fn create_dynamic(&self, key_type: KeyType, values: &[Value]) -> Result<DynIndex> {
        Ok(match key_type {
            KeyType::Int => DynIndex::Int(Index::new(convert_all(values)?)?),
            KeyType::Long => DynIndex::Long(Index::new(convert_all(values)?)?),
            KeyType::Double => DynIndex::Double(Index::new(convert_all(values)?)?),
            KeyType::Str => DynIndex::Str(Index::new(convert_all(values)?)?),
            KeyType::Date => DynIndex::Date(Index::new(convert_all(values)?)?),
            KeyType::DateTime => DynIndex::DateTime(Index::new(convert_all(values)?)?),
            KeyType::Object => DynIndex::Object(Index::new(values.to_vec())?),
        })
    }

    pub fn empty_dynamic(&self, key_type: KeyType) -> DynIndex {
        let capacity = self.config.initial_capacity;
        match key_type {
            KeyType::Int => DynIndex::Int(Index::with_capacity(capacity)),
            KeyType::Long => DynIndex::Long(Index::with_capacity(capacity)),
            KeyType::Double => DynIndex::Double(Index::with_capacity(capacity)),
            KeyType::Str => DynIndex::Str(Index::with_capacity(capacity)),
            KeyType::Date => DynIndex::Date(Index::with_capacity(capacity)),
            KeyType::DateTime => DynIndex::DateTime(Index::with_capacity(capacity)),
            KeyType::Object => DynIndex::Object(Index::with_capacity(capacity)),
        }
    }
}

impl DynIndex {
    pub fn key_type(&self) -> KeyType {
        match self {
            DynIndex::Int(_) => KeyType::Int,
            DynIndex::Long(_) => KeyType::Long,
            DynIndex::Double(_) => KeyType::Double,
            DynIndex::Str(_) => KeyType::Str,
            DynIndex::Date(_) => KeyType::Date,
            DynIndex::DateTime(_) => KeyType::DateTime,
            DynIndex::Object(_) => KeyType::Object,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_filter(&self) -> bool {
        dispatch!(self, index => index.is_filter())
    }

    /// `false` for values that do not convert to the key type
    pub fn contains(&self, key: &Value) -> bool {
        dispatch!(self, index => convert(key).is_ok_and(|k| index.contains(&k)))
    }

    pub fn get_index_for_key(&self, key: &Value) -> Result<usize> {
        dispatch!(self, index => index.get_index_for_key(&convert(key)?))
    }

    pub fn get_ordinal_for_key(&self, key: &Value) -> Result<usize> {
        dispatch!(self, index => index.get_ordinal_for_key(&convert(key)?))
    }

    pub fn key(&self, ordinal: usize) -> Result<Value> {
        dispatch!(self, index => index.key(ordinal).map(IndexKey::to_value))
    }

    pub fn keys(&self) -> Vec<Value> {
        dispatch!(self, index => index.keys().map(IndexKey::to_value).collect())
    }

    pub fn add(&mut self, key: &Value) -> Result<bool> {
        dispatch!(self, index => index.add(convert(key)?))
    }

    pub fn copy(&self) -> DynIndex {
        match self {
            DynIndex::Int(index) => DynIndex::Int(index.copy()),
            DynIndex::Long(index) => DynIndex::Long(index.copy()),
            DynIndex::Double(index) => DynIndex::Double(index.copy()),
            DynIndex::Str(index) => DynIndex::Str(index.copy()),
            DynIndex::Date(index) => DynIndex::Date(index.copy()),
            DynIndex::DateTime(index) => DynIndex::DateTime(index.copy()),
            DynIndex::Object(index) => DynIndex::Object(index.copy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_range_index() {
        let factory = IndexFactory::default();
        let index = factory.range(10, 15).unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(index.capacity(), 5);
        assert_eq!(index.get_index_for_key(&12).unwrap(), 2);
        assert!(factory.range(5, 1).unwrap().is_empty());
    }

    #[test]
    fn test_empty_uses_configured_capacity() {
        let factory = IndexFactory::new(FrameConfig::new().initial_capacity(64));
        let index: Index<String> = factory.empty();
        assert_eq!(index.capacity(), 64);
        assert!(index.is_empty());
    }

    #[test]
    fn test_dynamic_dispatch_by_key_type() {
        let factory = IndexFactory::default();
        let dates = [date!(2024 - 03 - 01), date!(2024 - 03 - 02)];
        let values: Vec<Value> = dates.iter().map(|d| Value::Date(*d)).collect();
        let mut index = factory.create_dynamic(KeyType::Date, &values).unwrap();
        assert_eq!(index.key_type(), KeyType::Date);
        assert_eq!(index.get_index_for_key(&values[1]).unwrap(), 1);
        assert!(!index.contains(&Value::Int(1)));
        assert!(index.add(&Value::Date(date!(2024 - 03 - 03))).unwrap());
        assert_eq!(index.len(), 3);
        assert_eq!(index.key(2).unwrap(), Value::Date(date!(2024 - 03 - 03)));
    }

    #[test]
    fn test_dynamic_type_mismatch() {
        let factory = IndexFactory::default();
        let err = factory
            .create_dynamic(KeyType::Int, &[Value::Str("x".into())])
            .unwrap_err();
        assert!(matches!(err, FrameError::TypeMismatch { .. }));
    }

    #[test]
    fn test_dynamic_object_keys_accept_mixed_values() {
        let factory = IndexFactory::default();
        let index = factory
            .create_dynamic(KeyType::Object, &[Value::Int(1), Value::Str("a".into())])
            .unwrap();
        assert_eq!(index.get_ordinal_for_key(&Value::Str("a".into())).unwrap(), 1);
        let copy = index.copy();
        assert_eq!(copy.keys(), index.keys());
    }
}
