//! Two-dimensional labeled storage.
//!
//! A [`Content`] pairs a row index and a column index with a list of typed
//! arrays. In a *column store* each array holds one column and is addressed by
//! row physical slot; in a *row store* each array holds one row. The axis that
//! selects an array is the *major* axis, the other one the *minor* axis.
//!
//! Arrays sit behind `Arc<RwLock<_>>` so that transposes and filtered views
//! share cells with their source: a write through any of them is visible to
//! all. Only [`Content::copy`] produces independent storage.

use std::fmt::Debug;
use std::ops::Range;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use crate::frame::array::{ArrayType, TypedArray};
use crate::frame::config::FrameConfig;
use crate::frame::cursor::{ColCursor, Cursor, RowCursor};
use crate::frame::index::{ABSENT, Index, SlotComparator};
use crate::frame::key::IndexKey;
use crate::frame::{FrameError, Result, Value};
use crate::helpers::parallel::split_join;

/// Shared handle to one backing array
pub type ArrayRef = Arc<RwLock<TypedArray>>;

pub(crate) fn read_array(array: &ArrayRef) -> RwLockReadGuard<'_, TypedArray> {
    array.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_array(array: &ArrayRef) -> RwLockWriteGuard<'_, TypedArray> {
    array.write().unwrap_or_else(PoisonError::into_inner)
}

/// Addresses one position along an axis, either by key or by ordinal
#[derive(Debug)]
pub enum Coord<'a, K> {
    Key(&'a K),
    Ordinal(usize),
}

impl<K> Clone for Coord<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Coord<'_, K> {}

impl<'a, K> From<&'a K> for Coord<'a, K> {
    fn from(key: &'a K) -> Self {
        Coord::Key(key)
    }
}

impl<K> From<usize> for Coord<'_, K> {
    fn from(ordinal: usize) -> Self {
        Coord::Ordinal(ordinal)
    }
}

impl<K: Debug> Coord<'_, K> {
    pub(crate) fn describe(&self) -> String {
        match self {
            Coord::Key(key) => format!("key {key:?}"),
            Coord::Ordinal(ordinal) => format!("ordinal {ordinal}"),
        }
    }
}

/// Where the array for a major physical slot lives in the data list
#[derive(Debug, Clone)]
enum MajorSlots {
    /// Data position equals the major physical slot
    Direct,
    /// Data position is `lookup[major physical slot]`; `ABSENT` outside the view
    Gathered(Arc<Vec<usize>>),
}

#[derive(Debug, Clone)]
pub struct Content<R: IndexKey, C: IndexKey> {
    row_keys: Index<R>,
    col_keys: Index<C>,
    column_store: bool,
    data: Arc<Vec<ArrayRef>>,
    major: MajorSlots,
    config: FrameConfig,
}

impl<R: IndexKey, C: IndexKey> Content<R, C> {
    /// Column-store content with one default-filled array of `array_type` per
    /// column. A filtered `col_keys` is compacted first.
    pub fn new(row_keys: Index<R>, col_keys: Index<C>, array_type: ArrayType) -> Self {
        let col_keys = owned_axis(col_keys);
        let types = vec![array_type; col_keys.physical_len()];
        Content::column_store(row_keys, col_keys, &types)
    }

    /// Column-store content with one column per entry of `types`, in column
    /// (ordinal) order. A filtered `col_keys` is compacted first.
    ///
    /// # Errors
    /// [`FrameError::Shape`] if `types` and `col_keys` differ in length.
    pub fn with_types(row_keys: Index<R>, col_keys: Index<C>, types: &[ArrayType]) -> Result<Self> {
        let col_keys = owned_axis(col_keys);
        if types.len() != col_keys.len() {
            return Err(FrameError::Shape(format!(
                "{} array types for {} columns",
                types.len(),
                col_keys.len()
            )));
        }
        let mut by_slot = vec![ArrayType::Double; col_keys.physical_len()];
        for (ordinal, &array_type) in types.iter().enumerate() {
            by_slot[col_keys.get_index_for_ordinal(ordinal)?] = array_type;
        }
        Ok(Content::column_store(row_keys, col_keys, &by_slot))
    }

    /// `types` is indexed by column physical slot
    fn column_store(row_keys: Index<R>, col_keys: Index<C>, types: &[ArrayType]) -> Self {
        let minor_len = row_keys.capacity().max(row_keys.physical_len());
        let data = types
            .iter()
            .map(|&t| Arc::new(RwLock::new(TypedArray::new(t, minor_len))))
            .collect();
        Content {
            row_keys,
            col_keys,
            column_store: true,
            data: Arc::new(data),
            major: MajorSlots::Direct,
            config: FrameConfig::default(),
        }
    }

    /// Column-store content built from whole columns
    pub fn from_columns<I>(row_keys: Index<R>, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, TypedArray)>,
    {
        let mut content = Content::new(row_keys, Index::with_capacity(1), ArrayType::Double);
        for (key, array) in columns {
            content.add_column(key, array)?;
        }
        Ok(content)
    }

    pub fn with_config(mut self, config: FrameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn row_keys(&self) -> &Index<R> {
        &self.row_keys
    }

    pub fn col_keys(&self) -> &Index<C> {
        &self.col_keys
    }

    pub fn row_count(&self) -> usize {
        self.row_keys.len()
    }

    pub fn col_count(&self) -> usize {
        self.col_keys.len()
    }

    pub fn is_column_store(&self) -> bool {
        self.column_store
    }

    pub(crate) fn row_slot(&self, row: Coord<'_, R>) -> Result<usize> {
        match row {
            Coord::Key(key) => self.row_keys.get_index_for_key(key),
            Coord::Ordinal(ordinal) => self.row_keys.get_index_for_ordinal(ordinal),
        }
    }

    pub(crate) fn col_slot(&self, col: Coord<'_, C>) -> Result<usize> {
        match col {
            Coord::Key(key) => self.col_keys.get_index_for_key(key),
            Coord::Ordinal(ordinal) => self.col_keys.get_index_for_ordinal(ordinal),
        }
    }

    /// Array holding the given major physical slot
    pub(crate) fn major_array(&self, major_slot: usize) -> Result<&ArrayRef> {
        let position = match &self.major {
            MajorSlots::Direct => major_slot,
            MajorSlots::Gathered(lookup) => lookup
                .get(major_slot)
                .copied()
                .filter(|&p| p != ABSENT)
                .ok_or(FrameError::OutOfBounds {
                    slot: major_slot,
                    len: lookup.len(),
                })?,
        };
        self.data.get(position).ok_or(FrameError::OutOfBounds {
            slot: position,
            len: self.data.len(),
        })
    }

    /// Backing array and slot of a physical (row, column) pair
    pub(crate) fn locate(&self, row_slot: usize, col_slot: usize) -> Result<(&ArrayRef, usize)> {
        if self.column_store {
            Ok((self.major_array(col_slot)?, row_slot))
        } else {
            Ok((self.major_array(row_slot)?, col_slot))
        }
    }

    fn resolve(&self, row: Coord<'_, R>, col: Coord<'_, C>) -> Result<(&ArrayRef, usize)> {
        let row_slot = self.row_slot(row)?;
        let col_slot = self.col_slot(col)?;
        self.locate(row_slot, col_slot)
    }

    fn read_cell<T, F>(&self, row: Coord<'_, R>, col: Coord<'_, C>, read: F) -> Result<T>
    where
        F: FnOnce(&TypedArray, usize) -> Result<T>,
    {
        let attempt = self
            .resolve(row, col)
            .and_then(|(array, slot)| read(&read_array(array), slot));
        attempt.map_err(|source| access_error(row, col, source))
    }

    fn write_cell<F>(&self, row: Coord<'_, R>, col: Coord<'_, C>, write: F) -> Result<()>
    where
        F: FnOnce(&mut TypedArray, usize) -> Result<()>,
    {
        let attempt = self
            .resolve(row, col)
            .and_then(|(array, slot)| write(&mut write_array(array), slot));
        attempt.map_err(|source| access_error(row, col, source))
    }

    pub fn get_bool<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<bool> {
        self.read_cell(row.into(), col.into(), |a, slot| a.get_bool(slot))
    }

    pub fn get_int<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<i32> {
        self.read_cell(row.into(), col.into(), |a, slot| a.get_int(slot))
    }

    pub fn get_long<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<i64> {
        self.read_cell(row.into(), col.into(), |a, slot| a.get_long(slot))
    }

    pub fn get_double<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<f64> {
        self.read_cell(row.into(), col.into(), |a, slot| a.get_double(slot))
    }

    pub fn get_value<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
    ) -> Result<Value> {
        self.read_cell(row.into(), col.into(), |a, slot| a.get_value(slot))
    }

    /// Element type of a column
    ///
    /// # Errors
    /// [`FrameError::OrientationMismatch`] on a row store, where each row
    /// array carries its own type.
    pub fn array_type<'c>(&self, col: impl Into<Coord<'c, C>>) -> Result<ArrayType> {
        self.require_column_store("column types are only defined on a column store")?;
        let slot = self.col_slot(col.into())?;
        Ok(read_array(self.major_array(slot)?).array_type())
    }

    // Writes go through the shared array lock, so views and transposes that
    // share storage observe them.

    pub fn set_bool<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
        value: bool,
    ) -> Result<()> {
        self.write_cell(row.into(), col.into(), |a, slot| a.set_bool(slot, value))
    }

    pub fn set_int<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
        value: i32,
    ) -> Result<()> {
        self.write_cell(row.into(), col.into(), |a, slot| a.set_int(slot, value))
    }

    pub fn set_long<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
        value: i64,
    ) -> Result<()> {
        self.write_cell(row.into(), col.into(), |a, slot| a.set_long(slot, value))
    }

    pub fn set_double<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
        value: f64,
    ) -> Result<()> {
        self.write_cell(row.into(), col.into(), |a, slot| a.set_double(slot, value))
    }

    pub fn set_value<'r, 'c>(
        &self,
        row: impl Into<Coord<'r, R>>,
        col: impl Into<Coord<'c, C>>,
        value: Value,
    ) -> Result<()> {
        self.write_cell(row.into(), col.into(), |a, slot| a.set_value(slot, value))
    }

    fn require_column_store(&self, message: &'static str) -> Result<()> {
        if self.column_store {
            Ok(())
        } else {
            Err(FrameError::OrientationMismatch(message))
        }
    }

    /// Grows every array to the row index capacity
    fn ensure_row_capacity(&self) {
        let capacity = self.row_keys.capacity();
        let mut grown = 0;
        for array in self.data.iter() {
            let mut array = write_array(array);
            if array.len() < capacity {
                array.expand(capacity);
                grown += 1;
            }
        }
        if grown > 0 {
            debug!(arrays = grown, capacity, "expanded column arrays");
        }
    }

    /// Appends a row. Returns `false` if the key already exists.
    ///
    /// # Errors
    /// [`FrameError::OrientationMismatch`] on a row store,
    /// [`FrameError::UnsupportedOnFilter`] when the row index is a filter.
    pub fn add_row(&mut self, key: R) -> Result<bool> {
        self.require_column_store("rows can only be added to a column store")?;
        let added = self.row_keys.add(key)?;
        if added {
            self.ensure_row_capacity();
        }
        Ok(added)
    }

    /// Appends every new key as a row, skipping keys already present.
    pub fn add_rows<I: IntoIterator<Item = R>>(&mut self, keys: I) -> Result<usize> {
        self.require_column_store("rows can only be added to a column store")?;
        let added = self.row_keys.add_all(keys, true)?;
        if added > 0 {
            self.ensure_row_capacity();
        }
        Ok(added)
    }

    /// Appends a column backed by `array`, padded to the row capacity.
    ///
    /// # Errors
    /// [`FrameError::DuplicateKey`] if the column exists,
    /// [`FrameError::OrientationMismatch`] on a row store,
    /// [`FrameError::UnsupportedOnFilter`] when the column index is a filter.
    pub fn add_column(&mut self, key: C, mut array: TypedArray) -> Result<()> {
        self.require_column_store("columns can only be added to a column store")?;
        if self.col_keys.contains(&key) {
            return Err(FrameError::DuplicateKey(format!("{key:?}")));
        }
        self.col_keys.add(key)?;
        array.expand(self.row_keys.capacity().max(self.row_keys.physical_len()));
        Arc::make_mut(&mut self.data).push(Arc::new(RwLock::new(array)));
        Ok(())
    }

    /// Appends a default-filled column of `array_type`
    pub fn add_column_of(&mut self, key: C, array_type: ArrayType) -> Result<()> {
        let len = self.row_keys.capacity().max(self.row_keys.physical_len());
        self.add_column(key, TypedArray::new(array_type, len))
    }

    /// Swaps the axes. The result shares every array with `self`.
    pub fn transpose(&self) -> Content<C, R> {
        trace!(
            rows = self.row_count(),
            cols = self.col_count(),
            "transposing content"
        );
        Content {
            row_keys: self.col_keys.clone(),
            col_keys: self.row_keys.clone(),
            column_store: !self.column_store,
            data: Arc::clone(&self.data),
            major: self.major.clone(),
            config: self.config,
        }
    }

    /// View restricted to `row_keys` and `col_keys`, which must be derived
    /// from this content's indexes. Cells stay shared with `self`.
    pub fn filter(&self, row_keys: Index<R>, col_keys: Index<C>) -> Result<Content<R, C>> {
        let (slots, filtered) = if self.column_store {
            (col_keys.physical_slots(), col_keys.is_filter())
        } else {
            (row_keys.physical_slots(), row_keys.is_filter())
        };
        let physical_len = if self.column_store {
            col_keys.physical_len()
        } else {
            row_keys.physical_len()
        };

        let (data, major) = if filtered {
            let mut lookup = vec![ABSENT; physical_len];
            let mut data = Vec::with_capacity(slots.len());
            for (position, &slot) in slots.iter().enumerate() {
                data.push(Arc::clone(self.major_array(slot)?));
                lookup[slot] = position;
            }
            (Arc::new(data), MajorSlots::Gathered(Arc::new(lookup)))
        } else {
            (Arc::clone(&self.data), self.major.clone())
        };
        trace!(
            rows = row_keys.len(),
            cols = col_keys.len(),
            arrays = data.len(),
            "filtering content"
        );
        Ok(Content {
            row_keys,
            col_keys,
            column_store: self.column_store,
            data,
            major,
            config: self.config,
        })
    }

    /// Deep copy with independent storage. Filtered axes are compacted: the
    /// copy's indexes are unfiltered and its arrays hold only the view's
    /// cells, in ordinal order.
    pub fn copy(&self) -> Result<Content<R, C>> {
        let (major_filtered, minor_filtered) = if self.column_store {
            (self.col_keys.is_filter(), self.row_keys.is_filter())
        } else {
            (self.row_keys.is_filter(), self.col_keys.is_filter())
        };
        let (major_slots, minor_slots, minor_capacity) = if self.column_store {
            (
                self.axis_slots(&self.col_keys),
                minor_filtered.then(|| self.row_keys.physical_slots()),
                self.row_keys.len().max(1),
            )
        } else {
            (
                self.axis_slots(&self.row_keys),
                minor_filtered.then(|| self.col_keys.physical_slots()),
                self.col_keys.len().max(1),
            )
        };

        let mut data = Vec::with_capacity(major_slots.len());
        for slot in major_slots {
            let source = read_array(self.major_array(slot)?);
            let array = match &minor_slots {
                Some(gather) => {
                    let mut array = source.gather(gather)?;
                    array.expand(minor_capacity);
                    array
                }
                None => source.copy(),
            };
            data.push(Arc::new(RwLock::new(array)));
        }
        debug!(
            rows = self.row_count(),
            cols = self.col_count(),
            major_filtered,
            minor_filtered,
            "copied content"
        );

        let row_filtered = self.row_keys.is_filter();
        let col_filtered = self.col_keys.is_filter();
        Ok(Content {
            row_keys: if row_filtered {
                self.row_keys.compact()
            } else {
                self.row_keys.copy()
            },
            col_keys: if col_filtered {
                self.col_keys.compact()
            } else {
                self.col_keys.copy()
            },
            column_store: self.column_store,
            data: Arc::new(data),
            major: MajorSlots::Direct,
            config: self.config,
        })
    }

    /// Major physical slots in the order the copy stores them: ordinal order
    /// for a filter, physical order otherwise.
    fn axis_slots<K: IndexKey>(&self, index: &Index<K>) -> Vec<usize> {
        if index.is_filter() {
            index.physical_slots()
        } else {
            (0..index.physical_len()).collect()
        }
    }

    pub fn sort_rows(&mut self, parallel: bool, ascending: bool) {
        self.row_keys.sort(parallel, ascending);
    }

    /// Reorders rows with a comparator over row physical slots; `None`
    /// restores insertion order.
    pub fn sort_rows_by(&mut self, parallel: bool, comparator: Option<&SlotComparator<'_>>) {
        self.row_keys.sort_by(parallel, comparator);
    }

    /// Reorders rows by the values of one column
    pub fn sort_rows_by_column(&mut self, parallel: bool, col: &C, ascending: bool) -> Result<()> {
        self.require_column_store("sorting rows by column requires a column store")?;
        let col_slot = self.col_keys.get_index_for_key(col)?;
        let array = Arc::clone(self.major_array(col_slot)?);
        let values = read_array(&array);
        let by_value = |a: usize, b: usize| {
            let ord = values.compare_slots(a, b);
            if ascending { ord } else { ord.reverse() }
        };
        self.row_keys.sort_by(parallel, Some(&by_value as &SlotComparator));
        Ok(())
    }

    pub fn sort_cols(&mut self, parallel: bool, ascending: bool) {
        self.col_keys.sort(parallel, ascending);
    }

    pub fn sort_cols_by(&mut self, parallel: bool, comparator: Option<&SlotComparator<'_>>) {
        self.col_keys.sort_by(parallel, comparator);
    }

    /// Cell cursor; starts unpositioned
    pub fn cursor(&self) -> Cursor<'_, R, C> {
        Cursor::new(self)
    }

    pub fn row_cursor(&self) -> RowCursor<'_, R, C> {
        RowCursor::new(self)
    }

    pub fn col_cursor(&self) -> ColCursor<'_, R, C> {
        ColCursor::new(self)
    }

    fn partition_threshold(&self, parallel: bool) -> usize {
        if parallel {
            self.config.parallel_threshold
        } else {
            usize::MAX
        }
    }

    /// Replaces every cell of a double-typed table with `f(cursor)`, visiting
    /// rows in ordinal order. With `parallel` the rows are split into
    /// fork/join partitions, each driving its own cursor.
    pub fn apply_doubles<F>(&self, parallel: bool, f: F) -> Result<()>
    where
        F: Fn(&Cursor<'_, R, C>) -> f64 + Sync,
    {
        let cols = self.col_count();
        let leaf = |rows: Range<usize>| -> Result<()> {
            let mut cursor = self.cursor();
            for row in rows {
                cursor.move_to_row(row)?;
                for col in 0..cols {
                    cursor.move_to_col(col)?;
                    let value = f(&cursor);
                    cursor.set_double(value)?;
                }
            }
            Ok(())
        };
        split_join(
            0..self.row_count(),
            self.partition_threshold(parallel),
            &leaf,
            &|left: Result<()>, right: Result<()>| left.and(right),
        )
    }

    /// View over the rows for which `predicate` holds, in ordinal order
    pub fn select_rows<P>(&self, parallel: bool, predicate: P) -> Result<Content<R, C>>
    where
        P: Fn(&RowCursor<'_, R, C>) -> bool + Sync,
    {
        let leaf = |rows: Range<usize>| -> Result<Vec<usize>> {
            let mut cursor = self.row_cursor();
            let mut selected = Vec::new();
            for row in rows {
                cursor.move_to(row)?;
                if predicate(&cursor) {
                    selected.push(row);
                }
            }
            Ok(selected)
        };
        let ordinals = split_join(
            0..self.row_count(),
            self.partition_threshold(parallel),
            &leaf,
            &|left: Result<Vec<usize>>, right: Result<Vec<usize>>| {
                let mut left = left?;
                left.extend(right?);
                Ok(left)
            },
        )?;
        let rows = self.row_keys.filter_ordinals(&ordinals)?;
        self.filter(rows, self.col_keys.clone())
    }
}

/// Unfiltered index over `keys`, compacting a filtered view
fn owned_axis<K: IndexKey>(keys: Index<K>) -> Index<K> {
    if keys.is_filter() {
        keys.compact()
    } else {
        keys
    }
}

fn access_error<R: Debug, C: Debug>(
    row: Coord<'_, R>,
    col: Coord<'_, C>,
    source: FrameError,
) -> FrameError {
    FrameError::Access {
        row: row.describe(),
        col: col.describe(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Content<String, String> {
        let rows = Index::new(["a", "b", "c"].map(String::from)).unwrap();
        Content::from_columns(
            rows,
            vec![
                ("x".to_string(), TypedArray::from(vec![1.0, 2.0, 3.0])),
                ("y".to_string(), TypedArray::from(vec![10i64, 20, 30])),
            ],
        )
        .unwrap()
    }

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_get_by_key_and_ordinal() {
        let content = table();
        assert_eq!(content.get_double(&key("b"), &key("x")).unwrap(), 2.0);
        assert_eq!(content.get_long(2, 1).unwrap(), 30);
        assert_eq!(content.get_double(0, &key("y")).unwrap(), 10.0);
        assert_eq!(content.array_type(1).unwrap(), ArrayType::Long);
        assert!(content.transpose().array_type(0).is_err());
    }

    #[test]
    fn test_access_errors_name_coordinates() {
        let content = table();
        let err = content.get_double(&key("zz"), &key("x")).unwrap_err();
        match err {
            FrameError::Access { row, source, .. } => {
                assert!(row.contains("zz"));
                assert!(matches!(*source, FrameError::KeyNotFound(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let err = content.get_bool(0, 0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Access { source, .. } if matches!(*source, FrameError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_sorted_rows_read_through_physical_slots() {
        let rows = Index::new(vec![5, 3, 9, 1]).unwrap();
        let cols = Index::new(vec!["v".to_string()]).unwrap();
        let mut content = Content::new(rows, cols, ArrayType::Double);
        for (k, v) in [(5, 0.5), (3, 0.3), (9, 0.9), (1, 0.1)] {
            content.set_double(&k, 0, v).unwrap();
        }
        content.sort_rows(false, true);
        let ordered: Vec<f64> = (0..4).map(|o| content.get_double(o, 0).unwrap()).collect();
        assert_eq!(ordered, vec![0.1, 0.3, 0.5, 0.9]);
        assert_eq!(content.get_double(&9, 0).unwrap(), 0.9);
    }

    #[test]
    fn test_filter_shares_cells() {
        let content = table();
        let rows = content.row_keys().filter_keys([key("c"), key("a")]).unwrap();
        let cols = content.col_keys().filter_keys([key("y")]).unwrap();
        let view = content.filter(rows, cols).unwrap();
        assert_eq!(view.row_count(), 2);
        assert_eq!(view.col_count(), 1);
        assert_eq!(view.get_long(0, 0).unwrap(), 30);

        view.set_long(&key("a"), &key("y"), 99).unwrap();
        assert_eq!(content.get_long(&key("a"), &key("y")).unwrap(), 99);
        assert!(view.get_double(&key("a"), &key("x")).is_err());
    }

    #[test]
    fn test_copy_compacts_filtered_axes() {
        let content = table();
        let rows = content.row_keys().filter_keys([key("c"), key("b")]).unwrap();
        let cols = content.col_keys().filter_keys([key("y")]).unwrap();
        let view = content.filter(rows, cols).unwrap();
        let copy = view.copy().unwrap();

        assert!(!copy.row_keys().is_filter());
        assert!(!copy.col_keys().is_filter());
        assert_eq!(copy.row_keys().get_index_for_key(&key("c")).unwrap(), 0);
        assert_eq!(copy.get_long(&key("b"), &key("y")).unwrap(), 20);

        copy.set_long(&key("c"), &key("y"), -1).unwrap();
        assert_eq!(content.get_long(&key("c"), &key("y")).unwrap(), 30);
    }

    #[test]
    fn test_copy_unfiltered_keeps_order_and_isolates() {
        let mut content = table();
        content.sort_rows(false, false);
        let mut copy = content.copy().unwrap();
        assert_eq!(copy.get_double(0, 0).unwrap(), 3.0);
        copy.add_row(key("d")).unwrap();
        copy.set_double(&key("d"), &key("x"), 4.0).unwrap();
        assert!(!content.row_keys().contains(&key("d")));
        copy.set_double(&key("a"), &key("x"), 100.0).unwrap();
        assert_eq!(content.get_double(&key("a"), &key("x")).unwrap(), 1.0);
    }

    #[test]
    fn test_transpose_shares_storage() {
        let content = table();
        let transposed = content.transpose();
        assert!(!transposed.is_column_store());
        assert_eq!(transposed.row_count(), 2);
        assert_eq!(transposed.get_long(&key("y"), &key("b")).unwrap(), 20);

        transposed.set_double(&key("x"), &key("c"), 7.5).unwrap();
        assert_eq!(content.get_double(&key("c"), &key("x")).unwrap(), 7.5);

        let back = transposed.transpose();
        assert!(back.is_column_store());
        assert_eq!(back.get_double(&key("c"), &key("x")).unwrap(), 7.5);
    }

    #[test]
    fn test_write_then_read_through_transpose() {
        let rows = Index::new(["r0", "r1", "r2"].map(String::from)).unwrap();
        let cols = Index::new(["A", "B"].map(String::from)).unwrap();
        let content = Content::new(rows, cols, ArrayType::Double);
        content.set_double(1, &key("B"), 42.0).unwrap();
        let transposed = content.transpose();
        assert_eq!(transposed.get_double(&key("B"), 1).unwrap(), 42.0);
    }

    #[test]
    fn test_growth_keeps_written_cells() {
        let mut rows = Index::with_capacity(4);
        rows.add_all(0..4, false).unwrap();
        let cols = Index::new(["a", "b"].map(String::from)).unwrap();
        let mut content = Content::new(rows, cols, ArrayType::Long);
        for row in 0..4 {
            content.set_long(&row, 0, row as i64 * 100).unwrap();
            content.set_long(&row, 1, -(row as i64)).unwrap();
        }

        assert_eq!(content.add_rows(4..7).unwrap(), 3);
        assert!(content.row_keys().capacity() >= 7);
        for row in 0..4 {
            assert_eq!(content.get_long(&row, 0).unwrap(), row as i64 * 100);
            assert_eq!(content.get_long(&row, 1).unwrap(), -(row as i64));
        }
        assert_eq!(content.get_long(&6, &key("b")).unwrap(), 0);
    }

    #[test]
    fn test_row_store_rejects_add_row() {
        let content = table();
        let mut transposed = content.transpose();
        assert!(matches!(
            transposed.add_row(key("z")),
            Err(FrameError::OrientationMismatch(_))
        ));
        assert!(matches!(
            transposed.add_column(key("z"), TypedArray::from(vec![1i32])),
            Err(FrameError::OrientationMismatch(_))
        ));
    }

    #[test]
    fn test_add_rows_expands_arrays() {
        let mut content = table();
        let added = content.add_rows((0..20).map(|i| format!("r{i}"))).unwrap();
        assert_eq!(added, 20);
        assert_eq!(content.row_count(), 23);
        assert!(content.get_double(&key("r19"), &key("x")).unwrap().is_nan());
        content.set_long(&key("r19"), &key("y"), 5).unwrap();
        assert_eq!(content.add_rows(vec![key("a")]).unwrap(), 0);
    }

    #[test]
    fn test_add_column_duplicate_and_filter() {
        let mut content = table();
        assert!(matches!(
            content.add_column_of(key("x"), ArrayType::Int),
            Err(FrameError::DuplicateKey(_))
        ));
        content.add_column_of(key("z"), ArrayType::Str).unwrap();
        assert_eq!(content.get_value(2, &key("z")).unwrap(), Value::Null);

        let rows = content.row_keys().filter_keys([key("a")]).unwrap();
        let mut view = content.filter(rows, content.col_keys().clone()).unwrap();
        assert!(matches!(
            view.add_row(key("q")),
            Err(FrameError::UnsupportedOnFilter(_))
        ));
    }

    #[test]
    fn test_sort_rows_by_column_descending() {
        let mut content = table();
        content.set_long(&key("a"), &key("y"), 50).unwrap();
        content.sort_rows_by_column(false, &key("y"), false).unwrap();
        let keys: Vec<&String> = content.row_keys().keys().collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
        content.sort_rows_by(false, None);
        assert_eq!(content.row_keys().key(0).unwrap(), "a");
        assert_eq!(content.row_keys().key(1).unwrap(), "b");
    }

    #[test]
    fn test_apply_doubles_parallel() {
        let rows = Index::new(0..1_000).unwrap();
        let cols = Index::new(0..3i64).unwrap();
        let content = Content::new(rows, cols, ArrayType::Double)
            .with_config(FrameConfig::new().parallel_threshold(64));
        content
            .apply_doubles(true, |cursor| {
                (*cursor.row_key().unwrap() as f64) * 10.0 + *cursor.col_key().unwrap() as f64
            })
            .unwrap();
        assert_eq!(content.get_double(&999, &2).unwrap(), 9_992.0);
        assert_eq!(content.get_double(&0, &1).unwrap(), 1.0);
    }

    #[test]
    fn test_select_rows_matches_sequential() {
        let rows = Index::new(0..500).unwrap();
        let content = Content::from_columns(
            rows,
            vec![("v".to_string(), TypedArray::from((0..500).collect::<Vec<i32>>()))],
        )
        .unwrap()
        .with_config(FrameConfig::new().parallel_threshold(32));
        let even = |row: &RowCursor<'_, i32, String>| row.get_int(0).is_ok_and(|v| v % 2 == 0);
        let parallel = content.select_rows(true, even).unwrap();
        let sequential = content.select_rows(false, even).unwrap();
        assert_eq!(parallel.row_count(), 250);
        assert_eq!(
            parallel.row_keys().keys().collect::<Vec<_>>(),
            sequential.row_keys().keys().collect::<Vec<_>>()
        );
        assert_eq!(parallel.get_int(10, 0).unwrap(), 20);
    }

    #[test]
    fn test_with_types_shape() {
        let rows = Index::new(0..2).unwrap();
        let cols = Index::new(vec![1i64, 2]).unwrap();
        assert!(matches!(
            Content::with_types(rows.clone(), cols.clone(), &[ArrayType::Int]),
            Err(FrameError::Shape(_))
        ));
        let content =
            Content::with_types(rows, cols, &[ArrayType::Int, ArrayType::Boolean]).unwrap();
        content.set_bool(1, &2, true).unwrap();
        assert!(content.get_bool(&1, 1).unwrap());
    }

    #[test]
    fn test_with_types_follows_column_ordinals() {
        let rows = Index::new(0..3).unwrap();
        let mut cols = Index::new(vec![2, 1]).unwrap();
        cols.sort(false, true);
        let content =
            Content::with_types(rows, cols, &[ArrayType::Int, ArrayType::Boolean]).unwrap();
        assert_eq!(content.array_type(0).unwrap(), ArrayType::Int);
        assert_eq!(content.array_type(&1).unwrap(), ArrayType::Int);
        assert_eq!(content.array_type(&2).unwrap(), ArrayType::Boolean);
        content.set_int(2, 0, 7).unwrap();
        content.set_bool(2, 1, true).unwrap();
        assert_eq!(content.get_int(2, &1).unwrap(), 7);
        assert!(content.get_bool(2, &2).unwrap());
    }

    #[test]
    fn test_constructors_compact_filtered_columns() {
        let rows = Index::new(0..2).unwrap();
        let cols = Index::new(vec![1i64, 2, 3]).unwrap();
        let picked = cols.filter_keys([3i64, 1]).unwrap();

        let mut content = Content::new(rows.clone(), picked.clone(), ArrayType::Long);
        assert!(!content.col_keys().is_filter());
        assert_eq!(content.col_keys().keys().copied().collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(content.col_keys().physical_len(), 2);
        content.add_column_of(4, ArrayType::Long).unwrap();
        assert_eq!(content.col_count(), 3);

        let typed =
            Content::with_types(rows, picked, &[ArrayType::Int, ArrayType::Boolean]).unwrap();
        assert!(!typed.col_keys().is_filter());
        assert_eq!(typed.array_type(&3).unwrap(), ArrayType::Int);
        assert_eq!(typed.array_type(&1).unwrap(), ArrayType::Boolean);
    }

    fn grid() -> Content<String, String> {
        let rows = Index::new(["a", "b", "c", "d"].map(String::from)).unwrap();
        Content::from_columns(
            rows,
            vec![
                (key("x"), TypedArray::from(vec![5.0, 6.0, 7.0, 8.0])),
                (key("y"), TypedArray::from(vec![50.0, 60.0, 70.0, 80.0])),
            ],
        )
        .unwrap()
    }

    fn column_values(content: &Content<String, String>, col: &str) -> Vec<f64> {
        (0..content.row_count())
            .map(|row| content.get_double(row, &key(col)).unwrap())
            .collect()
    }

    fn row_values(content: &Content<String, String>, row: &str) -> Vec<f64> {
        (0..content.col_count())
            .map(|col| content.get_double(&key(row), col).unwrap())
            .collect()
    }

    #[test]
    fn test_copy_with_filtered_rows_in_column_store() {
        let content = grid();
        let rows = content.row_keys().filter_keys([key("c"), key("a")]).unwrap();
        let view = content.filter(rows, content.col_keys().clone()).unwrap();
        let copy = view.copy().unwrap();

        assert!(copy.is_column_store());
        assert!(!copy.row_keys().is_filter());
        assert_eq!(column_values(&copy, "x"), vec![7.0, 5.0]);
        assert_eq!(column_values(&copy, "y"), vec![70.0, 50.0]);

        copy.set_double(&key("c"), &key("x"), -1.0).unwrap();
        assert_eq!(content.get_double(&key("c"), &key("x")).unwrap(), 7.0);
        assert_eq!(view.get_double(&key("c"), &key("x")).unwrap(), 7.0);
    }

    #[test]
    fn test_copy_with_filtered_columns_in_column_store() {
        let content = grid();
        let cols = content.col_keys().filter_keys([key("y")]).unwrap();
        let view = content.filter(content.row_keys().clone(), cols).unwrap();
        let copy = view.copy().unwrap();

        assert!(copy.is_column_store());
        assert_eq!(copy.col_count(), 1);
        assert_eq!(column_values(&copy, "y"), vec![50.0, 60.0, 70.0, 80.0]);
        assert!(copy.get_double(&key("a"), &key("x")).is_err());

        copy.set_double(&key("b"), &key("y"), -1.0).unwrap();
        assert_eq!(content.get_double(&key("b"), &key("y")).unwrap(), 60.0);
    }

    #[test]
    fn test_copy_with_filtered_columns_in_row_store() {
        let transposed = grid().transpose();
        let cols = transposed.col_keys().filter_keys([key("d"), key("b")]).unwrap();
        let view = transposed.filter(transposed.row_keys().clone(), cols).unwrap();
        let copy = view.copy().unwrap();

        assert!(!copy.is_column_store());
        assert!(!copy.col_keys().is_filter());
        assert_eq!(row_values(&copy, "x"), vec![8.0, 6.0]);
        assert_eq!(row_values(&copy, "y"), vec![80.0, 60.0]);

        copy.set_double(&key("x"), &key("d"), -1.0).unwrap();
        assert_eq!(transposed.get_double(&key("x"), &key("d")).unwrap(), 8.0);
    }

    #[test]
    fn test_copy_with_filtered_rows_in_row_store() {
        let mut transposed = grid().transpose();
        transposed.sort_cols(false, false);
        let rows = transposed.row_keys().filter_keys([key("x")]).unwrap();
        let view = transposed.filter(rows, transposed.col_keys().clone()).unwrap();
        let copy = view.copy().unwrap();

        assert!(!copy.is_column_store());
        assert_eq!(copy.row_count(), 1);
        assert_eq!(row_values(&copy, "x"), vec![8.0, 7.0, 6.0, 5.0]);
        assert!(copy.get_double(&key("y"), 0).is_err());

        copy.set_double(&key("x"), &key("a"), 0.0).unwrap();
        assert_eq!(transposed.get_double(&key("x"), &key("a")).unwrap(), 5.0);
    }
}
