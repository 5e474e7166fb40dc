//! Key index: a bidirectional mapping between a key, the dense *physical*
//! slot it was assigned on insertion, and its current *ordinal* (view
//! position).
//!
//! Physical slots never change once assigned. Sorting only rewrites the
//! ordinal ↔ physical permutation (`indexes` / `ordinals`), and filtering
//! builds a new index that shares the root's key storage and addresses the
//! root's physical-slot space directly, so filter chains never nest.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::frame::key::IndexKey;
use crate::frame::{FrameError, Result};
use crate::helpers::parallel::split_join;
use crate::helpers::sort::{SortTarget, par_sort, sort};

/// Marks a physical slot that is not part of a filtered view
pub const ABSENT: usize = usize::MAX;

/// Compares two *physical slots*
pub type SlotComparator<'a> = dyn Fn(usize, usize) -> Ordering + Sync + 'a;

#[derive(Debug, Clone)]
struct KeyStore<K: IndexKey> {
    /// Keys in physical-slot order
    keys: Vec<K>,
    slots: FxHashMap<K::Code, usize>,
}

impl<K: IndexKey> KeyStore<K> {
    fn with_capacity(capacity: usize) -> Self {
        KeyStore {
            keys: Vec::with_capacity(capacity),
            slots: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    fn slot(&self, key: &K) -> Option<usize> {
        self.slots.get(&*key.code_ref()).copied()
    }

    fn push(&mut self, key: K) -> usize {
        let slot = self.keys.len();
        self.slots.insert(key.code(), slot);
        self.keys.push(key);
        slot
    }
}

#[derive(Debug, Clone)]
pub struct Index<K: IndexKey> {
    store: Arc<KeyStore<K>>,
    /// ordinal -> physical slot, `None` while the view is in physical order
    indexes: Option<Arc<Vec<usize>>>,
    /// physical slot -> ordinal (`ABSENT` for slots outside a filter)
    ordinals: Option<Arc<Vec<usize>>>,
    capacity: usize,
    filter: bool,
    read_only: bool,
}

/// Sort target for ascending/descending key order: swaps a scratch copy of
/// the key references together with the ordinal permutation.
struct KeyOrder<'a, K: IndexKey> {
    keys: Vec<&'a K>,
    indexes: &'a mut Vec<usize>,
    ascending: bool,
}

impl<K: IndexKey> SortTarget for KeyOrder<'_, K> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        let ord = self.keys[a].compare(self.keys[b]);
        if self.ascending { ord } else { ord.reverse() }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.keys.swap(a, b);
        self.indexes.swap(a, b);
    }
}

/// Sort target for comparator-driven order: only the permutation moves
struct SlotOrder<'a, 'c> {
    indexes: &'a mut Vec<usize>,
    comparator: &'a SlotComparator<'c>,
}

impl SortTarget for SlotOrder<'_, '_> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        (self.comparator)(self.indexes[a], self.indexes[b])
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.indexes.swap(a, b);
    }
}

impl<K: IndexKey> Index<K> {
    /// Builds an index over `keys` in insertion order.
    ///
    /// # Errors
    /// [`FrameError::DuplicateKey`] if a key repeats.
    pub fn new<I: IntoIterator<Item = K>>(keys: I) -> Result<Self> {
        let iter = keys.into_iter();
        let mut store = KeyStore::with_capacity(iter.size_hint().0);
        for key in iter {
            if store.slot(&key).is_some() {
                return Err(FrameError::DuplicateKey(format!("{key:?}")));
            }
            store.push(key);
        }
        let capacity = store.keys.len().max(1);
        Ok(Index {
            store: Arc::new(store),
            indexes: None,
            ordinals: None,
            capacity,
            filter: false,
            read_only: false,
        })
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Index {
            store: Arc::new(KeyStore::with_capacity(capacity)),
            indexes: None,
            ordinals: None,
            capacity: capacity.max(1),
            filter: false,
            read_only: false,
        }
    }

    fn filtered(store: Arc<KeyStore<K>>, indexes: Vec<usize>) -> Self {
        let capacity = store.keys.len().max(1);
        let mut index = Index {
            store,
            indexes: None,
            ordinals: None,
            capacity,
            filter: true,
            read_only: true,
        };
        index.set_order(indexes);
        index
    }

    /// Number of keys in this view
    pub fn len(&self) -> usize {
        match &self.indexes {
            Some(indexes) if self.filter => indexes.len(),
            _ => self.store.keys.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots reserved for this index; backing arrays are at least this long
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of the physical-slot space this index addresses (the root's)
    pub fn physical_len(&self) -> usize {
        self.store.keys.len()
    }

    pub fn is_filter(&self) -> bool {
        self.filter
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether ordinals differ from physical slots
    pub fn is_reordered(&self) -> bool {
        self.indexes.is_some()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.try_get_index_for_key(key).is_some()
    }

    pub fn try_get_index_for_key(&self, key: &K) -> Option<usize> {
        let slot = self.store.slot(key)?;
        match &self.ordinals {
            Some(ordinals) if self.filter => (ordinals[slot] != ABSENT).then_some(slot),
            _ => Some(slot),
        }
    }

    /// Physical slot of `key`.
    ///
    /// # Errors
    /// [`FrameError::KeyNotFound`] if the key is not in this view.
    pub fn get_index_for_key(&self, key: &K) -> Result<usize> {
        self.try_get_index_for_key(key)
            .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))
    }

    /// Ordinal of a physical slot, `None` if the slot is outside this view
    pub fn get_ordinal_for_index(&self, index: usize) -> Option<usize> {
        match &self.ordinals {
            None if index < self.store.keys.len() => Some(index),
            None => None,
            Some(ordinals) => ordinals.get(index).copied().filter(|&o| o != ABSENT),
        }
    }

    pub fn get_ordinal_for_key(&self, key: &K) -> Result<usize> {
        let index = self.get_index_for_key(key)?;
        self.get_ordinal_for_index(index)
            .ok_or_else(|| FrameError::KeyNotFound(format!("{key:?}")))
    }

    pub fn get_index_for_ordinal(&self, ordinal: usize) -> Result<usize> {
        let len = self.len();
        if ordinal >= len {
            return Err(FrameError::OutOfBounds { slot: ordinal, len });
        }
        Ok(match &self.indexes {
            Some(indexes) => indexes[ordinal],
            None => ordinal,
        })
    }

    /// Key at `ordinal`
    pub fn key(&self, ordinal: usize) -> Result<&K> {
        let index = self.get_index_for_ordinal(ordinal)?;
        Ok(&self.store.keys[index])
    }

    /// Keys in ordinal order
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        (0..self.len()).map(move |ordinal| {
            let index = match &self.indexes {
                Some(indexes) => indexes[ordinal],
                None => ordinal,
            };
            &self.store.keys[index]
        })
    }

    /// Physical slots in ordinal order
    pub fn physical_slots(&self) -> Vec<usize> {
        match &self.indexes {
            Some(indexes) => indexes.as_ref().clone(),
            None => (0..self.len()).collect(),
        }
    }

    fn ensure_mutable(&self, op: &'static str) -> Result<()> {
        if self.filter || self.read_only {
            return Err(FrameError::UnsupportedOnFilter(op));
        }
        Ok(())
    }

    fn grow_to(&mut self, required: usize) {
        if required <= self.capacity {
            return;
        }
        let grown = self.capacity + self.capacity / 2;
        let capacity = grown.max(required);
        tracing::debug!(from = self.capacity, to = capacity, "growing index capacity");
        self.capacity = capacity;
    }

    /// Appends `key` at the next physical slot.
    ///
    /// Returns `false` if the key is already present.
    ///
    /// # Errors
    /// [`FrameError::UnsupportedOnFilter`] on a filtered or read-only index.
    pub fn add(&mut self, key: K) -> Result<bool> {
        self.ensure_mutable("add")?;
        if self.store.slot(&key).is_some() {
            return Ok(false);
        }
        self.grow_to(self.store.keys.len() + 1);
        let slot = Arc::make_mut(&mut self.store).push(key);
        if let (Some(indexes), Some(ordinals)) = (&mut self.indexes, &mut self.ordinals) {
            let ordinal = indexes.len();
            Arc::make_mut(indexes).push(slot);
            Arc::make_mut(ordinals).push(ordinal);
        }
        Ok(true)
    }

    /// Appends every key, returning how many were added.
    ///
    /// Without `ignore_duplicates` the first key already present fails the
    /// call; keys appended before it stay appended.
    pub fn add_all<I: IntoIterator<Item = K>>(
        &mut self,
        keys: I,
        ignore_duplicates: bool,
    ) -> Result<usize> {
        self.ensure_mutable("add_all")?;
        let iter = keys.into_iter();
        self.grow_to(self.store.keys.len() + iter.size_hint().0);
        let mut count = 0;
        for key in iter {
            if self.store.slot(&key).is_some() {
                if ignore_duplicates {
                    continue;
                }
                return Err(FrameError::DuplicateKey(format!("{key:?}")));
            }
            self.add(key)?;
            count += 1;
        }
        Ok(count)
    }

    /// Swaps `existing` for `replacement`, keeping the physical slot.
    pub fn replace(&mut self, existing: &K, replacement: K) -> Result<usize> {
        self.ensure_mutable("replace")?;
        if self.store.slot(&replacement).is_some() {
            return Err(FrameError::ReplacementAlreadyExists(format!(
                "{replacement:?}"
            )));
        }
        let slot = self.get_index_for_key(existing)?;
        let store = Arc::make_mut(&mut self.store);
        store.slots.remove(&*existing.code_ref());
        store.slots.insert(replacement.code(), slot);
        store.keys[slot] = replacement;
        Ok(slot)
    }

    /// Derived read-only view over the given keys, in the given order.
    ///
    /// # Errors
    /// [`FrameError::KeyNotFound`] if a key is not in this index,
    /// [`FrameError::DuplicateKey`] if a key is selected twice.
    pub fn filter_keys<I>(&self, keys: I) -> Result<Index<K>>
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
    {
        let mut seen = vec![false; self.store.keys.len()];
        let mut indexes = Vec::new();
        for key in keys {
            let key = key.borrow();
            let slot = self.get_index_for_key(key)?;
            if std::mem::replace(&mut seen[slot], true) {
                return Err(FrameError::DuplicateKey(format!("{key:?}")));
            }
            indexes.push(slot);
        }
        tracing::trace!(selected = indexes.len(), of = self.len(), "filtering index by keys");
        Ok(Index::filtered(Arc::clone(&self.store), indexes))
    }

    /// Derived read-only view over the keys at the given ordinals, in that order
    pub fn filter_ordinals(&self, ordinals: &[usize]) -> Result<Index<K>> {
        let mut seen = vec![false; self.store.keys.len()];
        let mut indexes = Vec::with_capacity(ordinals.len());
        for &ordinal in ordinals {
            let slot = self.get_index_for_ordinal(ordinal)?;
            if std::mem::replace(&mut seen[slot], true) {
                return Err(FrameError::DuplicateKey(format!(
                    "{:?}",
                    self.store.keys[slot]
                )));
            }
            indexes.push(slot);
        }
        Ok(Index::filtered(Arc::clone(&self.store), indexes))
    }

    /// Derived read-only view over keys matching `predicate`, in ordinal order
    pub fn filter<P: Fn(&K) -> bool>(&self, predicate: P) -> Index<K> {
        let indexes = self.matching_slots(0..self.len(), &predicate);
        Index::filtered(Arc::clone(&self.store), indexes)
    }

    /// Like [`Index::filter`], evaluating the predicate with fork/join
    /// splitting over ordinal ranges of at most `threshold` keys.
    pub fn par_filter<P: Fn(&K) -> bool + Sync>(&self, predicate: P, threshold: usize) -> Index<K> {
        let indexes = split_join(
            0..self.len(),
            threshold,
            &|range: Range<usize>| self.matching_slots(range, &predicate),
            &|mut left: Vec<usize>, right: Vec<usize>| {
                left.extend(right);
                left
            },
        );
        Index::filtered(Arc::clone(&self.store), indexes)
    }

    fn matching_slots<P: Fn(&K) -> bool>(&self, ordinals: Range<usize>, predicate: &P) -> Vec<usize> {
        ordinals
            .map(|ordinal| match &self.indexes {
                Some(indexes) => indexes[ordinal],
                None => ordinal,
            })
            .filter(|&slot| predicate(&self.store.keys[slot]))
            .collect()
    }

    /// Reorders ordinals by key. Physical slots are untouched.
    pub fn sort(&mut self, parallel: bool, ascending: bool) {
        let mut indexes = self.physical_slots();
        let len = indexes.len();
        {
            let keys: Vec<&K> = indexes.iter().map(|&slot| &self.store.keys[slot]).collect();
            let mut target = KeyOrder {
                keys,
                indexes: &mut indexes,
                ascending,
            };
            if parallel {
                par_sort(&mut target, 0, len);
            } else {
                sort(&mut target, 0, len);
            }
        }
        self.set_order(indexes);
    }

    /// Reorders ordinals with a comparator over physical slots, or restores
    /// physical (insertion) order when `comparator` is `None`.
    pub fn sort_by(&mut self, parallel: bool, comparator: Option<&SlotComparator<'_>>) {
        let Some(comparator) = comparator else {
            self.reset_order();
            return;
        };
        let mut indexes = self.physical_slots();
        let len = indexes.len();
        {
            let mut target = SlotOrder {
                indexes: &mut indexes,
                comparator,
            };
            if parallel {
                par_sort(&mut target, 0, len);
            } else {
                sort(&mut target, 0, len);
            }
        }
        self.set_order(indexes);
    }

    /// Reorders ordinals with a comparator over keys
    pub fn sort_keys_by<F>(&mut self, parallel: bool, comparator: F)
    where
        F: Fn(&K, &K) -> Ordering + Sync,
    {
        let store = Arc::clone(&self.store);
        let by_slot = move |a: usize, b: usize| comparator(&store.keys[a], &store.keys[b]);
        let by_slot: &SlotComparator<'_> = &by_slot;
        self.sort_by(parallel, Some(by_slot));
    }

    fn reset_order(&mut self) {
        if self.filter {
            let mut indexes = self.physical_slots();
            indexes.sort_unstable();
            self.set_order(indexes);
        } else {
            self.indexes = None;
            self.ordinals = None;
        }
    }

    /// Installs `indexes` (ordinal -> slot) and rebuilds `ordinals` as its inverse
    fn set_order(&mut self, indexes: Vec<usize>) {
        let mut ordinals = vec![ABSENT; self.store.keys.len()];
        for (ordinal, &slot) in indexes.iter().enumerate() {
            ordinals[slot] = ordinal;
        }
        self.indexes = Some(Arc::new(indexes));
        self.ordinals = Some(Arc::new(ordinals));
    }

    /// Independent deep clone
    pub fn copy(&self) -> Index<K> {
        Index {
            store: Arc::new(self.store.as_ref().clone()),
            indexes: self.indexes.as_ref().map(|v| Arc::new(v.as_ref().clone())),
            ordinals: self.ordinals.as_ref().map(|v| Arc::new(v.as_ref().clone())),
            capacity: self.capacity,
            filter: self.filter,
            read_only: self.read_only,
        }
    }

    /// Shares storage with `self` but rejects every mutator
    pub fn read_only(&self) -> Index<K> {
        Index {
            read_only: true,
            ..self.clone()
        }
    }

    /// Fresh, unfiltered index over this view's keys in ordinal order
    pub fn compact(&self) -> Index<K> {
        let mut store = KeyStore::with_capacity(self.len());
        for key in self.keys() {
            store.push(key.clone());
        }
        let capacity = store.keys.len().max(1);
        Index {
            store: Arc::new(store),
            indexes: None,
            ordinals: None,
            capacity,
            filter: false,
            read_only: false,
        }
    }
}
