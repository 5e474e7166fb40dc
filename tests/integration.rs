use std::collections::HashSet;
use std::sync::Once;

use labeled_frame::frame::serialize::{read_content, write_content};
use labeled_frame::{ArrayType, Content, FrameError, Index, SlotComparator, TypedArray, Value};
use proptest::prelude::*;
use tempfile::NamedTempFile;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

fn distinct_keys() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::hash_set(any::<i64>(), 0..200).prop_map(|set| set.into_iter().collect())
}

fn keys_and_subset() -> impl Strategy<Value = (Vec<i64>, Vec<i64>)> {
    distinct_keys().prop_flat_map(|keys| {
        let len = keys.len();
        (Just(keys.clone()), prop::sample::subsequence(keys, 0..=len))
    })
}

fn check_bijection(index: &Index<i64>) {
    for ordinal in 0..index.len() {
        let slot = index.get_index_for_ordinal(ordinal).unwrap();
        assert_eq!(index.get_ordinal_for_index(slot), Some(ordinal));
        let key = *index.key(ordinal).unwrap();
        assert_eq!(index.get_index_for_key(&key).unwrap(), slot);
        assert_eq!(index.get_ordinal_for_key(&key).unwrap(), ordinal);
    }
}

/// Physical slots follow insertion order no matter how the view is ordered
fn check_stable_slots(index: &Index<i64>, keys: &[i64]) {
    for (slot, key) in keys.iter().enumerate() {
        assert_eq!(index.get_index_for_key(key).unwrap(), slot);
    }
    check_bijection(index);
}

proptest! {
    #[test]
    fn lookups_round_trip(keys in distinct_keys()) {
        let index = Index::new(keys.clone()).unwrap();
        for (slot, key) in keys.iter().enumerate() {
            prop_assert_eq!(index.get_index_for_key(key).unwrap(), slot);
        }
        check_bijection(&index);
    }

    #[test]
    fn sort_keeps_physical_slots(keys in distinct_keys(), ascending in any::<bool>(), parallel in any::<bool>()) {
        let mut index = Index::new(keys.clone()).unwrap();
        index.sort(parallel, ascending);
        for (slot, key) in keys.iter().enumerate() {
            prop_assert_eq!(index.get_index_for_key(key).unwrap(), slot);
        }
        let sorted: Vec<i64> = index.keys().copied().collect();
        let mut expected = keys.clone();
        expected.sort();
        if !ascending {
            expected.reverse();
        }
        prop_assert_eq!(sorted, expected);
        check_bijection(&index);
    }

    #[test]
    fn filter_is_idempotent((keys, subset) in keys_and_subset()) {
        let index = Index::new(keys).unwrap();
        let once = index.filter_keys(&subset).unwrap();
        let twice = once.filter_keys(&subset).unwrap();
        prop_assert_eq!(once.keys().collect::<Vec<_>>(), twice.keys().collect::<Vec<_>>());
        for key in &subset {
            prop_assert_eq!(
                twice.get_index_for_key(key).unwrap(),
                index.get_index_for_key(key).unwrap()
            );
        }
    }

    #[test]
    fn predicate_filter_is_idempotent(
        (keys, subset) in keys_and_subset(),
        sorted in any::<bool>(),
        parallel in any::<bool>(),
    ) {
        let mut index = Index::new(keys).unwrap();
        if sorted {
            index.sort(parallel, false);
        }
        let wanted: HashSet<i64> = subset.iter().copied().collect();

        let once = index.filter(|k| wanted.contains(k));
        let twice = once.filter(|k| wanted.contains(k));
        prop_assert_eq!(once.len(), wanted.len());
        prop_assert_eq!(twice.len(), once.len());
        prop_assert_eq!(once.keys().collect::<Vec<_>>(), twice.keys().collect::<Vec<_>>());
        check_bijection(&twice);

        let by_keys = index.filter_keys(&subset).unwrap();
        let again = by_keys.filter(|k| wanted.contains(k));
        prop_assert_eq!(by_keys.keys().collect::<Vec<_>>(), again.keys().collect::<Vec<_>>());
        for key in &subset {
            prop_assert_eq!(
                again.get_index_for_key(key).unwrap(),
                index.get_index_for_key(key).unwrap()
            );
        }
    }

    #[test]
    fn comparator_sorts_and_reset_keep_slots(
        (keys, subset) in keys_and_subset(),
        parallel in any::<bool>(),
    ) {
        let mut index = Index::new(keys.clone()).unwrap();
        let newest_first = |a: usize, b: usize| b.cmp(&a);
        let newest_first: &SlotComparator<'_> = &newest_first;

        index.sort_by(parallel, Some(newest_first));
        prop_assert_eq!(
            index.keys().copied().collect::<Vec<_>>(),
            keys.iter().rev().copied().collect::<Vec<_>>()
        );
        check_stable_slots(&index, &keys);

        index.sort_keys_by(parallel, |a: &i64, b: &i64| a.cmp(b));
        let mut ascending = keys.clone();
        ascending.sort();
        prop_assert_eq!(index.keys().copied().collect::<Vec<_>>(), ascending);
        check_stable_slots(&index, &keys);

        index.sort_by(parallel, None);
        prop_assert!(!index.is_reordered());
        prop_assert_eq!(index.keys().copied().collect::<Vec<_>>(), keys.clone());
        check_stable_slots(&index, &keys);

        let mut filtered = index.filter_keys(&subset).unwrap();
        filtered.sort(parallel, false);
        let mut descending = subset.clone();
        descending.sort();
        descending.reverse();
        prop_assert_eq!(filtered.keys().copied().collect::<Vec<_>>(), descending);
        check_bijection(&filtered);

        filtered.sort_by(parallel, Some(newest_first));
        check_bijection(&filtered);
        filtered.sort_by(parallel, None);
        prop_assert_eq!(filtered.keys().copied().collect::<Vec<_>>(), subset.clone());
        check_bijection(&filtered);
        for key in &subset {
            prop_assert_eq!(
                filtered.get_index_for_key(key).unwrap(),
                index.get_index_for_key(key).unwrap()
            );
        }
    }

    #[test]
    fn filters_reject_mutation((keys, subset) in keys_and_subset(), extra in any::<i64>()) {
        let index = Index::new(keys).unwrap();
        let mut filtered = index.filter_keys(&subset).unwrap();
        prop_assert!(matches!(filtered.add(extra), Err(FrameError::UnsupportedOnFilter(_))));
        prop_assert!(matches!(
            filtered.add_all(vec![extra], true),
            Err(FrameError::UnsupportedOnFilter(_))
        ));
        prop_assert_eq!(filtered.len(), subset.len());
    }

    #[test]
    fn transpose_is_an_involution(values in prop::collection::vec(-1e6f64..1e6, 1..60)) {
        let rows = Index::new(0..values.len() as i32).unwrap();
        let content = Content::from_columns(
            rows,
            vec![("v".to_string(), TypedArray::from(values.clone()))],
        ).unwrap();
        let back = content.transpose().transpose();
        prop_assert_eq!(back.is_column_store(), content.is_column_store());
        for ordinal in 0..values.len() {
            prop_assert_eq!(back.get_double(ordinal, 0).unwrap(), values[ordinal]);
        }
    }
}

#[test]
fn scenario_sort_and_filter_share_slot_space() {
    init_tracing();
    let mut index = Index::new(vec![5, 3, 9, 1]).unwrap();
    index.sort(false, true);
    assert_eq!(index.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5, 9]);
    assert_eq!(index.get_index_for_key(&9).unwrap(), 2);

    let filtered = index.filter_keys([9, 3]).unwrap();
    assert_eq!(filtered.get_index_for_key(&9).unwrap(), 2);
    assert_eq!(filtered.get_ordinal_for_key(&3).unwrap(), 1);
    assert!(filtered.get_index_for_key(&5).is_err());
}

#[test]
fn copy_of_view_is_isolated() {
    init_tracing();
    let rows = Index::new(["a", "b", "c", "d"].map(String::from)).unwrap();
    let cols = Index::new(vec![2020, 2021, 2022]).unwrap();
    let content = Content::new(rows, cols, ArrayType::Long);
    for (r, key) in ["a", "b", "c", "d"].iter().enumerate() {
        for year in 2020..2023 {
            content
                .set_long(&key.to_string(), &year, r as i64 * 10_000 + year as i64)
                .unwrap();
        }
    }

    let rows = content.row_keys().filter_keys(["d", "b"].map(String::from)).unwrap();
    let cols = content.col_keys().filter(|y| *y >= 2021);
    let view = content.filter(rows, cols).unwrap();
    let copy = view.copy().unwrap();

    assert_eq!(copy.row_count(), 2);
    assert_eq!(copy.col_count(), 2);
    assert_eq!(copy.get_long(0, 0).unwrap(), 32_021);
    copy.set_long(0, 0, -1).unwrap();
    assert_eq!(view.get_long(0, 0).unwrap(), 32_021);
    assert_eq!(content.get_long(&"d".to_string(), &2021).unwrap(), 32_021);

    view.set_long(1, 1, 7).unwrap();
    assert_eq!(content.get_long(&"b".to_string(), &2022).unwrap(), 7);
    assert_eq!(copy.get_long(1, 1).unwrap(), 12_022);
}

#[test]
fn cursor_scan_matches_direct_access() {
    init_tracing();
    let rows = Index::new(0..100).unwrap();
    let content = Content::from_columns(
        rows,
        vec![
            (1i64, TypedArray::from((0..100).map(|v| v as f64).collect::<Vec<_>>())),
            (2i64, TypedArray::from((0..100).collect::<Vec<i32>>())),
        ],
    )
    .unwrap();

    let mut row = content.row_cursor();
    for ordinal in 0..content.row_count() {
        row.move_to(ordinal).unwrap();
        assert_eq!(row.get_double(&1).unwrap(), content.get_double(ordinal, &1).unwrap());
        assert_eq!(row.get_int(1).unwrap(), ordinal as i32);
    }
}

#[test]
fn persisted_table_round_trips_through_file() {
    init_tracing();
    let rows = Index::new(vec![Value::Int(1), Value::Str("two".into()), Value::Null]).unwrap();
    let mut content = Content::from_columns(
        rows,
        vec![
            ("flag".to_string(), TypedArray::from(vec![true, false, true])),
            ("score".to_string(), TypedArray::from(vec![0.5, 1.5, 2.5])),
        ],
    )
    .unwrap();
    content.sort_rows(false, false);

    let file = NamedTempFile::new().unwrap();
    content.save(file.path()).unwrap();
    let loaded = Content::<Value, String>::load(file.path()).unwrap();

    let expected: Vec<&Value> = content.row_keys().keys().collect();
    let actual: Vec<&Value> = loaded.row_keys().keys().collect();
    assert_eq!(actual, expected);
    for key in &expected {
        assert_eq!(
            loaded.get_double(*key, &"score".to_string()).unwrap(),
            content.get_double(*key, &"score".to_string()).unwrap()
        );
    }
    assert!(!loaded.row_keys().is_reordered());
}

#[test]
fn in_memory_encoding_rejects_wrong_key_types() {
    let rows = Index::new(vec![1i32, 2]).unwrap();
    let cols = Index::new(vec![1i32]).unwrap();
    let content = Content::new(rows, cols, ArrayType::Int);
    let mut bytes = Vec::new();
    write_content(&content, &mut bytes).unwrap();
    assert!(read_content::<i32, i32>(&bytes).is_ok());
    assert!(matches!(
        read_content::<i32, String>(&bytes),
        Err(FrameError::Format(_))
    ));
}

#[test]
fn parallel_and_sequential_selection_agree() {
    init_tracing();
    let rows = Index::new(0..5_000i64).unwrap();
    let content = Content::new(rows, Index::new(vec![0i64]).unwrap(), ArrayType::Long)
        .with_config(labeled_frame::FrameConfig::new().parallel_threshold(128));
    content
        .apply_doubles(false, |_| 0.0)
        .expect_err("long columns do not accept doubles");
    for key in 0..5_000i64 {
        content.set_long(&key, 0, key * key % 97).unwrap();
    }
    let pick = |row: &labeled_frame::RowCursor<'_, i64, i64>| row.get_long(0).is_ok_and(|v| v < 10);
    let parallel = content.select_rows(true, pick).unwrap();
    let sequential = content.select_rows(false, pick).unwrap();
    let a: HashSet<i64> = parallel.row_keys().keys().copied().collect();
    let b: HashSet<i64> = sequential.row_keys().keys().copied().collect();
    assert_eq!(a, b);
    assert_eq!(
        parallel.row_keys().keys().copied().collect::<Vec<_>>(),
        sequential.row_keys().keys().copied().collect::<Vec<_>>()
    );
}
