use std::ops::Range;

/// Fork/join over a contiguous range of ordinals.
///
/// The range is halved at its midpoint until a partition holds at most
/// `threshold` ordinals; each such partition runs `leaf` sequentially and the
/// partial results are folded pairwise with `combine`. A panic in any leaf
/// propagates through `rayon::join` and aborts the whole computation.
pub fn split_join<T, L, C>(range: Range<usize>, threshold: usize, leaf: &L, combine: &C) -> T
where
    T: Send,
    L: Fn(Range<usize>) -> T + Sync,
    C: Fn(T, T) -> T + Sync,
{
    let len = range.end.saturating_sub(range.start);
    if len <= threshold.max(1) {
        return leaf(range);
    }
    let mid = range.start + len / 2;
    let (left, right) = rayon::join(
        || split_join(range.start..mid, threshold, leaf, combine),
        || split_join(mid..range.end, threshold, leaf, combine),
    );
    combine(left, right)
}
