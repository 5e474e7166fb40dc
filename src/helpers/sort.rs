use std::cmp::Ordering;

use rayon::slice::ParallelSliceMut;

/// Anything that can be sorted by position: the sort core only ever compares
/// and swaps two positions, so the same algorithm reorders raw keys, an
/// index permutation, or both in lockstep.
pub trait SortTarget {
    fn compare(&self, a: usize, b: usize) -> Ordering;
    fn swap(&mut self, a: usize, b: usize);
}

const INSERTION_THRESHOLD: usize = 16;

/// Sorts positions `start..end` in place.
///
/// Adaptive: an already ordered range is detected in one pass and left
/// untouched. Otherwise runs a three-way quicksort (median-of-three pivot,
/// equal keys grouped) that falls back to insertion sort on short ranges.
pub fn sort<T: SortTarget + ?Sized>(target: &mut T, start: usize, end: usize) {
    if end <= start + 1 || is_sorted(target, start, end) {
        return;
    }
    quick_sort(target, start, end);
}

/// Parallel variant of [`sort`]: computes the target permutation with
/// rayon's parallel merge sort, then applies it through `swap`.
pub fn par_sort<T: SortTarget + Sync + ?Sized>(target: &mut T, start: usize, end: usize) {
    if end <= start + 1 || is_sorted(target, start, end) {
        return;
    }
    let mut order: Vec<usize> = (start..end).collect();
    {
        let view = &*target;
        order.par_sort_by(|&a, &b| view.compare(a, b));
    }
    apply_permutation(target, start, &order);
}

fn is_sorted<T: SortTarget + ?Sized>(target: &T, start: usize, end: usize) -> bool {
    (start + 1..end).all(|i| target.compare(i - 1, i) != Ordering::Greater)
}

fn insertion_sort<T: SortTarget + ?Sized>(target: &mut T, start: usize, end: usize) {
    for i in start + 1..end {
        let mut j = i;
        while j > start && target.compare(j - 1, j) == Ordering::Greater {
            target.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Orders positions `a`, `b`, `c` and moves the median to `a`.
fn median_to_front<T: SortTarget + ?Sized>(target: &mut T, a: usize, b: usize, c: usize) {
    if target.compare(b, a) == Ordering::Less {
        target.swap(a, b);
    }
    if target.compare(c, b) == Ordering::Less {
        target.swap(b, c);
        if target.compare(b, a) == Ordering::Less {
            target.swap(a, b);
        }
    }
    target.swap(a, b);
}

fn quick_sort<T: SortTarget + ?Sized>(target: &mut T, mut lo: usize, mut hi: usize) {
    while hi - lo > INSERTION_THRESHOLD {
        let mid = lo + (hi - lo) / 2;
        median_to_front(target, lo, mid, hi - 1);

        // [lo, lt) < pivot, [lt, i) == pivot, (gt, hi) > pivot; `lt` always
        // holds a pivot-equal element so it doubles as the pivot position.
        let mut lt = lo;
        let mut i = lo + 1;
        let mut gt = hi - 1;
        while i <= gt {
            match target.compare(i, lt) {
                Ordering::Less => {
                    target.swap(lt, i);
                    lt += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    target.swap(i, gt);
                    gt -= 1;
                }
                Ordering::Equal => i += 1,
            }
        }

        // Recurse into the smaller side, loop on the larger one
        if lt - lo < hi - (gt + 1) {
            quick_sort(target, lo, lt);
            lo = gt + 1;
        } else {
            quick_sort(target, gt + 1, hi);
            hi = lt;
        }
    }
    insertion_sort(target, lo, hi);
}

/// Rearranges `start..start + order.len()` so that position `start + k`
/// receives the element originally at `order[k]`, using only swaps.
fn apply_permutation<T: SortTarget + ?Sized>(target: &mut T, start: usize, order: &[usize]) {
    let n = order.len();
    // pos[original] = current position, at[current] = original
    let mut pos: Vec<usize> = (0..n).collect();
    let mut at: Vec<usize> = (0..n).collect();
    for k in 0..n {
        let want = order[k] - start;
        let cur = pos[want];
        if cur != k {
            target.swap(start + k, start + cur);
            let displaced = at[k];
            at[k] = want;
            at[cur] = displaced;
            pos[want] = k;
            pos[displaced] = cur;
        }
    }
}
