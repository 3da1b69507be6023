//! In-place k-d sort.
//!
//! The tree is implicit: the median of `[left, right]` sits at
//! `m = (left + right) >> 1`, split on the current axis, and both halves are
//! sorted recursively on the other axis. Ranges of at most `node_size + 1`
//! records are left unordered as leaf buckets.

use crate::arena::RecordArray;
use crate::select::select;

/// Default leaf-bucket threshold.
pub const DEFAULT_NODE_SIZE: usize = 64;

/// Axis split at the root of the tree.
pub const ROOT_AXIS: usize = 0;

/// Sort the whole array into k-d order.
pub fn kd_sort<A: RecordArray + ?Sized>(array: &mut A, node_size: usize) {
    let len = array.len();
    if len == 0 {
        return;
    }
    kd_sort_range(array, 0, len as isize - 1, ROOT_AXIS, node_size);
}

/// Sort `[left, right]` into k-d order starting with `axis`.
pub fn kd_sort_range<A: RecordArray + ?Sized>(
    array: &mut A,
    left: isize,
    right: isize,
    axis: usize,
    node_size: usize,
) {
    if is_leaf(left, right, node_size) {
        return;
    }

    let m = (left + right) >> 1;
    select(array, m as usize, left as usize, right as usize, axis);

    kd_sort_range(array, left, m - 1, 1 - axis, node_size);
    kd_sort_range(array, m + 1, right, 1 - axis, node_size);
}

/// Whether `[left, right]` is a leaf bucket for `node_size`.
///
/// Compared in `usize` so thresholds above `isize::MAX` still mean "never split".
pub fn is_leaf(left: isize, right: isize, node_size: usize) -> bool {
    right < left || (right - left) as usize <= node_size
}

/// Walk the implicit tree and check the split invariant at every node.
///
/// Returns the first `(left, right, m)` node that violates it.
pub fn find_violation<A: RecordArray + ?Sized>(
    array: &A,
    node_size: usize,
) -> Option<(usize, usize, usize)> {
    if array.is_empty() {
        return None;
    }
    let mut stack = vec![(0isize, array.len() as isize - 1, ROOT_AXIS)];

    while let Some((left, right, axis)) = stack.pop() {
        if is_leaf(left, right, node_size) {
            continue;
        }
        let m = (left + right) >> 1;
        let pivot = array.coord(m as usize, axis);

        let low_ok = (left..m).all(|i| array.coord(i as usize, axis) <= pivot);
        let high_ok = (m + 1..=right).all(|i| array.coord(i as usize, axis) >= pivot);
        if !low_ok || !high_ok {
            return Some((left as usize, right as usize, m as usize));
        }

        stack.push((left, m - 1, 1 - axis));
        stack.push((m + 1, right, 1 - axis));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<Point<usize>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                Point::new(
                    rng.random_range(-180.0..180.0),
                    rng.random_range(-90.0..90.0),
                    i,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_and_single() {
        let mut empty: Vec<Point<usize>> = Vec::new();
        kd_sort(empty.as_mut_slice(), 4);
        assert!(empty.is_empty());

        let mut one = vec![Point::new(1.0, 1.0, 0usize)];
        kd_sort(one.as_mut_slice(), 0);
        assert_eq!(one[0].value, 0);
    }

    #[test]
    fn test_small_input_is_untouched() {
        let mut points = random_points(65, 1);
        let before = points.clone();
        // 65 records span right - left = 64 <= node_size
        kd_sort(points.as_mut_slice(), 64);
        assert_eq!(points, before);
    }

    #[test]
    fn test_kd_ordering_property() {
        let mut points = random_points(10_000, 2);
        kd_sort(points.as_mut_slice(), 16);
        assert_eq!(find_violation(points.as_slice(), 16), None);
    }

    #[test]
    fn test_huge_node_size_is_one_leaf() {
        let mut points: Vec<Point<usize>> =
            (0..10).map(|i| Point::new((10 - i) as f64, 0.0, i)).collect();
        kd_sort(points.as_mut_slice(), usize::MAX);
        let order: Vec<usize> = points.iter().map(|p| p.value).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());

        for node_size in [isize::MAX as usize, isize::MAX as usize + 1] {
            kd_sort(points.as_mut_slice(), node_size);
            assert_eq!(points[0].value, 0);
        }
    }

    #[test]
    fn test_is_leaf_bounds() {
        assert!(is_leaf(5, 4, 0));
        assert!(is_leaf(0, 64, 64));
        assert!(!is_leaf(0, 65, 64));
        assert!(is_leaf(0, isize::MAX, usize::MAX));
    }

    #[test]
    fn test_node_size_zero_sorts_fully() {
        let mut points = random_points(257, 3);
        kd_sort(points.as_mut_slice(), 0);
        assert_eq!(find_violation(points.as_slice(), 0), None);
    }

    #[test]
    fn test_resort_keeps_property() {
        let mut points = random_points(3000, 4);
        for p in points.iter_mut().step_by(3) {
            p.x = 0.0;
        }
        kd_sort(points.as_mut_slice(), 8);
        kd_sort(points.as_mut_slice(), 8);
        assert_eq!(find_violation(points.as_slice(), 8), None);
    }

    #[test]
    fn test_find_violation_detects_unsorted() {
        let mut points: Vec<Point<usize>> =
            (0..10).map(|i| Point::new(i as f64, 0.0, i)).collect();
        points.reverse();
        assert!(find_violation(points.as_slice(), 2).is_some());
    }

    proptest! {
        #[test]
        fn prop_kd_sort_orders_and_preserves(
            coords in prop::collection::vec((-20i32..20, -20i32..20), 0..800),
            node_size in 0usize..12,
        ) {
            let mut points: Vec<Point<usize>> = coords
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| Point::new(f64::from(x), f64::from(y), i))
                .collect();
            kd_sort(points.as_mut_slice(), node_size);

            prop_assert_eq!(find_violation(points.as_slice(), node_size), None);
            let mut seen: Vec<usize> = points.iter().map(|p| p.value).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..coords.len()).collect::<Vec<_>>());
            for p in &points {
                let (x, y) = coords[p.value];
                prop_assert_eq!((p.x, p.y), (f64::from(x), f64::from(y)));
            }
        }
    }
}
