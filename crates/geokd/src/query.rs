//! Range and radius queries over a k-d sorted store.
//!
//! The sorted array is an implicit tree: the node for `[left, right]` sits
//! at `(left + right) >> 1` and splits on the axis of its depth. Ranges no
//! wider than the node size are leaves and are scanned linearly.

use crate::kdsort::{ROOT_AXIS, is_leaf};
use crate::store::KdStore;
use crate::{Point, Result};
use std::marker::PhantomData;
use tracing::debug;

/// Spatial queries on top of a [`KdStore`].
#[derive(Debug)]
pub struct PointIndex<T, S> {
    store: S,
    sorted: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T, S: KdStore<T>> PointIndex<T, S> {
    /// Wrap a store that still needs sorting.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            sorted: false,
            _value: PhantomData,
        }
    }

    /// Wrap a store whose records are already k-d sorted, e.g. one reopened
    /// from files written by an earlier sort.
    pub const fn presorted(store: S) -> Self {
        Self {
            store,
            sorted: true,
            _value: PhantomData,
        }
    }

    /// Append a point. The index must be sorted again before querying.
    pub fn insert(&mut self, point: Point<T>) -> Result<()> {
        self.store.push(point)?;
        self.sorted = false;
        Ok(())
    }

    /// Sort the underlying store.
    pub fn sort(&mut self) -> Result<()> {
        self.store.sort()?;
        self.sorted = true;
        Ok(())
    }

    /// Whether the store has been sorted since the last insert.
    pub const fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Points with `min_x <= x <= max_x` and `min_y <= y <= max_y`.
    ///
    /// Sorts first when needed. Results come in tree-walk order; at most
    /// `max_results` are returned when a limit is given.
    pub fn search_range(
        &mut self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        max_results: Option<usize>,
    ) -> Result<Vec<Point<T>>> {
        self.walk(
            max_results,
            |p| p.x >= min_x && p.x <= max_x && p.y >= min_y && p.y <= max_y,
            |p, axis| {
                let c = p.coord(axis);
                let (lo, hi) = if axis == 0 { (min_x, max_x) } else { (min_y, max_y) };
                (lo <= c, hi >= c)
            },
        )
    }

    /// Points within Euclidean distance `radius` of `(qx, qy)`, inclusive.
    pub fn search_radius(
        &mut self,
        qx: f64,
        qy: f64,
        radius: f64,
        max_results: Option<usize>,
    ) -> Result<Vec<Point<T>>> {
        let r2 = radius * radius;
        self.walk(
            max_results,
            |p| sq_dist(p.x, p.y, qx, qy) <= r2,
            |p, axis| {
                let (c, q) = if axis == 0 { (p.x, qx) } else { (p.y, qy) };
                (q - radius <= c, q + radius >= c)
            },
        )
    }

    /// The wrapped store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The wrapped store, mutably. Pushing through it bypasses the sorted
    /// flag; prefer [`PointIndex::insert`].
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Unwrap the store.
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Depth-first walk of the implicit tree.
    ///
    /// `visit_sides` reports whether the left and right subtrees of a node
    /// can hold matches.
    fn walk<M, V>(
        &mut self,
        max_results: Option<usize>,
        matches: M,
        visit_sides: V,
    ) -> Result<Vec<Point<T>>>
    where
        M: Fn(&Point<T>) -> bool,
        V: Fn(&Point<T>, usize) -> (bool, bool),
    {
        if !self.sorted {
            self.sort()?;
        }

        let limit = max_results.unwrap_or(usize::MAX);
        let mut results = Vec::new();
        if self.store.is_empty() || limit == 0 {
            return Ok(results);
        }

        let node_size = self.store.node_size();
        let mut stack = vec![(0isize, self.store.len() as isize - 1, ROOT_AXIS)];
        let mut visited = 0usize;

        while let Some((left, right, axis)) = stack.pop() {
            visited += 1;

            if is_leaf(left, right, node_size) {
                for point in self.store.get_range(left as usize, (right + 1) as usize)? {
                    if matches(&point) {
                        results.push(point);
                        if results.len() >= limit {
                            return Ok(results);
                        }
                    }
                }
                continue;
            }

            let m = (left + right) >> 1;
            let point = self.store.get(m as usize)?;
            let (go_left, go_right) = visit_sides(&point, axis);

            if matches(&point) {
                results.push(point);
                if results.len() >= limit {
                    return Ok(results);
                }
            }

            if go_left {
                stack.push((left, m - 1, 1 - axis));
            }
            if go_right {
                stack.push((m + 1, right, 1 - axis));
            }
        }

        debug!("Query visited {} nodes, {} results", visited, results.len());
        Ok(results)
    }
}

fn sq_dist(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = ax - bx;
    let dy = ay - by;
    dx * dx + dy * dy
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::MemoryKdStore;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    fn random_index(n: usize, node_size: usize) -> PointIndex<usize, MemoryKdStore<usize>> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut index = PointIndex::new(MemoryKdStore::new(node_size));
        for i in 0..n {
            let x = rng.random_range(0.0..100.0);
            let y = rng.random_range(0.0..100.0);
            index.insert(Point::new(x, y, i)).expect("insert");
        }
        index
    }

    fn sorted_ids(points: &[Point<usize>]) -> Vec<usize> {
        let mut ids: Vec<usize> = points.iter().map(|p| p.value).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_range_matches_brute_force() {
        let mut index = random_index(2000, 16);
        let found = index
            .search_range(20.0, 30.0, 45.0, 70.0, None)
            .expect("range");

        let all = index.store().as_slice();
        let expected: Vec<Point<usize>> = all
            .iter()
            .filter(|p| p.x >= 20.0 && p.x <= 45.0 && p.y >= 30.0 && p.y <= 70.0)
            .cloned()
            .collect();

        assert!(!expected.is_empty());
        assert_eq!(sorted_ids(&found), sorted_ids(&expected));
    }

    #[test]
    fn test_radius_matches_brute_force() {
        let mut index = random_index(2000, 8);
        let found = index.search_radius(50.0, 50.0, 12.5, None).expect("radius");

        let expected: Vec<Point<usize>> = index
            .store()
            .iter()
            .filter(|p| sq_dist(p.x, p.y, 50.0, 50.0) <= 12.5 * 12.5)
            .cloned()
            .collect();

        assert!(!expected.is_empty());
        assert_eq!(sorted_ids(&found), sorted_ids(&expected));
    }

    #[test]
    fn test_huge_node_size_scans_single_leaf() {
        let mut index = random_index(300, usize::MAX);
        let found = index
            .search_range(0.0, 0.0, 100.0, 100.0, None)
            .expect("range");
        assert_eq!(sorted_ids(&found), (0..300).collect::<Vec<_>>());

        let order: Vec<usize> = index.store().iter().map(|p| p.value).collect();
        assert_eq!(order, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn test_max_results() {
        let mut index = random_index(500, 4);
        let found = index
            .search_range(0.0, 0.0, 100.0, 100.0, Some(10))
            .expect("range");
        assert_eq!(found.len(), 10);
        assert!(index.search_range(0.0, 0.0, 100.0, 100.0, Some(0)).expect("range").is_empty());
    }

    #[test]
    fn test_insert_clears_sorted_flag() {
        let mut index = random_index(10, 2);
        index.sort().expect("sort");
        assert!(index.is_sorted());
        index.insert(Point::new(1.0, 1.0, 99)).expect("insert");
        assert!(!index.is_sorted());

        let found = index.search_radius(1.0, 1.0, 0.0, None).expect("radius");
        assert!(found.iter().any(|p| p.value == 99));
        assert!(index.is_sorted());
    }

    #[test]
    fn test_empty_store() {
        let mut index: PointIndex<u8, MemoryKdStore<u8>> = PointIndex::new(MemoryKdStore::default());
        assert!(index.search_range(0.0, 0.0, 1.0, 1.0, None).expect("range").is_empty());
    }
}
