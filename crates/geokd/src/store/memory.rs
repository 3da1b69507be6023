//! In-memory point store.

use super::{KdStore, check_index, check_range};
use crate::kdsort::{DEFAULT_NODE_SIZE, kd_sort};
use crate::{Point, Result};

/// Point store backed by a `Vec`.
///
/// Shares the selection and k-d sort code with [`super::MmapKdStore`], so
/// the same pushes followed by `sort` leave both stores in the same order.
#[derive(Debug, Clone)]
pub struct MemoryKdStore<T> {
    points: Vec<Point<T>>,
    node_size: usize,
}

impl<T> Default for MemoryKdStore<T> {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_SIZE)
    }
}

impl<T> MemoryKdStore<T> {
    /// Create an empty store with the given leaf-bucket threshold.
    pub const fn new(node_size: usize) -> Self {
        Self {
            points: Vec::new(),
            node_size,
        }
    }

    /// Points in current array order.
    pub fn iter(&self) -> std::slice::Iter<'_, Point<T>> {
        self.points.iter()
    }

    /// Points in current array order.
    pub fn as_slice(&self) -> &[Point<T>] {
        &self.points
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Take the points out of the store.
    pub fn into_points(self) -> Vec<Point<T>> {
        self.points
    }
}

impl<T> FromIterator<Point<T>> for MemoryKdStore<T> {
    fn from_iter<I: IntoIterator<Item = Point<T>>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
            node_size: DEFAULT_NODE_SIZE,
        }
    }
}

impl<'a, T> IntoIterator for &'a MemoryKdStore<T> {
    type Item = &'a Point<T>;
    type IntoIter = std::slice::Iter<'a, Point<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T: Clone> KdStore<T> for MemoryKdStore<T> {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn node_size(&self) -> usize {
        self.node_size
    }

    fn push(&mut self, point: Point<T>) -> Result<()> {
        self.points.push(point);
        Ok(())
    }

    fn get(&mut self, index: usize) -> Result<Point<T>> {
        check_index(index, self.points.len())?;
        Ok(self.points[index].clone())
    }

    fn get_range(&mut self, start: usize, end: usize) -> Result<Vec<Point<T>>> {
        check_range(start, end, self.points.len())?;
        Ok(self.points[start..end].to_vec())
    }

    fn sort(&mut self) -> Result<()> {
        kd_sort(self.points.as_mut_slice(), self.node_size);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::StoreError;
    use crate::kdsort::find_violation;

    #[test]
    fn test_push_get() {
        let mut store = MemoryKdStore::new(4);
        store.push(Point::new(1.0, 2.0, "a")).expect("push");
        store.push(Point::new(3.0, 4.0, "b")).expect("push");

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).expect("get"), Point::new(3.0, 4.0, "b"));
        assert_eq!(store.get_range(0, 2).expect("range").len(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut store: MemoryKdStore<u8> = MemoryKdStore::default();
        assert!(matches!(
            store.get(0),
            Err(StoreError::IndexOutOfRange { index: 0, len: 0 })
        ));
        assert!(matches!(
            store.get_range(0, 1),
            Err(StoreError::RangeOutOfBounds { .. })
        ));
        assert!(store.get_range(0, 0).expect("empty range").is_empty());
    }

    #[test]
    fn test_sort() {
        let mut store: MemoryKdStore<usize> = (0..500)
            .map(|i| Point::new(((i * 37) % 101) as f64, ((i * 53) % 89) as f64, i))
            .collect();
        store.sort().expect("sort");
        assert_eq!(find_violation(store.as_slice(), store.node_size()), None);
        assert_eq!(store.iter().count(), 500);
    }

    #[test]
    fn test_clear() {
        let mut store = MemoryKdStore::new(2);
        store.push(Point::new(0.0, 0.0, ())).expect("push");
        store.clear();
        assert!(store.is_empty());
    }
}
