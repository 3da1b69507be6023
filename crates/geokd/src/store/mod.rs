//! Point stores that can be k-d sorted in place.
//!
//! - [`MmapKdStore`]: records on disk, accessed through memory maps
//! - [`MemoryKdStore`]: records in a `Vec`, same sort and access semantics
//!
//! Both implement [`KdStore`], which is what [`crate::PointIndex`] queries.

pub mod memory;
pub mod mmap;

pub use memory::MemoryKdStore;
pub use mmap::{MmapKdStore, Values};

use crate::{Point, Result};

/// Append-then-sort store of 2D points.
pub trait KdStore<T> {
    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leaf-bucket threshold used by [`KdStore::sort`].
    fn node_size(&self) -> usize;

    /// Append a point at index `len()`.
    fn push(&mut self, point: Point<T>) -> Result<()>;

    /// Point at `index` in the current array order.
    fn get(&mut self, index: usize) -> Result<Point<T>>;

    /// Points in `[start, end)`, in array order.
    fn get_range(&mut self, start: usize, end: usize) -> Result<Vec<Point<T>>>;

    /// Reorder the records into an implicit k-d tree.
    fn sort(&mut self) -> Result<()>;
}

pub(crate) const fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(crate::StoreError::IndexOutOfRange { index, len })
    }
}

pub(crate) const fn check_range(start: usize, end: usize, len: usize) -> Result<()> {
    if start <= end && end <= len {
        Ok(())
    } else {
        Err(crate::StoreError::RangeOutOfBounds { start, end, len })
    }
}
