//! Record arrays that the partitioner and the k-d sort operate on.
//!
//! The sort never looks at values, only at one coordinate per record, and
//! it only ever moves whole records. [`RecordArray`] captures exactly that,
//! so the same selection code drives both the memory-mapped keys file and
//! the in-memory store.

use crate::record::{KEY_LENGTH, KeyRecord, X_OFFSET, Y_OFFSET, read_f64};

/// An indexable array of 2D records that can be reordered in place.
pub trait RecordArray {
    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the array holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate of record `index` on `axis` (0 = x, 1 = y).
    fn coord(&self, index: usize, axis: usize) -> f64;

    /// Exchange records `i` and `j` as whole units.
    fn swap(&mut self, i: usize, j: usize);
}

impl<T> RecordArray for [crate::Point<T>] {
    fn len(&self) -> usize {
        <[_]>::len(self)
    }

    fn coord(&self, index: usize, axis: usize) -> f64 {
        self[index].coord(axis)
    }

    fn swap(&mut self, i: usize, j: usize) {
        <[_]>::swap(self, i, j);
    }
}

/// Fixed-stride view of key records over a mutable byte buffer.
///
/// Record `i` occupies bytes `[i * 24, i * 24 + 24)`. Trailing bytes that do
/// not form a whole record are ignored.
pub struct KeyArena<'a> {
    bytes: &'a mut [u8],
    len: usize,
}

impl<'a> KeyArena<'a> {
    /// Wrap a byte buffer holding consecutive key records.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        let len = bytes.len() / KEY_LENGTH;
        Self { bytes, len }
    }

    /// Decode record `index`.
    pub fn record_at(&self, index: usize, values_are_index: bool) -> KeyRecord {
        KeyRecord::read_at(self.bytes, index, values_are_index)
    }
}

impl RecordArray for KeyArena<'_> {
    fn len(&self) -> usize {
        self.len
    }

    fn coord(&self, index: usize, axis: usize) -> f64 {
        let field = if axis == 0 { X_OFFSET } else { Y_OFFSET };
        read_f64(self.bytes, index * KEY_LENGTH + field)
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let mut tmp = [0u8; KEY_LENGTH];
        let a = i * KEY_LENGTH;
        let b = j * KEY_LENGTH;
        tmp.copy_from_slice(&self.bytes[a..a + KEY_LENGTH]);
        self.bytes.copy_within(b..b + KEY_LENGTH, a);
        self.bytes[b..b + KEY_LENGTH].copy_from_slice(&tmp);
    }
}
