//! Memory-mapped point store.
//!
//! Points are appended to `<base>.keys` (24-byte records) and, unless the
//! store packs values into the records, `<base>.values` (JSON payloads).
//! Reads and the k-d sort go through memory maps of those files; the sort
//! swaps records directly in the mapped keys file, so the dataset is never
//! loaded into process memory.

use super::{KdStore, check_index, check_range};
use crate::arena::KeyArena;
use crate::config::{StoreConfig, keys_path, values_path};
use crate::kdsort::kd_sort;
use crate::record::{
    KEY_LENGTH, KeyRecord, PackedKind, PackedValue, ValueSlot, decode_payload, encode_payload,
};
use crate::view::{MappedView, Mapping};
use crate::writer::AppendWriter;
use crate::{Point, Result, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Disk-backed point store with in-place k-d sorting.
///
/// The store owns its file handles exclusively for its lifetime. Pushes
/// write straight to the files and drop the current mapping; reads remap
/// lazily.
pub struct MmapKdStore<T> {
    base_path: PathBuf,
    config: StoreConfig,
    len: usize,
    writer: AppendWriter,
    view: MappedView,
    _value: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for MmapKdStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapKdStore")
            .field("base_path", &self.base_path)
            .field("len", &self.len)
            .field("node_size", &self.config.node_size)
            .field("values_are_index", &self.config.values_are_index)
            .field("mapped", &self.view.is_mapped())
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> MmapKdStore<T> {
    /// Open or create the store described by `config`.
    ///
    /// Existing records in the keys file are kept and counted.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let base_path = config.resolve_base_path();
        let keys = keys_path(&base_path);
        let values = (!config.values_are_index).then(|| values_path(&base_path));

        let writer = AppendWriter::open(&keys, values.as_deref())?;
        let len = writer.record_count()?;

        debug!(
            "Opened store {} with {} records (node size {}, values as index: {})",
            base_path.display(),
            len,
            config.node_size,
            config.values_are_index
        );

        Ok(Self {
            base_path,
            config,
            len,
            writer,
            view: MappedView::default(),
            _value: PhantomData,
        })
    }

    /// Open or create a store at `base_path` with default settings.
    pub fn open_path<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        Self::open(StoreConfig::new(base_path))
    }

    /// Create a store at a random path in the OS temp dir.
    pub fn temporary() -> Result<Self> {
        Self::open(StoreConfig::default())
    }

    /// Number of records.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the store holds no records.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Leaf-bucket threshold.
    pub const fn node_size(&self) -> usize {
        self.config.node_size
    }

    /// Whether values are packed into the key records.
    pub const fn values_are_index(&self) -> bool {
        self.config.values_are_index
    }

    /// The configuration the store was opened with.
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Base path shared by the store's files.
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the keys file.
    pub fn keys_path(&self) -> PathBuf {
        keys_path(&self.base_path)
    }

    /// Path of the values file, absent in values-as-index mode.
    pub fn values_path(&self) -> Option<PathBuf> {
        (!self.config.values_are_index).then(|| values_path(&self.base_path))
    }

    /// Append a point.
    ///
    /// In values-as-index mode the value must be a number; anything else is
    /// rejected before a byte is written.
    pub fn push(&mut self, point: &Point<T>) -> Result<()> {
        let (record, payload) = if self.config.values_are_index {
            let packed = PackedValue::from_value(&point.value)?;
            (KeyRecord::packed(point.x, point.y, packed), None)
        } else {
            let payload = encode_payload(&point.value)?;
            let (offset, length) = self.writer.next_pointer(payload.len())?;
            (
                KeyRecord::pointer(point.x, point.y, offset, length),
                Some(payload),
            )
        };

        self.view.invalidate();
        self.writer.append(&record, payload.as_deref())?;
        self.len += 1;
        Ok(())
    }

    /// Point at `index`, reading packed values with the configured kind.
    pub fn get(&mut self, index: usize) -> Result<Point<T>> {
        self.get_as(index, self.config.packed_kind)
    }

    /// Point at `index`, reading packed values as `kind`.
    pub fn get_as(&mut self, index: usize, kind: PackedKind) -> Result<Point<T>> {
        check_index(index, self.len)?;
        let values_are_index = self.config.values_are_index;
        let mapping: &Mapping = self.mapping()?;
        decode_point(mapping, index, values_are_index, kind)
    }

    /// Points in `[start, end)`, in array order.
    pub fn get_range(&mut self, start: usize, end: usize) -> Result<Vec<Point<T>>> {
        check_range(start, end, self.len)?;
        let values_are_index = self.config.values_are_index;
        let kind = self.config.packed_kind;
        let mapping: &Mapping = self.mapping()?;
        (start..end)
            .map(|index| decode_point(mapping, index, values_are_index, kind))
            .collect()
    }

    /// Lazy iterator over all points in current array order.
    ///
    /// `kind` selects how packed values are read; it has no effect when the
    /// store has a values file. Call again to restart.
    pub fn values(&mut self, kind: PackedKind) -> Values<'_, T> {
        Values {
            store: self,
            index: 0,
            kind,
        }
    }

    /// Lazy iterator using the configured packed kind.
    pub fn iter(&mut self) -> Values<'_, T> {
        let kind = self.config.packed_kind;
        self.values(kind)
    }

    /// Reorder the keys file into an implicit k-d tree, in place.
    pub fn sort(&mut self) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        let node_size = self.config.node_size;
        let len = self.len;
        let start = Instant::now();
        info!("Sorting {} records (node size {})", len, node_size);

        let mapping = self.mapping()?;
        let keys = mapping.keys_mut();
        if keys.len() < len * KEY_LENGTH {
            return Err(StoreError::Corruption(format!(
                "keys map holds {} bytes, expected {}",
                keys.len(),
                len * KEY_LENGTH
            )));
        }
        let mut arena = KeyArena::new(&mut keys[..len * KEY_LENGTH]);
        kd_sort(&mut arena, node_size);

        info!("Sorted {} records in {:?}", len, start.elapsed());
        Ok(())
    }

    /// Flush records reordered by [`MmapKdStore::sort`] to disk.
    pub fn flush(&self) -> Result<()> {
        match self.view.mapping() {
            Some(mapping) => mapping.flush(),
            None => Ok(()),
        }
    }

    /// Close the store, optionally deleting its files.
    ///
    /// Consumes the store, so it cannot be closed twice.
    pub fn close(self, cleanup: bool) -> Result<()> {
        self.flush()?;
        let Self {
            base_path,
            config,
            writer,
            mut view,
            ..
        } = self;

        view.invalidate();
        drop(writer);

        if cleanup {
            debug!("Removing store files at {}", base_path.display());
            std::fs::remove_file(keys_path(&base_path))?;
            if !config.values_are_index {
                let values = values_path(&base_path);
                if values.exists() {
                    std::fs::remove_file(&values)?;
                } else {
                    warn!("Values file {} already removed", values.display());
                }
            }
        }
        Ok(())
    }

    fn mapping(&mut self) -> Result<&mut Mapping> {
        self.view
            .ensure_mapped(self.writer.keys_file(), self.writer.values_file())
    }
}

fn decode_point<T: DeserializeOwned>(
    mapping: &Mapping,
    index: usize,
    values_are_index: bool,
    kind: PackedKind,
) -> Result<Point<T>> {
    let keys = mapping.keys();
    if keys.len() < (index + 1) * KEY_LENGTH {
        return Err(StoreError::Corruption(format!(
            "record {index} lies past the end of the keys map ({} bytes)",
            keys.len()
        )));
    }

    let record = KeyRecord::read_at(keys, index, values_are_index);
    let value = match record.slot {
        ValueSlot::Packed(bytes) => PackedValue::from_le_bytes(bytes, kind).into_value()?,
        ValueSlot::Pointer { offset, length } => {
            let start = offset as usize;
            let end = start + length as usize;
            let payload = mapping.values().get(start..end).ok_or_else(|| {
                StoreError::Corruption(format!(
                    "record {index} points at values {start}..{end} past the end of the values file"
                ))
            })?;
            decode_payload(payload)?
        }
    };

    Ok(Point::new(record.x, record.y, value))
}

/// Lazy iterator over a [`MmapKdStore`], see [`MmapKdStore::values`].
pub struct Values<'a, T> {
    store: &'a mut MmapKdStore<T>,
    index: usize,
    kind: PackedKind,
}

impl<T: Serialize + DeserializeOwned> Iterator for Values<'_, T> {
    type Item = Result<Point<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.store.len {
            return None;
        }
        let item = self.store.get_as(self.index, self.kind);
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.store.len.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<T: Serialize + DeserializeOwned> ExactSizeIterator for Values<'_, T> {}

impl<'a, T: Serialize + DeserializeOwned> IntoIterator for &'a mut MmapKdStore<T> {
    type Item = Result<Point<T>>;
    type IntoIter = Values<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Serialize + DeserializeOwned> KdStore<T> for MmapKdStore<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn node_size(&self) -> usize {
        self.config.node_size
    }

    fn push(&mut self, point: Point<T>) -> Result<()> {
        Self::push(self, &point)
    }

    fn get(&mut self, index: usize) -> Result<Point<T>> {
        Self::get(self, index)
    }

    fn get_range(&mut self, start: usize, end: usize) -> Result<Vec<Point<T>>> {
        Self::get_range(self, start, end)
    }

    fn sort(&mut self) -> Result<()> {
        Self::sort(self)
    }
}
