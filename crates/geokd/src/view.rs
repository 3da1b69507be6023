//! Lazily established memory maps over the keys and values files.
//!
//! A mapping is a snapshot of the file length at the time it was taken.
//! Any append through the file handles makes it stale, so writers call
//! [`MappedView::invalidate`] and readers go through
//! [`MappedView::ensure_mapped`], which remaps on demand.

use crate::Result;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;
use tracing::trace;

/// Live maps of a store's files.
pub struct Mapping {
    keys: Option<MmapMut>,
    values: Option<Mmap>,
}

impl Mapping {
    fn map(keys: &File, values: Option<&File>) -> Result<Self> {
        let keys = if keys.metadata()?.len() == 0 {
            None
        } else {
            // The store is the only writer of its files while it is open.
            #[allow(unsafe_code)]
            let map = unsafe { MmapOptions::new().map_mut(keys)? };
            Some(map)
        };

        let values = match values {
            Some(file) if file.metadata()?.len() > 0 => {
                #[allow(unsafe_code)]
                let map = unsafe { MmapOptions::new().map(file)? };
                Some(map)
            }
            _ => None,
        };

        Ok(Self { keys, values })
    }

    /// Bytes of the keys file at mapping time.
    pub fn keys(&self) -> &[u8] {
        self.keys.as_deref().unwrap_or_default()
    }

    /// Writable bytes of the keys file. Changes go straight to the file.
    pub fn keys_mut(&mut self) -> &mut [u8] {
        self.keys.as_deref_mut().unwrap_or_default()
    }

    /// Bytes of the values file at mapping time.
    pub fn values(&self) -> &[u8] {
        self.values.as_deref().unwrap_or_default()
    }

    /// Flush modified key pages to disk.
    pub fn flush(&self) -> Result<()> {
        if let Some(keys) = &self.keys {
            keys.flush()?;
        }
        Ok(())
    }
}

/// Mapping state of a store.
#[derive(Default)]
pub enum MappedView {
    /// No live mapping; the next read maps the files.
    #[default]
    Unmapped,
    /// Maps reflecting the files as of the last (re)map.
    Mapped(Mapping),
}

impl MappedView {
    /// Map the files unless a live mapping already exists.
    pub fn ensure_mapped(&mut self, keys: &File, values: Option<&File>) -> Result<&mut Mapping> {
        loop {
            match *self {
                Self::Mapped(ref mut mapping) => return Ok(mapping),
                Self::Unmapped => {
                    trace!("mapping store files");
                    *self = Self::Mapped(Mapping::map(keys, values)?);
                }
            }
        }
    }

    /// Drop any live mapping.
    pub fn invalidate(&mut self) {
        if self.is_mapped() {
            trace!("invalidating store mapping");
        }
        *self = Self::Unmapped;
    }

    /// Whether a live mapping exists.
    pub const fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }

    /// The live mapping, if any.
    pub const fn mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapped(mapping) => Some(mapping),
            Self::Unmapped => None,
        }
    }
}
