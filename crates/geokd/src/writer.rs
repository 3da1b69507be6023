//! Sequential append writer for the keys and values files.

use crate::record::{KEY_LENGTH, KeyRecord};
use crate::{Result, StoreError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Appends key records and value payloads, one point at a time.
///
/// Each append is a direct write to the file handles with no buffering, so
/// records reach the OS in call order before `append` returns.
pub struct AppendWriter {
    keys: File,
    values: Option<File>,
    value_offset: u64,
}

impl AppendWriter {
    /// Open (creating if absent) the keys file and, optionally, the values file.
    ///
    /// The running value offset continues from the current end of the
    /// values file so that a reopened store keeps appending valid pointers.
    pub fn open(keys_path: &Path, values_path: Option<&Path>) -> Result<Self> {
        let keys = open_append(keys_path)?;
        let values = values_path.map(open_append).transpose()?;
        let value_offset = match &values {
            Some(file) => file.metadata()?.len(),
            None => 0,
        };

        debug!(
            "Opened {} (values offset {})",
            keys_path.display(),
            value_offset
        );

        Ok(Self {
            keys,
            values,
            value_offset,
        })
    }

    /// Number of complete records currently in the keys file.
    pub fn record_count(&self) -> Result<usize> {
        let size = self.keys.metadata()?.len();
        if !size.is_multiple_of(KEY_LENGTH as u64) {
            return Err(StoreError::Corruption(format!(
                "keys file is {size} bytes, not a multiple of {KEY_LENGTH}"
            )));
        }
        Ok((size / KEY_LENGTH as u64) as usize)
    }

    /// Offset/length pair the next payload of `length` bytes will occupy.
    pub fn next_pointer(&self, length: usize) -> Result<(u32, u32)> {
        let overflow = || StoreError::ValuesOverflow {
            offset: self.value_offset,
            length,
        };
        let offset = u32::try_from(self.value_offset).map_err(|_| overflow())?;
        let len = u32::try_from(length).map_err(|_| overflow())?;
        offset.checked_add(len).ok_or_else(overflow)?;
        Ok((offset, len))
    }

    /// Append one record and, when the store has a values file, its payload.
    pub fn append(&mut self, record: &KeyRecord, payload: Option<&[u8]>) -> Result<()> {
        self.keys.write_all(&record.to_bytes())?;
        if let (Some(values), Some(payload)) = (self.values.as_mut(), payload) {
            values.write_all(payload)?;
            self.value_offset += payload.len() as u64;
        }
        Ok(())
    }

    /// Current end of the values file.
    pub const fn value_offset(&self) -> u64 {
        self.value_offset
    }

    /// Keys file handle.
    pub const fn keys_file(&self) -> &File {
        &self.keys
    }

    /// Values file handle, absent in values-as-index mode.
    pub const fn values_file(&self) -> Option<&File> {
        self.values.as_ref()
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?)
}
