//! Fixed-width key record layout.
//!
//! Every point is stored in the `.keys` file as one 24-byte little-endian
//! record:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0x00   | 8    | x (f64) |
//! | 0x08   | 8    | y (f64) |
//! | 0x10   | 4    | value offset into `.values` (u32) |
//! | 0x14   | 4    | value length (u32) |
//!
//! In values-as-index mode the last 8 bytes instead hold the value itself,
//! either an f64 or an i64. Which interpretation applies is a property of
//! the store, never of an individual record.

use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Size of one key record in bytes.
pub const KEY_LENGTH: usize = 24;

/// Byte offset of the x coordinate inside a record.
pub const X_OFFSET: usize = 0;

/// Byte offset of the y coordinate inside a record.
pub const Y_OFFSET: usize = 8;

/// Byte offset of the value slot inside a record.
pub const VALUE_OFFSET: usize = 16;

/// A point with its associated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point<T> {
    /// First coordinate (axis 0)
    pub x: f64,
    /// Second coordinate (axis 1)
    pub y: f64,
    /// Associated value
    pub value: T,
}

impl<T> Point<T> {
    /// Create a point.
    pub const fn new(x: f64, y: f64, value: T) -> Self {
        Self { x, y, value }
    }

    /// Coordinate on `axis` (0 = x, anything else = y).
    pub fn coord(&self, axis: usize) -> f64 {
        if axis == 0 { self.x } else { self.y }
    }
}

/// How the 8 packed bytes of a values-as-index record are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackedKind {
    /// Little-endian IEEE 754 double
    Float,
    /// Little-endian signed 64-bit integer
    #[default]
    Integer,
}

/// A numeric value packed directly into a key record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PackedValue {
    /// Plain floating point number
    Float(f64),
    /// 64-bit signed integer
    Integer(i64),
}

impl PackedValue {
    /// Convert a value to its packed form.
    ///
    /// Integers that fit in an i64 pack as `Integer`, floats (NaN and the
    /// infinities included) as `Float`. Anything that does not serialize to
    /// a single number is rejected.
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        crate::packed::pack(value)
    }

    /// Serialize to the 8-byte record slot.
    pub fn to_le_bytes(self) -> [u8; 8] {
        match self {
            Self::Float(f) => f.to_le_bytes(),
            Self::Integer(i) => i.to_le_bytes(),
        }
    }

    /// Read the 8-byte record slot with the given interpretation.
    pub fn from_le_bytes(bytes: [u8; 8], kind: PackedKind) -> Self {
        match kind {
            PackedKind::Float => Self::Float(f64::from_le_bytes(bytes)),
            PackedKind::Integer => Self::Integer(i64::from_le_bytes(bytes)),
        }
    }

    /// Convert back into the caller's value type.
    pub fn into_value<T: DeserializeOwned>(self) -> Result<T> {
        crate::packed::unpack(self)
    }
}

/// The last 8 bytes of a key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSlot {
    /// Location of the serialized value in the `.values` file
    Pointer {
        /// Byte offset into the values file
        offset: u32,
        /// Payload length in bytes
        length: u32,
    },
    /// The value itself, packed
    Packed([u8; 8]),
}

/// Decoded view of one 24-byte key record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRecord {
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
    /// Value pointer or packed value
    pub slot: ValueSlot,
}

impl KeyRecord {
    /// Record pointing at a payload in the values file.
    pub const fn pointer(x: f64, y: f64, offset: u32, length: u32) -> Self {
        Self {
            x,
            y,
            slot: ValueSlot::Pointer { offset, length },
        }
    }

    /// Record carrying its value packed in the last 8 bytes.
    pub fn packed(x: f64, y: f64, value: PackedValue) -> Self {
        Self {
            x,
            y,
            slot: ValueSlot::Packed(value.to_le_bytes()),
        }
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> [u8; KEY_LENGTH] {
        let mut buf = [0u8; KEY_LENGTH];
        buf[X_OFFSET..Y_OFFSET].copy_from_slice(&self.x.to_le_bytes());
        buf[Y_OFFSET..VALUE_OFFSET].copy_from_slice(&self.y.to_le_bytes());
        match self.slot {
            ValueSlot::Pointer { offset, length } => {
                buf[16..20].copy_from_slice(&offset.to_le_bytes());
                buf[20..24].copy_from_slice(&length.to_le_bytes());
            }
            ValueSlot::Packed(bytes) => buf[VALUE_OFFSET..].copy_from_slice(&bytes),
        }
        buf
    }

    /// Parse a record. `values_are_index` selects the slot interpretation.
    pub fn from_bytes(data: &[u8; KEY_LENGTH], values_are_index: bool) -> Self {
        let x = read_f64(data, X_OFFSET);
        let y = read_f64(data, Y_OFFSET);
        let slot = if values_are_index {
            let mut packed = [0u8; 8];
            packed.copy_from_slice(&data[VALUE_OFFSET..]);
            ValueSlot::Packed(packed)
        } else {
            ValueSlot::Pointer {
                offset: u32::from_le_bytes([data[16], data[17], data[18], data[19]]),
                length: u32::from_le_bytes([data[20], data[21], data[22], data[23]]),
            }
        };
        Self { x, y, slot }
    }

    /// Parse record `index` out of a buffer of consecutive records.
    ///
    /// Callers guarantee `(index + 1) * KEY_LENGTH <= keys.len()`.
    pub fn read_at(keys: &[u8], index: usize, values_are_index: bool) -> Self {
        let start = index * KEY_LENGTH;
        let mut buf = [0u8; KEY_LENGTH];
        buf.copy_from_slice(&keys[start..start + KEY_LENGTH]);
        Self::from_bytes(&buf, values_are_index)
    }
}

/// Read a little-endian f64 at `offset`.
///
/// Callers guarantee `offset + 8 <= data.len()`.
pub(crate) fn read_f64(data: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    f64::from_le_bytes(buf)
}

/// Serialize a value for the values file.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Parse a payload read from the values file.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
