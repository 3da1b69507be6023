//! Serde bridge between caller values and the 8-byte packed slot.
//!
//! Values are serialized straight into a [`PackedValue`] rather than through
//! a JSON tree, so NaN and the infinities survive as the f64 numbers they
//! are. Reading goes through serde's primitive deserializers for the same
//! reason.

use crate::record::PackedValue;
use crate::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::de::IntoDeserializer;
use serde::ser::{Impossible, Serialize, Serializer};

/// Pack a value that serializes as a single number.
pub(crate) fn pack<T: Serialize + ?Sized>(value: &T) -> Result<PackedValue> {
    value.serialize(PackedSerializer)
}

/// Rebuild a caller value from a packed number.
pub(crate) fn unpack<T: DeserializeOwned>(value: PackedValue) -> Result<T> {
    let result: std::result::Result<T, serde::de::value::Error> = match value {
        PackedValue::Float(f) => T::deserialize(f.into_deserializer()),
        PackedValue::Integer(i) => T::deserialize(i.into_deserializer()),
    };
    result.map_err(|e| StoreError::ValueType(format!("packed value {value:?}: {e}")))
}

fn reject(kind: &str) -> StoreError {
    StoreError::ValueType(format!("values-as-index requires a number, got {kind}"))
}

fn integer<I>(value: I) -> Result<PackedValue>
where
    I: Copy + std::fmt::Display,
    i64: TryFrom<I>,
{
    i64::try_from(value).map(PackedValue::Integer).map_err(|_| {
        StoreError::ValueType(format!("integer {value} does not fit in 64 signed bits"))
    })
}

struct PackedSerializer;

impl Serializer for PackedSerializer {
    type Ok = PackedValue;
    type Error = StoreError;

    type SerializeSeq = Impossible<PackedValue, StoreError>;
    type SerializeTuple = Impossible<PackedValue, StoreError>;
    type SerializeTupleStruct = Impossible<PackedValue, StoreError>;
    type SerializeTupleVariant = Impossible<PackedValue, StoreError>;
    type SerializeMap = Impossible<PackedValue, StoreError>;
    type SerializeStruct = Impossible<PackedValue, StoreError>;
    type SerializeStructVariant = Impossible<PackedValue, StoreError>;

    fn serialize_i8(self, v: i8) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<PackedValue> {
        Ok(PackedValue::Integer(v))
    }

    fn serialize_i128(self, v: i128) -> Result<PackedValue> {
        integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<PackedValue> {
        Ok(PackedValue::Integer(i64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<PackedValue> {
        integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<PackedValue> {
        integer(v)
    }

    fn serialize_f32(self, v: f32) -> Result<PackedValue> {
        Ok(PackedValue::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<PackedValue> {
        Ok(PackedValue::Float(v))
    }

    // Transparent wrappers around a number pack as that number
    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<PackedValue> {
        value.serialize(self)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<PackedValue> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<PackedValue> {
        Err(reject("bool"))
    }

    fn serialize_char(self, _v: char) -> Result<PackedValue> {
        Err(reject("char"))
    }

    fn serialize_str(self, _v: &str) -> Result<PackedValue> {
        Err(reject("string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<PackedValue> {
        Err(reject("bytes"))
    }

    fn serialize_none(self) -> Result<PackedValue> {
        Err(reject("null"))
    }

    fn serialize_unit(self) -> Result<PackedValue> {
        Err(reject("null"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<PackedValue> {
        Err(reject(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<PackedValue> {
        Err(reject(name))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<PackedValue> {
        Err(reject(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(reject("array"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(reject("array"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(reject(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(reject(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(reject("object"))
    }

    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(reject(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(reject(name))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(serde::Serialize)]
    struct Meters(f64);

    #[test]
    fn test_pack_non_finite_floats() {
        assert!(matches!(pack(&f64::NAN).expect("nan"), PackedValue::Float(f) if f.is_nan()));
        assert_eq!(pack(&f64::INFINITY).expect("inf"), PackedValue::Float(f64::INFINITY));
        assert_eq!(
            pack(&f64::NEG_INFINITY).expect("-inf"),
            PackedValue::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn test_unpack_non_finite_floats() {
        let nan: f64 = unpack(PackedValue::Float(f64::NAN)).expect("nan");
        assert!(nan.is_nan());
        let inf: f64 = unpack(PackedValue::Float(f64::NEG_INFINITY)).expect("-inf");
        assert_eq!(inf, f64::NEG_INFINITY);
    }

    #[test]
    fn test_pack_wrappers_and_json_numbers() {
        assert_eq!(pack(&Meters(3.5)).expect("newtype"), PackedValue::Float(3.5));
        assert_eq!(pack(&Some(7u8)).expect("some"), PackedValue::Integer(7));
        assert_eq!(pack(&json!(12)).expect("json int"), PackedValue::Integer(12));
        assert_eq!(pack(&json!(-0.5)).expect("json float"), PackedValue::Float(-0.5));
    }

    #[test]
    fn test_unpack_range_checks() {
        let small: u8 = unpack(PackedValue::Integer(200)).expect("fits");
        assert_eq!(small, 200);
        assert!(unpack::<u8>(PackedValue::Integer(300)).is_err());
        assert!(unpack::<String>(PackedValue::Integer(1)).is_err());
    }

    #[test]
    fn test_pack_wide_integers() {
        assert_eq!(pack(&(i64::MAX as u64)).expect("max"), PackedValue::Integer(i64::MAX));
        assert!(matches!(pack(&u64::MAX), Err(StoreError::ValueType(_))));
        assert!(matches!(pack(&i128::MIN), Err(StoreError::ValueType(_))));
    }
}
