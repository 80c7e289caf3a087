//! CIM type descriptors and the values they describe.
//!
//! Every property, qualifier and array element on disk is tagged with a 4 byte descriptor:
//! a type tag, an "is array" flag byte and two reserved bytes. The descriptor decides how wide
//! the on-disk slot is and how the slot is turned into a [`CimValue`].

use std::fmt;

use serde::Serialize;

use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::ByteCursor;

/// Value of the flag byte that marks a descriptor as an array.
///
/// Other non-zero values have been observed and do *not* mean "array".
pub const CIM_ARRAY_FLAG: u8 = 0x20;

/// On-disk width of an array slot, which is always a heap reference.
pub const CIM_ARRAY_REF_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CimTypeTag {
    LangId = 0x03,
    Real32 = 0x04,
    String = 0x08,
    Boolean = 0x0B,
    UInt8 = 0x11,
    UInt16 = 0x12,
    UInt32 = 0x13,
    UInt64 = 0x15,
    DateTime = 0x65,
}

impl CimTypeTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        let tag = match value {
            0x03 => CimTypeTag::LangId,
            0x04 => CimTypeTag::Real32,
            0x08 => CimTypeTag::String,
            0x0B => CimTypeTag::Boolean,
            0x11 => CimTypeTag::UInt8,
            0x12 => CimTypeTag::UInt16,
            0x13 => CimTypeTag::UInt32,
            0x15 => CimTypeTag::UInt64,
            0x65 => CimTypeTag::DateTime,
            _ => return None,
        };
        Some(tag)
    }

    /// Width of a scalar slot of this type.
    ///
    /// Strings and datetimes are stored as 4 byte heap references.
    pub fn size(self) -> usize {
        match self {
            CimTypeTag::UInt8 => 1,
            CimTypeTag::Boolean | CimTypeTag::UInt16 => 2,
            CimTypeTag::LangId
            | CimTypeTag::Real32
            | CimTypeTag::String
            | CimTypeTag::UInt32
            | CimTypeTag::DateTime => 4,
            CimTypeTag::UInt64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CimTypeTag::LangId => "LANGID",
            CimTypeTag::Real32 => "REAL32",
            CimTypeTag::String => "STRING",
            CimTypeTag::Boolean => "BOOLEAN",
            CimTypeTag::UInt8 => "UINT8",
            CimTypeTag::UInt16 => "UINT16",
            CimTypeTag::UInt32 => "UINT32",
            CimTypeTag::UInt64 => "UINT64",
            CimTypeTag::DateTime => "DATETIME",
        }
    }
}

impl fmt::Display for CimTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed type descriptor: scalar of `tag`, or array of `tag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CimType {
    tag: CimTypeTag,
    is_array: bool,
}

impl CimType {
    pub const fn scalar(tag: CimTypeTag) -> Self {
        CimType {
            tag,
            is_array: false,
        }
    }

    pub const fn array_of(tag: CimTypeTag) -> Self {
        CimType {
            tag,
            is_array: true,
        }
    }

    pub(crate) fn from_cursor(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        let offset = cursor.position();
        let [tag, array_flag, _, _] = cursor.array::<4>("cim type")?;
        let tag = CimTypeTag::from_u8(tag)
            .ok_or(DeserializationError::UnknownCimType { value: tag, offset })?;

        Ok(CimType {
            tag,
            is_array: array_flag == CIM_ARRAY_FLAG,
        })
    }

    pub fn tag(&self) -> CimTypeTag {
        self.tag
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// The descriptor of a single element of this type (itself, for scalars).
    pub fn element_type(&self) -> CimType {
        CimType::scalar(self.tag)
    }

    /// Width of this type's slot in a value table.
    pub fn slot_size(&self) -> usize {
        if self.is_array {
            CIM_ARRAY_REF_SIZE
        } else {
            self.tag.size()
        }
    }

    /// Read one on-disk slot of this type, without dereferencing it.
    pub(crate) fn read_raw(&self, cursor: &mut ByteCursor<'_>) -> DeserializationResult<RawValue> {
        if self.is_array {
            return Ok(RawValue::U32(cursor.u32_named("array reference")?));
        }

        let raw = match self.tag {
            CimTypeTag::UInt8 => RawValue::U8(cursor.u8_named("uint8 value")?),
            CimTypeTag::Boolean => RawValue::U16(cursor.u16_named("boolean value")?),
            CimTypeTag::UInt16 => RawValue::U16(cursor.u16_named("uint16 value")?),
            CimTypeTag::Real32 => RawValue::F32(cursor.f32_named("real32 value")?),
            CimTypeTag::LangId | CimTypeTag::UInt32 => {
                RawValue::U32(cursor.u32_named("uint32 value")?)
            }
            CimTypeTag::String => RawValue::U32(cursor.u32_named("string reference")?),
            CimTypeTag::DateTime => RawValue::U32(cursor.u32_named("datetime reference")?),
            CimTypeTag::UInt64 => RawValue::U64(cursor.u64_named("uint64 value")?),
        };
        Ok(raw)
    }
}

impl fmt::Display for CimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_array {
            write!(f, "arrayref to {}", self.tag)
        } else {
            write!(f, "{}", self.tag)
        }
    }
}

/// A fixed-width slot exactly as read from disk, before any heap dereference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
}

impl RawValue {
    /// The slot interpreted as an unsigned integer (references, counts, flags).
    pub fn as_u64(&self) -> u64 {
        match *self {
            RawValue::U8(v) => u64::from(v),
            RawValue::U16(v) => u64::from(v),
            RawValue::U32(v) => u64::from(v),
            RawValue::U64(v) => v,
            RawValue::F32(v) => u64::from(v.to_bits()),
        }
    }

    /// The slot interpreted as a 4 byte heap reference.
    pub fn as_ref_u32(&self) -> u32 {
        self.as_u64() as u32
    }
}

/// A fully resolved value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CimValue {
    LangId(u32),
    Real32(f32),
    String(String),
    Boolean(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    /// A textual CIM datetime (`yyyymmddHHMMSS.mmmmmmsUUU`) read from an instance heap.
    DateTime(String),
    /// A datetime slot inside a class definition, which is left as the raw heap reference.
    DateTimeRef(u32),
    Array(Vec<CimValue>),
}

impl CimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CimValue::String(s) | CimValue::DateTime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            CimValue::LangId(v) | CimValue::UInt32(v) => Some(u64::from(v)),
            CimValue::UInt8(v) => Some(u64::from(v)),
            CimValue::UInt16(v) => Some(u64::from(v)),
            CimValue::UInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            CimValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CimValue]> {
        match self {
            CimValue::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for CimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CimValue::LangId(v) | CimValue::UInt32(v) | CimValue::DateTimeRef(v) => {
                write!(f, "{v}")
            }
            CimValue::Real32(v) => write!(f, "{v}"),
            CimValue::String(s) | CimValue::DateTime(s) => f.write_str(s),
            CimValue::Boolean(b) => write!(f, "{b}"),
            CimValue::UInt8(v) => write!(f, "{v}"),
            CimValue::UInt16(v) => write!(f, "{v}"),
            CimValue::UInt64(v) => write!(f, "{v}"),
            CimValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_flag_requires_exact_sentinel() {
        let mut c = ByteCursor::new(&[0x13, 0x20, 0, 0]);
        assert!(CimType::from_cursor(&mut c).unwrap().is_array());

        let mut c = ByteCursor::new(&[0x13, 0x21, 0, 0]);
        assert!(!CimType::from_cursor(&mut c).unwrap().is_array());
    }

    #[test]
    fn unknown_tag_is_fatal_with_offset() {
        let buf = [0xAA, 0x07, 0x00, 0x00, 0x00];
        let mut c = ByteCursor::with_pos(&buf, 1).unwrap();
        match CimType::from_cursor(&mut c) {
            Err(DeserializationError::UnknownCimType { value, offset }) => {
                assert_eq!(value, 0x07);
                assert_eq!(offset, 1);
            }
            other => panic!("expected unknown type, got {other:?}"),
        }
    }

    #[test]
    fn slot_sizes_match_type_table() {
        let expected = [
            (CimTypeTag::LangId, 4),
            (CimTypeTag::Real32, 4),
            (CimTypeTag::String, 4),
            (CimTypeTag::Boolean, 2),
            (CimTypeTag::UInt8, 1),
            (CimTypeTag::UInt16, 2),
            (CimTypeTag::UInt32, 4),
            (CimTypeTag::UInt64, 8),
            (CimTypeTag::DateTime, 4),
        ];
        for (tag, size) in expected {
            assert_eq!(CimType::scalar(tag).slot_size(), size, "{tag}");
            assert_eq!(CimType::array_of(tag).slot_size(), 4, "{tag}[]");
            assert_eq!(CimTypeTag::from_u8(tag as u8), Some(tag));
        }
    }

    #[test]
    fn arrays_always_read_a_u32_reference() {
        let buf = 0x1122_3344_5566_7788u64.to_le_bytes();
        let mut c = ByteCursor::new(&buf);
        let raw = CimType::array_of(CimTypeTag::UInt64)
            .read_raw(&mut c)
            .unwrap();
        assert_eq!(raw, RawValue::U32(0x5566_7788));
        assert_eq!(c.pos(), 4);
    }

    #[test]
    fn display_matches_descriptor() {
        assert_eq!(CimType::array_of(CimTypeTag::String).to_string(), "arrayref to STRING");
        assert_eq!(CimType::scalar(CimTypeTag::UInt32).to_string(), "UINT32");
    }

    #[test]
    fn values_serialize_untagged() {
        let v = CimValue::Array(vec![
            CimValue::String("a".to_string()),
            CimValue::Boolean(true),
            CimValue::UInt16(7),
        ]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"["a",true,7]"#);
    }
}
