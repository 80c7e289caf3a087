//! Record-private data heaps.
//!
//! Class definitions and class instances each carry a trailing variable-length region holding
//! strings and arrays; everything else in the record refers into it by offset. A
//! [`HeapOffset`] is tagged with the kind of heap it belongs to, so an offset read from an
//! instance can't be resolved against a class definition's heap (or vice versa).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use encoding::EncodingRef;

use crate::cim_type::{CimType, CimTypeTag, CimValue, RawValue};
use crate::err::DeserializationResult;
use crate::utils::{ByteCursor, decode_ansi};

/// Per-heap decoding rules.
pub trait HeapKind {
    /// Instance heaps hold datetimes as strings; class definitions leave them as references.
    const DATETIME_AS_TEXT: bool;
    /// Instance heaps use reference 0 to mean "no array data".
    const NULL_ARRAY_IS_EMPTY: bool;
}

/// The heap at the end of a class definition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassDataHeap {}

/// The heap at the end of a class instance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceDataHeap {}

impl HeapKind for ClassDataHeap {
    const DATETIME_AS_TEXT: bool = false;
    const NULL_ARRAY_IS_EMPTY: bool = false;
}

impl HeapKind for InstanceDataHeap {
    const DATETIME_AS_TEXT: bool = true;
    const NULL_ARRAY_IS_EMPTY: bool = true;
}

/// An offset into one specific kind of heap.
pub struct HeapOffset<H> {
    offset: u32,
    _heap: PhantomData<fn() -> H>,
}

impl<H> HeapOffset<H> {
    pub(crate) const fn new(offset: u32) -> Self {
        HeapOffset {
            offset,
            _heap: PhantomData,
        }
    }

    pub fn get(self) -> u32 {
        self.offset
    }
}

impl<H> Clone for HeapOffset<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for HeapOffset<H> {}

impl<H> PartialEq for HeapOffset<H> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<H> Eq for HeapOffset<H> {}

impl<H> Hash for HeapOffset<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.offset.hash(state)
    }
}

impl<H> fmt::Debug for HeapOffset<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapOffset(0x{:x})", self.offset)
    }
}

/// A borrowed view over one record's heap.
pub(crate) struct Heap<'a, H> {
    data: &'a [u8],
    ansi_codec: EncodingRef,
    _heap: PhantomData<fn() -> H>,
}

impl<'a, H: HeapKind> Heap<'a, H> {
    pub(crate) fn new(data: &'a [u8], ansi_codec: EncodingRef) -> Self {
        Heap {
            data,
            ansi_codec,
            _heap: PhantomData,
        }
    }

    pub(crate) fn cursor_at(
        &self,
        at: HeapOffset<H>,
        what: &'static str,
    ) -> DeserializationResult<ByteCursor<'a>> {
        ByteCursor::with_pos(self.data, at.get() as usize).map_err(|_| {
            crate::utils::bytes::truncated(what, at.get() as usize, 1, self.data.len())
        })
    }

    /// A heap string: one reserved byte, then bytes up to a NUL terminator.
    pub(crate) fn string(&self, at: HeapOffset<H>) -> DeserializationResult<String> {
        let mut cursor = self.cursor_at(at, "heap string")?;
        let _reserved = cursor.u8_named("heap string prefix")?;
        let bytes = cursor.null_terminated_bytes("heap string")?;
        decode_ansi(bytes, self.ansi_codec)
    }

    /// An array: a `u32` element count, then tightly packed elements of `element_type`.
    pub(crate) fn array(
        &self,
        at: HeapOffset<H>,
        element_type: CimType,
    ) -> DeserializationResult<Vec<CimValue>> {
        if H::NULL_ARRAY_IS_EMPTY && at.get() == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = self.cursor_at(at, "array")?;
        let count = cursor.u32_named("array element count")? as usize;

        // Don't trust `count` for the allocation, the heap bounds every element anyway.
        let room = self.data.len().saturating_sub(cursor.pos()) / element_type.slot_size();
        let mut items = Vec::with_capacity(count.min(room));
        for _ in 0..count {
            let raw = element_type.read_raw(&mut cursor)?;
            items.push(self.resolve(raw, element_type)?);
        }
        Ok(items)
    }

    /// Turn a raw slot into a value, dereferencing into this heap where the type requires it.
    pub(crate) fn resolve(&self, raw: RawValue, ty: CimType) -> DeserializationResult<CimValue> {
        if ty.is_array() {
            let items = self.array(HeapOffset::new(raw.as_ref_u32()), ty.element_type())?;
            return Ok(CimValue::Array(items));
        }

        let value = match ty.tag() {
            CimTypeTag::String => CimValue::String(self.string(HeapOffset::new(raw.as_ref_u32()))?),
            CimTypeTag::DateTime if H::DATETIME_AS_TEXT => {
                CimValue::DateTime(self.string(HeapOffset::new(raw.as_ref_u32()))?)
            }
            CimTypeTag::DateTime => CimValue::DateTimeRef(raw.as_ref_u32()),
            CimTypeTag::Boolean => CimValue::Boolean(raw.as_u64() != 0),
            CimTypeTag::LangId => CimValue::LangId(raw.as_ref_u32()),
            CimTypeTag::Real32 => match raw {
                RawValue::F32(v) => CimValue::Real32(v),
                other => CimValue::Real32(f32::from_bits(other.as_ref_u32())),
            },
            CimTypeTag::UInt8 => CimValue::UInt8(raw.as_u64() as u8),
            CimTypeTag::UInt16 => CimValue::UInt16(raw.as_u64() as u16),
            CimTypeTag::UInt32 => CimValue::UInt32(raw.as_ref_u32()),
            CimTypeTag::UInt64 => CimValue::UInt64(raw.as_u64()),
        };
        Ok(value)
    }
}
