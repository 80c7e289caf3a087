//! Class instance records.
//!
//! ```text
//! name hash (64 UTF-16 units) | FILETIME | FILETIME | data length      <- 0x94 bytes
//! padding (length recovered from the class definition header)
//! value table (one fixed-width slot per layout property)
//! qualifier list | flag (0x01) | property data length | heap
//! ```
//!
//! Every reference in an instance resolves against the instance's own heap. The heap starts
//! with the instance's class name.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use jiff::Timestamp;
use log::trace;
use serde_json::{Map, Value};

use crate::cim_type::{CimValue, RawValue};
use crate::class_layout::ClassLayout;
use crate::err::{DeserializationError, DeserializationResult};
use crate::heap::{Heap, HeapOffset, InstanceDataHeap};
use crate::property::Property;
use crate::qualifier::{Qualifiers, read_qualifier_list};
use crate::utils::bytes::read_u32_le;
use crate::utils::{ByteCursor, read_filetime};

pub const INSTANCE_HEADER_SIZE: usize = 0x94;
pub const NAME_HASH_UNITS: usize = 64;

/// Extra padding offsets tried, in order, for classes with the 0x17 marker.
pub const PADDING_SEARCH_CANDIDATES: &[u32] = &[5, 6];

const INSTANCE_FLAG_STATIC: u8 = 0x1;
const FALLBACK_KEY_PROPERTY: &str = "Name";

/// How the padding between the instance header and its value table is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingRule {
    /// `unk1 + extra`
    Fixed { extra: u32 },
    /// Try each of [`PADDING_SEARCH_CANDIDATES`] until the trailing lengths add up.
    Search,
}

impl PaddingRule {
    pub fn from_marker(marker: u32) -> Self {
        match marker {
            0x18 => PaddingRule::Fixed { extra: 6 },
            0x19 => PaddingRule::Fixed { extra: 5 },
            0x17 => PaddingRule::Search,
            _ => PaddingRule::Fixed { extra: 5 },
        }
    }

    pub fn padding_length(
        self,
        buf: &[u8],
        unk1: u32,
        toc_length: usize,
    ) -> DeserializationResult<usize> {
        match self {
            PaddingRule::Fixed { extra } => Ok(unk1 as usize + extra as usize),
            PaddingRule::Search => recover_padding(buf, unk1, toc_length),
        }
    }
}

/// Test one padding candidate against an instance buffer.
///
/// Assuming padding `unk1 + candidate`, the value table ends at
/// `0x94 + unk1 + candidate + toc_length`. The qualifier list size is read there and the
/// heap length right after the qualifier list and the flag byte. The candidate is accepted
/// only if the heap then ends exactly at the end of the buffer. Returns the padding length.
pub fn try_candidate(buf: &[u8], unk1: u32, candidate: u32, toc_length: usize) -> Option<usize> {
    let toc_end = INSTANCE_HEADER_SIZE
        .checked_add(unk1 as usize)?
        .checked_add(candidate as usize)?
        .checked_add(toc_length)?;

    let qualifiers_length = read_u32_le(buf, toc_end)? as usize;
    if qualifiers_length > buf.len() {
        return None;
    }

    let data_length_at = toc_end + qualifiers_length + 1;
    let property_data_length = (read_u32_le(buf, data_length_at)? & 0x7FFF_FFFF) as usize;

    if toc_end + qualifiers_length + 5 + property_data_length == buf.len() {
        Some(unk1 as usize + candidate as usize)
    } else {
        None
    }
}

/// Recover the padding length of a 0x17 class instance, see [`try_candidate`].
pub fn recover_padding(buf: &[u8], unk1: u32, toc_length: usize) -> DeserializationResult<usize> {
    for &candidate in PADDING_SEARCH_CANDIDATES {
        match try_candidate(buf, unk1, candidate, toc_length) {
            Some(padding) => {
                trace!("padding candidate {candidate} accepted (padding {padding})");
                return Ok(padding);
            }
            None => trace!("padding candidate {candidate} rejected"),
        }
    }

    Err(DeserializationError::PaddingRecoveryFailed {
        base: unk1,
        candidates: PADDING_SEARCH_CANDIDATES,
        len: buf.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInstanceHeader {
    pub name_hash: String,
    pub timestamp1: Timestamp,
    pub timestamp2: Timestamp,
    pub data_length: u32,
}

impl ClassInstanceHeader {
    fn from_cursor(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        Ok(ClassInstanceHeader {
            name_hash: cursor.utf16_by_char_count(NAME_HASH_UNITS, "instance name hash")?,
            timestamp1: read_filetime(cursor, "instance timestamp1")?,
            timestamp2: read_filetime(cursor, "instance timestamp2")?,
            data_length: cursor.u32_named("instance data length")?,
        })
    }
}

/// A decoded class instance. Property values are resolved on access.
pub struct ClassInstance {
    buf: Vec<u8>,
    layout: Arc<ClassLayout>,
    header: ClassInstanceHeader,
    padding: usize,
    toc: Vec<RawValue>,
    toc_range: Range<usize>,
    qualifiers: Qualifiers,
    data: Range<usize>,
}

impl ClassInstance {
    pub fn from_buffer(buf: Vec<u8>, layout: Arc<ClassLayout>) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(&buf);
        let header = ClassInstanceHeader::from_cursor(&mut cursor)?;

        let class_header = layout.class_definition().header();
        let padding = PaddingRule::from_marker(class_header.junk_marker).padding_length(
            &buf,
            class_header.unk1,
            layout.properties_toc_length(),
        )?;
        cursor.advance(padding, "instance padding")?;

        let toc_start = cursor.pos();
        let toc = layout
            .properties()
            .iter()
            .map(|p| p.cim_type().read_raw(&mut cursor))
            .collect::<DeserializationResult<Vec<_>>>()?;
        let toc_range = toc_start..cursor.pos();

        let qualifiers_start = cursor.pos();
        let qualifier_references = read_qualifier_list::<InstanceDataHeap>(&mut cursor)?;
        // Slack after the last entry still counts towards the declared list size.
        let qualifiers_end = read_u32_le(&buf, qualifiers_start)
            .and_then(|size| qualifiers_start.checked_add(size as usize))
            .filter(|&end| end >= cursor.pos() && end <= buf.len());
        if let Some(end) = qualifiers_end {
            cursor.set_pos(end, "instance qualifier list")?;
        }

        let flag_offset = cursor.position();
        let flag = cursor.u8_named("instance flag")?;
        if flag != INSTANCE_FLAG_STATIC {
            return Err(DeserializationError::UnsupportedInstanceVariant {
                value: flag,
                offset: flag_offset,
            });
        }

        let data_length = cursor.masked_len_named("property data length")?;
        let data_start = cursor.pos();
        cursor.advance(data_length, "property data heap")?;
        let data = data_start..cursor.pos();

        trace!(
            "instance of {}: padding {}, value table {:?}, heap {:?}",
            layout.class_definition().class_name(),
            padding,
            toc_range,
            data
        );

        let qualifiers = Qualifiers::resolve(
            &qualifier_references,
            &Heap::new(&buf[data.clone()], layout.class_definition().ansi_codec()),
        )?;

        Ok(ClassInstance {
            buf,
            layout,
            header,
            padding,
            toc,
            toc_range,
            qualifiers,
            data,
        })
    }

    fn heap(&self) -> Heap<'_, InstanceDataHeap> {
        Heap::new(&self.buf[self.data.clone()], self.layout.class_definition().ansi_codec())
    }

    pub fn header(&self) -> &ClassInstanceHeader {
        &self.header
    }

    pub fn layout(&self) -> &Arc<ClassLayout> {
        &self.layout
    }

    pub fn padding_length(&self) -> usize {
        self.padding
    }

    /// Bytes occupied by the value table.
    pub fn value_table_length(&self) -> usize {
        self.toc_range.len()
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// The private heap.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.data.clone()]
    }

    /// The class name recorded at the start of the instance heap.
    pub fn class_name(&self) -> DeserializationResult<String> {
        self.heap().string(HeapOffset::new(0))
    }

    /// The value of the `index`-th layout property.
    pub fn value_at(&self, index: usize) -> Option<DeserializationResult<CimValue>> {
        let raw = *self.toc.get(index)?;
        let property = self.layout.properties().get(index)?;
        Some(self.heap().resolve(raw, property.cim_type()))
    }

    /// Look a value up by property name; `None` if the class has no such property.
    pub fn get_property_value(&self, name: &str) -> DeserializationResult<Option<CimValue>> {
        self.property(name).map(|found| found.map(|(_, value)| value))
    }

    /// A property's schema together with its value.
    pub fn property(&self, name: &str) -> DeserializationResult<Option<(&Property, CimValue)>> {
        let Some(index) = self.layout.property_index(name) else {
            return Ok(None);
        };
        let property = &self.layout.properties()[index];
        let value = self.heap().resolve(self.toc[index], property.cim_type())?;
        Ok(Some((property, value)))
    }

    /// All values, in layout order.
    pub fn properties(&self) -> DeserializationResult<Vec<(String, CimValue)>> {
        let heap = self.heap();
        self.layout
            .properties()
            .iter()
            .zip(&self.toc)
            .map(|(p, raw)| Ok((p.name().to_string(), heap.resolve(*raw, p.cim_type())?)))
            .collect()
    }

    /// The instance's key: the values of its key-qualified properties joined by `,`.
    ///
    /// Falls back to the `Name` property for classes that declare no key. `None` if neither
    /// exists.
    pub fn key(&self) -> DeserializationResult<Option<String>> {
        let heap = self.heap();
        let mut parts = Vec::new();
        for (p, raw) in self.layout.properties().iter().zip(&self.toc) {
            if p.is_key() {
                parts.push(heap.resolve(*raw, p.cim_type())?.to_string());
            }
        }
        if !parts.is_empty() {
            return Ok(Some(parts.join(",")));
        }

        Ok(self
            .get_property_value(FALLBACK_KEY_PROPERTY)?
            .map(|v| v.to_string()))
    }

    /// The values as an ordered JSON object.
    pub fn to_json(&self) -> DeserializationResult<Value> {
        let properties = self.properties()?;
        let mut map = Map::with_capacity(properties.len());
        for (name, value) in properties {
            map.insert(name, serde_json::to_value(&value).unwrap_or(Value::Null));
        }
        Ok(Value::Object(map))
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInstance")
            .field("class", &self.layout.class_definition().class_name())
            .field("name_hash", &self.header.name_hash)
            .field("padding", &self.padding)
            .field("values", &self.toc.len())
            .field("qualifiers", &self.qualifiers.len())
            .finish()
    }
}

impl fmt::Display for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassInstance(classhash: {})", self.header.name_hash)
    }
}
