//! Class definition records.
//!
//! A class definition holds one class's own schema: its super-class link, class-level
//! qualifiers and the properties it declares (inherited properties live in the ancestors'
//! records, see [`crate::ClassLayout`]).
//!
//! ```text
//! header | qualifier list | property reference table | junk | data length | heap
//! ```

use std::fmt::{self, Debug, Formatter};
use std::ops::Range;

use encoding::EncodingRef;
use jiff::Timestamp;
use log::{trace, warn};
use serde_json::{Value, json};

use crate::cim_type::{CimType, CimValue, RawValue};
use crate::err::DeserializationResult;
use crate::heap::{ClassDataHeap, Heap, HeapOffset};
use crate::property::{Property, PropertyReference};
use crate::qualifier::{Qualifiers, read_qualifier_list};
use crate::utils::{ByteCursor, decode_ansi, filetime_to_timestamp};

/// The super-class fields of a class definition header.
///
/// The length of the UTF-16 super-class name decides which variant is on disk; for a root
/// class the name, its ASCII mirror and the trailing `unk4` are all absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperClassLink {
    Root,
    Derived {
        name: String,
        ascii_name: String,
        unk4: u32,
    },
}

impl SuperClassLink {
    pub fn name(&self) -> &str {
        match self {
            SuperClassLink::Root => "",
            SuperClassLink::Derived { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinitionHeader {
    pub super_class: SuperClassLink,
    pub timestamp: Timestamp,
    pub unk0: u8,
    /// Base of the instance padding formula.
    pub unk1: u32,
    pub offset_class_name: HeapOffset<ClassDataHeap>,
    pub junk_length: u32,
    /// Selects how instances of this class compute their padding (0x17, 0x18, 0x19).
    pub junk_marker: u32,
}

impl ClassDefinitionHeader {
    fn from_cursor(
        cursor: &mut ByteCursor<'_>,
        ansi_codec: EncodingRef,
    ) -> DeserializationResult<Self> {
        let super_class_len = cursor.u32_named("super class name length")? as usize;
        let super_class_name = match super_class_len {
            0 => None,
            n => Some(cursor.utf16_by_char_count(n, "super class name")?),
        };

        let timestamp = filetime_to_timestamp(cursor.u64_named("class timestamp")?)?;
        let unk0 = cursor.u8_named("class header unk0")?;
        let unk1 = cursor.u32_named("class header unk1")?;
        let offset_class_name = HeapOffset::new(cursor.u32_named("class name offset")?);
        let junk_length = cursor.u32_named("junk length")?;
        let junk_marker = cursor.u32_named("junk marker")?;

        let super_class = match super_class_name {
            None => SuperClassLink::Root,
            Some(name) => {
                let _reserved = cursor.u8_named("super class ascii prefix")?;
                let ascii = cursor.null_terminated_bytes("super class ascii name")?;
                let ascii_name = decode_ansi(ascii, ansi_codec)?;
                let unk4 = cursor.u32_named("class header unk4")?;
                SuperClassLink::Derived {
                    name,
                    ascii_name,
                    unk4,
                }
            }
        };

        Ok(ClassDefinitionHeader {
            super_class,
            timestamp,
            unk0,
            unk1,
            offset_class_name,
            junk_length,
            junk_marker,
        })
    }
}

/// A decoded class definition record.
///
/// The record buffer is kept; names, qualifiers and properties are resolved against its heap
/// when the definition is built, so a definition that decodes once never fails later.
pub struct ClassDefinition {
    buf: Vec<u8>,
    header: ClassDefinitionHeader,
    class_name: String,
    qualifiers: Qualifiers,
    property_references: Vec<PropertyReference>,
    properties: Vec<Property>,
    junk: Range<usize>,
    data: Range<usize>,
    ansi_codec: EncodingRef,
}

impl ClassDefinition {
    pub fn from_buffer(buf: Vec<u8>, ansi_codec: EncodingRef) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(&buf);
        let header = ClassDefinitionHeader::from_cursor(&mut cursor, ansi_codec)?;

        let qualifier_references = read_qualifier_list::<ClassDataHeap>(&mut cursor)?;

        let property_count = cursor.u32_named("property reference count")? as usize;
        // Each reference is 8 bytes; bound the allocation by what the buffer can hold.
        let mut property_references = Vec::with_capacity(
            property_count.min(buf.len().saturating_sub(cursor.pos()) / 8),
        );
        for _ in 0..property_count {
            property_references.push(PropertyReference {
                offset_property_name: HeapOffset::new(cursor.u32_named("property name offset")?),
                offset_property_struct: HeapOffset::new(
                    cursor.u32_named("property struct offset")?,
                ),
            });
        }

        let junk_start = cursor.pos();
        cursor.advance(header.junk_length as usize, "class definition junk")?;
        let junk = junk_start..cursor.pos();

        let data_length = cursor.masked_len_named("class data length")?;
        let data_start = cursor.pos();
        cursor.advance(data_length, "class data heap")?;
        let data = data_start..cursor.pos();

        trace!(
            "class definition: {} qualifiers, {} properties, junk {:?}, heap {:?}",
            qualifier_references.len(),
            property_count,
            junk,
            data
        );

        let heap: Heap<'_, ClassDataHeap> = Heap::new(&buf[data.clone()], ansi_codec);
        let class_name = heap.string(header.offset_class_name)?;
        let qualifiers = Qualifiers::resolve(&qualifier_references, &heap)?;
        let properties = property_references
            .iter()
            .map(|r| Property::resolve(&heap, r))
            .collect::<DeserializationResult<Vec<_>>>()?;

        for (i, p) in properties.iter().enumerate() {
            if properties[..i]
                .iter()
                .any(|other| other.entry_number() == p.entry_number())
            {
                warn!(
                    "class `{}` declares entry number {} more than once (property `{}`)",
                    class_name,
                    p.entry_number(),
                    p.name()
                );
            }
        }

        Ok(ClassDefinition {
            buf,
            header,
            class_name,
            qualifiers,
            property_references,
            properties,
            junk,
            data,
            ansi_codec,
        })
    }

    pub fn header(&self) -> &ClassDefinitionHeader {
        &self.header
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The direct super class, or `""` for the root of a hierarchy.
    pub fn super_class_name(&self) -> &str {
        self.header.super_class.name()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.timestamp
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    pub fn property_references(&self) -> &[PropertyReference] {
        &self.property_references
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Properties declared by this class, in reference table order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// A property by name. If a name is declared twice the later declaration wins.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().rev().find(|p| p.name() == name)
    }

    /// Resolve a raw slot against this definition's heap.
    pub fn get_value(&self, raw: RawValue, value_type: CimType) -> DeserializationResult<CimValue> {
        self.heap().resolve(raw, value_type)
    }

    pub fn get_string(&self, offset: HeapOffset<ClassDataHeap>) -> DeserializationResult<String> {
        self.heap().string(offset)
    }

    pub fn junk(&self) -> &[u8] {
        &self.buf[self.junk.clone()]
    }

    /// The private heap.
    pub fn data(&self) -> &[u8] {
        &self.buf[self.data.clone()]
    }

    pub fn ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    fn heap(&self) -> Heap<'_, ClassDataHeap> {
        Heap::new(self.data(), self.ansi_codec)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.class_name,
            "super_class": self.super_class_name(),
            "timestamp": self.header.timestamp.to_string(),
            "qualifiers": self.qualifiers.to_json(),
            "properties": self.properties.iter().map(Property::to_json).collect::<Vec<_>>(),
        })
    }
}

impl Debug for ClassDefinition {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("ClassDefinition")
            .field("class_name", &self.class_name)
            .field("super_class", &self.super_class_name())
            .field("timestamp", &self.header.timestamp)
            .field("junk_marker", &self.header.junk_marker)
            .field("properties", &self.properties.len())
            .field("encoding", &self.ansi_codec.name())
            .finish()
    }
}

impl fmt::Display for ClassDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ClassDefinition(name: {})", self.class_name)
    }
}
