//! Qualifiers: typed metadata attached to classes, properties and instances.

use std::fmt;

use serde_json::{Map, Value};

use crate::cim_type::{CimType, CimValue, RawValue};
use crate::err::DeserializationResult;
use crate::heap::{Heap, HeapKind, HeapOffset};
use crate::utils::ByteCursor;

/// key reference (4) + reserved (1) + type descriptor (4).
pub const QUALIFIER_REFERENCE_MIN_SIZE: usize = 9;

const BUILTIN_KEY_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinQualifier {
    Key,
    ReadAccess,
    ClassNamespace,
    ClassUnknown,
    PropertyType,
}

impl BuiltinQualifier {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0x1 => Some(BuiltinQualifier::Key),
            0x3 => Some(BuiltinQualifier::ReadAccess),
            0x6 => Some(BuiltinQualifier::ClassNamespace),
            0x7 => Some(BuiltinQualifier::ClassUnknown),
            0xA => Some(BuiltinQualifier::PropertyType),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            BuiltinQualifier::Key => 0x1,
            BuiltinQualifier::ReadAccess => 0x3,
            BuiltinQualifier::ClassNamespace => 0x6,
            BuiltinQualifier::ClassUnknown => 0x7,
            BuiltinQualifier::PropertyType => 0xA,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinQualifier::Key => "key",
            BuiltinQualifier::ReadAccess => "read-access",
            BuiltinQualifier::ClassNamespace => "class-namespace",
            BuiltinQualifier::ClassUnknown => "class-unknown",
            BuiltinQualifier::PropertyType => "property-type",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QualifierKey {
    Builtin(BuiltinQualifier),
    /// A builtin id we have no name for; kept as-is rather than failing.
    UnknownBuiltin(u32),
    Named(String),
}

impl fmt::Display for QualifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierKey::Builtin(b) => f.write_str(b.name()),
            QualifierKey::UnknownBuiltin(id) => write!(f, "{id}"),
            QualifierKey::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum QualifierKeyRef<H> {
    Builtin(u32),
    Heap(HeapOffset<H>),
}

/// A qualifier as stored on disk, with its key and value still unresolved.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QualifierReference<H> {
    key: QualifierKeyRef<H>,
    value_type: CimType,
    value: RawValue,
}

impl<H: HeapKind> QualifierReference<H> {
    fn from_cursor(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        let key_reference = cursor.u32_named("qualifier key reference")?;
        let _reserved = cursor.u8_named("qualifier reserved byte")?;
        let value_type = CimType::from_cursor(cursor)?;
        let value = value_type.read_raw(cursor)?;

        let key = if key_reference & BUILTIN_KEY_FLAG != 0 {
            QualifierKeyRef::Builtin(key_reference & !BUILTIN_KEY_FLAG)
        } else {
            QualifierKeyRef::Heap(HeapOffset::new(key_reference))
        };

        Ok(QualifierReference {
            key,
            value_type,
            value,
        })
    }

    pub(crate) fn resolve(&self, heap: &Heap<'_, H>) -> DeserializationResult<Qualifier> {
        let key = match self.key {
            QualifierKeyRef::Builtin(id) => match BuiltinQualifier::from_id(id) {
                Some(builtin) => QualifierKey::Builtin(builtin),
                None => QualifierKey::UnknownBuiltin(id),
            },
            QualifierKeyRef::Heap(offset) => QualifierKey::Named(heap.string(offset)?),
        };

        Ok(Qualifier {
            key,
            value_type: self.value_type,
            value: heap.resolve(self.value, self.value_type)?,
        })
    }
}

/// Read a size-bounded qualifier list.
///
/// The list starts with its total size (including the size field itself); references are
/// read while at least [`QUALIFIER_REFERENCE_MIN_SIZE`] bytes of the declared size remain.
/// The cursor is left after the last reference read.
pub(crate) fn read_qualifier_list<H: HeapKind>(
    cursor: &mut ByteCursor<'_>,
) -> DeserializationResult<Vec<QualifierReference<H>>> {
    let start = cursor.pos();
    let size = cursor.u32_named("qualifier list size")? as usize;
    let end = start.saturating_add(size);

    let mut qualifiers = Vec::new();
    while cursor.pos() + QUALIFIER_REFERENCE_MIN_SIZE <= end {
        qualifiers.push(QualifierReference::from_cursor(cursor)?);
    }
    Ok(qualifiers)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    pub key: QualifierKey,
    pub value_type: CimType,
    pub value: CimValue,
}

/// The resolved qualifiers of one class, property or instance, in on-disk order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Qualifiers(Vec<Qualifier>);

impl Qualifiers {
    pub(crate) fn resolve<H: HeapKind>(
        references: &[QualifierReference<H>],
        heap: &Heap<'_, H>,
    ) -> DeserializationResult<Self> {
        references
            .iter()
            .map(|r| r.resolve(heap))
            .collect::<DeserializationResult<Vec<_>>>()
            .map(Qualifiers)
    }

    /// Look a qualifier up by its display name; a later duplicate shadows an earlier one.
    pub fn get(&self, name: &str) -> Option<&CimValue> {
        self.0
            .iter()
            .rev()
            .find(|q| q.key.to_string() == name)
            .map(|q| &q.value)
    }

    pub fn get_builtin(&self, builtin: BuiltinQualifier) -> Option<&CimValue> {
        self.0
            .iter()
            .rev()
            .find(|q| q.key == QualifierKey::Builtin(builtin))
            .map(|q| &q.value)
    }

    pub fn contains_builtin(&self, builtin: BuiltinQualifier) -> bool {
        self.get_builtin(builtin).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.0.len());
        for q in &self.0 {
            map.insert(q.key.to_string(), serde_json::to_value(&q.value).unwrap_or(Value::Null));
        }
        Value::Object(map)
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", q.key, q.value)?;
        }
        Ok(())
    }
}
