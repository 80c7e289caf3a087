use std::fmt;

use serde_json::{Value, json};

use crate::cim_type::CimType;
use crate::err::DeserializationResult;
use crate::heap::{ClassDataHeap, Heap, HeapOffset};
use crate::qualifier::{BuiltinQualifier, Qualifiers, read_qualifier_list};

/// One entry of a class definition's property reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    pub offset_property_name: HeapOffset<ClassDataHeap>,
    pub offset_property_struct: HeapOffset<ClassDataHeap>,
}

/// A property declared by one class definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    cim_type: CimType,
    entry_number: u16,
    qualifiers: Qualifiers,
}

impl Property {
    /// Resolve a property out of its declaring class definition's heap.
    ///
    /// The property struct is: type (4), entry number (2), two unknown `u32`s, qualifier list.
    pub(crate) fn resolve(
        heap: &Heap<'_, ClassDataHeap>,
        reference: &PropertyReference,
    ) -> DeserializationResult<Self> {
        let name = heap.string(reference.offset_property_name)?;

        let mut cursor = heap.cursor_at(reference.offset_property_struct, "property struct")?;
        let cim_type = CimType::from_cursor(&mut cursor)?;
        let entry_number = cursor.u16_named("property entry number")?;
        let _unk1 = cursor.u32_named("property unk1")?;
        let _unk2 = cursor.u32_named("property unk2")?;
        let references = read_qualifier_list::<ClassDataHeap>(&mut cursor)?;
        let qualifiers = Qualifiers::resolve(&references, heap)?;

        Ok(Property {
            name,
            cim_type,
            entry_number,
            qualifiers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cim_type(&self) -> CimType {
        self.cim_type
    }

    /// Declaration order of this property within its class.
    pub fn entry_number(&self) -> u16 {
        self.entry_number
    }

    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Whether the property is part of the instance key.
    pub fn is_key(&self) -> bool {
        self.qualifiers
            .get_builtin(BuiltinQualifier::Key)
            .is_some_and(|v| v.as_bool().unwrap_or(true))
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "type": self.cim_type.to_string(),
            "entry_number": self.entry_number,
            "qualifiers": self.qualifiers.to_json(),
        })
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Property(name: {}, type: {}, qualifiers: {})",
            self.name, self.cim_type, self.qualifiers
        )
    }
}
