use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap as FastMap;
use log::debug;

use crate::class_definition::ClassDefinition;
use crate::class_instance::ClassInstance;
use crate::err::{CimError, DeserializationResult, Result};
use crate::property::Property;

/// Anything that can hand out class definitions by `(namespace, class)`.
///
/// [`crate::ObjectResolver`] is the real implementation; the layout resolver only needs this
/// to walk a super-class chain.
pub trait ClassDefinitionProvider {
    fn class_definition(&self, namespace: &str, class_name: &str) -> Result<Arc<ClassDefinition>>;
}

/// The flattened, inheritance-ordered property schema of a class.
///
/// Properties are ordered root ancestor first; within one class by ascending entry number.
/// Names are not de-duplicated: a class redeclaring an inherited property gets a second slot,
/// which is how instances are laid out on disk.
pub struct ClassLayout {
    namespace: String,
    class_definition: Arc<ClassDefinition>,
    /// Parent to child, ending with `class_definition`.
    derivation: Vec<Arc<ClassDefinition>>,
    properties: Vec<Property>,
    slot_offsets: Vec<usize>,
    toc_length: usize,
    by_name: FastMap<String, usize, ahash::RandomState>,
}

impl ClassLayout {
    /// Walk the super-class chain of `class_definition` and flatten it.
    ///
    /// Fails with [`CimError::CycleDetected`] if more than `max_depth` ancestors are found.
    pub fn resolve<P>(
        provider: &P,
        namespace: &str,
        class_definition: Arc<ClassDefinition>,
        max_depth: usize,
    ) -> Result<Self>
    where
        P: ClassDefinitionProvider + ?Sized,
    {
        // child to parent
        let mut derivation = vec![Arc::clone(&class_definition)];
        let mut super_class = class_definition.super_class_name().to_string();

        while !super_class.is_empty() {
            if derivation.len() > max_depth {
                return Err(CimError::CycleDetected {
                    namespace: namespace.to_string(),
                    class: class_definition.class_name().to_string(),
                    depth: max_depth,
                });
            }

            if let Some(child) = derivation.last() {
                debug!("parent of {} is {}", child.class_name(), super_class);
            }
            let parent = provider.class_definition(namespace, &super_class)?;
            super_class = parent.super_class_name().to_string();
            derivation.push(parent);
        }

        derivation.reverse();

        debug!(
            "{} derivation: {:?}",
            class_definition.class_name(),
            derivation.iter().map(|cd| cd.class_name()).collect::<Vec<_>>()
        );

        let mut properties = Vec::new();
        for cd in &derivation {
            let mut own: Vec<&Property> = cd.properties().iter().collect();
            own.sort_by_key(|p| p.entry_number());
            properties.extend(own.into_iter().cloned());
        }

        let mut slot_offsets = Vec::with_capacity(properties.len());
        let mut toc_length = 0;
        let mut by_name = FastMap::with_capacity_and_hasher(properties.len(), ahash::RandomState::new());
        for (i, p) in properties.iter().enumerate() {
            slot_offsets.push(toc_length);
            toc_length += p.cim_type().slot_size();
            // Later (more derived) declarations shadow earlier ones for name lookups.
            by_name.insert(p.name().to_string(), i);
        }

        debug!(
            "{} property layout: {:?}",
            class_definition.class_name(),
            properties.iter().map(Property::name).collect::<Vec<_>>()
        );

        Ok(ClassLayout {
            namespace: namespace.to_string(),
            class_definition,
            derivation,
            properties,
            slot_offsets,
            toc_length,
            by_name,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn class_definition(&self) -> &Arc<ClassDefinition> {
        &self.class_definition
    }

    /// The class and its ancestors, root first.
    pub fn derivation(&self) -> &[Arc<ClassDefinition>] {
        &self.derivation
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.property_index(name).map(|i| &self.properties[i])
    }

    /// Offset of property `index`'s slot from the start of the value table.
    pub fn slot_offset(&self, index: usize) -> Option<usize> {
        self.slot_offsets.get(index).copied()
    }

    /// Total width of an instance's value table.
    pub fn properties_toc_length(&self) -> usize {
        self.toc_length
    }

    /// Decode an instance record of this class.
    pub fn instance(self: &Arc<Self>, buf: Vec<u8>) -> DeserializationResult<ClassInstance> {
        ClassInstance::from_buffer(buf, Arc::clone(self))
    }
}

impl fmt::Debug for ClassLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLayout")
            .field("namespace", &self.namespace)
            .field("class", &self.class_definition.class_name())
            .field(
                "properties",
                &self.properties.iter().map(Property::name).collect::<Vec<_>>(),
            )
            .field("toc_length", &self.toc_length)
            .finish()
    }
}
