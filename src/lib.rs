#![deny(unused_must_use)]
#![forbid(unsafe_code)]
// Don't allow dbg! prints in release.
#![cfg_attr(not(debug_assertions), deny(clippy::dbg_macro))]

pub use cim_type::{CIM_ARRAY_FLAG, CimType, CimTypeTag, CimValue, RawValue};
pub use class_definition::{ClassDefinition, ClassDefinitionHeader, SuperClassLink};
pub use class_instance::{
    ClassInstance, ClassInstanceHeader, INSTANCE_HEADER_SIZE, PaddingRule, recover_padding,
    try_candidate,
};
pub use class_layout::{ClassDefinitionProvider, ClassLayout};
pub use heap::{ClassDataHeap, HeapKind, HeapOffset, InstanceDataHeap};
pub use object_resolver::{
    ClassDefinitionSpecifier, ClassInstanceSpecifier, KeyIndex, NAMESPACE_CLASS_NAME,
    NamespaceSpecifier, ObjectCache, ObjectResolver, ObjectStore, ROOT_NAMESPACE_NAME,
    ResolverSettings, SYSTEM_NAMESPACE_NAME,
};
pub use path_key::{KeyTag, PathKey, PathSegment};
pub use property::{Property, PropertyReference};
pub use qualifier::{BuiltinQualifier, Qualifier, QualifierKey, Qualifiers};
pub use tree::{Tree, TreeClassDefinition, TreeClassInstance, TreeNamespace};

mod cim_type;
mod class_definition;
mod class_instance;
mod class_layout;
pub mod err;
mod heap;
mod object_resolver;
mod path_key;
mod property;
mod qualifier;
mod tree;
mod utils;
