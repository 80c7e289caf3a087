//! A lazy, read-only view of a repository as a namespace tree.
//!
//! Every node is a thin handle around the shared [`ObjectResolver`]; nothing is decoded until
//! a node is asked for its children or its definition.

use std::fmt;
use std::sync::Arc;

use crate::class_definition::ClassDefinition;
use crate::class_instance::ClassInstance;
use crate::class_layout::ClassLayout;
use crate::err::Result;
use crate::object_resolver::{KeyIndex, ObjectResolver, ObjectStore, ROOT_NAMESPACE_NAME, ResolverSettings};

pub struct Tree<I, S> {
    resolver: Arc<ObjectResolver<I, S>>,
}

impl<I, S> Tree<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    pub fn new(index: I, store: S) -> Self {
        Self::from_resolver(Arc::new(ObjectResolver::new(index, store)))
    }

    pub fn with_settings(index: I, store: S, settings: ResolverSettings) -> Self {
        Self::from_resolver(Arc::new(ObjectResolver::with_settings(index, store, settings)))
    }

    pub fn from_resolver(resolver: Arc<ObjectResolver<I, S>>) -> Self {
        Tree { resolver }
    }

    pub fn resolver(&self) -> &Arc<ObjectResolver<I, S>> {
        &self.resolver
    }

    pub fn root(&self) -> TreeNamespace<I, S> {
        TreeNamespace::new(Arc::clone(&self.resolver), ROOT_NAMESPACE_NAME.to_string())
    }
}

impl<I, S> fmt::Display for Tree<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Tree")
    }
}

pub struct TreeNamespace<I, S> {
    resolver: Arc<ObjectResolver<I, S>>,
    name: String,
}

impl<I, S> TreeNamespace<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    fn new(resolver: Arc<ObjectResolver<I, S>>, name: String) -> Self {
        TreeNamespace { resolver, name }
    }

    /// Full path, e.g. `root\CIMV2`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enclosing namespace; `None` for `root`.
    pub fn parent(&self) -> Option<TreeNamespace<I, S>> {
        if self.name == ROOT_NAMESPACE_NAME {
            return None;
        }
        let (parent, _) = self.name.rsplit_once('\\')?;
        Some(TreeNamespace::new(Arc::clone(&self.resolver), parent.to_string()))
    }

    pub fn namespaces(&self) -> Result<impl Iterator<Item = Result<TreeNamespace<I, S>>> + '_> {
        Ok(self
            .resolver
            .child_namespaces(&self.name)?
            .map(|ns| Ok(TreeNamespace::new(Arc::clone(&self.resolver), ns?.namespace_name))))
    }

    pub fn classes(&self) -> Result<impl Iterator<Item = Result<TreeClassDefinition<I, S>>> + '_> {
        Ok(self
            .resolver
            .child_class_definitions(&self.name)?
            .map(|cd| {
                let cd = cd?;
                Ok(TreeClassDefinition::new(
                    Arc::clone(&self.resolver),
                    cd.namespace_name,
                    cd.class_name,
                ))
            }))
    }

    pub fn class(&self, class_name: &str) -> TreeClassDefinition<I, S> {
        TreeClassDefinition::new(
            Arc::clone(&self.resolver),
            self.name.clone(),
            class_name.to_string(),
        )
    }
}

impl<I, S> fmt::Display for TreeNamespace<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace(name: {})", self.name)
    }
}

pub struct TreeClassDefinition<I, S> {
    resolver: Arc<ObjectResolver<I, S>>,
    namespace: String,
    name: String,
}

impl<I, S> TreeClassDefinition<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    fn new(resolver: Arc<ObjectResolver<I, S>>, namespace: String, name: String) -> Self {
        TreeClassDefinition {
            resolver,
            namespace,
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_name(&self) -> &str {
        &self.namespace
    }

    pub fn namespace(&self) -> TreeNamespace<I, S> {
        TreeNamespace::new(Arc::clone(&self.resolver), self.namespace.clone())
    }

    pub fn definition(&self) -> Result<Arc<ClassDefinition>> {
        self.resolver.class_definition(&self.namespace, &self.name)
    }

    pub fn layout(&self) -> Result<Arc<ClassLayout>> {
        self.resolver.class_layout(&self.namespace, &self.name)
    }

    pub fn instances(&self) -> Result<impl Iterator<Item = Result<TreeClassInstance<I, S>>> + '_> {
        Ok(self
            .resolver
            .class_instance_specifiers(&self.namespace, &self.name)?
            .map(|ci| {
                let ci = ci?;
                Ok(TreeClassInstance {
                    resolver: Arc::clone(&self.resolver),
                    namespace: ci.namespace_name,
                    class_name: ci.class_name,
                    instance_name: ci.instance_name,
                })
            }))
    }
}

impl<I, S> fmt::Display for TreeClassDefinition<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassDefinition(namespace: {}, name: {})",
            self.namespace, self.name
        )
    }
}

pub struct TreeClassInstance<I, S> {
    resolver: Arc<ObjectResolver<I, S>>,
    namespace: String,
    class_name: String,
    instance_name: String,
}

impl<I, S> TreeClassInstance<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    pub fn name(&self) -> &str {
        &self.instance_name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn class_definition(&self) -> TreeClassDefinition<I, S> {
        TreeClassDefinition::new(
            Arc::clone(&self.resolver),
            self.namespace.clone(),
            self.class_name.clone(),
        )
    }

    pub fn namespace(&self) -> TreeNamespace<I, S> {
        TreeNamespace::new(Arc::clone(&self.resolver), self.namespace.clone())
    }

    /// Fetch and decode the instance record.
    pub fn instance(&self) -> Result<ClassInstance> {
        self.resolver
            .class_instance(&self.namespace, &self.class_name, &self.instance_name)
    }
}

impl<I, S> fmt::Display for TreeClassInstance<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassInstance(namespace: {}, class: {}, name: {})",
            self.namespace, self.class_name, self.instance_name
        )
    }
}
