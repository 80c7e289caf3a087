//! Turns namespace/class/instance names into index keys and decoded objects.
//!
//! The repository's key index and object store are supplied by the caller through
//! [`KeyIndex`] and [`ObjectStore`]. Decoded class definitions and layouts are memoized in an
//! [`ObjectCache`] for the lifetime of the resolver, which may be shared between resolvers.

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

use encoding::EncodingRef;
use hashbrown::HashMap as FastMap;
use log::{debug, trace};

use crate::class_definition::ClassDefinition;
use crate::class_instance::ClassInstance;
use crate::class_layout::{ClassDefinitionProvider, ClassLayout};
use crate::err::{BoxError, CimError, DeserializationResult, Result};
use crate::path_key::{KeyTag, PathKey, PathSegment};
use crate::utils::encode_utf16le_upper;

pub const ROOT_NAMESPACE_NAME: &str = "root";
pub const SYSTEM_NAMESPACE_NAME: &str = "__SystemClass";
pub const NAMESPACE_CLASS_NAME: &str = "__namespace";

const DEFAULT_MAX_CLASS_DEPTH: usize = 64;

/// The repository's hash-keyed index.
pub trait KeyIndex {
    type Reference;

    /// Hash an uppercased, UTF-16LE encoded name into a key segment suffix.
    fn hash(&self, name_utf16le_upper: &[u8]) -> String;

    /// All references whose key starts with `key`. Ordering is not significant.
    fn lookup_keys(&self, key: &PathKey) -> std::result::Result<Vec<Self::Reference>, BoxError>;
}

/// The repository's object store.
pub trait ObjectStore {
    type Reference;

    fn get_object_buffer(&self, reference: &Self::Reference) -> std::result::Result<Vec<u8>, BoxError>;
}

#[derive(Clone)]
pub struct ResolverSettings {
    ansi_codec: EncodingRef,
    max_class_depth: usize,
    system_namespace: String,
    fallback_to_system_namespace: bool,
    num_threads: usize,
}

impl Debug for ResolverSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverSettings")
            .field("ansi_codec", &self.ansi_codec.name())
            .field("max_class_depth", &self.max_class_depth)
            .field("system_namespace", &self.system_namespace)
            .field("fallback_to_system_namespace", &self.fallback_to_system_namespace)
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

impl PartialEq for ResolverSettings {
    fn eq(&self, other: &Self) -> bool {
        self.ansi_codec.name() == other.ansi_codec.name()
            && self.max_class_depth == other.max_class_depth
            && self.system_namespace == other.system_namespace
            && self.fallback_to_system_namespace == other.fallback_to_system_namespace
            && self.num_threads == other.num_threads
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            ansi_codec: encoding::all::WINDOWS_1252,
            max_class_depth: DEFAULT_MAX_CLASS_DEPTH,
            system_namespace: SYSTEM_NAMESPACE_NAME.to_string(),
            fallback_to_system_namespace: true,
            num_threads: 0,
        }
    }
}

impl ResolverSettings {
    pub fn new() -> Self {
        ResolverSettings::default()
    }

    /// Codec for heap strings and the ASCII super-class name.
    pub fn ansi_codec(mut self, ansi_codec: EncodingRef) -> Self {
        self.ansi_codec = ansi_codec;
        self
    }

    /// Longest super-class chain accepted before it is treated as a cycle.
    pub fn max_class_depth(mut self, max_class_depth: usize) -> Self {
        self.max_class_depth = max_class_depth;
        self
    }

    pub fn system_namespace(mut self, system_namespace: impl Into<String>) -> Self {
        self.system_namespace = system_namespace.into();
        self
    }

    /// Look class definitions up in the system namespace when the requested namespace has none.
    pub fn fallback_to_system_namespace(mut self, fallback: bool) -> Self {
        self.fallback_to_system_namespace = fallback;
        self
    }

    /// Threads used to decode instances in bulk. 0 lets rayon decide.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn get_ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    pub fn get_max_class_depth(&self) -> usize {
        self.max_class_depth
    }

    pub fn get_system_namespace(&self) -> &str {
        &self.system_namespace
    }

    pub fn get_fallback_to_system_namespace(&self) -> bool {
        self.fallback_to_system_namespace
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }
}

type ClassId = (String, String);
type CacheMap<T> = FastMap<ClassId, Arc<T>, ahash::RandomState>;

/// Append-only memo of decoded class definitions and layouts, keyed by `(namespace, class)`.
///
/// Concurrent misses on the same key may both decode; the first insert wins and every caller
/// gets that entry back.
#[derive(Default)]
pub struct ObjectCache {
    class_definitions: RwLock<CacheMap<ClassDefinition>>,
    class_layouts: RwLock<CacheMap<ClassLayout>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        ObjectCache::default()
    }

    fn get<T>(map: &RwLock<CacheMap<T>>, namespace: &str, class_name: &str) -> Option<Arc<T>> {
        map.read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(namespace.to_string(), class_name.to_string()))
            .cloned()
    }

    fn insert<T>(map: &RwLock<CacheMap<T>>, namespace: &str, class_name: &str, value: Arc<T>) -> Arc<T> {
        let mut map = map.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            map.entry((namespace.to_string(), class_name.to_string()))
                .or_insert(value),
        )
    }

    pub fn class_definition(&self, namespace: &str, class_name: &str) -> Option<Arc<ClassDefinition>> {
        Self::get(&self.class_definitions, namespace, class_name)
    }

    pub fn insert_class_definition(
        &self,
        namespace: &str,
        class_name: &str,
        class_definition: Arc<ClassDefinition>,
    ) -> Arc<ClassDefinition> {
        Self::insert(&self.class_definitions, namespace, class_name, class_definition)
    }

    pub fn class_layout(&self, namespace: &str, class_name: &str) -> Option<Arc<ClassLayout>> {
        Self::get(&self.class_layouts, namespace, class_name)
    }

    pub fn insert_class_layout(
        &self,
        namespace: &str,
        class_name: &str,
        class_layout: Arc<ClassLayout>,
    ) -> Arc<ClassLayout> {
        Self::insert(&self.class_layouts, namespace, class_name, class_layout)
    }

    pub fn class_definition_count(&self) -> usize {
        self.class_definitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn class_layout_count(&self) -> usize {
        self.class_layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Debug for ObjectCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("class_definitions", &self.class_definition_count())
            .field("class_layouts", &self.class_layout_count())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceSpecifier {
    pub namespace_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDefinitionSpecifier {
    pub namespace_name: String,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassInstanceSpecifier {
    pub namespace_name: String,
    pub class_name: String,
    pub instance_name: String,
}

pub struct ObjectResolver<I, S> {
    index: I,
    store: S,
    settings: ResolverSettings,
    cache: Arc<ObjectCache>,
}

impl<I, S> ObjectResolver<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    pub fn new(index: I, store: S) -> Self {
        Self::with_settings(index, store, ResolverSettings::default())
    }

    pub fn with_settings(index: I, store: S, settings: ResolverSettings) -> Self {
        Self::with_cache(index, store, settings, Arc::new(ObjectCache::new()))
    }

    /// Use a caller owned cache, e.g. to share decoded classes between resolvers over the
    /// same repository.
    pub fn with_cache(index: I, store: S, settings: ResolverSettings, cache: Arc<ObjectCache>) -> Self {
        ObjectResolver {
            index,
            store,
            settings,
            cache,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// `tag` followed by the hash of `name`, or the bare tag.
    pub fn segment(&self, tag: KeyTag, name: Option<&str>) -> PathSegment {
        match name {
            Some(name) => PathSegment::new(tag, Some(self.index.hash(&encode_utf16le_upper(name)))),
            None => PathSegment::bare(tag),
        }
    }

    pub fn key(&self, segments: &[(KeyTag, Option<&str>)]) -> PathKey {
        PathKey::new(
            segments
                .iter()
                .map(|&(tag, name)| self.segment(tag, name))
                .collect(),
        )
    }

    fn lookup(&self, key: &PathKey) -> Result<Vec<I::Reference>> {
        self.index.lookup_keys(key).map_err(|source| CimError::Index {
            key: key.to_string(),
            source,
        })
    }

    fn fetch(&self, key: &PathKey, reference: &I::Reference) -> Result<Vec<u8>> {
        self.store
            .get_object_buffer(reference)
            .map_err(|source| CimError::Store {
                key: key.to_string(),
                source,
            })
    }

    fn exactly_one(key: &PathKey, mut references: Vec<I::Reference>) -> Result<I::Reference> {
        match references.len() {
            1 => references.pop().ok_or(CimError::AmbiguousOrMissingLookup {
                key: key.to_string(),
                found: 0,
            }),
            found => Err(CimError::AmbiguousOrMissingLookup {
                key: key.to_string(),
                found,
            }),
        }
    }

    /// The single object stored under `key`.
    pub fn get_object(&self, key: &PathKey) -> Result<Vec<u8>> {
        let reference = Self::exactly_one(key, self.lookup(key)?)?;
        self.fetch(key, &reference)
    }

    /// Every object stored under `key`, fetched as the iterator is advanced.
    pub fn get_objects<'a>(
        &'a self,
        key: &'a PathKey,
    ) -> Result<impl Iterator<Item = Result<Vec<u8>>> + 'a> {
        let references = self.lookup(key)?;
        trace!("{} objects under {}", references.len(), key);
        Ok(references
            .into_iter()
            .map(move |reference| self.fetch(key, &reference)))
    }

    /// The class definition of `namespace:class_name`.
    ///
    /// Classes missing from `namespace` are looked up in the system namespace.
    pub fn class_definition(&self, namespace: &str, class_name: &str) -> Result<Arc<ClassDefinition>> {
        if let Some(cd) = self.cache.class_definition(namespace, class_name) {
            return Ok(cd);
        }
        debug!("class definition cache miss: {namespace}:{class_name}");

        let mut key = self.key(&[
            (KeyTag::Namespace, Some(namespace)),
            (KeyTag::ClassDefinition, Some(class_name)),
        ]);
        let mut references = self.lookup(&key)?;

        let system_namespace = self.settings.get_system_namespace();
        if references.is_empty()
            && self.settings.get_fallback_to_system_namespace()
            && namespace != system_namespace
        {
            debug!("didn't find {class_name} in {namespace}, retrying in {system_namespace}");
            key = self.key(&[
                (KeyTag::Namespace, Some(system_namespace)),
                (KeyTag::ClassDefinition, Some(class_name)),
            ]);
            references = self.lookup(&key)?;
        }

        let reference = Self::exactly_one(&key, references)?;
        let buf = self.fetch(&key, &reference)?;
        let cd = ClassDefinition::from_buffer(buf, self.settings.get_ansi_codec()).map_err(
            |source| CimError::FailedToDecodeClassDefinition {
                namespace: namespace.to_string(),
                class: class_name.to_string(),
                source,
            },
        )?;

        Ok(self
            .cache
            .insert_class_definition(namespace, class_name, Arc::new(cd)))
    }

    /// The flattened layout of `namespace:class_name`.
    pub fn class_layout(&self, namespace: &str, class_name: &str) -> Result<Arc<ClassLayout>> {
        if let Some(cl) = self.cache.class_layout(namespace, class_name) {
            return Ok(cl);
        }
        debug!("class layout cache miss: {namespace}:{class_name}");

        let cd = self.class_definition(namespace, class_name)?;
        let layout = ClassLayout::resolve(self, namespace, cd, self.settings.get_max_class_depth())?;

        Ok(self
            .cache
            .insert_class_layout(namespace, class_name, Arc::new(layout)))
    }

    /// The `__namespace` class definition from the system namespace.
    pub fn namespace_class_definition(&self) -> Result<Arc<ClassDefinition>> {
        self.class_definition(self.settings.get_system_namespace(), NAMESPACE_CLASS_NAME)
    }

    pub fn namespace_class_layout(&self) -> Result<Arc<ClassLayout>> {
        self.class_layout(self.settings.get_system_namespace(), NAMESPACE_CLASS_NAME)
    }

    fn decode_instance(
        key: &PathKey,
        layout: &Arc<ClassLayout>,
        namespace: &str,
        buf: Vec<u8>,
    ) -> Result<ClassInstance> {
        layout
            .instance(buf)
            .map_err(|source| CimError::FailedToDecodeInstance {
                namespace: namespace.to_string(),
                class: layout.class_definition().class_name().to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Direct child namespaces of `namespace`, named `namespace\child`.
    pub fn child_namespaces<'a>(
        &'a self,
        namespace: &'a str,
    ) -> Result<impl Iterator<Item = Result<NamespaceSpecifier>> + 'a> {
        let key = self.key(&[
            (KeyTag::Namespace, Some(namespace)),
            (KeyTag::ClassInstance, Some(NAMESPACE_CLASS_NAME)),
            (KeyTag::InstanceLocation, None),
        ]);
        let references = self.lookup(&key)?;
        let layout = self.namespace_class_layout()?;

        Ok(references.into_iter().map(move |reference| {
            let buf = self.fetch(&key, &reference)?;
            let instance = Self::decode_instance(&key, &layout, namespace, buf)?;
            let name = Self::property_text(&key, &instance, namespace, "Name")?;
            Ok(NamespaceSpecifier {
                namespace_name: format!("{namespace}\\{name}"),
            })
        }))
    }

    fn property_text(
        key: &PathKey,
        instance: &ClassInstance,
        namespace: &str,
        property: &str,
    ) -> Result<String> {
        let class = instance.layout().class_definition().class_name();
        let value = Self::instance_context(key, instance, namespace, instance.get_property_value(property))?;
        value
            .map(|v| v.to_string())
            .ok_or_else(|| CimError::UnknownProperty {
                class: class.to_string(),
                property: property.to_string(),
            })
    }

    fn instance_context<T>(
        key: &PathKey,
        instance: &ClassInstance,
        namespace: &str,
        result: DeserializationResult<T>,
    ) -> Result<T> {
        result.map_err(|source| CimError::FailedToDecodeInstance {
            namespace: namespace.to_string(),
            class: instance.layout().class_definition().class_name().to_string(),
            key: key.to_string(),
            source,
        })
    }

    /// Classes defined in `namespace`.
    ///
    /// Each definition is decoded to learn its name, so it is cached on the way.
    pub fn child_class_definitions<'a>(
        &'a self,
        namespace: &'a str,
    ) -> Result<impl Iterator<Item = Result<ClassDefinitionSpecifier>> + 'a> {
        let key = self.key(&[
            (KeyTag::Namespace, Some(namespace)),
            (KeyTag::ClassDefinition, None),
        ]);
        let references = self.lookup(&key)?;

        Ok(references.into_iter().map(move |reference| {
            let buf = self.fetch(&key, &reference)?;
            let cd = ClassDefinition::from_buffer(buf, self.settings.get_ansi_codec()).map_err(
                |source| CimError::FailedToDecodeListedClassDefinition {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    source,
                },
            )?;
            let class_name = cd.class_name().to_string();
            self.cache
                .insert_class_definition(namespace, &class_name, Arc::new(cd));
            Ok(ClassDefinitionSpecifier {
                namespace_name: namespace.to_string(),
                class_name,
            })
        }))
    }

    /// Instances of `namespace:class_name`, named by their key properties.
    pub fn class_instance_specifiers<'a>(
        &'a self,
        namespace: &'a str,
        class_name: &'a str,
    ) -> Result<impl Iterator<Item = Result<ClassInstanceSpecifier>> + 'a> {
        let key = self.instances_key(namespace, class_name);
        let references = self.lookup(&key)?;
        let layout = self.class_layout(namespace, class_name)?;

        Ok(references.into_iter().map(move |reference| {
            let buf = self.fetch(&key, &reference)?;
            let instance = Self::decode_instance(&key, &layout, namespace, buf)?;
            let instance_name = Self::instance_context(&key, &instance, namespace, instance.key())?
                .ok_or_else(|| CimError::UnknownProperty {
                    class: class_name.to_string(),
                    property: "Name".to_string(),
                })?;
            Ok(ClassInstanceSpecifier {
                namespace_name: namespace.to_string(),
                class_name: class_name.to_string(),
                instance_name,
            })
        }))
    }

    fn instances_key(&self, namespace: &str, class_name: &str) -> PathKey {
        self.key(&[
            (KeyTag::Namespace, Some(namespace)),
            (KeyTag::ClassInstance, Some(class_name)),
            (KeyTag::InstanceLocation, None),
        ])
    }

    /// One instance, addressed by its key.
    pub fn class_instance(
        &self,
        namespace: &str,
        class_name: &str,
        instance_name: &str,
    ) -> Result<ClassInstance> {
        let key = self.key(&[
            (KeyTag::Namespace, Some(namespace)),
            (KeyTag::ClassInstance, Some(class_name)),
            (KeyTag::InstanceLocation, Some(instance_name)),
        ]);
        let layout = self.class_layout(namespace, class_name)?;
        let buf = self.get_object(&key)?;
        Self::decode_instance(&key, &layout, namespace, buf)
    }

    /// Every instance of `namespace:class_name`, decoded.
    ///
    /// Buffers are fetched in index order; with the `multithreading` feature they are then
    /// decoded on a rayon pool.
    pub fn class_instances(&self, namespace: &str, class_name: &str) -> Result<Vec<ClassInstance>> {
        let key = self.instances_key(namespace, class_name);
        let layout = self.class_layout(namespace, class_name)?;
        let buffers = self.get_objects(&key)?.collect::<Result<Vec<_>>>()?;
        debug!(
            "decoding {} instances of {namespace}:{class_name}",
            buffers.len()
        );
        self.decode_instances(&key, &layout, namespace, buffers)
    }

    #[cfg(feature = "multithreading")]
    fn decode_instances(
        &self,
        key: &PathKey,
        layout: &Arc<ClassLayout>,
        namespace: &str,
        buffers: Vec<Vec<u8>>,
    ) -> Result<Vec<ClassInstance>> {
        use rayon::prelude::*;

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.get_num_threads())
            .build()
        {
            Ok(pool) => pool.install(|| {
                buffers
                    .into_par_iter()
                    .map(|buf| Self::decode_instance(key, layout, namespace, buf))
                    .collect()
            }),
            Err(e) => {
                log::warn!("failed to build thread pool ({e}), decoding on this thread");
                buffers
                    .into_iter()
                    .map(|buf| Self::decode_instance(key, layout, namespace, buf))
                    .collect()
            }
        }
    }

    #[cfg(not(feature = "multithreading"))]
    fn decode_instances(
        &self,
        key: &PathKey,
        layout: &Arc<ClassLayout>,
        namespace: &str,
        buffers: Vec<Vec<u8>>,
    ) -> Result<Vec<ClassInstance>> {
        buffers
            .into_iter()
            .map(|buf| Self::decode_instance(key, layout, namespace, buf))
            .collect()
    }
}

impl<I, S> ClassDefinitionProvider for ObjectResolver<I, S>
where
    I: KeyIndex,
    S: ObjectStore<Reference = I::Reference>,
{
    fn class_definition(&self, namespace: &str, class_name: &str) -> Result<Arc<ClassDefinition>> {
        ObjectResolver::class_definition(self, namespace, class_name)
    }
}

impl<I, S> Debug for ObjectResolver<I, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectResolver")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builders::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// Keys are the hex of the hashed bytes; lookups are prefix matches.
    #[derive(Default)]
    struct Repo {
        keys: Vec<String>,
        objects: Vec<Vec<u8>>,
        lookups: Cell<usize>,
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02X}")).collect()
    }

    impl Repo {
        fn put(&mut self, path: &[(&str, Option<&str>)], object: Vec<u8>) {
            let key = path
                .iter()
                .map(|(tag, name)| {
                    format!("{tag}{}", name.map(|n| hex(&encode_utf16le_upper(n))).unwrap_or_default())
                })
                .collect::<Vec<_>>()
                .join("/");
            self.keys.push(key);
            self.objects.push(object);
        }
    }

    impl KeyIndex for &Repo {
        type Reference = usize;

        fn hash(&self, name: &[u8]) -> String {
            hex(name)
        }

        fn lookup_keys(&self, key: &PathKey) -> std::result::Result<Vec<usize>, BoxError> {
            self.lookups.set(self.lookups.get() + 1);
            let query = key.to_string();
            Ok(self
                .keys
                .iter()
                .enumerate()
                .filter(|(_, k)| k.starts_with(&query))
                .map(|(i, _)| i)
                .collect())
        }
    }

    impl ObjectStore for &Repo {
        type Reference = usize;

        fn get_object_buffer(&self, reference: &usize) -> std::result::Result<Vec<u8>, BoxError> {
            self.objects
                .get(*reference)
                .cloned()
                .ok_or_else(|| format!("no object {reference}").into())
        }
    }

    fn repo() -> Repo {
        let mut repo = Repo::default();
        repo.put(
            &[("NS_", Some("NS")), ("CD_", Some("Parent"))],
            ClassDefinitionSpec::new("Parent", "")
                .property(PropertySpec::new("A", TAG_UINT32, 0))
                .build(),
        );
        repo.put(
            &[("NS_", Some("NS")), ("CD_", Some("Child"))],
            ClassDefinitionSpec::new("Child", "Parent")
                .property(
                    PropertySpec::new("B", TAG_STRING, 0)
                        .with_qualifier(QualifierSpec::builtin(BUILTIN_KEY, ValueSpec::Bool(true))),
                )
                .build(),
        );
        repo.put(
            &[("NS_", Some("__SystemClass")), ("CD_", Some("__SystemThing"))],
            ClassDefinitionSpec::new("__SystemThing", "").build(),
        );
        repo.put(
            &[("NS_", Some("NS")), ("CI_", Some("Child")), ("IL_", Some("one"))],
            InstanceSpec::new("Child", 5)
                .value(ValueSpec::U32(1))
                .value(ValueSpec::str("one"))
                .build(),
        );
        repo
    }

    #[test]
    fn settings_builder() {
        let settings = ResolverSettings::new()
            .max_class_depth(3)
            .system_namespace("__Sys")
            .fallback_to_system_namespace(false)
            .num_threads(2);
        assert_eq!(settings.get_max_class_depth(), 3);
        assert_eq!(settings.get_system_namespace(), "__Sys");
        assert!(!settings.get_fallback_to_system_namespace());
        assert_eq!(settings.get_num_threads(), 2);
        assert_eq!(settings.get_ansi_codec().name(), "windows-1252");
        assert_ne!(settings, ResolverSettings::default());
    }

    #[test]
    fn keys_hash_uppercased_utf16_names() {
        let repo = Repo::default();
        let resolver = ObjectResolver::new(&repo, &repo);
        let key = resolver.key(&[
            (KeyTag::Namespace, Some("ab")),
            (KeyTag::ClassDefinition, None),
        ]);
        assert_eq!(key.to_string(), "NS_41004200/CD_");
    }

    #[test]
    fn layout_walks_parents_and_is_memoized() {
        let repo = repo();
        let resolver = ObjectResolver::new(&repo, &repo);

        let layout = resolver.class_layout("NS", "Child").unwrap();
        let names: Vec<&str> = layout.properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let lookups = repo.lookups.get();
        let again = resolver.class_layout("NS", "Child").unwrap();
        assert!(Arc::ptr_eq(&layout, &again));
        assert!(Arc::ptr_eq(
            &resolver.class_definition("NS", "Parent").unwrap(),
            &layout.derivation()[0]
        ));
        assert_eq!(repo.lookups.get(), lookups);
        assert_eq!(resolver.cache().class_definition_count(), 2);
        assert_eq!(resolver.cache().class_layout_count(), 1);
    }

    #[test]
    fn missing_class_falls_back_to_system_namespace() {
        let repo = repo();
        let resolver = ObjectResolver::new(&repo, &repo);
        let cd = resolver.class_definition("NS", "__SystemThing").unwrap();
        assert_eq!(cd.class_name(), "__SystemThing");

        let strict = ObjectResolver::with_settings(
            &repo,
            &repo,
            ResolverSettings::new().fallback_to_system_namespace(false),
        );
        assert!(matches!(
            strict.class_definition("NS", "__SystemThing"),
            Err(CimError::AmbiguousOrMissingLookup { found: 0, .. })
        ));
    }

    #[test]
    fn get_object_requires_a_single_match() {
        let repo = repo();
        let resolver = ObjectResolver::new(&repo, &repo);
        let key = resolver.key(&[
            (KeyTag::Namespace, Some("NS")),
            (KeyTag::ClassDefinition, None),
        ]);
        assert!(matches!(
            resolver.get_object(&key),
            Err(CimError::AmbiguousOrMissingLookup { found: 2, .. })
        ));
        assert_eq!(resolver.get_objects(&key).unwrap().count(), 2);
    }

    #[test]
    fn instance_lookup_by_name() {
        let repo = repo();
        let resolver = ObjectResolver::new(&repo, &repo);
        let instance = resolver.class_instance("NS", "Child", "one").unwrap();
        assert_eq!(
            instance.get_property_value("A").unwrap(),
            Some(crate::CimValue::UInt32(1))
        );

        let specifiers: Vec<_> = resolver
            .class_instance_specifiers("NS", "Child")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            specifiers,
            vec![ClassInstanceSpecifier {
                namespace_name: "NS".to_string(),
                class_name: "Child".to_string(),
                instance_name: "one".to_string(),
            }]
        );
    }
}
