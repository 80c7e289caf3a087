use std::fmt;

/// The literal prefix of one path key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTag {
    Namespace,
    ClassDefinition,
    ClassReference,
    Reference,
    ClassInstance,
    KeyInstance,
    InstanceLocation,
    Instance,
}

impl KeyTag {
    pub fn prefix(self) -> &'static str {
        match self {
            KeyTag::Namespace => "NS_",
            KeyTag::ClassDefinition => "CD_",
            KeyTag::ClassReference => "CR_",
            KeyTag::Reference => "R_",
            KeyTag::ClassInstance => "CI_",
            KeyTag::KeyInstance => "KI_",
            KeyTag::InstanceLocation => "IL_",
            KeyTag::Instance => "I_",
        }
    }
}

/// A tag, optionally followed by the hash of a name.
///
/// A bare tag is used as a prefix query ("every class definition in this namespace").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    tag: KeyTag,
    hash: Option<String>,
}

impl PathSegment {
    pub fn new(tag: KeyTag, hash: Option<String>) -> Self {
        PathSegment { tag, hash }
    }

    pub fn bare(tag: KeyTag) -> Self {
        PathSegment { tag, hash: None }
    }

    pub fn tag(&self) -> KeyTag {
        self.tag
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn is_prefix_query(&self) -> bool {
        self.hash.is_none()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag.prefix())?;
        if let Some(hash) = &self.hash {
            f.write_str(hash)?;
        }
        Ok(())
    }
}

/// A hierarchical index key such as `NS_<hash>/CD_<hash>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathKey {
    segments: Vec<PathSegment>,
}

impl PathKey {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        PathKey { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn with(mut self, segment: PathSegment) -> Self {
        self.push(segment);
        self
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_segments_joined_by_slash() {
        let key = PathKey::default()
            .with(PathSegment::new(KeyTag::Namespace, Some("AB12".to_string())))
            .with(PathSegment::new(KeyTag::ClassInstance, Some("CD34".to_string())))
            .with(PathSegment::bare(KeyTag::InstanceLocation));
        assert_eq!(key.to_string(), "NS_AB12/CI_CD34/IL_");
        assert!(key.segments()[2].is_prefix_query());
    }

    #[test]
    fn every_tag_has_its_prefix() {
        let tags = [
            (KeyTag::Namespace, "NS_"),
            (KeyTag::ClassDefinition, "CD_"),
            (KeyTag::ClassReference, "CR_"),
            (KeyTag::Reference, "R_"),
            (KeyTag::ClassInstance, "CI_"),
            (KeyTag::KeyInstance, "KI_"),
            (KeyTag::InstanceLocation, "IL_"),
            (KeyTag::Instance, "I_"),
        ];
        for (tag, prefix) in tags {
            assert_eq!(PathSegment::bare(tag).to_string(), prefix);
        }
    }
}
