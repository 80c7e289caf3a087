use thiserror::Error;

pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;
pub type Result<T> = std::result::Result<T, CimError>;

/// Error type surfaced by the external index/store collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while decoding a single record buffer.
///
/// Offsets are relative to the slice being parsed: the whole record for header/table fields,
/// the record's private heap for heap references.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("offset {offset}: unknown CIM type tag `0x{value:02x}`")]
    UnknownCimType { value: u8, offset: u64 },

    #[error(
        "offset {offset}: unsupported class instance encoding (flag byte 0x{value:02x}, expected 0x01)"
    )]
    UnsupportedInstanceVariant { value: u8, offset: u64 },

    #[error(
        "unable to recover class instance padding length (base 0x{base:x}, tried extra offsets {candidates:?}, buffer len {len})"
    )]
    PaddingRecoveryFailed {
        base: u32,
        candidates: &'static [u32],
        len: usize,
    },

    #[error("failed to decode ansi string (used encoding scheme {encoding_used}): {inner_message}")]
    AnsiDecodeError {
        encoding_used: &'static str,
        inner_message: String,
    },

    #[error("invalid utf-16 string for {what} at offset {offset}")]
    InvalidUtf16 { what: &'static str, offset: u64 },

    #[error("FILETIME value {filetime} is out of range")]
    InvalidDateTime { filetime: u64 },
}

/// Errors raised while resolving objects out of a repository.
///
/// Every decode failure is wrapped with the namespace/class it belongs to.
#[derive(Debug, Error)]
pub enum CimError {
    #[error("failed to decode class definition `{namespace}:{class}`: {source}")]
    FailedToDecodeClassDefinition {
        namespace: String,
        class: String,
        source: DeserializationError,
    },

    #[error("failed to decode a class definition listed in `{namespace}` under `{key}`: {source}")]
    FailedToDecodeListedClassDefinition {
        namespace: String,
        key: String,
        source: DeserializationError,
    },

    #[error("failed to decode instance of `{namespace}:{class}` (key `{key}`): {source}")]
    FailedToDecodeInstance {
        namespace: String,
        class: String,
        key: String,
        source: DeserializationError,
    },

    #[error("super-class chain of `{namespace}:{class}` exceeds {depth} ancestors, assuming a cycle")]
    CycleDetected {
        namespace: String,
        class: String,
        depth: usize,
    },

    #[error("expected exactly one object for key `{key}`, found {found}")]
    AmbiguousOrMissingLookup { key: String, found: usize },

    #[error("index lookup for key `{key}` failed: {source}")]
    Index { key: String, source: BoxError },

    #[error("failed to fetch object buffer for key `{key}`: {source}")]
    Store { key: String, source: BoxError },

    #[error("class `{class}` has no property named `{property}`")]
    UnknownProperty { class: String, property: String },
}
