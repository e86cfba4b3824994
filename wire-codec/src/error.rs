use thiserror::Error;
use wire_core::{CoreError, Field};

/// Errors raised while rendering or parsing a document body, or while navigating fields on top of
/// an already-parsed document. Framing and byte-store errors are a different layer entirely (see
/// `wire-framing::FramingError`, `wire-bytes::BytesError`); nothing in this crate touches a
/// `ByteStore` directly, so this enum only ever carries codec-shaped problems plus whatever
/// `wire-core` (the `Pauser`/`ClassAlias` primitives) can raise along the way.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{0}")]
    IllegalArgument(String),

    /// A requested field was never written and no default was supplied. Callers that want
    /// default-on-missing behavior should treat this as "absent", not as a hard failure — see
    /// `FieldReader::read_or`.
    #[error("field {0:?} not found in document")]
    FieldMissing(Field),

    /// The bytes for a value did not match the shape a `Format` expects (truncated input, bad
    /// UTF-8, an unrecognized tag byte, an out-of-range discriminant).
    #[error("malformed {format} body: {reason}")]
    Malformed {
        format: &'static str,
        reason: String,
    },

    /// The value found on the wire cannot be read back as the type the caller asked for (e.g.
    /// reading a `Mapping` as a scalar, or reading a bound scalar where the field was text).
    #[error("cannot read value of kind {found} as {expected}")]
    SchemaMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A `RawFormat` decode consumed fewer or more bytes than its schema predicted.
    #[error("raw format schema mismatch: {0}")]
    RawSchemaMismatch(String),

    #[error("alias '{0}' is not registered with the marshalling registry")]
    UnknownAlias(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type CodecResult<T> = Result<T, CodecError>;
