//! Format-agnostic value codec: a [`wire_core::Value`]/[`wire_core::Field`] document model and
//! three concrete renderers over it (`TextFormat`, `BinaryFormat`, `RawFormat`), plus the
//! bookkeeping ([`field::FieldReader`]) and user-type ([`marshal::MarshalRegistry`]) layers that
//! sit on top of whichever format a caller picked.
//!
//! Nothing in this crate touches a byte store or a document header directly — see `wire-framing`
//! for that. A `Format` only ever renders to, or parses from, a body of bytes (or text) that has
//! already been carved out and handed over in full.
pub mod binary;
pub mod error;
pub mod field;
pub mod marshal;
pub mod raw;
pub mod text;

pub use binary::{BinaryFormat, EncodedDocument};
pub use error::{CodecError, CodecResult};
pub use field::{FieldReader, FieldWriter};
pub use marshal::MarshalRegistry;
pub use raw::{RawFormat, RawKind};
pub use text::TextFormat;
