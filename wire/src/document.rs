use wire_codec::FieldReader;
use wire_core::Value;

/// Whether a document carries configuration/metadata (skippable by data-only readers) or payload
/// counted by `HeaderNumber`. Mirrors `wire_framing::ReadOutcome`'s `Meta`/`Data` split, but
/// attached to an already-parsed document instead of a bare offset+length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Meta,
    Data,
}

/// Outcome of asking a `Wire` for its next document. Distinguishing `NotReady` from `EndOfStream`
/// is what lets a polling reader tell "nothing published yet, try again" apart from "the stream
/// is closed, stop".
#[derive(Debug)]
pub enum ReadStep<T> {
    NotReady,
    EndOfStream,
    Document(T),
}

impl<T> ReadStep<T> {
    pub fn document(self) -> Option<T> {
        match self {
            ReadStep::Document(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ReadStep::EndOfStream)
    }
}

/// A document read back through `TextWire` or `BinaryWire`: its stream offset, kind, and fields
/// ready for order-independent lookup via [`FieldReader`].
#[derive(Debug)]
pub struct WireDocument {
    pub offset: u64,
    pub kind: DocumentKind,
    pub fields: FieldReader,
}

/// A document read back through `RawWire`. Raw fields have no identifiers, so there is nothing
/// for a `FieldReader` to key on — the caller gets back the positional values the schema
/// described, in schema order.
#[derive(Debug)]
pub struct RawDocument {
    pub offset: u64,
    pub kind: DocumentKind,
    pub values: Vec<Value>,
}
