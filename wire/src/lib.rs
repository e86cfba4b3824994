//! A polymorphic wire-format engine.
//!
//! A single abstract document model — fields, scalars, sequences, typed objects and bound
//! references — rendered and parsed as human-readable text (YAML-subset), self-describing binary,
//! or field-less raw binary, framed over any [`wire_bytes::ByteStore`] with lock-free concurrent
//! append and atomic whole-document publication.
//!
//! This crate is the facade: it collapses the three format concerns (`wire_codec`) and the shared
//! framing/concurrency protocol (`wire_framing`) into three closed `Wire` variants —
//! [`TextWire`], [`BinaryWire`] and [`RawWire`] — each wrapping one `Format` plus a `Framing`.
//! Lower crates stay usable standalone for callers who only need, say, the byte-store atomics or
//! the codec without framing.
#![allow(rustdoc::invalid_html_tags)]
#![allow(rustdoc::broken_intra_doc_links)]

pub mod binary_wire;
pub mod config;
pub mod document;
pub mod error;
pub mod raw_wire;
pub mod text_wire;

pub use binary_wire::BinaryWire;
pub use config::{PauserKind, WireConfig, WireConfigBuilder};
pub use document::{DocumentKind, RawDocument, ReadStep, WireDocument};
pub use error::{WireError, WireResult};
pub use raw_wire::RawWire;
pub use text_wire::TextWire;

// Re-exported for callers who need to build `Value`/`Field` documents, alternate `ByteStore`
// backends, or touch the framing/codec layers directly without adding those crates to their own
// `Cargo.toml`.
pub use wire_bytes::{BoundHandle, ByteStore, HeapByteStore, MmapByteStore};
pub use wire_codec::{FieldReader, FieldWriter, MarshalRegistry, RawKind};
pub use wire_core::{BoundRef, ClassAlias, ClassAliasRegistry, Field, FixedWidth, Value};
pub use wire_framing::ScopeTicket;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wire_bytes::HeapByteStore;
    use wire_core::{Field, Value};

    use crate::binary_wire::BinaryWire;
    use crate::config::WireConfig;
    use crate::text_wire::TextWire;

    /// Framing lives in the `ByteStore`, not in any particular `Wire` instance: a second `TextWire`
    /// built over the same store picks up exactly the documents the first one published, including
    /// its header count. This is what makes the framing protocol suitable for independent readers
    /// and writers attaching to the same shared memory region rather than requiring a single
    /// in-process owner.
    #[test]
    fn independent_wire_instances_share_framing_state_through_the_store() {
        let store: Arc<dyn wire_bytes::ByteStore> = Arc::new(HeapByteStore::new(4096));

        let writer = TextWire::new(store.clone(), WireConfig::default());
        assert!(writer.create().unwrap());
        writer.write_first_document(&[]).unwrap();
        let offset = writer
            .write_document(&[(Field::name("n"), Value::Int64(1))], false)
            .unwrap();

        let reader = TextWire::new(store, WireConfig::default());
        reader.read_first_document().unwrap();
        let doc = reader.read_document(false).unwrap().document().unwrap();
        assert_eq!(doc.offset, offset);
    }

    #[test]
    fn binary_wire_counts_header_number_across_data_documents() {
        let store: Arc<dyn wire_bytes::ByteStore> = Arc::new(HeapByteStore::new(4096));
        let w = BinaryWire::new(store, WireConfig::default());
        w.create().unwrap();
        w.write_first_document(&[]).unwrap();
        w.write_document(&[], false).unwrap();
        w.write_document(&[], false).unwrap();
        assert_eq!(w.header_number(), Some(2));
    }
}
