use std::sync::Arc;

use wire_bytes::{BoundHandle, ByteStore, Cursor};
use wire_core::{ClassAlias, ClassAliasRegistry, Field, Value};
use wire_codec::{BinaryFormat, FieldReader};
use wire_framing::{Framing, ReadOutcome, ScopeTicket};

use crate::config::WireConfig;
use crate::document::{DocumentKind, ReadStep, WireDocument};
use crate::error::WireResult;

/// A `Wire` driving the tagged [`BinaryFormat`] over a `ByteStore`.
///
/// Unlike `TextWire`, a binary document can pin one or more of its fields to their full declared
/// width instead of letting the encoder auto-compact them, producing a [`BoundHandle`] the caller
/// can use for lock-free atomic access into the published document without going through the
/// codec again (§4.5, "fixed-width scalars may be accessed by BoundRef").
pub struct BinaryWire {
    framing: Framing,
    format: BinaryFormat,
    class_aliases: Arc<dyn ClassAlias>,
    config: WireConfig,
}

impl BinaryWire {
    pub fn new(store: Arc<dyn ByteStore>, config: WireConfig) -> Self {
        let framing = Framing::new_with_limits(
            store,
            config.make_pauser(),
            config.assertion_mode,
            config.first_header_max_len,
            config.skip_ahead_threshold,
        );
        Self {
            framing,
            format: BinaryFormat::new(),
            class_aliases: Arc::new(ClassAliasRegistry::new()),
            config,
        }
    }

    pub fn with_class_aliases(mut self, registry: Arc<dyn ClassAlias>) -> Self {
        self.class_aliases = registry;
        self
    }

    pub fn class_aliases(&self) -> &Arc<dyn ClassAlias> {
        &self.class_aliases
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn header_number(&self) -> Option<u64> {
        self.framing.header_number()
    }

    pub fn start_use(&self) -> WireResult<ScopeTicket<'_>> {
        Ok(self.framing.start_use()?)
    }

    pub fn create(&self) -> WireResult<bool> {
        Ok(self.framing.write_first_header()?)
    }

    pub fn write_first_document(&self, fields: &[(Field, Value)]) -> WireResult<()> {
        let body = self.format.render(fields)?;
        self.framing.store().write_bytes(4, &body)?;
        self.framing.update_first_header(body.len() as u32)?;
        Ok(())
    }

    pub fn read_first_document(&self) -> WireResult<Vec<(Field, Value)>> {
        let len = self.framing.read_first_header(self.config.timeout)?;
        let body = self.read_body(4, len)?;
        Ok(self.format.parse(&body)?)
    }

    pub fn write_document(&self, fields: &[(Field, Value)], is_meta: bool) -> WireResult<u64> {
        let body = self.format.render(fields)?;
        self.write_rendered(&body, is_meta)
    }

    /// As [`BinaryWire::write_document`], but pins every field named in `bound_fields` to its full
    /// declared width and returns a [`BoundHandle`] per pinned field, keyed by field, in the same
    /// order as `bound_fields`. The returned handles become invalid once the underlying store is
    /// reused for something else; they stay valid for the lifetime of this document's bytes.
    pub fn write_document_with_bindings(
        &self,
        fields: &[(Field, Value)],
        bound_fields: &[Field],
        is_meta: bool,
    ) -> WireResult<(u64, Vec<(Field, BoundHandle)>)> {
        let encoded = self.format.render_with_bindings(fields, bound_fields)?;
        let offset = self.write_rendered(&encoded.bytes, is_meta)?;
        let document_base = offset + 4;
        let handles = encoded
            .bindings
            .into_iter()
            .map(|(field, bound_ref)| {
                let handle = BoundHandle::new(self.framing.store().clone(), document_base, bound_ref);
                (field, handle)
            })
            .collect();
        Ok((offset, handles))
    }

    fn write_rendered(&self, body: &[u8], is_meta: bool) -> WireResult<u64> {
        let offset = self
            .framing
            .write_header(Some(body.len() as u32), self.config.timeout)?;
        let mut cursor = Cursor::new(self.framing.store().clone(), offset + 4, offset + 4 + body.len() as u64);
        cursor.write(body)?;
        self.framing.advance_write_cursor_to(cursor.position());
        self.framing.update_header(offset, is_meta)?;
        Ok(offset)
    }

    pub fn read_document(&self, include_meta: bool) -> WireResult<ReadStep<WireDocument>> {
        match self.framing.read_data_header(include_meta)? {
            ReadOutcome::None => Ok(ReadStep::NotReady),
            ReadOutcome::EndOfStream => Ok(ReadStep::EndOfStream),
            ReadOutcome::Meta { offset, len } => {
                self.framing.advance_past(offset, len);
                let body = self.read_body(offset + 4, len)?;
                let fields = self.format.parse(&body)?;
                Ok(ReadStep::Document(WireDocument {
                    offset,
                    kind: DocumentKind::Meta,
                    fields: FieldReader::new(fields),
                }))
            }
            ReadOutcome::Data { offset, len } => {
                self.framing.advance_past(offset, len);
                let body = self.read_body(offset + 4, len)?;
                let fields = self.format.parse(&body)?;
                Ok(ReadStep::Document(WireDocument {
                    offset,
                    kind: DocumentKind::Data,
                    fields: FieldReader::new(fields),
                }))
            }
        }
    }

    /// Reattach a [`BoundHandle`] to a field of a document already read back by `read_document` —
    /// useful when a reader wants atomic access to a scalar a writer pinned, without re-rendering
    /// the document. `bound` must come from the same render call that produced the document's
    /// bytes at `document_offset`; this crate has no way to recover it from already-parsed
    /// `Value`s.
    pub fn bound_handle(&self, document_offset: u64, bound: wire_core::BoundRef) -> BoundHandle {
        BoundHandle::new(self.framing.store().clone(), document_offset + 4, bound)
    }

    pub fn write_end_of_wire(&self) -> WireResult<()> {
        Ok(self.framing.write_end_of_wire(self.config.timeout)?)
    }

    fn read_body(&self, start: u64, len: u32) -> WireResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.framing.store().read_bytes(start, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_bytes::HeapByteStore;
    use wire_core::FixedWidth;

    fn wire() -> BinaryWire {
        BinaryWire::new(Arc::new(HeapByteStore::new(4096)), WireConfig::default())
    }

    #[test]
    fn first_document_round_trips() {
        let w = wire();
        assert!(w.create().unwrap());
        let fields = vec![(Field::name("version"), Value::Int64(1))];
        w.write_first_document(&fields).unwrap();
        assert_eq!(w.read_first_document().unwrap(), fields);
    }

    #[test]
    fn data_document_round_trips() {
        let w = wire();
        w.create().unwrap();
        w.write_first_document(&[]).unwrap();

        let fields = vec![(Field::name("code"), Value::Enum("SECONDS".to_string()))];
        w.write_document(&fields, false).unwrap();

        let doc = w.read_document(false).unwrap().document().unwrap();
        let mut reader = doc.fields;
        assert_eq!(
            reader.read_named(&Field::name("code")),
            Some(Value::Enum("SECONDS".to_string()))
        );
    }

    #[test]
    fn bound_field_supports_atomic_increment() {
        let w = wire();
        w.create().unwrap();
        w.write_first_document(&[]).unwrap();

        let fields = vec![(Field::name("counter"), Value::Int64(0))];
        let (_offset, handles) = w
            .write_document_with_bindings(&fields, &[Field::name("counter")], false)
            .unwrap();
        assert_eq!(handles.len(), 1);
        let (field, handle) = &handles[0];
        assert_eq!(*field, Field::name("counter"));
        assert_eq!(handle.width(), FixedWidth::Word64);
        assert_eq!(handle.get_and_add(5).unwrap(), 0);
        assert_eq!(handle.volatile_get().unwrap(), 5);
    }
}
