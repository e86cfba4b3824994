use std::sync::Arc;

use wire_bytes::{ByteStore, Cursor};
use wire_core::{ClassAlias, ClassAliasRegistry, Field, Value};
use wire_codec::{CodecError, FieldReader, TextFormat};
use wire_framing::{Framing, ReadOutcome, ScopeTicket};

use crate::config::WireConfig;
use crate::document::{DocumentKind, ReadStep, WireDocument};
use crate::error::WireResult;

/// A `Wire` driving the YAML-subset [`TextFormat`] over a `ByteStore`.
///
/// Text bodies are rendered and parsed whole — there is no incremental/random-access write path
/// (per §4.4, "random access and in-place updates are not supported for text bodies"), so every
/// write here renders a complete document before reserving its header, and every read parses a
/// complete body before handing fields back.
pub struct TextWire {
    framing: Framing,
    format: TextFormat,
    class_aliases: Arc<dyn ClassAlias>,
    config: WireConfig,
}

impl TextWire {
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
            format: TextFormat::new(),
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

    /// Enforces the single-writer-per-`Wire` contract for the scope of the returned ticket.
    pub fn start_use(&self) -> WireResult<ScopeTicket<'_>> {
        Ok(self.framing.start_use()?)
    }

    /// Claims the stream's first (meta-data) header slot. Returns whether this caller is the
    /// stream's initialiser.
    pub fn create(&self) -> WireResult<bool> {
        Ok(self.framing.write_first_header()?)
    }

    pub fn write_first_document(&self, fields: &[(Field, Value)]) -> WireResult<()> {
        let rendered = self.format.render(fields)?;
        let body = render_self_describing(rendered).into_bytes();
        self.framing.store().write_bytes(4, &body)?;
        self.framing.update_first_header(body.len() as u32)?;
        Ok(())
    }

    pub fn read_first_document(&self) -> WireResult<Vec<(Field, Value)>> {
        let len = self.framing.read_first_header(self.config.timeout)?;
        let text = self.read_body_text(4, len)?;
        Ok(self.format.parse(&text)?)
    }

    /// Reserves, renders, writes, and commits a document in one call.
    pub fn write_document(&self, fields: &[(Field, Value)], is_meta: bool) -> WireResult<u64> {
        let rendered = self.format.render(fields)?;
        let body = render_self_describing(rendered).into_bytes();
        let offset = self
            .framing
            .write_header(Some(body.len() as u32), self.config.timeout)?;
        let mut cursor = Cursor::new(self.framing.store().clone(), offset + 4, offset + 4 + body.len() as u64);
        cursor.write(&body)?;
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
                let text = self.read_body_text(offset + 4, len)?;
                let fields = self.format.parse(&text)?;
                Ok(ReadStep::Document(WireDocument {
                    offset,
                    kind: DocumentKind::Meta,
                    fields: FieldReader::new(fields),
                }))
            }
            ReadOutcome::Data { offset, len } => {
                self.framing.advance_past(offset, len);
                let text = self.read_body_text(offset + 4, len)?;
                let fields = self.format.parse(&text)?;
                Ok(ReadStep::Document(WireDocument {
                    offset,
                    kind: DocumentKind::Data,
                    fields: FieldReader::new(fields),
                }))
            }
        }
    }

    pub fn write_end_of_wire(&self) -> WireResult<()> {
        Ok(self.framing.write_end_of_wire(self.config.timeout)?)
    }

    fn read_body_text(&self, start: u64, len: u32) -> WireResult<String> {
        let mut buf = vec![0u8; len as usize];
        self.framing.store().read_bytes(start, &mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            CodecError::Malformed {
                format: "text",
                reason: format!("invalid UTF-8 in document body: {e}"),
            }
            .into()
        })
    }
}

/// §4.4's self-describing discovery rule: a text stream's first content byte must be ASCII
/// printable, so a polymorphic reader can pick text vs binary by looking at just that byte (every
/// `BinaryFormat` tag byte has bit 7 set). A leading space is harmless inside the YAML-subset
/// grammar (it is stripped by the key parser) and restores that property whenever rendering
/// happens to start with a non-ASCII byte — which in practice only happens for an empty field
/// list, since every rendered key starts with an ASCII character already.
fn render_self_describing(rendered: String) -> String {
    match rendered.as_bytes().first() {
        Some(byte) if *byte < 0x80 => rendered,
        _ => format!(" {rendered}"),
    }
}
