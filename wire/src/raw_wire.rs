use std::sync::Arc;

use wire_bytes::{ByteStore, Cursor};
use wire_codec::{RawFormat, RawKind};
use wire_core::Value;
use wire_framing::{Framing, ReadOutcome, ScopeTicket};

use crate::config::WireConfig;
use crate::document::{DocumentKind, RawDocument, ReadStep};
use crate::error::WireResult;

/// A `Wire` driving the field-less [`RawFormat`] over a `ByteStore`.
///
/// `RawFormat` has no schema-evolution story of its own (§4.6): reader and writer must already
/// agree out of band on the sequence of value kinds a document holds, so a `RawWire` is
/// constructed with that `schema` fixed for its lifetime rather than accepting one per call the
/// way `RawFormat::render`/`parse` do. There is no bound-scalar write path here — `BoundRef`
/// pinning is meaningful for `BinaryFormat` because its tag-plus-value layout can choose to skip
/// auto-compaction for one field while leaving the rest self-describing; `RawFormat` has no tags
/// at all, so every position's width is already exactly what the schema says, and "pin this field"
/// would just mean "take its fixed offset", which callers can already compute themselves from the
/// schema without any help from this crate.
pub struct RawWire {
    framing: Framing,
    format: RawFormat,
    schema: Vec<RawKind>,
    config: WireConfig,
}

impl RawWire {
    pub fn new(store: Arc<dyn ByteStore>, schema: Vec<RawKind>, config: WireConfig) -> Self {
        let framing = Framing::new_with_limits(
            store,
            config.make_pauser(),
            config.assertion_mode,
            config.first_header_max_len,
            config.skip_ahead_threshold,
        );
        Self {
            framing,
            format: RawFormat::new(),
            schema,
            config,
        }
    }

    pub fn schema(&self) -> &[RawKind] {
        &self.schema
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

    pub fn write_first_document(&self, values: &[Value]) -> WireResult<()> {
        let body = self.render(values)?;
        self.framing.store().write_bytes(4, &body)?;
        self.framing.update_first_header(body.len() as u32)?;
        Ok(())
    }

    pub fn read_first_document(&self) -> WireResult<Vec<Value>> {
        let len = self.framing.read_first_header(self.config.timeout)?;
        let body = self.read_body(4, len)?;
        Ok(self.format.parse(&body, &self.schema)?)
    }

    pub fn write_document(&self, values: &[Value], is_meta: bool) -> WireResult<u64> {
        let body = self.render(values)?;
        let offset = self
            .framing
            .write_header(Some(body.len() as u32), self.config.timeout)?;
        let mut cursor = Cursor::new(self.framing.store().clone(), offset + 4, offset + 4 + body.len() as u64);
        cursor.write(&body)?;
        self.framing.advance_write_cursor_to(cursor.position());
        self.framing.update_header(offset, is_meta)?;
        Ok(offset)
    }

    pub fn read_document(&self, include_meta: bool) -> WireResult<ReadStep<RawDocument>> {
        match self.framing.read_data_header(include_meta)? {
            ReadOutcome::None => Ok(ReadStep::NotReady),
            ReadOutcome::EndOfStream => Ok(ReadStep::EndOfStream),
            ReadOutcome::Meta { offset, len } => {
                self.framing.advance_past(offset, len);
                let body = self.read_body(offset + 4, len)?;
                let values = self.format.parse(&body, &self.schema)?;
                Ok(ReadStep::Document(RawDocument {
                    offset,
                    kind: DocumentKind::Meta,
                    values,
                }))
            }
            ReadOutcome::Data { offset, len } => {
                self.framing.advance_past(offset, len);
                let body = self.read_body(offset + 4, len)?;
                let values = self.format.parse(&body, &self.schema)?;
                Ok(ReadStep::Document(RawDocument {
                    offset,
                    kind: DocumentKind::Data,
                    values,
                }))
            }
        }
    }

    pub fn write_end_of_wire(&self) -> WireResult<()> {
        Ok(self.framing.write_end_of_wire(self.config.timeout)?)
    }

    fn render(&self, values: &[Value]) -> WireResult<Vec<u8>> {
        Ok(self.format.render(values, &self.schema)?)
    }

    fn read_body(&self, start: u64, len: u32) -> WireResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.framing.store().read_bytes(start, &mut buf)?;
        Ok(buf)
    }
}
