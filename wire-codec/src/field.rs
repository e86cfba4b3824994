//! Format-independent field bookkeeping: order-independent lookup, unknown-field retention, and
//! default-on-missing reads, layered on top of whichever `Format` already materialized a document
//! body into an owned `Vec<(Field, Value)>`.
//!
//! A document's bytes are only ever read after they have been fully, atomically published by
//! Framing — there is no concurrent partial read to guard against, and no requirement to stream
//! incrementally off the wire. So rather than a lazy reorder buffer threaded through an
//! in-progress byte scan, `FieldReader` parses the whole body up front and does its
//! reordering/residual bookkeeping over the resulting `Vec` in plain Rust. It is simpler than a
//! streaming implementation and makes exactly the same guarantees the codec promises: a reader
//! can ask for fields in any order, ask what is left over, and get a sentinel back for anything
//! never written.
use wire_core::{Field, Value};

/// Accumulates `(Field, Value)` pairs in emission order. A thin wrapper so `Wire`'s write path
/// reads the same as its read path; the actual rendering is done by handing `into_fields()` to a
/// `Format`.
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: Vec<(Field, Value)>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, field: impl Into<Field>, value: Value) -> &mut Self {
        self.fields.push((field.into(), value));
        self
    }

    pub fn into_fields(self) -> Vec<(Field, Value)> {
        self.fields
    }
}

/// Consumes a materialized document, field by field, in whatever order the caller asks for them.
#[derive(Debug)]
pub struct FieldReader {
    entries: Vec<Option<(Field, Value)>>,
}

impl FieldReader {
    pub fn new(fields: Vec<(Field, Value)>) -> Self {
        Self {
            entries: fields.into_iter().map(Some).collect(),
        }
    }

    /// Reads the next not-yet-consumed field in on-wire order, regardless of name. Used for
    /// linear scans (e.g. enumerating an entire document) rather than targeted lookups.
    pub fn read_next(&mut self) -> Option<(Field, Value)> {
        self.entries.iter_mut().find_map(|slot| slot.take())
    }

    /// Scans for `field` among not-yet-consumed entries and, if found, consumes and returns it.
    /// Entries scanned past and not matched are left in place — they remain available to a later
    /// call for a different field, which is what makes read order independent of write order.
    pub fn read_named(&mut self, field: &Field) -> Option<Value> {
        self.entries
            .iter_mut()
            .find(|slot| matches!(slot, Some((f, _)) if f == field))
            .and_then(|slot| slot.take())
            .map(|(_, value)| value)
    }

    /// Like `read_named`, but hands back `default` instead of `None` when the field was never
    /// written.
    pub fn read_or(&mut self, field: &Field, default: Value) -> Value {
        self.read_named(field).unwrap_or(default)
    }

    /// Every field not yet consumed, in on-wire order. Draining this is how a caller asks "what
    /// don't I recognize" after reading the fields it expected by name.
    pub fn residual(&mut self) -> Vec<(Field, Value)> {
        self.entries.iter_mut().filter_map(|slot| slot.take()).collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    pub fn remaining_count(&self) -> usize {
        self.entries.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(Field, Value)> {
        vec![
            (Field::name("a"), Value::Int64(1)),
            (Field::name("b"), Value::Int64(2)),
            (Field::name("c"), Value::Int64(3)),
        ]
    }

    #[test]
    fn reads_fields_out_of_order() {
        let mut reader = FieldReader::new(sample());
        assert_eq!(reader.read_named(&Field::name("c")), Some(Value::Int64(3)));
        assert_eq!(reader.read_named(&Field::name("a")), Some(Value::Int64(1)));
        assert_eq!(reader.read_named(&Field::name("b")), Some(Value::Int64(2)));
    }

    #[test]
    fn missing_field_returns_default() {
        let mut reader = FieldReader::new(sample());
        assert_eq!(
            reader.read_or(&Field::name("z"), Value::Null),
            Value::Null
        );
    }

    #[test]
    fn residual_preserves_on_wire_order_after_targeted_reads() {
        let mut reader = FieldReader::new(sample());
        reader.read_named(&Field::name("b"));
        let residual = reader.residual();
        assert_eq!(
            residual,
            vec![
                (Field::name("a"), Value::Int64(1)),
                (Field::name("c"), Value::Int64(3)),
            ]
        );
    }

    #[test]
    fn exhaustion_tracks_consumption() {
        let mut reader = FieldReader::new(sample());
        assert!(!reader.is_exhausted());
        reader.residual();
        assert!(reader.is_exhausted());
        assert_eq!(reader.remaining_count(), 0);
    }

    #[test]
    fn writer_preserves_emission_order() {
        let mut writer = FieldWriter::new();
        writer.write("a", Value::Int64(1)).write("b", Value::Int64(2));
        assert_eq!(
            writer.into_fields(),
            vec![
                (Field::name("a"), Value::Int64(1)),
                (Field::name("b"), Value::Int64(2)),
            ]
        );
    }
}
