//! Field-less, fixed-layout binary format.
//!
//! Unlike `BinaryFormat`, `RawFormat` never writes a type tag or a field identifier: the writer
//! and reader must already agree, out of band, on the sequence of value kinds a document holds.
//! That agreement is the `schema: &[RawKind]` every `render`/`parse` call takes. There is no
//! schema-evolution story here by design — reordering, unknown fields and defaulted-missing
//! fields are a self-describing-format guarantee (`BinaryFormat`, `TextFormat`); `RawFormat`
//! trades that away for the smallest possible on-wire representation.
use bytes::Bytes;
use wire_core::Value;

use crate::error::{CodecError, CodecResult};

/// The value kind a single schema position holds. One `RawKind` per element of `schema`; a
/// `Sequence` kind additionally names the element kind for everything inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Enum,
    Sequence(Box<RawKind>),
}

const LONG_STRING_MARKER: u8 = 0xFF;

/// No-field-identifier binary codec. Stateless — every method takes the schema it needs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawFormat;

impl RawFormat {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, values: &[Value], schema: &[RawKind]) -> CodecResult<Vec<u8>> {
        if values.len() != schema.len() {
            return Err(CodecError::RawSchemaMismatch(format!(
                "{} values but schema has {} positions",
                values.len(),
                schema.len()
            )));
        }
        let mut out = Vec::new();
        for (value, kind) in values.iter().zip(schema) {
            write_value(&mut out, value, kind)?;
        }
        Ok(out)
    }

    pub fn parse(&self, bytes: &[u8], schema: &[RawKind]) -> CodecResult<Vec<Value>> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let mut out = Vec::with_capacity(schema.len());
        for kind in schema {
            out.push(read_value(&mut cursor, kind)?);
        }
        if cursor.pos != bytes.len() {
            return Err(CodecError::RawSchemaMismatch(format!(
                "schema consumed {} of {} bytes",
                cursor.pos,
                bytes.len()
            )));
        }
        Ok(out)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or_else(|| {
            CodecError::RawSchemaMismatch("length overflow while reading raw body".into())
        })?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| {
            CodecError::RawSchemaMismatch(format!(
                "expected {n} more bytes at offset {}, only {} remain",
                self.pos,
                self.bytes.len() - self.pos.min(self.bytes.len())
            ))
        })?;
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    if bytes.len() < LONG_STRING_MARKER as usize {
        out.push(bytes.len() as u8);
    } else {
        out.push(LONG_STRING_MARKER);
        out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(bytes);
}

fn read_string(cur: &mut Cursor<'_>) -> CodecResult<String> {
    let len_byte = cur.take_u8()?;
    let len = if len_byte == LONG_STRING_MARKER {
        u16::from_le_bytes(cur.take(2)?.try_into().expect("len 2")) as usize
    } else {
        len_byte as usize
    };
    let bytes = cur.take(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::Malformed {
        format: "raw",
        reason: format!("invalid UTF-8 in string: {e}"),
    })
}

fn write_value(out: &mut Vec<u8>, value: &Value, kind: &RawKind) -> CodecResult<()> {
    match (kind, value) {
        (RawKind::Bool, Value::Bool(b)) => out.push(if *b { 1 } else { 0 }),
        (RawKind::Int8, _) => out.push(expect_i64(value, "int8")? as i8 as u8),
        (RawKind::Int16, _) => out.extend_from_slice(&(expect_i64(value, "int16")? as i16).to_le_bytes()),
        (RawKind::Int32, _) => out.extend_from_slice(&(expect_i64(value, "int32")? as i32).to_le_bytes()),
        (RawKind::Int64, _) => out.extend_from_slice(&expect_i64(value, "int64")?.to_le_bytes()),
        (RawKind::Float32, _) => out.extend_from_slice(&(expect_f64(value)? as f32).to_le_bytes()),
        (RawKind::Float64, _) => out.extend_from_slice(&expect_f64(value)?.to_le_bytes()),
        (RawKind::Text, Value::Text(s)) => write_string(out, s),
        (RawKind::Enum, Value::Enum(s)) => write_string(out, s),
        (RawKind::Sequence(elem_kind), Value::Sequence(items)) => {
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                write_value(out, item, elem_kind)?;
            }
        }
        _ => {
            return Err(CodecError::SchemaMismatch {
                expected: kind_name(kind),
                found: value_kind_name(value),
            })
        }
    }
    Ok(())
}

fn read_value(cur: &mut Cursor<'_>, kind: &RawKind) -> CodecResult<Value> {
    Ok(match kind {
        RawKind::Bool => Value::Bool(cur.take_u8()? != 0),
        RawKind::Int8 => Value::Int8(cur.take_u8()? as i8),
        RawKind::Int16 => Value::Int16(i16::from_le_bytes(cur.take(2)?.try_into().expect("len 2"))),
        RawKind::Int32 => Value::Int32(i32::from_le_bytes(cur.take(4)?.try_into().expect("len 4"))),
        RawKind::Int64 => Value::Int64(i64::from_le_bytes(cur.take(8)?.try_into().expect("len 8"))),
        RawKind::Float32 => Value::Float32(f32::from_le_bytes(cur.take(4)?.try_into().expect("len 4"))),
        RawKind::Float64 => Value::Float64(f64::from_le_bytes(cur.take(8)?.try_into().expect("len 8"))),
        RawKind::Text => Value::Text(read_string(cur)?),
        RawKind::Enum => Value::Enum(read_string(cur)?),
        RawKind::Sequence(elem_kind) => {
            let len = u32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_value(cur, elem_kind)?);
            }
            Value::Sequence(items)
        }
    })
}

fn expect_i64(value: &Value, expected: &'static str) -> CodecResult<i64> {
    value.as_i64().ok_or_else(|| CodecError::SchemaMismatch {
        expected,
        found: value_kind_name(value),
    })
}

fn expect_f64(value: &Value) -> CodecResult<f64> {
    value.as_f64().ok_or_else(|| CodecError::SchemaMismatch {
        expected: "float",
        found: value_kind_name(value),
    })
}

fn kind_name(kind: &RawKind) -> &'static str {
    match kind {
        RawKind::Bool => "bool",
        RawKind::Int8 => "int8",
        RawKind::Int16 => "int16",
        RawKind::Int32 => "int32",
        RawKind::Int64 => "int64",
        RawKind::Float32 => "float32",
        RawKind::Float64 => "float64",
        RawKind::Text => "text",
        RawKind::Enum => "enum",
        RawKind::Sequence(_) => "sequence",
    }
}

fn value_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int8(_) => "int8",
        Value::Int16(_) => "int16",
        Value::Int32(_) => "int32",
        Value::Int64(_) => "int64",
        Value::Float32(_) => "float32",
        Value::Float64(_) => "float64",
        Value::Text(_) => "text",
        Value::Enum(_) => "enum",
        Value::Bytes(_) => "bytes",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Typed(..) => "typed",
    }
}

/// Convenience for schema-less byte blobs that a caller wants to pass through unchanged rather
/// than interpret; not part of the core grammar but handy for tests exercising `Value::Bytes`.
pub fn bytes_value(bytes: impl Into<Bytes>) -> Value {
    Value::Bytes(bytes.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_3_fixture_matches_spec() {
        let values = vec![
            Value::Text("Hello World".to_string()),
            Value::Int64(1234567890),
            Value::Enum("SECONDS".to_string()),
            Value::Float64(10.5),
        ];
        let schema = vec![
            RawKind::Text,
            RawKind::Int64,
            RawKind::Enum,
            RawKind::Float64,
        ];
        let format = RawFormat::new();
        let rendered = format.render(&values, &schema).unwrap();
        let expected: Vec<u8> = [
            "0B 48 65 6C 6C 6F 20 57 6F 72 6C 64 D2 02 96 49 00 00 00 00 07 53 45 43 4F 4E 44 53",
            "00 00 00 00 00 00 25 40",
        ]
        .join(" ")
        .split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).unwrap())
        .collect();
        assert_eq!(rendered, expected);

        let parsed = format.parse(&rendered, &schema).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn sequence_round_trips() {
        let values = vec![Value::Sequence(vec![
            Value::Int32(1),
            Value::Int32(2),
            Value::Int32(3),
        ])];
        let schema = vec![RawKind::Sequence(Box::new(RawKind::Int32))];
        let format = RawFormat::new();
        let rendered = format.render(&values, &schema).unwrap();
        assert_eq!(format.parse(&rendered, &schema).unwrap(), values);
    }

    #[test]
    fn schema_length_mismatch_is_rejected() {
        let format = RawFormat::new();
        let err = format
            .render(&[Value::Bool(true)], &[RawKind::Bool, RawKind::Int8])
            .unwrap_err();
        assert!(matches!(err, CodecError::RawSchemaMismatch(_)));
    }

    #[test]
    fn truncated_body_is_rejected() {
        let format = RawFormat::new();
        let err = format.parse(&[0x01, 0x02], &[RawKind::Int64]).unwrap_err();
        assert!(matches!(err, CodecError::RawSchemaMismatch(_)));
    }

    #[test]
    fn long_string_uses_u16_escape() {
        let s = "x".repeat(300);
        let values = vec![Value::Text(s.clone())];
        let schema = vec![RawKind::Text];
        let format = RawFormat::new();
        let rendered = format.render(&values, &schema).unwrap();
        assert_eq!(rendered[0], LONG_STRING_MARKER);
        assert_eq!(format.parse(&rendered, &schema).unwrap(), values);
    }
}
