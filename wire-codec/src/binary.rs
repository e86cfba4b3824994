//! Self-describing tagged binary format.
//!
//! Every value is preceded by a tag byte that names its own shape, so `BinaryFormat` documents
//! carry enough information to be read back without a schema — unlike `RawFormat`, which needs
//! one supplied out of band. Tag bytes are divided into two disjoint alphabets depending on
//! where they appear: a *field tag* (the first byte of an entry, naming which field follows) and
//! a *value tag* (naming the shape of the value itself). The two alphabets happen to reuse the
//! same numeric ranges in places (`0x80`-`0xBF` means "field number" before an entry but is free
//! for value tags to use elsewhere) because the two positions are never ambiguous to a parser
//! that already knows which one it is reading.
//!
//! Integers are auto-compacted to the smallest tag that fits the *value*, not the value's
//! declared type — `Int32(1)` and `Int64(1)` render identically. Decoding a compacted integer
//! therefore always hands back an `Int64`, and the same widening applies to floats (a `Float64`
//! that survives the round trip through `f32` is written with the float32 tag and read back as
//! `Float64` anyway). Callers that care about the original declared width should use `RawFormat`,
//! which preserves it by construction. The one exception is a field written through
//! [`BinaryFormat::render_with_bindings`], which pins fields to their full declared width so a
//! later `BoundRef` into the rendered bytes stays valid after an in-place atomic update.
//!
//! `Value::Enum` shares its value tag with `Value::Text` — on the wire a bare symbol and a short
//! string are indistinguishable, so `parse` always hands enums back as `Text`. A caller that needs
//! the enum/string distinction to survive a round trip should use `TextFormat`, which recovers it
//! from the bare-symbol grammar instead of a tag byte.
use wire_core::{BoundRef, Field, FixedWidth, Value};

use crate::error::{CodecError, CodecResult};

const FIELD_NUMBER_BASE: u8 = 0x80;
const FIELD_NUMBER_MAX: u8 = 0xBF;
const FIELD_NAME_BASE: u8 = 0xC0;
const FIELD_NAME_INLINE_MAX_LEN: u8 = 0x1E; // 30
const FIELD_NAME_ESCAPE: u8 = 0xDF;

const TAG_FLOAT32: u8 = 0x90;
const TAG_FLOAT64: u8 = 0x91;

const TAG_INT8: u8 = 0xA0;
const TAG_INT16: u8 = 0xA1;
const TAG_INT32: u8 = 0xA3;
const TAG_INT64: u8 = 0xA7;

const TAG_NULL: u8 = 0xB0;
const TAG_BOOL: u8 = 0xB1;
const TAG_BYTES: u8 = 0xB2;
const TAG_SEQUENCE: u8 = 0xB3;
/// `0x82`: a raw length-prefixed nested document (u32 LE length + body). Used both for a bare
/// `Value::Mapping` and for the body of a `Value::Typed` marshallable.
const TAG_NESTED_DOCUMENT: u8 = 0x82;
/// `0xB6`: a typed marshallable — alias length byte, alias bytes, then the inner value (usually a
/// nested document).
const TAG_MARSHALLABLE: u8 = 0xB6;

const VALUE_TEXT_BASE: u8 = 0xE0;
const VALUE_TEXT_INLINE_MAX_LEN: u8 = 0x0E; // 14
const VALUE_TEXT_ESCAPE: u8 = 0xEF;

const COMPACT_INT_MAX: i64 = 0x7F;

/// A rendered document body plus the byte offsets of any field written through
/// [`BinaryFormat::render_with_bindings`], so the caller can hand them to `wire_bytes::BoundHandle`
/// once the body has been copied into a document's byte store.
#[derive(Debug, Clone, Default)]
pub struct EncodedDocument {
    pub bytes: Vec<u8>,
    pub bindings: Vec<(Field, BoundRef)>,
}

/// Self-describing tagged binary codec. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryFormat;

impl BinaryFormat {
    pub fn new() -> Self {
        Self
    }

    /// Render a flat list of fields with no bound-scalar tracking.
    pub fn render(&self, fields: &[(Field, Value)]) -> CodecResult<Vec<u8>> {
        Ok(self.render_with_bindings(fields, &[])?.bytes)
    }

    /// Render a flat list of fields, pinning any field named in `bound_fields` to its full
    /// declared width (no auto-compaction) and recording where it landed.
    pub fn render_with_bindings(
        &self,
        fields: &[(Field, Value)],
        bound_fields: &[Field],
    ) -> CodecResult<EncodedDocument> {
        let mut out = Vec::new();
        let mut bindings = Vec::new();
        for (field, value) in fields {
            write_field_tag(&mut out, field)?;
            if bound_fields.contains(field) {
                let (offset, width) = write_pinned_scalar(&mut out, value)?;
                bindings.push((field.clone(), BoundRef::scalar(offset, width)));
            } else {
                write_value(&mut out, value)?;
            }
        }
        Ok(EncodedDocument { bytes: out, bindings })
    }

    pub fn parse(&self, bytes: &[u8]) -> CodecResult<Vec<(Field, Value)>> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let mut out = Vec::new();
        while cursor.pos < cursor.bytes.len() {
            let field = read_field_tag(&mut cursor)?;
            let value = read_value(&mut cursor)?;
            out.push((field, value));
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
        let end = self.pos.checked_add(n).ok_or_else(|| malformed("length overflow"))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| malformed(&format!("expected {n} more bytes at offset {}", self.pos)))?;
        self.pos = end;
        Ok(slice)
    }

    fn take_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn peek_u8(&self) -> CodecResult<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| malformed("unexpected end of body"))
    }
}

fn malformed(reason: &str) -> CodecError {
    CodecError::Malformed {
        format: "binary",
        reason: reason.to_string(),
    }
}

fn write_field_tag(out: &mut Vec<u8>, field: &Field) -> CodecResult<()> {
    match field {
        Field::Number(n) => {
            if *n > (FIELD_NUMBER_MAX - FIELD_NUMBER_BASE) as u16 {
                return Err(CodecError::IllegalArgument(format!(
                    "field number {n} exceeds the inline range supported by this format"
                )));
            }
            out.push(FIELD_NUMBER_BASE + *n as u8);
        }
        Field::Name(name) => {
            let bytes = name.as_bytes();
            if bytes.len() <= FIELD_NAME_INLINE_MAX_LEN as usize {
                out.push(FIELD_NAME_BASE + bytes.len() as u8);
            } else {
                out.push(FIELD_NAME_ESCAPE);
                out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            }
            out.extend_from_slice(bytes);
        }
        Field::Anonymous => {
            return Err(CodecError::IllegalArgument(
                "a self-describing binary document requires a name or number for every field"
                    .to_string(),
            ))
        }
    }
    Ok(())
}

fn read_field_tag(cur: &mut Cursor<'_>) -> CodecResult<Field> {
    let tag = cur.take_u8()?;
    match tag {
        FIELD_NUMBER_BASE..=FIELD_NUMBER_MAX => Ok(Field::Number((tag - FIELD_NUMBER_BASE) as u16)),
        FIELD_NAME_ESCAPE => {
            let len = u16::from_le_bytes(cur.take(2)?.try_into().expect("len 2")) as usize;
            Ok(Field::Name(read_utf8(cur, len)?))
        }
        t if (FIELD_NAME_BASE..FIELD_NAME_ESCAPE).contains(&t) => {
            let len = (t - FIELD_NAME_BASE) as usize;
            Ok(Field::Name(read_utf8(cur, len)?))
        }
        other => Err(malformed(&format!("unrecognized field tag 0x{other:02X}"))),
    }
}

fn read_utf8(cur: &mut Cursor<'_>, len: usize) -> CodecResult<String> {
    let bytes = cur.take(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| malformed(&format!("invalid UTF-8: {e}")))
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(if *b { 1 } else { 0 });
        }
        Value::Int8(v) => write_int(out, *v as i64),
        Value::Int16(v) => write_int(out, *v as i64),
        Value::Int32(v) => write_int(out, *v as i64),
        Value::Int64(v) => write_int(out, *v),
        Value::Float32(v) => write_float(out, *v as f64),
        Value::Float64(v) => write_float(out, *v),
        Value::Text(s) | Value::Enum(s) => {
            write_tagged_string(out, s, VALUE_TEXT_BASE, VALUE_TEXT_INLINE_MAX_LEN, VALUE_TEXT_ESCAPE)
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        Value::Sequence(items) => {
            out.push(TAG_SEQUENCE);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                write_value(out, item)?;
            }
        }
        Value::Mapping(fields) => {
            out.push(TAG_NESTED_DOCUMENT);
            let mut body = Vec::new();
            for (field, v) in fields {
                write_field_tag(&mut body, field)?;
                write_value(&mut body, v)?;
            }
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            out.extend_from_slice(&body);
        }
        Value::Typed(alias, inner) => {
            out.push(TAG_MARSHALLABLE);
            let alias_bytes = alias.as_bytes();
            if alias_bytes.len() > u8::MAX as usize {
                return Err(CodecError::IllegalArgument(format!(
                    "class alias '{alias}' is too long to encode"
                )));
            }
            out.push(alias_bytes.len() as u8);
            out.extend_from_slice(alias_bytes);
            // A mapping inner renders through the same nested-document encoding as a bare
            // `Value::Mapping`; a scalar inner just writes its own tag with no extra wrapper.
            write_value(out, inner)?;
        }
    }
    Ok(())
}

/// Writes `value` with the narrowest float tag that reproduces it exactly, matching the integer
/// auto-compaction above.
fn write_float(out: &mut Vec<u8>, value: f64) {
    if value.is_finite() && f64::from(value as f32) == value {
        out.push(TAG_FLOAT32);
        out.extend_from_slice(&(value as f32).to_le_bytes());
    } else {
        out.push(TAG_FLOAT64);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_int(out: &mut Vec<u8>, value: i64) {
    if (0..=COMPACT_INT_MAX).contains(&value) {
        out.push(value as u8);
    } else if let Ok(v) = i8::try_from(value) {
        out.push(TAG_INT8);
        out.push(v as u8);
    } else if let Ok(v) = i16::try_from(value) {
        out.push(TAG_INT16);
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = i32::try_from(value) {
        out.push(TAG_INT32);
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.push(TAG_INT64);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Writes `value` at its full declared width with no compaction, and returns the offset of the
/// *value* bytes (after the tag byte) so the caller's `BoundRef` points at the scalar itself and
/// stays valid across later in-place atomic writes at that offset.
fn write_pinned_scalar(out: &mut Vec<u8>, value: &Value) -> CodecResult<(u64, FixedWidth)> {
    match value {
        Value::Int32(v) => {
            out.push(TAG_INT32);
            let offset = out.len() as u64;
            out.extend_from_slice(&v.to_le_bytes());
            Ok((offset, FixedWidth::Word32))
        }
        Value::Int64(v) => {
            out.push(TAG_INT64);
            let offset = out.len() as u64;
            out.extend_from_slice(&v.to_le_bytes());
            Ok((offset, FixedWidth::Word64))
        }
        other => Err(CodecError::SchemaMismatch {
            expected: "int32 or int64",
            found: value_kind_name(other),
        }),
    }
}

fn write_tagged_string(out: &mut Vec<u8>, s: &str, base: u8, inline_max: u8, escape: u8) {
    let bytes = s.as_bytes();
    if bytes.len() <= inline_max as usize {
        out.push(base + bytes.len() as u8);
    } else {
        out.push(escape);
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    }
    out.extend_from_slice(bytes);
}

fn read_value(cur: &mut Cursor<'_>) -> CodecResult<Value> {
    let tag = cur.peek_u8()?;
    if tag <= COMPACT_INT_MAX as u8 {
        cur.take_u8()?;
        return Ok(Value::Int64(tag as i64));
    }
    match tag {
        TAG_FLOAT32 => {
            cur.take_u8()?;
            let v = f32::from_le_bytes(cur.take(4)?.try_into().expect("len 4"));
            Ok(Value::Float64(v as f64))
        }
        TAG_FLOAT64 => {
            cur.take_u8()?;
            Ok(Value::Float64(f64::from_le_bytes(cur.take(8)?.try_into().expect("len 8"))))
        }
        TAG_INT8 => {
            cur.take_u8()?;
            Ok(Value::Int64(cur.take_u8()? as i8 as i64))
        }
        TAG_INT16 => {
            cur.take_u8()?;
            Ok(Value::Int64(i16::from_le_bytes(cur.take(2)?.try_into().expect("len 2")) as i64))
        }
        TAG_INT32 => {
            cur.take_u8()?;
            Ok(Value::Int64(i32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as i64))
        }
        TAG_INT64 => {
            cur.take_u8()?;
            Ok(Value::Int64(i64::from_le_bytes(cur.take(8)?.try_into().expect("len 8"))))
        }
        TAG_NULL => {
            cur.take_u8()?;
            Ok(Value::Null)
        }
        TAG_BOOL => {
            cur.take_u8()?;
            Ok(Value::Bool(cur.take_u8()? != 0))
        }
        TAG_BYTES => {
            cur.take_u8()?;
            let len = u32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as usize;
            Ok(Value::Bytes(cur.take(len)?.to_vec().into()))
        }
        TAG_SEQUENCE => {
            cur.take_u8()?;
            let len = u32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as usize;
            let mut items = Vec::with_capacity(len);
            for _ in 0..len {
                items.push(read_value(cur)?);
            }
            Ok(Value::Sequence(items))
        }
        TAG_NESTED_DOCUMENT => {
            cur.take_u8()?;
            let len = u32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as usize;
            let body = cur.take(len)?;
            let mut body_cursor = Cursor { bytes: body, pos: 0 };
            let mut fields = Vec::new();
            while body_cursor.pos < body_cursor.bytes.len() {
                let field = read_field_tag(&mut body_cursor)?;
                let value = read_value(&mut body_cursor)?;
                fields.push((field, value));
            }
            Ok(Value::Mapping(fields))
        }
        TAG_MARSHALLABLE => {
            cur.take_u8()?;
            let alias_len = cur.take_u8()? as usize;
            let alias = read_utf8(cur, alias_len)?;
            let inner = read_value(cur)?;
            Ok(Value::Typed(alias, Box::new(inner)))
        }
        VALUE_TEXT_ESCAPE => {
            cur.take_u8()?;
            let len = u32::from_le_bytes(cur.take(4)?.try_into().expect("len 4")) as usize;
            Ok(Value::Text(read_utf8(cur, len)?))
        }
        t if (VALUE_TEXT_BASE..VALUE_TEXT_ESCAPE).contains(&t) => {
            cur.take_u8()?;
            let len = (t - VALUE_TEXT_BASE) as usize;
            Ok(Value::Text(read_utf8(cur, len)?))
        }
        other => Err(malformed(&format!("unrecognized value tag 0x{other:02X}"))),
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
