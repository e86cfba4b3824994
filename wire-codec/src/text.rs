//! Human-readable YAML-subset format.
//!
//! Unlike `BinaryFormat`, there is no tag byte in front of every value — the grammar itself
//! carries the type (quoting, a decimal point, `true`/`false`, a bare symbol). That makes one
//! case genuinely ambiguous on read: a plain, unquoted scalar with no internal whitespace could
//! have been written as either `Value::Text` or `Value::Enum` (the fixture in this crate's test
//! suite writes both `message: Hello World` and `code: SECONDS` with no quoting at all). This
//! parser resolves it the way most plain-scalar YAML consumers already read symbolic constants:
//! a token matching `^[A-Z][A-Z0-9_]*$` is read back as `Value::Enum`; anything else unquoted is
//! `Value::Text`. A writer that cares about the distinction surviving a round trip through an
//! unfamiliar reader should prefer `BinaryFormat`, which tags the two explicitly.
//!
//! Random access and in-place updates are not supported for text bodies: there is no way to
//! locate a scalar's byte offset without parsing the whole document, so `BoundRef`s are never
//! produced by this format.
use wire_core::{Field, Value};

use crate::error::{CodecError, CodecResult};

const INDENT_WIDTH: usize = 2;

/// Self-describing YAML-subset codec. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormat;

impl TextFormat {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, fields: &[(Field, Value)]) -> CodecResult<String> {
        let mut out = String::new();
        render_fields(&mut out, fields, 0)?;
        Ok(out)
    }

    pub fn parse(&self, body: &str) -> CodecResult<Vec<(Field, Value)>> {
        let lines: Vec<&str> = body.lines().collect();
        let (fields, consumed) = parse_block(&lines, 0, 0)?;
        if consumed != lines.len() {
            return Err(malformed(&format!(
                "trailing content at line {consumed} (indentation did not match any open block)"
            )));
        }
        Ok(fields)
    }
}

fn malformed(reason: &str) -> CodecError {
    CodecError::Malformed {
        format: "text",
        reason: reason.to_string(),
    }
}

fn render_fields(out: &mut String, fields: &[(Field, Value)], indent: usize) -> CodecResult<()> {
    for (field, value) in fields {
        out.push_str(&" ".repeat(indent));
        render_field_key(out, field)?;
        out.push(':');
        render_value(out, value, indent)?;
        out.push('\n');
    }
    Ok(())
}

fn render_field_key(out: &mut String, field: &Field) -> CodecResult<()> {
    match field {
        Field::Name(name) => out.push_str(&quote_if_needed(name)),
        Field::Number(n) => out.push_str(&n.to_string()),
        Field::Anonymous => {
            return Err(CodecError::IllegalArgument(
                "a text document requires a name or number for every field".to_string(),
            ))
        }
    }
    Ok(())
}

fn render_value(out: &mut String, value: &Value, indent: usize) -> CodecResult<()> {
    match value {
        Value::Null => out.push_str(" null"),
        Value::Bool(b) => out.push_str(if *b { " true" } else { " false" }),
        Value::Int8(v) => out.push_str(&format!(" {v}")),
        Value::Int16(v) => out.push_str(&format!(" {v}")),
        Value::Int32(v) => out.push_str(&format!(" {v}")),
        Value::Int64(v) => out.push_str(&format!(" {v}")),
        Value::Float32(v) => out.push_str(&format!(" {v}")),
        Value::Float64(v) => out.push_str(&format!(" {v}")),
        Value::Text(s) => {
            out.push(' ');
            out.push_str(&quote_if_needed(s));
        }
        Value::Enum(s) => {
            out.push(' ');
            out.push_str(s);
        }
        Value::Bytes(b) => {
            out.push_str(" !!binary \"");
            for byte in b.iter() {
                out.push_str(&format!("{byte:02x}"));
            }
            out.push('"');
        }
        Value::Sequence(items) => {
            out.push_str(" [");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_inline_scalar(out, item)?;
            }
            out.push(']');
        }
        Value::Mapping(nested) => {
            out.push('\n');
            render_fields(out, nested, indent + INDENT_WIDTH)?;
            // render_fields terminates with a trailing '\n' per field, so drop the one we'd add.
            out.pop();
        }
        Value::Typed(alias, inner) => {
            out.push_str(" !");
            out.push_str(alias);
            match inner.as_ref() {
                Value::Mapping(nested) => {
                    out.push('\n');
                    render_fields(out, nested, indent + INDENT_WIDTH)?;
                    out.pop();
                }
                other => render_value(out, other, indent)?,
            }
        }
    }
    Ok(())
}

fn render_inline_scalar(out: &mut String, value: &Value) -> CodecResult<()> {
    match value {
        Value::Text(s) => out.push_str(&quote_if_needed(s)),
        Value::Enum(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
        Value::Int8(v) => out.push_str(&v.to_string()),
        Value::Int16(v) => out.push_str(&v.to_string()),
        Value::Int32(v) => out.push_str(&v.to_string()),
        Value::Int64(v) => out.push_str(&v.to_string()),
        Value::Float32(v) => out.push_str(&v.to_string()),
        Value::Float64(v) => out.push_str(&v.to_string()),
        other => {
            return Err(CodecError::IllegalArgument(format!(
                "{other:?} cannot appear inline inside a sequence literal"
            )))
        }
    }
    Ok(())
}

fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s != s.trim() {
        return true;
    }
    if matches!(s, "true" | "false" | "null") {
        return true;
    }
    if looks_like_number(s) || is_bare_symbol(s) {
        return true;
    }
    let first = s.chars().next().expect("non-empty");
    if "!&*-?|>%@,\"'[]{}#".contains(first) {
        return true;
    }
    if s.contains(": ") || s.ends_with(':') || s.contains('\n') {
        return true;
    }
    false
}

fn quote_if_needed(s: &str) -> String {
    if needs_quoting(s) {
        let mut q = String::with_capacity(s.len() + 2);
        q.push('"');
        for c in s.chars() {
            match c {
                '\\' => q.push_str("\\\\"),
                '"' => q.push_str("\\\""),
                '\n' => q.push_str("\\n"),
                '\t' => q.push_str("\\t"),
                other => q.push(other),
            }
        }
        q.push('"');
        q
    } else {
        s.to_string()
    }
}

fn unquote(s: &str) -> CodecResult<String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| malformed(&format!("unterminated quoted scalar: {s}")))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => return Err(malformed("dangling escape at end of quoted scalar")),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn looks_like_number(s: &str) -> bool {
    parse_int(s).is_some() || parse_float(s).is_some()
}

fn parse_int(s: &str) -> Option<i64> {
    s.parse::<i64>().ok()
}

fn parse_float(s: &str) -> Option<f64> {
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        return None;
    }
    s.parse::<f64>().ok()
}

fn is_bare_symbol(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

/// Parses every field at exactly `indent` starting at `lines[start]`, stopping at the first line
/// that is blank, less indented than `indent`, or (having matched `indent` exactly) not a
/// `key: value` line. Returns the parsed fields and the index of the first unconsumed line.
fn parse_block(lines: &[&str], start: usize, indent: usize) -> CodecResult<(Vec<(Field, Value)>, usize)> {
    let mut fields = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let line_indent = indent_of(line);
        if line_indent < indent {
            break;
        }
        if line_indent > indent {
            return Err(malformed(&format!("unexpected indentation at line {i}")));
        }
        let content = &line[line_indent..];
        let colon = find_key_colon(content)
            .ok_or_else(|| malformed(&format!("expected 'key: value' at line {i}: {content:?}")))?;
        let key = content[..colon].trim();
        let field = parse_field_key(key)?;
        let remainder = content[colon + 1..].trim_start();
        let (value, next) = parse_value(lines, i, remainder, indent)?;
        fields.push((field, value));
        i = next;
    }
    Ok((fields, i))
}

fn find_key_colon(content: &str) -> Option<usize> {
    if let Some(rest) = content.strip_prefix('"') {
        let end = rest.find('"')?;
        let after = &content[end + 2..];
        return after.find(':').map(|p| end + 2 + p);
    }
    content.find(':')
}

fn parse_field_key(key: &str) -> CodecResult<Field> {
    if key.starts_with('"') {
        return Ok(Field::Name(unquote(key)?));
    }
    if let Ok(n) = key.parse::<u16>() {
        return Ok(Field::Number(n));
    }
    Ok(Field::Name(key.to_string()))
}

fn parse_value(
    lines: &[&str],
    current: usize,
    remainder: &str,
    parent_indent: usize,
) -> CodecResult<(Value, usize)> {
    if remainder.is_empty() {
        let nested_indent = parent_indent + INDENT_WIDTH;
        let next_nonblank = (current + 1..lines.len())
            .find(|&i| !lines[i].trim().is_empty())
            .map(|i| (i, indent_of(lines[i])));
        return match next_nonblank {
            Some((i, indent)) if indent >= nested_indent => {
                let (fields, next) = parse_block(lines, i, indent)?;
                Ok((Value::Mapping(fields), next))
            }
            _ => Ok((Value::Null, current + 1)),
        };
    }
    if let Some(alias) = remainder.strip_prefix('!') {
        if alias.starts_with('!') {
            return parse_tagged_scalar(remainder, current);
        }
        let nested_indent = parent_indent + INDENT_WIDTH;
        let next_nonblank = (current + 1..lines.len())
            .find(|&i| !lines[i].trim().is_empty())
            .map(|i| (i, indent_of(lines[i])));
        let (fields, next) = match next_nonblank {
            Some((i, indent)) if indent >= nested_indent => parse_block(lines, i, indent)?,
            _ => (Vec::new(), current + 1),
        };
        return Ok((
            Value::Typed(alias.trim().to_string(), Box::new(Value::Mapping(fields))),
            next,
        ));
    }
    if let Some(inline) = remainder.strip_prefix('[') {
        let inline = inline
            .strip_suffix(']')
            .ok_or_else(|| malformed(&format!("unterminated sequence at line {current}")))?;
        let items = split_inline_items(inline)?
            .into_iter()
            .map(|tok| parse_scalar(tok.trim()))
            .collect::<CodecResult<Vec<_>>>()?;
        return Ok((Value::Sequence(items), current + 1));
    }
    Ok((parse_scalar(remainder)?, current + 1))
}

fn parse_tagged_scalar(remainder: &str, line: usize) -> CodecResult<(Value, usize)> {
    let rest = remainder
        .strip_prefix("!!binary")
        .ok_or_else(|| malformed(&format!("unsupported tag at line {line}: {remainder}")))?
        .trim();
    let hex = rest
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| malformed(&format!("expected quoted hex payload at line {line}")))?;
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let chars: Vec<char> = hex.chars().collect();
    for pair in chars.chunks(2) {
        let s: String = pair.iter().collect();
        let byte = u8::from_str_radix(&s, 16).map_err(|_| malformed("invalid hex in !!binary payload"))?;
        bytes.push(byte);
    }
    Ok((Value::Bytes(bytes.into()), line + 1))
}

fn split_inline_items(s: &str) -> CodecResult<Vec<&str>> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut start = 0usize;
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'[' if !in_quotes => depth += 1,
            b']' if !in_quotes => depth -= 1,
            b',' if !in_quotes && depth == 0 => {
                items.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        items.push(&s[start..]);
    } else if s.is_empty() {
        return Ok(Vec::new());
    }
    Ok(items)
}

fn parse_scalar(token: &str) -> CodecResult<Value> {
    if token.starts_with("!!binary") {
        return Ok(parse_tagged_scalar(token, 0)?.0);
    }
    if token.starts_with('"') {
        return Ok(Value::Text(unquote(token)?));
    }
    match token {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" | "~" => return Ok(Value::Null),
        _ => {}
    }
    if let Some(v) = parse_int(token) {
        return Ok(Value::Int64(v));
    }
    if let Some(v) = parse_float(token) {
        return Ok(Value::Float64(v));
    }
    if is_bare_symbol(token) {
        return Ok(Value::Enum(token.to_string()));
    }
    Ok(Value::Text(token.to_string()))
}
