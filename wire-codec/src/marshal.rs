//! User marshalling: registered `{write, read}` callback pairs that convert a native Rust type
//! to and from the codec's `Value` universe.
//!
//! This is a different collaborator from `wire_core::ClassAliasRegistry`: that one is a bare
//! `String <-> TypeId` lookup consumed when `BinaryFormat`/`TextFormat` tag a typed object on the
//! wire. This registry is keyed by the *same* alias string but holds the actual conversion
//! logic, and is consulted by callers of the codec (not by the formats themselves) when they
//! want `Wire::write_typed`/`Wire::read_typed` to hand back a concrete `T` instead of a raw
//! `Value::Typed`.
use std::any::Any;
use std::collections::HashMap;
use std::sync::RwLock;

use wire_core::Value;

use crate::error::{CodecError, CodecResult};

type WriteFn = Box<dyn Fn(&dyn Any) -> CodecResult<Value> + Send + Sync>;
type ReadFn = Box<dyn Fn(&Value) -> CodecResult<Box<dyn Any>> + Send + Sync>;

struct Entry {
    write: WriteFn,
    read: ReadFn,
}

/// Registry of alias -> `{write, read}` callbacks. Construct one per `Wire` (or share a single
/// instance across callers that agree on the same set of marshallable types).
#[derive(Default)]
pub struct MarshalRegistry {
    entries: RwLock<HashMap<String, Entry>>,
}

impl std::fmt::Debug for MarshalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let aliases: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        f.debug_struct("MarshalRegistry").field("aliases", &aliases).finish()
    }
}

impl MarshalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the conversion pair for `T` under `alias`. Re-registering the same alias
    /// silently replaces the previous pair — unlike `ClassAliasRegistry::register`, there is no
    /// conflict to detect because there is no second type to compare against; the alias alone is
    /// the registration key.
    pub fn register<T, W, R>(&self, alias: impl Into<String>, write: W, read: R)
    where
        T: 'static,
        W: Fn(&T) -> CodecResult<Value> + Send + Sync + 'static,
        R: Fn(&Value) -> CodecResult<T> + Send + Sync + 'static,
    {
        let alias = alias.into();
        tracing::debug!(%alias, "registering marshalling callbacks");
        let entry = Entry {
            write: Box::new(move |any| {
                let typed = any.downcast_ref::<T>().ok_or_else(|| {
                    CodecError::IllegalArgument("marshalling callback called with the wrong type".to_string())
                })?;
                write(typed)
            }),
            read: Box::new(move |value| read(value).map(|v| Box::new(v) as Box<dyn Any>)),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(alias, entry);
    }

    pub fn is_registered(&self, alias: &str) -> bool {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).contains_key(alias)
    }

    /// Converts `value` into a `Value::Typed(alias, ...)` using the registered write callback.
    pub fn write<T: 'static>(&self, alias: &str, value: &T) -> CodecResult<Value> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .get(alias)
            .ok_or_else(|| CodecError::UnknownAlias(alias.to_string()))?;
        let inner = (entry.write)(value as &dyn Any)?;
        Ok(Value::Typed(alias.to_string(), Box::new(inner)))
    }

    /// Converts a `Value::Typed(alias, inner)` back into `T` using the registered read callback.
    pub fn read<T: 'static>(&self, value: &Value) -> CodecResult<T> {
        let (alias, inner) = match value {
            Value::Typed(alias, inner) => (alias, inner),
            other => {
                return Err(CodecError::SchemaMismatch {
                    expected: "typed",
                    found: value_kind_name(other),
                })
            }
        };
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries
            .get(alias.as_str())
            .ok_or_else(|| CodecError::UnknownAlias(alias.clone()))?;
        let boxed = (entry.read)(inner)?;
        boxed.downcast::<T>().map(|b| *b).map_err(|_| {
            CodecError::IllegalArgument(format!(
                "marshalling read callback for '{alias}' returned the wrong type"
            ))
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use wire_core::Field;

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    fn registry_with_point() -> MarshalRegistry {
        let registry = MarshalRegistry::new();
        registry.register::<Point, _, _>(
            "Point",
            |p: &Point| {
                Ok(Value::Mapping(vec![
                    (Field::name("x"), Value::Int64(p.x)),
                    (Field::name("y"), Value::Int64(p.y)),
                ]))
            },
            |v: &Value| match v {
                Value::Mapping(fields) => {
                    let x = fields
                        .iter()
                        .find(|(f, _)| *f == Field::name("x"))
                        .and_then(|(_, v)| v.as_i64())
                        .ok_or_else(|| CodecError::FieldMissing(Field::name("x")))?;
                    let y = fields
                        .iter()
                        .find(|(f, _)| *f == Field::name("y"))
                        .and_then(|(_, v)| v.as_i64())
                        .ok_or_else(|| CodecError::FieldMissing(Field::name("y")))?;
                    Ok(Point { x, y })
                }
                other => Err(CodecError::SchemaMismatch {
                    expected: "mapping",
                    found: value_kind_name(other),
                }),
            },
        );
        registry
    }

    #[test]
    fn write_then_read_round_trips() {
        let registry = registry_with_point();
        let point = Point { x: 3, y: 4 };
        let value = registry.write("Point", &point).unwrap();
        assert!(matches!(value, Value::Typed(ref alias, _) if alias == "Point"));
        let back: Point = registry.read(&value).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn unknown_alias_is_reported() {
        let registry = MarshalRegistry::new();
        let err = registry.write("Nope", &Point { x: 0, y: 0 }).unwrap_err();
        assert!(matches!(err, CodecError::UnknownAlias(_)));
    }

    #[test]
    fn reregistering_an_alias_replaces_it() {
        let registry = registry_with_point();
        registry.register::<Point, _, _>(
            "Point",
            |_: &Point| Ok(Value::Null),
            |_: &Value| Ok(Point { x: 0, y: 0 }),
        );
        let value = registry.write("Point", &Point { x: 1, y: 1 }).unwrap();
        assert!(matches!(value, Value::Typed(_, inner) if *inner == Value::Null));
    }
}
