//! Scenario 4: a user type registered under an alias, round-tripped through `BinaryFormat` as a
//! `Value::Typed`, driven through a `Wire` and a `MarshalRegistry` the way an application actually
//! wires the two registries (`ClassAliasRegistry` for the tag map, `MarshalRegistry` for the
//! conversion) together around a document.
use std::sync::Arc;

use wire::{BinaryWire, ByteStore, Field, HeapByteStore, MarshalRegistry, Value, WireConfig};
use wire_codec::CodecError;

#[derive(Debug, PartialEq)]
struct TestMarshallable {
    name: String,
    count: i64,
}

fn marshal_registry() -> MarshalRegistry {
    let registry = MarshalRegistry::new();
    registry.register::<TestMarshallable, _, _>(
        "TestMarshallable",
        |t: &TestMarshallable| {
            Ok(Value::Mapping(vec![
                (Field::name("name"), Value::Text(t.name.clone())),
                (Field::name("count"), Value::Int64(t.count)),
            ]))
        },
        |v: &Value| match v {
            Value::Mapping(fields) => {
                let name = fields
                    .iter()
                    .find(|(f, _)| *f == Field::name("name"))
                    .and_then(|(_, v)| v.as_text())
                    .ok_or_else(|| CodecError::FieldMissing(Field::name("name")))?
                    .to_string();
                let count = fields
                    .iter()
                    .find(|(f, _)| *f == Field::name("count"))
                    .and_then(|(_, v)| v.as_i64())
                    .ok_or_else(|| CodecError::FieldMissing(Field::name("count")))?;
                Ok(TestMarshallable { name, count })
            }
            _ => Err(CodecError::IllegalArgument("expected a mapping".to_string())),
        },
    );
    registry
}

#[test]
fn typed_object_round_trips_through_binary_wire() {
    let marshal = marshal_registry();
    let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(4096));
    let w = BinaryWire::new(store, WireConfig::default());
    w.create().unwrap();
    w.write_first_document(&[]).unwrap();

    let original = TestMarshallable {
        name: "name".to_string(),
        count: 1,
    };
    let typed_value = marshal.write("TestMarshallable", &original).unwrap();
    w.write_document(&[(Field::name("payload"), typed_value)], false).unwrap();

    let doc = w.read_document(false).unwrap().document().unwrap();
    let mut reader = doc.fields;
    let read_back = reader.read_named(&Field::name("payload")).unwrap();
    let reconstructed: TestMarshallable = marshal.read(&read_back).unwrap();
    assert_eq!(reconstructed, original);
}
