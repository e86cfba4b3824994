//! Schema-evolution properties promised by the codec layer (order-independence, residual/unknown
//! fields, default-on-missing), exercised through a full `Wire` write/read round trip rather than
//! directly against `FieldReader`.
use std::sync::Arc;

use wire::{BinaryWire, ByteStore, Field, HeapByteStore, Value, WireConfig};

fn store() -> Arc<dyn ByteStore> {
    Arc::new(HeapByteStore::new(4096))
}

#[test]
fn reader_requesting_reordered_fields_gets_correct_values_and_residual() {
    let w = BinaryWire::new(store(), WireConfig::default());
    w.create().unwrap();
    w.write_first_document(&[]).unwrap();
    let fields = vec![
        (Field::name("a"), Value::Int64(1)),
        (Field::name("b"), Value::Int64(2)),
        (Field::name("c"), Value::Int64(3)),
    ];
    w.write_document(&fields, false).unwrap();

    let doc = w.read_document(false).unwrap().document().unwrap();
    let mut reader = doc.fields;
    assert_eq!(reader.read_named(&Field::name("c")), Some(Value::Int64(3)));
    assert_eq!(reader.read_named(&Field::name("a")), Some(Value::Int64(1)));
    assert_eq!(reader.residual(), vec![(Field::name("b"), Value::Int64(2))]);
}

#[test]
fn missing_field_returns_a_sentinel_default() {
    let w = BinaryWire::new(store(), WireConfig::default());
    w.create().unwrap();
    w.write_first_document(&[]).unwrap();
    w.write_document(&[(Field::name("a"), Value::Int64(1))], false).unwrap();

    let doc = w.read_document(false).unwrap().document().unwrap();
    let mut reader = doc.fields;
    assert_eq!(reader.read_named(&Field::name("a")), Some(Value::Int64(1)));
    assert_eq!(reader.read_or(&Field::name("b"), Value::Null), Value::Null);
}

#[test]
fn unknown_fields_are_enumerable_in_on_wire_order() {
    let w = BinaryWire::new(store(), WireConfig::default());
    w.create().unwrap();
    w.write_first_document(&[]).unwrap();
    let fields = vec![
        (Field::name("known"), Value::Text("value".to_string())),
        (Field::name("extra_one"), Value::Int32(10)),
        (Field::name("extra_two"), Value::Bool(true)),
    ];
    w.write_document(&fields, false).unwrap();

    let doc = w.read_document(false).unwrap().document().unwrap();
    let mut reader = doc.fields;
    assert_eq!(reader.read_named(&Field::name("known")), Some(Value::Text("value".to_string())));
    // BinaryFormat auto-compacts integers and always decodes them back as Int64, regardless of
    // the declared width they were written with.
    assert_eq!(
        reader.residual(),
        vec![
            (Field::name("extra_one"), Value::Int64(10)),
            (Field::name("extra_two"), Value::Bool(true)),
        ]
    );
}
