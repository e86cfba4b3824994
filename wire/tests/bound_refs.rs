//! After `boundScalar` pins a field, concurrent `getAndAdd` from N threads sharing the stream must
//! return N distinct consecutive values and leave the final `volatileGet` equal to N (§8, "bound
//! references").
use std::sync::Arc;
use std::thread;

use wire::{BinaryWire, Field, HeapByteStore, Value, WireConfig};

#[test]
fn concurrent_get_and_add_yields_distinct_consecutive_values() {
    let store: Arc<dyn wire::ByteStore> = Arc::new(HeapByteStore::new(4096));
    let w = BinaryWire::new(store, WireConfig::default());
    w.create().unwrap();
    w.write_first_document(&[]).unwrap();

    let fields = vec![(Field::name("counter"), Value::Int64(0))];
    let (_offset, handles) = w
        .write_document_with_bindings(&fields, &[Field::name("counter")], false)
        .unwrap();
    let (_, handle) = handles.into_iter().next().unwrap();
    let handle = Arc::new(handle);

    const THREADS: usize = 8;
    const INCREMENTS_PER_THREAD: usize = 200;

    let mut join_handles = Vec::new();
    for _ in 0..THREADS {
        let handle = handle.clone();
        join_handles.push(thread::spawn(move || {
            let mut observed = Vec::with_capacity(INCREMENTS_PER_THREAD);
            for _ in 0..INCREMENTS_PER_THREAD {
                observed.push(handle.get_and_add(1).unwrap());
            }
            observed
        }));
    }

    let mut all_observed: Vec<i64> = join_handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all_observed.sort_unstable();

    let total = (THREADS * INCREMENTS_PER_THREAD) as i64;
    let expected: Vec<i64> = (0..total).collect();
    assert_eq!(all_observed, expected, "every pre-increment value 0..N must appear exactly once");
    assert_eq!(handle.volatile_get().unwrap(), total);
}
