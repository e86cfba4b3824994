//! Scenario 5: two writers racing against one shared store for a bounded stretch of wall time.
//! Checks the framing-layer invariant that the resulting chain of committed headers is
//! contiguous and gap-free, and that `HeaderNumber` — local to each writer's own `Wire` — matches
//! what that writer actually committed.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use wire::{BinaryWire, ByteStore, Field, HeapByteStore, Value, WireConfig};

const DOCUMENT_FIELD_BYTES: usize = 24;

fn payload() -> Vec<(Field, Value)> {
    vec![(Field::name("payload"), Value::Text("x".repeat(DOCUMENT_FIELD_BYTES)))]
}

#[test]
fn two_writers_produce_a_contiguous_gap_free_header_chain() {
    let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(8 * 1024 * 1024));

    let init = BinaryWire::new(store.clone(), WireConfig::default());
    assert!(init.create().unwrap());
    init.write_first_document(&[]).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let deadline = Instant::now() + Duration::from_millis(300);

    let mut handles = Vec::new();
    let mut commit_counts = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let stop = stop.clone();
        handles.push(thread::spawn(move || {
            let wire = BinaryWire::new(store, WireConfig::default());
            let mut committed = 0u64;
            while !stop.load(Ordering::Relaxed) {
                wire.write_document(&payload(), false).unwrap();
                committed += 1;
            }
            (committed, wire.header_number().unwrap_or(0))
        }));
    }

    while Instant::now() < deadline {
        thread::yield_now();
    }
    stop.store(true, Ordering::Relaxed);

    for handle in handles {
        let (committed, header_number) = handle.join().unwrap();
        commit_counts.push(committed);
        // HeaderNumber advances both on this writer's own commits and while scanning past a
        // contended slot another writer just finished, so it tracks "data documents this Wire has
        // advanced past", not strictly "data documents this Wire itself wrote" — it can only be
        // less than what this writer committed if committing never required a forward scan, and
        // never more than the grand total in flight.
        assert!(committed > 0, "writer made no progress inside the race window");
        assert!(header_number >= committed);
    }

    let total_committed: u64 = commit_counts.iter().sum();

    // A single-threaded scanner starting right after the first header walks every committed
    // document in order; the chain must be contiguous (no NOT_COMPLETE header in the middle) and
    // the scanner's count must equal the sum of what the writers themselves reported committing.
    let scanner = BinaryWire::new(store, WireConfig::default());
    scanner.read_first_document().unwrap();
    let mut scanned = 0u64;
    loop {
        match scanner.read_document(false).unwrap() {
            wire::ReadStep::Document(_) => scanned += 1,
            wire::ReadStep::NotReady => break,
            wire::ReadStep::EndOfStream => break,
        }
    }
    assert_eq!(scanned, total_committed);
}
