//! Scenario 6: a byte manually written past a reserved document's claimed end, before the header
//! is committed, must be caught as `StreamCorrupted` once assertion mode is on — and must be
//! silently accepted once it is off, since the whole point of the flag is to trade that safety
//! net for one fewer store round-trip per commit.
use std::sync::Arc;
use std::time::Duration;

use wire::{ByteStore, HeapByteStore, WireConfig, WireError};
use wire_core::BusyPauser;
use wire_framing::{Framing, FramingError};

fn framing(assertion_mode: bool) -> (Framing, Arc<dyn ByteStore>) {
    let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(256));
    let config = WireConfig::builder().assertion_mode(assertion_mode).build();
    let framing = Framing::new_with_limits(
        store.clone(),
        Box::new(BusyPauser::default()),
        config.assertion_mode,
        config.first_header_max_len,
        config.skip_ahead_threshold,
    );
    (framing, store)
}

#[test]
fn tail_corruption_is_rejected_under_assertion_mode() {
    let (framing, store) = framing(true);
    framing.write_first_header().unwrap();
    framing.update_first_header(0).unwrap();

    let offset = framing.write_header(Some(16), Duration::from_millis(100)).unwrap();
    store.write_bytes(offset + 4, b"hi").unwrap();
    framing.advance_write_cursor_to(offset + 4 + 2);
    // Corrupt the byte immediately past the claimed body end before committing.
    store.write_bytes(offset + 4 + 2, &[0xFF]).unwrap();

    let err = framing.update_header(offset, false).unwrap_err();
    let wire_err: WireError = err.into();
    assert!(matches!(wire_err, WireError::Framing(FramingError::StreamCorrupted(_))));
}

#[test]
fn tail_corruption_is_ignored_without_assertion_mode() {
    let (framing, store) = framing(false);
    framing.write_first_header().unwrap();
    framing.update_first_header(0).unwrap();

    let offset = framing.write_header(Some(16), Duration::from_millis(100)).unwrap();
    store.write_bytes(offset + 4, b"hi").unwrap();
    framing.advance_write_cursor_to(offset + 4 + 2);
    store.write_bytes(offset + 4 + 2, &[0xFF]).unwrap();

    // No assertion, no CAS-on-commit, no tail check: the ordered write goes through regardless.
    let committed = framing.update_header(offset, false).unwrap();
    assert_eq!(committed, 2);
}
