use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;

use wire_bytes::ByteStore;
use wire_core::Pauser;

use crate::error::{FramingError, FramingResult};
use crate::header::{
    decode, encode_ready, encode_reservation, framed_len, HeaderWord, MAX_LENGTH,
    NOT_COMPLETE_UNKNOWN_LENGTH, UNKNOWN_LENGTH,
};
use crate::scope::{ScopeGuard, ScopeTicket};

const DEFAULT_FIRST_HEADER_MAX_LEN: u32 = 64 * 1024;
const DEFAULT_SKIP_AHEAD_THRESHOLD: u64 = 1024 * 1024;

/// Outcome of `read_data_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Not ready yet; try again later.
    None,
    Meta { offset: u64, len: u32 },
    Data { offset: u64, len: u32 },
    EndOfStream,
}

#[derive(Debug, Clone, Copy)]
struct InsideHeader {
    offset: u64,
    reserved_len: Option<u32>,
    is_meta: bool,
}

/// The framing state shared by every `Wire` variant: header reservation/commit, the read/write
/// cursors, `HeaderNumber`, and the `startUse`/`endUse` scope guard. This is the "shared value
/// aggregate embedded in each variant" called for by collapsing the source's class hierarchy down
/// to a single interface over three closed format variants — `TextWire`, `BinaryWire` and
/// `RawWire` in the `wire` facade crate each hold one of these and differ only in which codec
/// format they drive.
pub struct Framing {
    store: Arc<dyn ByteStore>,
    write_cursor: Cell<u64>,
    read_cursor: Cell<u64>,
    header_number: Cell<Option<u64>>,
    inside_header: Cell<Option<InsideHeader>>,
    pauser: RefCell<Box<dyn Pauser>>,
    assertion_mode: bool,
    first_header_max_len: u32,
    skip_ahead_threshold: u64,
    scope: ScopeGuard,
}

impl std::fmt::Debug for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framing")
            .field("write_cursor", &self.write_cursor.get())
            .field("read_cursor", &self.read_cursor.get())
            .field("header_number", &self.header_number.get())
            .field("assertion_mode", &self.assertion_mode)
            .finish()
    }
}

impl Framing {
    pub fn new(store: Arc<dyn ByteStore>, pauser: Box<dyn Pauser>, assertion_mode: bool) -> Self {
        Self::new_with_limits(
            store,
            pauser,
            assertion_mode,
            DEFAULT_FIRST_HEADER_MAX_LEN,
            DEFAULT_SKIP_AHEAD_THRESHOLD,
        )
    }

    /// As [`Framing::new`], but with an explicit first-header size ceiling and skip-ahead jump
    /// distance instead of the spec's defaults (64 KiB, 1 MiB) — the knobs a `WireConfig`
    /// exposes at the facade crate.
    pub fn new_with_limits(
        store: Arc<dyn ByteStore>,
        pauser: Box<dyn Pauser>,
        assertion_mode: bool,
        first_header_max_len: u32,
        skip_ahead_threshold: u64,
    ) -> Self {
        Self {
            store,
            write_cursor: Cell::new(0),
            read_cursor: Cell::new(0),
            header_number: Cell::new(None),
            inside_header: Cell::new(None),
            pauser: RefCell::new(pauser),
            assertion_mode,
            first_header_max_len,
            skip_ahead_threshold,
            scope: ScopeGuard::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    pub fn start_use(&self) -> FramingResult<ScopeTicket<'_>> {
        self.scope.start_use()
    }

    pub fn header_number(&self) -> Option<u64> {
        self.header_number.get()
    }

    /// Reset `HeaderNumber` to unset, e.g. after a skip-ahead jump loses continuity with prior
    /// document counting.
    pub fn reset_header_number(&self) {
        self.header_number.set(None);
    }

    fn bump_header_number_if_data(&self, is_meta: bool) {
        if !is_meta {
            self.header_number.set(Some(self.header_number.get().unwrap_or(0) + 1));
        }
    }

    pub fn write_cursor(&self) -> u64 {
        self.write_cursor.get()
    }

    pub fn read_cursor(&self) -> u64 {
        self.read_cursor.get()
    }

    pub fn seek_read_cursor(&self, pos: u64) {
        self.read_cursor.set(pos);
    }

    /// Advances the write cursor to `pos` after the caller has written document body bytes
    /// directly through `store()` rather than through `Framing` itself — the codec layer renders
    /// a whole document up front and writes it with its own bounds-checked cursor over the
    /// reserved body window, so `Framing` has to be told where that left the write cursor before
    /// `update_header` can compute the actual body length.
    pub fn advance_write_cursor_to(&self, pos: u64) {
        self.write_cursor.set(pos);
    }

    // ---- First-header protocol -------------------------------------------------------------

    /// CAS offset 0 from `NOT_INITIALIZED` to the reservation sentinel. Returns whether this
    /// caller is the stream's initialiser (`false` means someone else already claimed it).
    pub fn write_first_header(&self) -> FramingResult<bool> {
        let won = self
            .store
            .compare_and_swap_i32(0, 0, NOT_COMPLETE_UNKNOWN_LENGTH as i32)?;
        if won {
            self.write_cursor.set(4);
        }
        Ok(won)
    }

    pub fn update_first_header(&self, body_len: u32) -> FramingResult<()> {
        if body_len > self.first_header_max_len {
            return Err(FramingError::IllegalArgument(format!(
                "first header body of {body_len} bytes exceeds the 64 KiB ceiling"
            )));
        }
        let word = encode_ready(body_len, true);
        self.store.write_ordered_i32(0, word as i32)?;
        self.write_cursor.set(framed_len(body_len));
        Ok(())
    }

    pub fn read_first_header(&self, timeout: Duration) -> FramingResult<u32> {
        let mut pauser = self.pauser.borrow_mut();
        pauser.reset();
        loop {
            let word = self.store.read_volatile_i32(0)? as u32;
            match decode(word) {
                HeaderWord::Ready { meta: true, len } => {
                    if len > self.first_header_max_len {
                        return Err(FramingError::StreamCorrupted(format!(
                            "first header length {len} exceeds 64 KiB"
                        )));
                    }
                    self.read_cursor.set(framed_len(len));
                    return Ok(len);
                }
                HeaderWord::Ready { meta: false, .. } => {
                    return Err(FramingError::StreamCorrupted(
                        "first header is not meta-data".into(),
                    ));
                }
                HeaderWord::EndOfStream => return Err(FramingError::EndOfStream),
                _ => {
                    pauser.pause_timeout(timeout).map_err(|_| FramingError::Timeout {
                        during: "readFirstHeader",
                    })?;
                }
            }
        }
    }

    // ---- Reservation / commit ----------------------------------------------------------------

    /// Reserve a document header. `requested_len` of `None` means `UNKNOWN_LENGTH` (writer will
    /// discover the length by how much it writes before committing). Returns the absolute offset
    /// of the reserved header.
    pub fn write_header(&self, requested_len: Option<u32>, timeout: Duration) -> FramingResult<u64> {
        self.write_header_from(self.write_cursor.get(), requested_len, timeout)
    }

    /// As `write_header`, but jump straight to `hint` first if it is far enough ahead of the
    /// current write cursor to be worth skipping the intervening scan — the skip-ahead
    /// optimisation for multi-writer append logs. Resets `HeaderNumber` since document counting
    /// continuity is lost across the jump.
    pub fn write_header_with_hint(
        &self,
        requested_len: Option<u32>,
        timeout: Duration,
        hint: u64,
    ) -> FramingResult<u64> {
        let start = if hint > self.write_cursor.get() + self.skip_ahead_threshold {
            self.reset_header_number();
            hint
        } else {
            self.write_cursor.get()
        };
        self.write_header_from(start, requested_len, timeout)
    }

    fn write_header_from(
        &self,
        mut pos: u64,
        requested_len: Option<u32>,
        timeout: Duration,
    ) -> FramingResult<u64> {
        if let Some(inside) = self.inside_header.get() {
            return Err(FramingError::Reentrant { offset: inside.offset });
        }
        let max_len = requested_len.unwrap_or(MAX_LENGTH);
        if max_len > MAX_LENGTH {
            return Err(FramingError::IllegalArgument(format!(
                "requested length {max_len} exceeds MAX_LENGTH"
            )));
        }

        let mut pauser = self.pauser.borrow_mut();
        pauser.reset();

        loop {
            let capacity = self.store.real_capacity();
            let available = capacity.saturating_sub(pos + 4);
            if u64::from(max_len) > available {
                return Err(FramingError::NotEnoughSpace {
                    requested: u64::from(max_len),
                    available,
                });
            }

            let reservation = encode_reservation(requested_len.unwrap_or(UNKNOWN_LENGTH));
            if self.store.compare_and_swap_i32(pos, 0, reservation as i32)? {
                self.write_cursor.set(pos + 4);
                self.inside_header.set(Some(InsideHeader {
                    offset: pos,
                    reserved_len: requested_len,
                    is_meta: false,
                }));
                tracing::trace!(offset = pos, "reserved document header");
                return Ok(pos);
            }

            tracing::debug!(offset = pos, "header CAS contended, scanning forward");
            loop {
                let word = self.store.read_volatile_i32(pos)? as u32;
                match decode(word) {
                    HeaderWord::EndOfStream => return Err(FramingError::EndOfStream),
                    HeaderWord::Ready { meta, len } => {
                        self.bump_header_number_if_data(meta);
                        pos += framed_len(len);
                        break;
                    }
                    _ => {
                        pauser.pause_timeout(timeout).map_err(|_| FramingError::Timeout {
                            during: "writeHeader scan-forward",
                        })?;
                    }
                }
            }
        }
    }

    pub fn update_header(&self, offset: u64, is_meta: bool) -> FramingResult<u32> {
        let inside = self.inside_header.get().ok_or_else(|| {
            FramingError::IllegalArgument("updateHeader called without a reservation".into())
        })?;
        if inside.offset != offset {
            return Err(FramingError::IllegalArgument(format!(
                "updateHeader offset {offset} does not match reserved offset {}",
                inside.offset
            )));
        }

        let mut cursor_pos = self.write_cursor.get();
        if cursor_pos == offset + 4 {
            self.store.write_bytes(cursor_pos, &[0u8])?;
            cursor_pos += 1;
            self.write_cursor.set(cursor_pos);
        }

        let actual = cursor_pos - offset - 4;
        let actual: u32 = actual
            .try_into()
            .map_err(|_| FramingError::StreamCorrupted("body length exceeds 31 bits".into()))?;

        if let Some(reserved) = inside.reserved_len {
            if actual > reserved {
                return Err(FramingError::LengthMismatch { reserved, actual });
            }
        }
        if actual == 0 && !is_meta {
            return Err(FramingError::IllegalArgument(
                "data documents cannot have zero length".into(),
            ));
        }

        let new_word = encode_ready(actual, is_meta);
        if self.assertion_mode {
            let expected = encode_reservation(inside.reserved_len.unwrap_or(UNKNOWN_LENGTH));
            if !self
                .store
                .compare_and_swap_i32(offset, expected as i32, new_word as i32)?
            {
                return Err(FramingError::StreamCorrupted(
                    "header CAS mismatch on commit".into(),
                ));
            }
            if cursor_pos + 4 <= self.store.real_capacity() {
                let mut probe = [0u8; 4];
                self.store.read_bytes(cursor_pos, &mut probe)?;
                if probe != [0, 0, 0, 0] {
                    tracing::error!(offset, "bytes past document end are non-zero");
                    return Err(FramingError::StreamCorrupted(
                        "non-zero bytes found past document end".into(),
                    ));
                }
            }
        } else {
            self.store.write_ordered_i32(offset, new_word as i32)?;
        }

        self.inside_header.set(None);
        self.bump_header_number_if_data(is_meta);
        Ok(actual)
    }

    // ---- Reading ------------------------------------------------------------------------------

    pub fn read_data_header(&self, include_meta: bool) -> FramingResult<ReadOutcome> {
        loop {
            let pos = self.read_cursor.get();
            let word = self.store.read_volatile_i32(pos)? as u32;
            match decode(word) {
                HeaderWord::Unset | HeaderWord::ReservedUnknownLength | HeaderWord::Reserved { .. } => {
                    return Ok(ReadOutcome::None)
                }
                HeaderWord::EndOfStream => return Ok(ReadOutcome::EndOfStream),
                HeaderWord::Ready { meta: true, len } => {
                    if include_meta {
                        return Ok(ReadOutcome::Meta { offset: pos, len });
                    }
                    self.read_cursor.set(pos + framed_len(len));
                }
                HeaderWord::Ready { meta: false, len } => {
                    return Ok(ReadOutcome::Data { offset: pos, len });
                }
            }
        }
    }

    /// Advance the read cursor past a document the caller has finished consuming.
    pub fn advance_past(&self, offset: u64, len: u32) {
        self.read_cursor.set(offset + framed_len(len));
    }

    // ---- End of stream --------------------------------------------------------------------------

    pub fn write_end_of_wire(&self, timeout: Duration) -> FramingResult<()> {
        let mut pauser = self.pauser.borrow_mut();
        pauser.reset();
        let mut pos = self.write_cursor.get();
        loop {
            let word = self.store.read_volatile_i32(pos)? as u32;
            if word == crate::header::END_OF_DATA {
                return Ok(());
            }
            if self.store.compare_and_swap_i32(pos, 0, crate::header::END_OF_DATA as i32)? {
                self.write_cursor.set(pos);
                return Ok(());
            }
            match decode(self.store.read_volatile_i32(pos)? as u32) {
                HeaderWord::EndOfStream => return Ok(()),
                HeaderWord::Ready { meta, len } => {
                    self.bump_header_number_if_data(meta);
                    pos += framed_len(len);
                }
                _ => {
                    pauser.pause_timeout(timeout).map_err(|_| FramingError::Timeout {
                        during: "writeEndOfWire",
                    })?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wire_bytes::HeapByteStore;
    use wire_core::BusyPauser;

    fn framing(capacity: usize) -> Framing {
        let store: Arc<dyn ByteStore> = Arc::new(HeapByteStore::new(capacity));
        Framing::new(store, Box::new(BusyPauser::default()), true)
    }

    #[test]
    fn first_header_round_trip() {
        let f = framing(256);
        assert!(f.write_first_header().unwrap());
        f.update_first_header(10).unwrap();
        let len = f.read_first_header(Duration::from_millis(100)).unwrap();
        assert_eq!(len, 10);
    }

    #[test]
    fn second_writer_loses_first_header_race() {
        let f = framing(256);
        assert!(f.write_first_header().unwrap());
        assert!(!f.write_first_header().unwrap());
    }

    #[test]
    fn reserve_write_commit_then_read_back() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();

        let offset = f.write_header(Some(16), Duration::from_millis(100)).unwrap();
        f.store().write_bytes(offset + 4, b"hello world").unwrap();
        // advance the write cursor to reflect bytes actually written by the body writer
        f.write_cursor.set(offset + 4 + 11);
        let committed = f.update_header(offset, false).unwrap();
        assert_eq!(committed, 11);

        f.seek_read_cursor(offset);
        match f.read_data_header(false).unwrap() {
            ReadOutcome::Data { offset: o, len } => {
                assert_eq!(o, offset);
                assert_eq!(len, 11);
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn reentrant_reservation_is_rejected() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();
        f.write_header(Some(16), Duration::from_millis(100)).unwrap();
        let err = f.write_header(Some(16), Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, FramingError::Reentrant { .. }));
    }

    #[test]
    fn not_enough_space_is_reported() {
        let f = framing(8);
        let err = f
            .write_header(Some(1000), Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, FramingError::NotEnoughSpace { .. }));
    }

    #[test]
    fn empty_data_body_gets_padded_to_one_byte() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();
        let offset = f.write_header(Some(16), Duration::from_millis(100)).unwrap();
        let committed = f.update_header(offset, false).unwrap();
        assert_eq!(committed, 1);
    }

    #[test]
    fn end_of_wire_is_observed_by_reader() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();
        f.write_end_of_wire(Duration::from_millis(100)).unwrap();
        f.seek_read_cursor(f.write_cursor());
        assert_eq!(f.read_data_header(false).unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn write_end_of_wire_is_idempotent() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();
        f.write_end_of_wire(Duration::from_millis(100)).unwrap();
        f.write_end_of_wire(Duration::from_millis(100)).unwrap();
    }

    #[test]
    fn corrupted_tail_is_detected_under_assertion_mode() {
        let f = framing(256);
        f.write_first_header().unwrap();
        f.update_first_header(0).unwrap();
        let offset = f.write_header(Some(16), Duration::from_millis(100)).unwrap();
        f.store().write_bytes(offset + 4, b"hi").unwrap();
        f.write_cursor.set(offset + 4 + 2);
        // corrupt the byte immediately after the claimed body end
        f.store().write_bytes(offset + 4 + 2, &[0xFF]).unwrap();
        let err = f.update_header(offset, false).unwrap_err();
        assert!(matches!(err, FramingError::StreamCorrupted(_)));
    }
}
