//! Document header bit layout and the pure encode/decode functions over it.
//!
//! Three full-word values are sentinels checked by exact equality before any bit decomposition:
//! `NOT_INITIALIZED` (slot never touched), `NOT_COMPLETE_UNKNOWN_LENGTH` (the first header's
//! reservation marker, written before any length estimate exists), and `END_OF_DATA` (stream
//! terminator). Every other word decomposes as `{ready: bit 31, meta: bit 30, length: bits
//! 0..29}` when ready, or as a bare not-yet-ready length placeholder (top two bits clear) during
//! an ordinary (non-first-header) reservation.

pub const READY_BIT: u32 = 0x8000_0000;
pub const META_DATA_BIT: u32 = 0x4000_0000;
pub const LENGTH_MASK: u32 = 0x3FFF_FFFF;

pub const NOT_INITIALIZED: u32 = 0x0000_0000;
pub const NOT_COMPLETE_UNKNOWN_LENGTH: u32 = 0x8000_0000;
pub const END_OF_DATA: u32 = 0xC000_0000;
pub const MAX_LENGTH: u32 = 0x3FFF_FFFF;
pub const UNKNOWN_LENGTH: u32 = 0x3FFF_FFFF;

/// The decoded meaning of a 4-byte header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderWord {
    /// Slot has never been written (`0x0`).
    Unset,
    /// The first header's reservation sentinel: not ready, length not yet known.
    ReservedUnknownLength,
    /// An ordinary (non-first-header) reservation in progress: not ready, placeholder length as
    /// requested by the writer that owns it.
    Reserved { requested_len: u32 },
    /// A committed, readable document.
    Ready { meta: bool, len: u32 },
    /// The stream terminator.
    EndOfStream,
}

/// Decode a raw header word read from the store.
pub fn decode(word: u32) -> HeaderWord {
    match word {
        NOT_INITIALIZED => HeaderWord::Unset,
        NOT_COMPLETE_UNKNOWN_LENGTH => HeaderWord::ReservedUnknownLength,
        END_OF_DATA => HeaderWord::EndOfStream,
        _ if word & READY_BIT != 0 => HeaderWord::Ready {
            meta: word & META_DATA_BIT != 0,
            len: word & LENGTH_MASK,
        },
        _ => HeaderWord::Reserved {
            requested_len: word & LENGTH_MASK,
        },
    }
}

/// Encode an ordinary (non-first-header) reservation word: not ready, carrying the requested
/// length as a placeholder so a concurrent scanner can at least see how much room was asked for.
pub fn encode_reservation(requested_len: u32) -> u32 {
    requested_len & LENGTH_MASK
}

/// Encode a committed, ready header.
pub fn encode_ready(actual_len: u32, is_meta: bool) -> u32 {
    READY_BIT | if is_meta { META_DATA_BIT } else { 0 } | (actual_len & LENGTH_MASK)
}

/// `4 + len`, the number of bytes a document occupies including its header.
pub fn framed_len(len: u32) -> u64 {
    4 + len as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_sentinels() {
        assert_eq!(decode(NOT_INITIALIZED), HeaderWord::Unset);
        assert_eq!(
            decode(NOT_COMPLETE_UNKNOWN_LENGTH),
            HeaderWord::ReservedUnknownLength
        );
        assert_eq!(decode(END_OF_DATA), HeaderWord::EndOfStream);
    }

    #[test]
    fn decode_reservation_placeholder() {
        assert_eq!(
            decode(encode_reservation(128)),
            HeaderWord::Reserved { requested_len: 128 }
        );
    }

    #[test]
    fn encode_then_decode_ready_data() {
        let word = encode_ready(37, false);
        assert_eq!(decode(word), HeaderWord::Ready { meta: false, len: 37 });
    }

    #[test]
    fn encode_then_decode_ready_meta() {
        let word = encode_ready(12, true);
        assert_eq!(decode(word), HeaderWord::Ready { meta: true, len: 12 });
    }

    #[test]
    fn ready_bit_distinguishes_from_end_of_data() {
        assert_ne!(encode_ready(0x3FFF_FFFF, true), END_OF_DATA);
    }
}
