// TODO: Fix doc comment generic types to use backticks
#![allow(rustdoc::invalid_html_tags)]
#![allow(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod framing;
pub mod header;
pub mod scope;

pub use error::{FramingError, FramingResult};
pub use framing::{Framing, ReadOutcome};
pub use header::{
    decode, encode_ready, encode_reservation, framed_len, HeaderWord, END_OF_DATA, LENGTH_MASK,
    MAX_LENGTH, META_DATA_BIT, NOT_COMPLETE_UNKNOWN_LENGTH, NOT_INITIALIZED, READY_BIT,
    UNKNOWN_LENGTH,
};
pub use scope::{ScopeGuard, ScopeTicket};
