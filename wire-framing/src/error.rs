use thiserror::Error;
use wire_bytes::BytesError;
use wire_core::CoreError;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("{0}")]
    IllegalArgument(String),

    #[error("requested {requested} bytes but only {available} remain in the store")]
    NotEnoughSpace { requested: u64, available: u64 },

    #[error("wait budget exhausted while {during}")]
    Timeout { during: &'static str },

    #[error("end of stream (END_OF_DATA) encountered")]
    EndOfStream,

    #[error("stream corrupted: {0}")]
    StreamCorrupted(String),

    #[error("actual body length {actual} exceeds reservation {reserved}")]
    LengthMismatch { reserved: u32, actual: u32 },

    #[error("writeHeader called while already inside a reserved header at offset {offset}")]
    Reentrant { offset: u64 },

    #[error("wire in use by thread {owner}, cannot be entered from thread {caller}")]
    InUse { owner: String, caller: String },

    #[error(transparent)]
    Bytes(#[from] BytesError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type FramingResult<T> = Result<T, FramingError>;
