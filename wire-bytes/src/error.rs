use thiserror::Error;

/// Errors raised by a [`ByteStore`](crate::store::ByteStore) implementation or by the
/// bounds-checked [`Cursor`](crate::cursor::Cursor) built on top of one.
#[derive(Debug, Error)]
pub enum BytesError {
    #[error("offset {offset} + len {len} exceeds store capacity {capacity}")]
    OutOfBounds {
        offset: u64,
        len: u64,
        capacity: u64,
    },

    #[error("cursor has {remaining} bytes remaining, requested {requested}")]
    WindowExhausted { remaining: u64, requested: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type BytesResult<T> = Result<T, BytesError>;
