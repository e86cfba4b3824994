use thiserror::Error;

use wire_bytes::BytesError;
use wire_codec::CodecError;
use wire_core::CoreError;
use wire_framing::FramingError;

/// The single error type this crate's callers match on. Each lower crate (`wire-bytes`,
/// `wire-framing`, `wire-codec`, `wire-core`) keeps its own narrower enum scoped to what it can
/// actually raise; this is just the union, with `#[from]` conversions so `?` works across the
/// crate boundary without an explicit `.map_err`.
#[derive(Debug, Error)]
pub enum WireError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Bytes(#[from] BytesError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A `WireConfig` built from an external source (currently only the `config-toml` TOML
    /// convenience) failed validation or parsing.
    #[error("invalid wire configuration: {0}")]
    Config(String),
}

pub type WireResult<T> = Result<T, WireError>;
