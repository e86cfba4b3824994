use thiserror::Error;

/// Errors raised by the primitives in this crate: the adaptive [`Pauser`](crate::pauser::Pauser)
/// and the [`ClassAliasRegistry`](crate::alias::ClassAliasRegistry).
///
/// Higher layers (`wire-bytes`, `wire-framing`, `wire-codec`) define their own narrower error
/// enums and convert a `CoreError` into one of their variants with `#[from]`; nothing above this
/// crate should need to match on `CoreError` directly.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A bounded wait (`Pauser::pause(timeout)`) exceeded its budget without the awaited
    /// condition becoming true.
    #[error("wait budget of {budget_millis}ms exhausted")]
    Timeout {
        /// The configured budget, for diagnostics.
        budget_millis: u64,
    },

    /// `ClassAliasRegistry::register` was called twice for the same alias with different type
    /// tags after the registry had already resolved that alias once.
    #[error("alias '{alias}' already registered for type '{existing}', cannot rebind to '{attempted}'")]
    AliasConflict {
        alias: String,
        existing: &'static str,
        attempted: &'static str,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
