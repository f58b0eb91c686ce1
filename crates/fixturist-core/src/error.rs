use thiserror::Error;

/// Core error type shared across Fixturist crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The datamodel violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A requested feature is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by Fixturist crates.
pub type Result<T> = std::result::Result<T, CoreError>;
