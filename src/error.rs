//! Crate-wide error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by the context pipeline.
///
/// Only constructor and configuration paths are fallible; the
/// fit/format/assemble pipeline itself always degrades to a valid
/// (possibly smaller) output instead of failing, and memory transport
/// failures are converted to empty results at the adapter boundary.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<prometheus::Error> for ContextError {
    fn from(err: prometheus::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
