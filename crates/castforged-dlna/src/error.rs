//! Error types for castforged-dlna.

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting DLNA/HTTP seek text.
///
/// Malformed input is always rejected; nothing here is ever guessed at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed normal play time text.
    #[error("invalid npt time: {0}")]
    Format(String),

    /// Malformed or out-of-bounds HTTP byte range.
    #[error("invalid byte range: {0}")]
    Range(String),
}

impl Error {
    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a range error.
    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }
}
