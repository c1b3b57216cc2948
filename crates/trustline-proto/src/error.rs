//! Protocol errors.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while decoding or encoding frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Outbound payload could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Identity was empty or whitespace only.
    #[error("identity must not be empty")]
    EmptyIdentity,
}
