use thiserror::Error;

/// Errors produced when parsing digests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
