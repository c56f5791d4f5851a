use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors produced while encoding or decoding.
///
/// The type is `Clone` so a latched error can be handed back by every later
/// call on the same reader or writer.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("corrupt data at offset {offset}: {reason}")]
    Corrupted { offset: u64, reason: String },

    #[error("read quota exceeded: {requested} more bytes after {read} read (limit {limit})")]
    QuotaExceeded { requested: u64, read: u64, limit: u64 },

    #[error("unexpected end of input: expected {expected} bytes, got {got}")]
    UnexpectedEof { expected: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("timestamp cannot be represented on the wire")]
    TimestampOutOfRange,

    #[error("object error: {0}")]
    Object(String),
}

impl CodecError {
    /// Build a [`CodecError::Corrupted`] at the given stream offset.
    pub fn corrupted(offset: u64, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised by the read quota.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

// Io holds an Arc, so equality compares kinds rather than identity.
impl PartialEq for CodecError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Corrupted { offset: a, reason: r },
                Self::Corrupted { offset: b, reason: s },
            ) => a == b && r == s,
            (
                Self::QuotaExceeded {
                    requested: a,
                    read: b,
                    limit: c,
                },
                Self::QuotaExceeded {
                    requested: x,
                    read: y,
                    limit: z,
                },
            ) => a == x && b == y && c == z,
            (
                Self::UnexpectedEof { expected: a, got: b },
                Self::UnexpectedEof { expected: x, got: y },
            ) => a == x && b == y,
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            (Self::InvalidUtf8 { offset: a }, Self::InvalidUtf8 { offset: b }) => a == b,
            (
                Self::OutOfRange { value: a, target: t },
                Self::OutOfRange { value: b, target: u },
            ) => a == b && t == u,
            (Self::TimestampOutOfRange, Self::TimestampOutOfRange) => true,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CodecError {}

pub type CodecResult<T> = Result<T, CodecError>;
