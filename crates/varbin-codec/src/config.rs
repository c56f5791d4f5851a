use serde::{Deserialize, Serialize};

/// Read-side settings for a [`Reader`](crate::Reader) or [`Buffer`](crate::Buffer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Maximum number of bytes the reader may consume from now on.
    /// `0` means unlimited. This is the guard against hostile length
    /// prefixes in untrusted input.
    pub read_limit: u64,
    /// Maximum nesting of length-prefixed objects inside one another
    /// (default: 64).
    pub max_depth: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_limit: 0,
            max_depth: 64,
        }
    }
}

impl ReaderConfig {
    /// A configuration that caps reads at `limit` bytes.
    pub fn limited(limit: u64) -> Self {
        Self {
            read_limit: limit,
            ..Default::default()
        }
    }
}
