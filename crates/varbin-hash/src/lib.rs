//! Content hashes over the varbin encoding.
//!
//! Every hash here is computed over the exact bytes [`varbin_codec::encode`]
//! would produce for the same value sequence, so two sequences hash equal
//! only if they encode equal.
//!
//! - [`hash256`]: full BLAKE3 [`Digest`]; [`hash32`], [`hash64`],
//!   [`hash128`] and [`hash160`] are its big-endian prefixes
//! - [`ValueHasher`]: the same digest, fed incrementally
//! - [`fast_hash64`]: a cheap non-cryptographic hash for bucketing

pub mod digest;
pub mod error;
pub mod fast;
pub mod hasher;

pub use digest::Digest;
pub use error::HashError;
pub use fast::{fast_hash64, fast_hash64_bytes};
pub use hasher::{hash128, hash160, hash256, hash32, hash64, ValueHasher};
