use tracing::trace;
use varbin_codec::{BinWrite, CodecResult, Value, Writer};

use crate::digest::Digest;

/// Streams values through the varbin encoder straight into BLAKE3.
///
/// The digest of a sequence equals the BLAKE3 hash of
/// [`encode`](varbin_codec::encode) over the same sequence, without
/// materialising the encoding.
#[derive(Debug)]
pub struct ValueHasher {
    writer: Writer<blake3::Hasher>,
}

impl ValueHasher {
    /// A hasher that has seen no values yet.
    pub fn new() -> Self {
        Self {
            writer: Writer::new(blake3::Hasher::new()),
        }
    }

    /// Feed one value. Errors are latched; see [`finalize`](Self::finalize).
    pub fn update<'v>(&mut self, value: impl Into<Value<'v>>) -> CodecResult<&mut Self> {
        self.writer.write_value(value)?;
        Ok(self)
    }

    /// Feed each of `values` in order, stopping at the first failure.
    pub fn update_all(&mut self, values: &[Value<'_>]) -> CodecResult<&mut Self> {
        self.writer.write_values(values)?;
        Ok(self)
    }

    /// Number of encoded bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.writer.bytes_written()
    }

    /// Whether nothing has been hashed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The digest, or the first encoding error if any update failed.
    pub fn finalize(&self) -> CodecResult<Digest> {
        if let Some(err) = self.writer.write_error_state() {
            return Err(err.clone());
        }
        let hash = self.writer.get_ref().finalize();
        trace!(bytes = self.len(), "hashed value sequence");
        Ok(Digest::from_hash(*hash.as_bytes()))
    }
}

impl Default for ValueHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Full 256-bit digest of the encoding of `values`.
pub fn hash256(values: &[Value<'_>]) -> CodecResult<Digest> {
    let mut hasher = ValueHasher::new();
    hasher.update_all(values)?;
    hasher.finalize()
}

/// First 4 bytes of [`hash256`], big-endian.
pub fn hash32(values: &[Value<'_>]) -> CodecResult<u32> {
    hash256(values).map(|d| d.prefix32())
}

/// First 8 bytes of [`hash256`], big-endian.
pub fn hash64(values: &[Value<'_>]) -> CodecResult<u64> {
    hash256(values).map(|d| d.prefix64())
}

/// First 16 bytes of [`hash256`].
pub fn hash128(values: &[Value<'_>]) -> CodecResult<[u8; 16]> {
    hash256(values).map(|d| d.prefix128())
}

/// First 20 bytes of [`hash256`].
pub fn hash160(values: &[Value<'_>]) -> CodecResult<[u8; 20]> {
    hash256(values).map(|d| d.prefix160())
}
