use varbin_codec::{encode, CodecResult, Value};

const SEED: u64 = 14695981039346656037;
const PRIME: u64 = 1099511628211;
const MIX: u64 = 1073676287;

/// Fast non-cryptographic 64-bit hash of the encoding of `values`.
///
/// An FNV-1a variant: each byte is scaled by a second multiplier before it
/// is folded in. Use it for bucketing and caches, not for integrity.
pub fn fast_hash64(values: &[Value<'_>]) -> CodecResult<u64> {
    let data = encode(values)?;
    Ok(fast_hash64_bytes(&data))
}

/// [`fast_hash64`] over already-encoded bytes.
pub fn fast_hash64_bytes(data: &[u8]) -> u64 {
    data.iter().fold(SEED, |h, &c| {
        h.wrapping_mul(PRIME) ^ u64::from(c).wrapping_mul(MIX)
    })
}
