//! Canonical signed variable-length integers.
//!
//! Wire layout:
//! ```text
//! 0xxxxxxx                      value 0..=127, stored verbatim
//! 1s00nnnn [n magnitude bytes]  s = sign, n = 0..=8 big-endian magnitude bytes
//! ```
//! The encoder always emits the shortest form. `i64::MIN` is encoded through
//! its unsigned magnitude (`C8 80 00 00 00 00 00 00 00`).

use crate::error::{CodecError, CodecResult};

/// Longest possible encoding: control byte plus eight magnitude bytes.
pub const MAX_ENCODED_LEN: usize = 9;

const MULTI_BYTE: u8 = 0x80;
const NEGATIVE: u8 = 0x40;
const LEN_MASK: u8 = 0x0f;
const MAX_MAGNITUDE_BYTES: usize = 8;

/// Append the canonical encoding of `value` to `buf`.
pub fn encode_varint(buf: &mut Vec<u8>, value: i64) {
    if (0..0x80).contains(&value) {
        buf.push(value as u8);
        return;
    }
    let mut control = MULTI_BYTE;
    if value < 0 {
        control |= NEGATIVE;
    }
    let magnitude = value.unsigned_abs();
    let n = magnitude_len(magnitude);
    buf.push(control | n as u8);
    buf.extend_from_slice(&magnitude.to_be_bytes()[MAX_MAGNITUDE_BYTES - n..]);
}

/// Number of bytes [`encode_varint`] emits for `value`.
pub fn encoded_len(value: i64) -> usize {
    if (0..0x80).contains(&value) {
        1
    } else {
        1 + magnitude_len(value.unsigned_abs())
    }
}

/// Decode one varint from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_varint(data: &[u8]) -> CodecResult<(i64, usize)> {
    let Some(&first) = data.first() else {
        return Err(CodecError::UnexpectedEof {
            expected: 1,
            got: 0,
        });
    };
    match Control::parse(first, 0)? {
        Control::Small(value) => Ok((value, 1)),
        Control::Multi { negative, len } => {
            let rest = &data[1..];
            if rest.len() < len {
                return Err(CodecError::UnexpectedEof {
                    expected: len,
                    got: rest.len(),
                });
            }
            let value = assemble(negative, &rest[..len], 1)?;
            Ok((value, 1 + len))
        }
    }
}

fn magnitude_len(magnitude: u64) -> usize {
    (u64::BITS - magnitude.leading_zeros()).div_ceil(8) as usize
}

/// A parsed control byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Control {
    Small(i64),
    Multi { negative: bool, len: usize },
}

impl Control {
    /// `offset` is the stream position of the control byte, used in errors.
    pub(crate) fn parse(byte: u8, offset: u64) -> CodecResult<Self> {
        if byte & MULTI_BYTE == 0 {
            return Ok(Self::Small(i64::from(byte)));
        }
        let len = usize::from(byte & LEN_MASK);
        if len > MAX_MAGNITUDE_BYTES {
            return Err(CodecError::corrupted(
                offset,
                format!("varint byte count {len} exceeds {MAX_MAGNITUDE_BYTES}"),
            ));
        }
        Ok(Self::Multi {
            negative: byte & NEGATIVE != 0,
            len,
        })
    }
}

/// Rebuild a value from its big-endian magnitude bytes.
pub(crate) fn assemble(negative: bool, magnitude: &[u8], offset: u64) -> CodecResult<i64> {
    let m = magnitude
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    if negative {
        if m > i64::MIN.unsigned_abs() {
            return Err(CodecError::corrupted(
                offset,
                format!("negative varint magnitude {m} out of range"),
            ));
        }
        Ok((m as i64).wrapping_neg())
    } else {
        i64::try_from(m).map_err(|_| {
            CodecError::corrupted(offset, format!("varint magnitude {m} out of range"))
        })
    }
}
