//! Compact binary codec.
//!
//! Values are written back to back with no tags or schema: both sides agree
//! on the sequence of kinds out of band. Integers use a canonical signed
//! varint, byte strings and strings are length-prefixed, fixed-width kinds
//! are big-endian, and user objects are nested as self-delimiting blocks.
//!
//! # Architecture
//!
//! - [`varint`]: the pure varint encoder/decoder
//! - [`BinWrite`] / [`BinRead`]: every encode/decode operation, built on a
//!   single raw write/read with a sticky error
//! - [`Writer`] / [`Reader`]: the traits over `std::io` sinks and sources,
//!   the reader with an optional byte quota
//! - [`Buffer`]: an in-memory queue that is both
//! - [`Value`] / [`Slot`]: closed dispatch for writes and reads, with
//!   [`Encodable`] / [`Decodable`] for user types

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod reader;
pub mod value;
pub mod varint;
pub mod writer;

pub use buffer::Buffer;
pub use codec::{
    decode, decode_object, decode_with, encode, encode_object, read_from, read_from_with,
    write_to,
};
pub use config::ReaderConfig;
pub use error::{CodecError, CodecResult};
pub use reader::{BinRead, ReadState, Reader};
pub use value::{Allocate, Decodable, Encodable, Slot, Value, WireError};
pub use writer::{BinWrite, WriteState, Writer};
