//! Dynamic dispatch: the closed set of kinds a writer accepts ([`Value`]) and
//! a reader fills ([`Slot`]), plus the capabilities user types implement to
//! take part as nested objects.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::buffer::Buffer;
use crate::error::CodecResult;

/// A composite type that can write its own encoding.
///
/// When passed through [`Value::Object`], the encoding is produced into a
/// standalone buffer and written as a length-prefixed block, so readers can
/// skip it without decoding.
pub trait Encodable {
    fn encode(&self, buf: &mut Buffer) -> CodecResult<()>;
}

/// A composite type that can fill itself from its own encoding.
pub trait Decodable {
    fn decode(&mut self, buf: &mut Buffer) -> CodecResult<()>;
}

/// An owning slot for a not-yet-allocated object.
///
/// Implementations allocate a fresh instance, decode into it, and only
/// replace the slot's contents when decoding succeeds.
///
/// An empty block reads as `None`. An object whose own encoding is empty is
/// therefore indistinguishable from an absent one: `Some(Box::new(x))` with
/// nothing to write reads back as `None`.
pub trait Allocate {
    fn allocate_from(&mut self, block: &mut Buffer) -> CodecResult<()>;
}

impl<T: Decodable + Default> Allocate for Option<Box<T>> {
    fn allocate_from(&mut self, block: &mut Buffer) -> CodecResult<()> {
        // An empty block is how `Value::Nil` reads back.
        if block.is_empty() {
            *self = None;
            return Ok(());
        }
        let mut fresh = Box::<T>::default();
        fresh.decode(block)?;
        if let Some(err) = block.error() {
            return Err(err.clone());
        }
        *self = Some(fresh);
        Ok(())
    }
}

/// An error value received over the wire. Only its message survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct WireError(pub String);

impl WireError {
    /// The message as it was sent.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A value to be written through [`BinWrite::write_value`](crate::BinWrite::write_value).
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// A single zero byte; reads back as an empty block.
    Nil,
    Int(i64),
    /// Written as the two's-complement bit pattern of the value.
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Time(DateTime<Utc>),
    Bool(bool),
    Str(&'a str),
    Bytes(&'a [u8]),
    Strings(&'a [String]),
    ByteSeqs(&'a [Vec<u8>]),
    Object(&'a dyn Encodable),
    /// Written as its `Display` message.
    Error(&'a (dyn std::error::Error + 'a)),
}

impl<'a> Value<'a> {
    /// A nested object, written as a length-prefixed block.
    pub fn object(obj: &'a dyn Encodable) -> Self {
        Self::Object(obj)
    }

    /// `None` is written as [`Value::Nil`].
    pub fn optional(obj: Option<&'a dyn Encodable>) -> Self {
        obj.map_or(Self::Nil, Self::Object)
    }

    /// An error, written as its message.
    pub fn error(err: &'a (dyn std::error::Error + 'a)) -> Self {
        Self::Error(err)
    }

    /// Short name of the variant, for logs and debug output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float32(_) => "f32",
            Self::Float64(_) => "f64",
            Self::Time(_) => "time",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Strings(_) => "strings",
            Self::ByteSeqs(_) => "byte-seqs",
            Self::Object(_) => "object",
            Self::Error(_) => "error",
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Uint(v) => write!(f, "Uint({v})"),
            Self::Float32(v) => write!(f, "Float32({v})"),
            Self::Float64(v) => write!(f, "Float64({v})"),
            Self::Time(v) => write!(f, "Time({v})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            Self::Strings(v) => write!(f, "Strings({v:?})"),
            Self::ByteSeqs(v) => write!(f, "ByteSeqs({} items)", v.len()),
            Self::Object(_) => write!(f, "Object(..)"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}

macro_rules! value_from {
    ($variant:ident as $wide:ty: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value<'_> {
                fn from(v: $ty) -> Self {
                    Self::$variant(v as $wide)
                }
            }
        )+
    };
}

value_from!(Int as i64: i8, i16, i32, i64, isize);
value_from!(Uint as u64: u8, u16, u32, u64, usize);

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value<'_> {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Self::Str(v)
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(v: &'a String) -> Self {
        Self::Str(v)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Self::Bytes(v)
    }
}

impl<'a> From<&'a Vec<u8>> for Value<'a> {
    fn from(v: &'a Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<'a> From<&'a [String]> for Value<'a> {
    fn from(v: &'a [String]) -> Self {
        Self::Strings(v)
    }
}

impl<'a> From<&'a Vec<String>> for Value<'a> {
    fn from(v: &'a Vec<String>) -> Self {
        Self::Strings(v)
    }
}

impl<'a> From<&'a [Vec<u8>]> for Value<'a> {
    fn from(v: &'a [Vec<u8>]) -> Self {
        Self::ByteSeqs(v)
    }
}

impl<'a> From<&'a Vec<Vec<u8>>> for Value<'a> {
    fn from(v: &'a Vec<Vec<u8>>) -> Self {
        Self::ByteSeqs(v)
    }
}

impl<'a, T: Encodable> From<&'a Option<Box<T>>> for Value<'a> {
    fn from(v: &'a Option<Box<T>>) -> Self {
        match v {
            Some(obj) => Self::Object(obj.as_ref()),
            None => Self::Nil,
        }
    }
}

impl<'a> From<&'a WireError> for Value<'a> {
    fn from(v: &'a WireError) -> Self {
        Self::Error(v)
    }
}

/// A writable destination for [`BinRead::read_value`](crate::BinRead::read_value).
///
/// On a read failure every slot except [`Slot::Object`] keeps its previous
/// value. `Object` decodes in place, so fields read before the failure stay
/// overwritten; use [`Slot::Alloc`] when the destination must be untouched.
pub enum Slot<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    /// Reinterprets the varint bit pattern, so every `u64` round-trips.
    U64(&'a mut u64),
    Usize(&'a mut usize),
    Float32(&'a mut f32),
    Float64(&'a mut f64),
    Bool(&'a mut bool),
    Time(&'a mut DateTime<Utc>),
    Str(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    Strings(&'a mut Vec<String>),
    ByteSeqs(&'a mut Vec<Vec<u8>>),
    /// Decoded in place from a length-prefixed block. Not atomic: a failed
    /// decode can leave the object partly filled.
    Object(&'a mut dyn Decodable),
    /// Allocated, decoded, then committed.
    Alloc(&'a mut dyn Allocate),
    /// An empty message reads back as `None`.
    Error(&'a mut Option<WireError>),
}

impl<'a> Slot<'a> {
    /// Decode a nested object in place.
    pub fn object(obj: &'a mut dyn Decodable) -> Self {
        Self::Object(obj)
    }
}

macro_rules! slot_from {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        $(
            impl<'a> From<&'a mut $ty> for Slot<'a> {
                fn from(v: &'a mut $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )+
    };
}

slot_from!(
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    Isize => isize,
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    Usize => usize,
    Float32 => f32,
    Float64 => f64,
    Bool => bool,
    Time => DateTime<Utc>,
    Str => String,
    Bytes => Vec<u8>,
    Strings => Vec<String>,
    ByteSeqs => Vec<Vec<u8>>,
    Error => Option<WireError>,
);

impl<'a, T: Decodable + Default> From<&'a mut Option<Box<T>>> for Slot<'a> {
    fn from(v: &'a mut Option<Box<T>>) -> Self {
        Self::Alloc(v)
    }
}
