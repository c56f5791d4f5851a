use std::fmt;
use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::ReaderConfig;
use crate::error::CodecError;
use crate::reader::{BinRead, ReadState};
use crate::value::Value;
use crate::writer::{BinWrite, WriteState};

/// In-memory byte queue that is both a [`BinWrite`] and a [`BinRead`].
///
/// Writes append at the back; reads consume from the front. The read and
/// write sides keep separate counters and separate latched errors.
#[derive(Default)]
pub struct Buffer {
    data: BytesMut,
    read: ReadState,
    write: WriteState,
}

impl Buffer {
    /// A buffer whose read side starts at the beginning of `bytes`.
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            data: BytesMut::from(bytes.as_ref()),
            ..Self::default()
        }
    }

    /// Like [`new`](Self::new), with the read quota and nesting limit taken
    /// from `config`.
    pub fn with_config(bytes: impl AsRef<[u8]>, config: &ReaderConfig) -> Self {
        Self {
            data: BytesMut::from(bytes.as_ref()),
            read: ReadState::from_config(config),
            ..Self::default()
        }
    }

    /// An empty buffer with `values` already written. A write failure is
    /// latched and visible through [`error`](Self::error).
    pub fn with_values(values: &[Value<'_>]) -> Self {
        Self::prefilled(b"", values)
    }

    /// `bytes` followed by the encoding of `values`; reads start at `bytes`.
    pub fn prefilled(bytes: impl AsRef<[u8]>, values: &[Value<'_>]) -> Self {
        let mut buf = Self::new(bytes);
        // Failures stay latched on the write side.
        let _ = buf.write_values(values);
        buf
    }

    pub(crate) fn nested(bytes: &[u8], read: ReadState) -> Self {
        Self {
            data: BytesMut::from(bytes),
            read,
            ..Self::default()
        }
    }

    /// The unread bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether every written byte has been read.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the unread bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// Take the unread bytes without copying.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// The first latched error, read side before write side.
    pub fn error(&self) -> Option<&CodecError> {
        self.read.error().or_else(|| self.write.error())
    }
}

impl BinRead for Buffer {
    fn read_state(&self) -> &ReadState {
        &self.read
    }

    fn read_state_mut(&mut self) -> &mut ReadState {
        &mut self.read
    }

    fn read_source(&mut self, buf: &mut [u8]) -> (usize, io::Result<()>) {
        let n = self.data.remaining().min(buf.len());
        self.data.copy_to_slice(&mut buf[..n]);
        if n < buf.len() {
            let err = io::Error::new(io::ErrorKind::UnexpectedEof, "buffer drained");
            return (n, Err(err));
        }
        (n, Ok(()))
    }
}

impl BinWrite for Buffer {
    fn write_state(&self) -> &WriteState {
        &self.write
    }

    fn write_state_mut(&mut self) -> &mut WriteState {
        &mut self.write
    }

    fn write_sink(&mut self, bytes: &[u8]) -> (usize, io::Result<()>) {
        self.data.put_slice(bytes);
        (bytes.len(), Ok(()))
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<BytesMut> for Buffer {
    fn from(data: BytesMut) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("unread", &self.len())
            .field("read", &self.read)
            .field("write", &self.write)
            .finish()
    }
}
