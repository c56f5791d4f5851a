use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::codec::encode_object;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::varint::{encode_varint, MAX_ENCODED_LEN};

/// Byte counter and sticky error slot of a writer.
#[derive(Debug, Default)]
pub struct WriteState {
    written: u64,
    error: Option<CodecError>,
}

impl WriteState {
    /// Bytes that reached the sink so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// The latched error, if any.
    pub fn error(&self) -> Option<&CodecError> {
        self.error.as_ref()
    }

    /// Forget the latched error so writes can resume.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn check(&self) -> CodecResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Latch `err` unless an earlier error is already held; returns the held one.
    pub(crate) fn fail(&mut self, err: CodecError) -> CodecError {
        match &self.error {
            Some(first) => first.clone(),
            None => {
                debug!(error = %err, written = self.written, "writer error latched");
                self.error = Some(err.clone());
                err
            }
        }
    }
}

/// Serializes values into a byte sink.
///
/// Implementors provide the sink and the [`WriteState`]; every encoding
/// operation is built on [`write_raw`](Self::write_raw). Once a write fails,
/// the error is latched and every later call returns it without touching
/// the sink.
pub trait BinWrite {
    fn write_state(&self) -> &WriteState;

    fn write_state_mut(&mut self) -> &mut WriteState;

    /// Push all of `bytes` into the sink. Returns how many were accepted
    /// along with the outcome.
    fn write_sink(&mut self, bytes: &[u8]) -> (usize, io::Result<()>);

    fn write_raw(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.write_state().check()?;
        let (n, result) = self.write_sink(bytes);
        let state = self.write_state_mut();
        state.written += n as u64;
        result.map_err(|e| state.fail(e.into()))
    }

    fn bytes_written(&self) -> u64 {
        self.write_state().bytes_written()
    }

    fn write_error_state(&self) -> Option<&CodecError> {
        self.write_state().error()
    }

    fn clear_write_error(&mut self) {
        self.write_state_mut().clear_error();
    }

    // Fixed-width kinds, big-endian.

    fn write_byte(&mut self, b: u8) -> CodecResult<()> {
        self.write_raw(&[b])
    }

    fn write_u8(&mut self, v: u8) -> CodecResult<()> {
        self.write_byte(v)
    }

    fn write_u16(&mut self, v: u16) -> CodecResult<()> {
        self.write_raw(&v.to_be_bytes())
    }

    fn write_u32(&mut self, v: u32) -> CodecResult<()> {
        self.write_raw(&v.to_be_bytes())
    }

    fn write_u64(&mut self, v: u64) -> CodecResult<()> {
        self.write_raw(&v.to_be_bytes())
    }

    fn write_f32(&mut self, v: f32) -> CodecResult<()> {
        self.write_u32(v.to_bits())
    }

    fn write_f64(&mut self, v: f64) -> CodecResult<()> {
        self.write_u64(v.to_bits())
    }

    /// 8 bytes of nanoseconds since the UNIX epoch.
    fn write_time(&mut self, t: DateTime<Utc>) -> CodecResult<()> {
        self.write_state().check()?;
        match t.timestamp_nanos_opt() {
            Some(nanos) => self.write_u64(nanos as u64),
            None => Err(self.write_state_mut().fail(CodecError::TimestampOutOfRange)),
        }
    }

    /// 4 bytes of whole seconds since the UNIX epoch; sub-second precision
    /// is dropped.
    fn write_time32(&mut self, t: DateTime<Utc>) -> CodecResult<()> {
        self.write_state().check()?;
        match u32::try_from(t.timestamp()) {
            Ok(secs) => self.write_u32(secs),
            Err(_) => Err(self.write_state_mut().fail(CodecError::TimestampOutOfRange)),
        }
    }

    fn write_bool(&mut self, v: bool) -> CodecResult<()> {
        self.write_byte(u8::from(v))
    }

    // Variable-width kinds.

    fn write_varint(&mut self, v: i64) -> CodecResult<()> {
        let mut buf = Vec::with_capacity(MAX_ENCODED_LEN);
        encode_varint(&mut buf, v);
        self.write_raw(&buf)
    }

    /// Writes the two's-complement bit pattern of `v` as a varint.
    fn write_var_uint(&mut self, v: u64) -> CodecResult<()> {
        self.write_varint(v as i64)
    }

    /// Length-prefixed block.
    fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.write_varint(bytes.len() as i64)?;
        self.write_raw(bytes)
    }

    fn write_string(&mut self, s: &str) -> CodecResult<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Count followed by that many length-prefixed blocks.
    fn write_bytes_seq<B: AsRef<[u8]>>(&mut self, items: &[B]) -> CodecResult<()> {
        self.write_varint(items.len() as i64)?;
        for item in items {
            self.write_bytes(item.as_ref())?;
        }
        Ok(())
    }

    fn write_strings<S: AsRef<str>>(&mut self, items: &[S]) -> CodecResult<()> {
        self.write_varint(items.len() as i64)?;
        for item in items {
            self.write_string(item.as_ref())?;
        }
        Ok(())
    }

    fn write_error(&mut self, err: &dyn std::error::Error) -> CodecResult<()> {
        self.write_string(&err.to_string())
    }

    /// Write any supported value, dispatching on its kind.
    ///
    /// Objects are encoded into a standalone buffer first and written as a
    /// length-prefixed block.
    fn write_value<'v>(&mut self, value: impl Into<Value<'v>>) -> CodecResult<()> {
        self.write_state().check()?;
        match value.into() {
            Value::Nil => self.write_byte(0),
            Value::Int(v) => self.write_varint(v),
            Value::Uint(v) => self.write_var_uint(v),
            Value::Float32(v) => self.write_f32(v),
            Value::Float64(v) => self.write_f64(v),
            Value::Time(v) => self.write_time(v),
            Value::Bool(v) => self.write_bool(v),
            Value::Str(v) => self.write_string(v),
            Value::Bytes(v) => self.write_bytes(v),
            Value::Strings(v) => self.write_strings(v),
            Value::ByteSeqs(v) => self.write_bytes_seq(v),
            Value::Object(obj) => match encode_object(obj) {
                Ok(data) => self.write_bytes(&data),
                Err(err) => Err(self.write_state_mut().fail(err)),
            },
            Value::Error(err) => self.write_error(err),
        }
    }

    /// Write each value in order, stopping at the first failure.
    fn write_values(&mut self, values: &[Value<'_>]) -> CodecResult<()> {
        for value in values {
            self.write_value(*value)?;
        }
        Ok(())
    }
}

/// A [`BinWrite`] over any [`std::io::Write`] sink.
pub struct Writer<W> {
    sink: W,
    state: WriteState,
}

impl<W: Write> Writer<W> {
    /// A writer that appends to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriteState::default(),
        }
    }

    /// Flush the sink. A failure is latched like any other write error.
    pub fn flush(&mut self) -> CodecResult<()> {
        self.state.check()?;
        self.sink
            .flush()
            .map_err(|e| self.state.fail(e.into()))
    }

    /// The underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Give the sink back, e.g. to close it.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl Default for Writer<Vec<u8>> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<W: Write> BinWrite for Writer<W> {
    fn write_state(&self) -> &WriteState {
        &self.state
    }

    fn write_state_mut(&mut self) -> &mut WriteState {
        &mut self.state
    }

    fn write_sink(&mut self, bytes: &[u8]) -> (usize, io::Result<()>) {
        write_full(&mut self.sink, bytes)
    }
}

impl<W> fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("written", &self.state.written)
            .field("error", &self.state.error)
            .finish_non_exhaustive()
    }
}

/// Like `write_all`, but reports how many bytes were accepted before a failure.
fn write_full<W: Write + ?Sized>(sink: &mut W, mut bytes: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while !bytes.is_empty() {
        match sink.write(bytes) {
            Ok(0) => {
                return (
                    written,
                    Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    )),
                )
            }
            Ok(n) => {
                written += n;
                bytes = &bytes[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}
