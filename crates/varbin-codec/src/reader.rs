use std::fmt;
use std::io::{self, Read};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::buffer::Buffer;
use crate::config::ReaderConfig;
use crate::error::{CodecError, CodecResult};
use crate::value::{Slot, WireError};
use crate::varint::{assemble, Control};

/// Upper bound on up-front allocation driven by a length or count prefix.
/// Larger payloads grow as bytes actually arrive.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Byte counter, read quota, nesting depth and sticky error slot of a reader.
#[derive(Debug, Clone)]
pub struct ReadState {
    read: u64,
    /// Absolute ceiling on `read`; 0 = unlimited.
    limit: u64,
    depth: u32,
    max_depth: u32,
    error: Option<CodecError>,
}

impl Default for ReadState {
    fn default() -> Self {
        Self::from_config(&ReaderConfig::default())
    }
}

impl ReadState {
    /// Fresh state with the quota and nesting limit from `config`.
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            read: 0,
            limit: config.read_limit,
            depth: 0,
            max_depth: config.max_depth,
            error: None,
        }
    }

    /// Bytes consumed from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// The absolute ceiling on [`bytes_read`](Self::bytes_read), if any.
    pub fn limit(&self) -> Option<u64> {
        (self.limit > 0).then_some(self.limit)
    }

    /// Allow `n` more bytes from the current position; `0` removes the limit.
    pub fn set_read_limit(&mut self, n: u64) {
        self.limit = if n == 0 { 0 } else { self.read.saturating_add(n) };
    }

    /// The latched error, if any.
    pub fn error(&self) -> Option<&CodecError> {
        self.error.as_ref()
    }

    /// Forget the latched error so reads can resume.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn check(&self) -> CodecResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Sticky and quota checks for a read of `n` bytes.
    fn admit(&mut self, n: usize) -> CodecResult<()> {
        self.check()?;
        let n = n as u64;
        if self.limit > 0 && self.read.saturating_add(n) > self.limit {
            warn!(
                requested = n,
                read = self.read,
                limit = self.limit,
                "read quota exceeded"
            );
            return Err(self.fail(CodecError::QuotaExceeded {
                requested: n,
                read: self.read,
                limit: self.limit,
            }));
        }
        Ok(())
    }

    /// Latch `err` unless an earlier error is already held; returns the held one.
    pub(crate) fn fail(&mut self, err: CodecError) -> CodecError {
        match &self.error {
            Some(first) => first.clone(),
            None => {
                debug!(error = %err, read = self.read, "reader error latched");
                self.error = Some(err.clone());
                err
            }
        }
    }

    /// Fresh state for decoding a nested block one level deeper.
    fn nested(&self) -> CodecResult<Self> {
        if self.depth >= self.max_depth {
            return Err(CodecError::corrupted(
                self.read,
                format!("object nesting deeper than {}", self.max_depth),
            ));
        }
        Ok(Self {
            read: 0,
            limit: 0,
            depth: self.depth + 1,
            max_depth: self.max_depth,
            error: None,
        })
    }
}

/// Deserializes values from a byte source; the mirror of
/// [`BinWrite`](crate::BinWrite).
///
/// Every operation is built on [`read_raw`](Self::read_raw), which checks
/// the latched error and the read quota before touching the source. A short
/// read is an error, never a partial result.
pub trait BinRead {
    fn read_state(&self) -> &ReadState;

    fn read_state_mut(&mut self) -> &mut ReadState;

    /// Fill all of `buf` from the source. Returns how many bytes arrived
    /// along with the outcome; running out of input must be reported as
    /// [`io::ErrorKind::UnexpectedEof`].
    fn read_source(&mut self, buf: &mut [u8]) -> (usize, io::Result<()>);

    fn read_raw(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        self.read_state_mut().admit(buf.len())?;
        let (got, result) = self.read_source(buf);
        let state = self.read_state_mut();
        state.read += got as u64;
        result.map_err(|e| {
            let err = if e.kind() == io::ErrorKind::UnexpectedEof {
                CodecError::UnexpectedEof {
                    expected: buf.len(),
                    got,
                }
            } else {
                e.into()
            };
            state.fail(err)
        })
    }

    /// Read exactly `n` raw bytes. The quota is checked for all `n` up front.
    fn read_block(&mut self, n: usize) -> CodecResult<Vec<u8>> {
        self.read_state_mut().admit(n)?;
        let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        while out.len() < n {
            let start = out.len();
            let take = (n - start).min(PREALLOC_LIMIT);
            out.resize(start + take, 0);
            self.read_raw(&mut out[start..])?;
        }
        Ok(out)
    }

    fn bytes_read(&self) -> u64 {
        self.read_state().bytes_read()
    }

    /// Allow `n` more bytes from the current position; `0` removes the limit.
    fn set_read_limit(&mut self, n: u64) {
        self.read_state_mut().set_read_limit(n);
    }

    fn read_error_state(&self) -> Option<&CodecError> {
        self.read_state().error()
    }

    fn clear_read_error(&mut self) {
        self.read_state_mut().clear_error();
    }

    // Fixed-width kinds, big-endian.

    fn read_byte(&mut self) -> CodecResult<u8> {
        let mut b = [0u8; 1];
        self.read_raw(&mut b)?;
        Ok(b[0])
    }

    fn read_u8(&mut self) -> CodecResult<u8> {
        self.read_byte()
    }

    fn read_u16(&mut self) -> CodecResult<u16> {
        let mut b = [0u8; 2];
        self.read_raw(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read_u32(&mut self) -> CodecResult<u32> {
        let mut b = [0u8; 4];
        self.read_raw(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_u64(&mut self) -> CodecResult<u64> {
        let mut b = [0u8; 8];
        self.read_raw(&mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    fn read_f32(&mut self) -> CodecResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    fn read_f64(&mut self) -> CodecResult<f64> {
        self.read_u64().map(f64::from_bits)
    }

    fn read_time(&mut self) -> CodecResult<DateTime<Utc>> {
        let nanos = self.read_u64()? as i64;
        Ok(DateTime::from_timestamp_nanos(nanos))
    }

    fn read_time32(&mut self) -> CodecResult<DateTime<Utc>> {
        let secs = self.read_u32()?;
        DateTime::from_timestamp(i64::from(secs), 0)
            .ok_or_else(|| self.read_state_mut().fail(CodecError::TimestampOutOfRange))
    }

    fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_byte()? != 0)
    }

    // Variable-width kinds.

    fn read_varint(&mut self) -> CodecResult<i64> {
        let offset = self.bytes_read();
        let control = self.read_byte()?;
        match Control::parse(control, offset) {
            Ok(Control::Small(value)) => Ok(value),
            Ok(Control::Multi { negative, len }) => {
                let mut magnitude = [0u8; 8];
                self.read_raw(&mut magnitude[..len])?;
                assemble(negative, &magnitude[..len], offset)
                    .map_err(|e| self.read_state_mut().fail(e))
            }
            Err(err) => Err(self.read_state_mut().fail(err)),
        }
    }

    /// Reinterprets the varint bit pattern as unsigned.
    fn read_var_uint(&mut self) -> CodecResult<u64> {
        self.read_varint().map(|v| v as u64)
    }

    /// Length-prefixed block. A zero length yields an empty vector.
    fn read_bytes(&mut self) -> CodecResult<Vec<u8>> {
        match read_len(self)? {
            0 => Ok(Vec::new()),
            n => self.read_block(n),
        }
    }

    fn read_string(&mut self) -> CodecResult<String> {
        let offset = self.bytes_read();
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|_| self.read_state_mut().fail(CodecError::InvalidUtf8 { offset }))
    }

    fn read_bytes_seq(&mut self) -> CodecResult<Vec<Vec<u8>>> {
        let n = read_len(self)?;
        let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            out.push(self.read_bytes()?);
        }
        Ok(out)
    }

    fn read_strings(&mut self) -> CodecResult<Vec<String>> {
        let n = read_len(self)?;
        let mut out = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            out.push(self.read_string()?);
        }
        Ok(out)
    }

    /// An error value written by [`BinWrite::write_error`](crate::BinWrite::write_error).
    /// An empty message reads as `None`.
    fn read_error_message(&mut self) -> CodecResult<Option<WireError>> {
        let message = self.read_string()?;
        Ok((!message.is_empty()).then_some(WireError(message)))
    }

    /// Fill `slot` with the next value, dispatching on the slot's kind.
    ///
    /// On failure the destination is left as it was, except for
    /// [`Slot::Object`], which decodes in place and may be partly filled.
    /// [`Slot::Alloc`] only commits a fully decoded object.
    fn read_value(&mut self, slot: Slot<'_>) -> CodecResult<()> {
        self.read_state().check()?;
        match slot {
            Slot::I8(v) => *v = narrow(self, "i8")?,
            Slot::I16(v) => *v = narrow(self, "i16")?,
            Slot::I32(v) => *v = narrow(self, "i32")?,
            Slot::I64(v) => *v = self.read_varint()?,
            Slot::Isize(v) => *v = narrow(self, "isize")?,
            Slot::U8(v) => *v = narrow(self, "u8")?,
            Slot::U16(v) => *v = narrow(self, "u16")?,
            Slot::U32(v) => *v = narrow(self, "u32")?,
            Slot::U64(v) => *v = self.read_var_uint()?,
            Slot::Usize(v) => {
                let wide = self.read_var_uint()?;
                *v = usize::try_from(wide).map_err(|_| {
                    self.read_state_mut().fail(CodecError::OutOfRange {
                        value: wide as i64,
                        target: "usize",
                    })
                })?;
            }
            Slot::Float32(v) => *v = self.read_f32()?,
            Slot::Float64(v) => *v = self.read_f64()?,
            Slot::Bool(v) => *v = self.read_bool()?,
            Slot::Time(v) => *v = self.read_time()?,
            Slot::Str(v) => *v = self.read_string()?,
            Slot::Bytes(v) => *v = self.read_bytes()?,
            Slot::Strings(v) => *v = self.read_strings()?,
            Slot::ByteSeqs(v) => *v = self.read_bytes_seq()?,
            Slot::Object(obj) => {
                let mut block = nested_block(self)?;
                let result = obj.decode(&mut block).and_then(|()| match block.error() {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                });
                if let Err(err) = result {
                    debug!(error = %err, "nested object failed to decode");
                    return Err(self.read_state_mut().fail(err));
                }
            }
            Slot::Alloc(target) => {
                let mut block = nested_block(self)?;
                if let Err(err) = target.allocate_from(&mut block) {
                    debug!(error = %err, "nested object failed to decode, slot unchanged");
                    return Err(self.read_state_mut().fail(err));
                }
            }
            Slot::Error(v) => *v = self.read_error_message()?,
        }
        Ok(())
    }

    /// Fill each slot in order, stopping at the first failure.
    fn read_values<'s, I>(&mut self, slots: I) -> CodecResult<()>
    where
        I: IntoIterator<Item = Slot<'s>>,
    {
        for slot in slots {
            self.read_value(slot)?;
        }
        Ok(())
    }
}

/// A non-negative varint length or count prefix.
fn read_len<R: BinRead + ?Sized>(r: &mut R) -> CodecResult<usize> {
    let offset = r.bytes_read();
    let n = r.read_varint()?;
    usize::try_from(n).map_err(|_| {
        r.read_state_mut()
            .fail(CodecError::corrupted(offset, format!("negative length {n}")))
    })
}

fn narrow<T, R>(r: &mut R, target: &'static str) -> CodecResult<T>
where
    T: TryFrom<i64>,
    R: BinRead + ?Sized,
{
    let value = r.read_varint()?;
    T::try_from(value).map_err(|_| {
        r.read_state_mut()
            .fail(CodecError::OutOfRange { value, target })
    })
}

/// Read a length-prefixed block and wrap it for decoding one level deeper.
fn nested_block<R: BinRead + ?Sized>(r: &mut R) -> CodecResult<Buffer> {
    let state = r
        .read_state()
        .nested()
        .map_err(|e| r.read_state_mut().fail(e))?;
    let data = r.read_bytes()?;
    Ok(Buffer::nested(&data, state))
}

/// A [`BinRead`] over any [`std::io::Read`] source.
pub struct Reader<R> {
    source: R,
    state: ReadState,
}

impl<R: Read> Reader<R> {
    /// An unlimited reader over `source`.
    pub fn new(source: R) -> Self {
        Self {
            source,
            state: ReadState::default(),
        }
    }

    /// A reader over `source` with the quota and nesting limit from `config`.
    pub fn with_config(source: R, config: &ReaderConfig) -> Self {
        Self {
            source,
            state: ReadState::from_config(config),
        }
    }

    /// The underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Give the source back, e.g. to close it.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: Read> BinRead for Reader<R> {
    fn read_state(&self) -> &ReadState {
        &self.state
    }

    fn read_state_mut(&mut self) -> &mut ReadState {
        &mut self.state
    }

    fn read_source(&mut self, buf: &mut [u8]) -> (usize, io::Result<()>) {
        read_full(&mut self.source, buf)
    }
}

impl<R> fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Like `read_exact`, but reports how many bytes arrived before a failure.
fn read_full<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> (usize, io::Result<()>) {
    let mut got = 0;
    while got < buf.len() {
        match source.read(&mut buf[got..]) {
            Ok(0) => {
                return (
                    got,
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "source ended early",
                    )),
                )
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (got, Err(e)),
        }
    }
    (got, Ok(()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::value::{Decodable, Encodable, Value};
    use crate::writer::BinWrite;

    /// Counts calls so tests can prove a latched reader leaves it alone.
    struct CountingSource<'a> {
        data: &'a [u8],
        calls: usize,
    }

    impl Read for CountingSource<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            self.data.read(buf)
        }
    }

    /// Hands out at most one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    impl Encodable for Point {
        fn encode(&self, buf: &mut Buffer) -> CodecResult<()> {
            buf.write_value(self.x)?;
            buf.write_value(self.y)
        }
    }

    impl Decodable for Point {
        fn decode(&mut self, buf: &mut Buffer) -> CodecResult<()> {
            buf.read_value(Slot::from(&mut self.x))?;
            buf.read_value(Slot::from(&mut self.y))
        }
    }

    fn written(values: &[Value<'_>]) -> Vec<u8> {
        let mut w = crate::Writer::<Vec<u8>>::default();
        w.write_values(values).unwrap();
        w.into_inner()
    }

    #[test]
    fn read_mixed_values() {
        let data = written(&[
            Value::from(123u64),
            Value::from("abc"),
            Value::from(3.1415),
            Value::from(&[5u8, 6, 7][..]),
            Value::object(&Point { x: 88, y: 99 }),
        ]);

        let (mut i, mut s, mut f) = (0i32, String::new(), 0f64);
        let (mut b, mut p): (Vec<u8>, Point) = (Vec::new(), Point::default());
        let mut r = Reader::new(data.as_slice());
        r.read_values([
            Slot::from(&mut i),
            Slot::from(&mut s),
            Slot::from(&mut f),
            Slot::from(&mut b),
            Slot::object(&mut p),
        ])
        .unwrap();

        assert_eq!(i, 123);
        assert_eq!(s, "abc");
        assert_eq!(f, 3.1415);
        assert_eq!(b, [5, 6, 7]);
        assert_eq!(p, Point { x: 88, y: 99 });
    }

    #[test]
    fn read_varint_values() {
        let data = written(&[Value::from(0x1234), Value::from(-1), Value::from(i64::MIN)]);
        let mut r = Reader::new(data.as_slice());
        assert_eq!(r.read_varint().unwrap(), 0x1234);
        assert_eq!(r.read_varint().unwrap(), -1);
        assert_eq!(r.read_varint().unwrap(), i64::MIN);
        assert_eq!(r.bytes_read(), data.len() as u64);
    }

    #[test]
    fn floats_and_times() {
        let t = Utc.with_ymd_and_hms(2016, 7, 6, 18, 24, 45).unwrap();
        let mut w = crate::Writer::<Vec<u8>>::default();
        w.write_value(-0.123456789).unwrap();
        w.write_value(-1f32 / 3.0).unwrap();
        w.write_value(t).unwrap();
        w.write_time32(t).unwrap();
        let data = w.into_inner();

        let mut r = Reader::new(data.as_slice());
        assert_eq!(r.read_f64().unwrap(), -0.123456789);
        assert_eq!(r.read_f32().unwrap(), -1f32 / 3.0);
        assert_eq!(r.read_time().unwrap(), t);
        assert_eq!(
            r.read_time32().unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2016-07-06 18:24:45"
        );
    }

    #[test]
    fn empty_block_is_empty_not_missing() {
        let mut r = Reader::new(&[0u8][..]);
        assert_eq!(r.read_bytes().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn read_limit_allows_exact_fit() {
        let data = written(&[Value::from(&[0u8; 100][..])]);
        let mut r = Reader::new(data.as_slice());
        r.set_read_limit(101); // 100 payload bytes + 1 length byte
        assert_eq!(r.read_bytes().unwrap().len(), 100);
    }

    #[test]
    fn read_limit_rejects_and_latches() {
        let data = written(&[Value::from(&[0u8; 100][..])]);
        let mut source = CountingSource {
            data: &data,
            calls: 0,
        };
        let mut r = Reader::new(&mut source);
        r.set_read_limit(99);
        let err = r.read_bytes().unwrap_err();
        assert_eq!(
            err,
            CodecError::QuotaExceeded {
                requested: 100,
                read: 1,
                limit: 99,
            }
        );
        assert_eq!(r.bytes_read(), 1, "payload must not be touched");
        assert_eq!(r.read_u8(), Err(err.clone()));
        assert_eq!(r.read_string(), Err(err.clone()));
        assert_eq!(r.read_error_state(), Some(&err));
        drop(r);
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn read_limit_is_relative_to_position() {
        let data = [1u8, 2, 3, 4];
        let mut r = Reader::new(&data[..]);
        r.read_u16().unwrap();
        r.set_read_limit(1);
        assert_eq!(r.read_state().limit(), Some(3));
        assert_eq!(r.read_u8().unwrap(), 3);
        assert!(r.read_u8().unwrap_err().is_quota_exceeded());

        r.clear_read_error();
        r.set_read_limit(0);
        assert_eq!(r.read_u8().unwrap(), 4);
    }

    #[test]
    fn configured_limit() {
        let data = written(&[Value::from("hello")]);
        let mut r = Reader::with_config(data.as_slice(), &ReaderConfig::limited(3));
        assert!(r.read_string().unwrap_err().is_quota_exceeded());
    }

    #[test]
    fn short_read_is_an_error() {
        let mut r = Reader::new(&[0x82, 0x01][..]);
        let err = r.read_varint().unwrap_err();
        assert_eq!(err, CodecError::UnexpectedEof { expected: 2, got: 1 });
        assert_eq!(r.bytes_read(), 2);
        assert_eq!(r.read_u8(), Err(err));
    }

    #[test]
    fn corrupt_varint_latches() {
        let mut r = Reader::new(&[0x8f, 1, 2][..]);
        let err = r.read_varint().unwrap_err();
        assert!(matches!(err, CodecError::Corrupted { offset: 0, .. }));
        assert_eq!(r.read_u8(), Err(err));
    }

    #[test]
    fn negative_length_is_corrupt() {
        let mut r = Reader::new(&[0xc1, 0x05, 1, 2, 3, 4, 5][..]);
        assert!(matches!(
            r.read_bytes().unwrap_err(),
            CodecError::Corrupted { .. }
        ));
    }

    #[test]
    fn invalid_utf8() {
        let mut r = Reader::new(&[2, 0xff, 0xfe][..]);
        assert_eq!(
            r.read_string().unwrap_err(),
            CodecError::InvalidUtf8 { offset: 0 }
        );
    }

    #[test]
    fn slow_sources_are_read_fully() {
        let data = written(&[Value::from("trickle"), Value::from(70000)]);
        let mut r = Reader::new(Trickle(&data));
        assert_eq!(r.read_string().unwrap(), "trickle");
        assert_eq!(r.read_varint().unwrap(), 70000);
    }

    #[test]
    fn narrow_destinations_reject_overflow() {
        let data = written(&[Value::from(300), Value::from(-1)]);
        let mut r = Reader::new(data.as_slice());
        let mut small = 7u8;
        let err = r.read_value(Slot::from(&mut small)).unwrap_err();
        assert_eq!(
            err,
            CodecError::OutOfRange {
                value: 300,
                target: "u8",
            }
        );
        assert_eq!(small, 7);
    }

    #[test]
    fn unsigned_bit_patterns_roundtrip() {
        let data = written(&[Value::from(u64::MAX), Value::from(u64::MAX - 1)]);
        let mut r = Reader::new(data.as_slice());
        let (mut a, mut b) = (0u64, 0u64);
        r.read_values([Slot::from(&mut a), Slot::from(&mut b)]).unwrap();
        assert_eq!(a, u64::MAX);
        assert_eq!(b, u64::MAX - 1);
    }

    #[test]
    fn sequences_roundtrip() {
        let strings = vec!["a".to_string(), String::new(), "ccc".to_string()];
        let blobs = vec![vec![0u8, 0], vec![], vec![255]];
        let none: Vec<String> = Vec::new();
        let data = written(&[
            Value::from(&strings),
            Value::from(&blobs),
            Value::from(&none),
        ]);

        let mut r = Reader::new(data.as_slice());
        assert_eq!(r.read_strings().unwrap(), strings);
        assert_eq!(r.read_bytes_seq().unwrap(), blobs);
        assert!(r.read_strings().unwrap().is_empty());
    }

    #[test]
    fn error_values() {
        let err = WireError("not found".into());
        let data = written(&[Value::from(&err), Value::Nil]);
        let mut r = Reader::new(data.as_slice());
        let mut first: Option<WireError> = None;
        let mut second = Some(WireError("stale".into()));
        r.read_values([Slot::from(&mut first), Slot::from(&mut second)])
            .unwrap();
        assert_eq!(first, Some(err));
        assert_eq!(second, None);
    }

    #[test]
    fn allocates_missing_objects() {
        let data = written(&[Value::object(&Point { x: -4, y: 1 << 40 })]);
        let mut slot: Option<Box<Point>> = None;
        Reader::new(data.as_slice())
            .read_value(Slot::from(&mut slot))
            .unwrap();
        assert_eq!(slot, Some(Box::new(Point { x: -4, y: 1 << 40 })));
    }

    #[test]
    fn failed_allocation_keeps_previous_object() {
        // Block claims 2 bytes: x decodes, y is a truncated varint.
        let data = [2u8, 5, 0x82];
        let mut slot = Some(Box::new(Point { x: 1, y: 2 }));
        let mut r = Reader::new(&data[..]);
        let err = r.read_value(Slot::from(&mut slot)).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { .. }));
        assert_eq!(slot, Some(Box::new(Point { x: 1, y: 2 })));
        assert_eq!(r.read_error_state(), Some(&err));
    }

    #[test]
    fn in_place_object_keeps_fields_read_before_failure() {
        // Same truncated block as above, decoded in place this time.
        let data = [2u8, 5, 0x82];
        let mut p = Point { x: 1, y: 2 };
        let err = crate::decode(&data, [Slot::object(&mut p)]).unwrap_err();
        assert_eq!(err, CodecError::UnexpectedEof { expected: 2, got: 0 });
        assert_eq!(p, Point { x: 5, y: 2 });
    }

    #[test]
    fn nesting_depth_is_bounded() {
        #[derive(Default)]
        struct Chain(Option<Box<Chain>>);

        impl Decodable for Chain {
            fn decode(&mut self, buf: &mut Buffer) -> CodecResult<()> {
                buf.read_value(Slot::from(&mut self.0))
            }
        }

        // Each level is a one-byte length prefix wrapping the next level.
        let levels = 10;
        let mut data = vec![0u8];
        for _ in 0..levels {
            let mut outer = vec![data.len() as u8];
            outer.extend_from_slice(&data);
            data = outer;
        }

        let config = ReaderConfig {
            max_depth: 4,
            ..ReaderConfig::default()
        };
        let mut root = Chain::default();
        let mut r = Reader::with_config(data.as_slice(), &config);
        let err = r.read_value(Slot::object(&mut root)).unwrap_err();
        assert!(matches!(err, CodecError::Corrupted { .. }));
        assert!(root.0.is_none());

        let mut root = Chain::default();
        Reader::new(data.as_slice())
            .read_value(Slot::object(&mut root))
            .unwrap();
        assert!(root.0.is_some());
    }
}
