use std::io::{Read, Write};

use crate::buffer::Buffer;
use crate::config::ReaderConfig;
use crate::error::CodecResult;
use crate::reader::{BinRead, Reader};
use crate::value::{Decodable, Encodable, Slot, Value};
use crate::writer::{BinWrite, Writer};

/// Encode `values` back to back.
pub fn encode(values: &[Value<'_>]) -> CodecResult<Vec<u8>> {
    let mut buf = Buffer::default();
    buf.write_values(values)?;
    Ok(buf.into_bytes())
}

/// Decode `data` into `slots`, in order.
pub fn decode<'s>(data: &[u8], slots: impl IntoIterator<Item = Slot<'s>>) -> CodecResult<()> {
    decode_with(&ReaderConfig::default(), data, slots)
}

/// [`decode`] with the quota and nesting limit from `config`.
pub fn decode_with<'s>(
    config: &ReaderConfig,
    data: &[u8],
    slots: impl IntoIterator<Item = Slot<'s>>,
) -> CodecResult<()> {
    Reader::with_config(data, config).read_values(slots)
}

/// Encode `values` straight into `sink`, then flush it.
pub fn write_to<W: Write>(sink: W, values: &[Value<'_>]) -> CodecResult<()> {
    let mut writer = Writer::new(sink);
    writer.write_values(values)?;
    writer.flush()
}

/// Decode values from `source` into `slots`, in order.
pub fn read_from<'s, R: Read>(
    source: R,
    slots: impl IntoIterator<Item = Slot<'s>>,
) -> CodecResult<()> {
    read_from_with(&ReaderConfig::default(), source, slots)
}

/// [`read_from`] with the quota and nesting limit from `config`.
pub fn read_from_with<'s, R: Read>(
    config: &ReaderConfig,
    source: R,
    slots: impl IntoIterator<Item = Slot<'s>>,
) -> CodecResult<()> {
    Reader::with_config(source, config).read_values(slots)
}

/// The bare encoding of one object, without the length prefix that
/// [`Value::Object`] adds.
pub fn encode_object(obj: &dyn Encodable) -> CodecResult<Vec<u8>> {
    let mut buf = Buffer::default();
    obj.encode(&mut buf)?;
    if let Some(err) = buf.error() {
        return Err(err.clone());
    }
    Ok(buf.into_bytes())
}

/// Fill `obj` from its bare encoding, as produced by [`encode_object`].
pub fn decode_object(data: &[u8], obj: &mut dyn Decodable) -> CodecResult<()> {
    let mut buf = Buffer::new(data);
    obj.decode(&mut buf)?;
    match buf.error() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::error::CodecError;
    use crate::value::WireError;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tag {
        name: String,
        weight: f32,
    }

    impl Encodable for Tag {
        fn encode(&self, buf: &mut Buffer) -> CodecResult<()> {
            buf.write_values(&[Value::from(&self.name), Value::from(self.weight)])
        }
    }

    impl Decodable for Tag {
        fn decode(&mut self, buf: &mut Buffer) -> CodecResult<()> {
            buf.read_values([Slot::from(&mut self.name), Slot::from(&mut self.weight)])
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Document {
        id: u64,
        created: DateTime<Utc>,
        body: Vec<u8>,
        keywords: Vec<String>,
        primary: Tag,
        secondary: Option<Box<Tag>>,
        last_error: Option<WireError>,
    }

    impl Encodable for Document {
        fn encode(&self, buf: &mut Buffer) -> CodecResult<()> {
            let last_error = match &self.last_error {
                Some(err) => Value::from(err),
                None => Value::Nil,
            };
            buf.write_values(&[
                Value::from(self.id),
                Value::from(self.created),
                Value::from(&self.body),
                Value::from(&self.keywords),
                Value::object(&self.primary),
                Value::from(&self.secondary),
                last_error,
            ])
        }
    }

    impl Decodable for Document {
        fn decode(&mut self, buf: &mut Buffer) -> CodecResult<()> {
            buf.read_values([
                Slot::from(&mut self.id),
                Slot::from(&mut self.created),
                Slot::from(&mut self.body),
                Slot::from(&mut self.keywords),
                Slot::object(&mut self.primary),
                Slot::from(&mut self.secondary),
                Slot::from(&mut self.last_error),
            ])
        }
    }

    fn sample() -> Document {
        Document {
            id: u64::MAX - 7,
            created: Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap(),
            body: vec![0, 1, 0, 2],
            keywords: vec!["alpha".into(), String::new(), "γ".into()],
            primary: Tag {
                name: "main".into(),
                weight: 0.5,
            },
            secondary: Some(Box::new(Tag {
                name: "aux".into(),
                weight: -2.25,
            })),
            last_error: Some(WireError("timeout".into())),
        }
    }

    #[test]
    fn nested_document_roundtrip() {
        let doc = sample();
        let data = encode(&[Value::object(&doc)]).unwrap();

        let mut decoded = Document::default();
        decode(&data, [Slot::object(&mut decoded)]).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn absent_children_roundtrip() {
        let doc = Document {
            secondary: None,
            last_error: None,
            ..sample()
        };
        let data = encode(&[Value::object(&doc)]).unwrap();

        let mut decoded = sample();
        decode(&data, [Slot::object(&mut decoded)]).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn objects_are_skippable() {
        let doc = sample();
        let data = encode(&[Value::object(&doc), Value::from("after")]).unwrap();

        let mut r = Reader::new(data.as_slice());
        let skipped = r.read_bytes().unwrap();
        assert_eq!(skipped, encode_object(&doc).unwrap());
        assert_eq!(r.read_string().unwrap(), "after");
    }

    #[test]
    fn object_helpers_roundtrip() {
        let doc = sample();
        let bare = encode_object(&doc).unwrap();
        let mut decoded = Document::default();
        decode_object(&bare, &mut decoded).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn stream_helpers() {
        let mut sink: Vec<u8> = Vec::new();
        write_to(&mut sink, &[Value::from(-42), Value::from("tail")]).unwrap();

        let (mut n, mut s) = (0i64, String::new());
        read_from(sink.as_slice(), [Slot::from(&mut n), Slot::from(&mut s)]).unwrap();
        assert_eq!((n, s.as_str()), (-42, "tail"));
    }

    #[test]
    fn decode_reports_first_fault() {
        let data = encode(&[Value::from("only")]).unwrap();
        let (mut s, mut extra) = (String::new(), 0i64);
        let err = decode(&data, [Slot::from(&mut s), Slot::from(&mut extra)]).unwrap_err();
        assert_eq!(err, CodecError::UnexpectedEof { expected: 1, got: 0 });
        assert_eq!(s, "only");
        assert_eq!(extra, 0);
    }

    #[test]
    fn decode_with_quota() {
        let data = encode(&[Value::from(&vec![7u8; 100])]).unwrap();
        let mut out: Vec<u8> = Vec::new();
        decode_with(&ReaderConfig::limited(101), &data, [Slot::from(&mut out)]).unwrap();
        assert_eq!(out.len(), 100);

        let err = read_from_with(&ReaderConfig::limited(99), data.as_slice(), [Slot::from(&mut out)])
            .unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn empty_string_is_single_zero() {
        assert_eq!(encode(&[Value::from("")]).unwrap(), [0]);
    }

    proptest! {
        #[test]
        fn scalar_roundtrip(
            i in any::<i64>(),
            u in any::<u64>(),
            f in any::<f64>().prop_filter("NaN never compares equal", |f| !f.is_nan()),
            s in ".*",
            b in proptest::collection::vec(any::<u8>(), 0..64),
            ss in proptest::collection::vec(".*", 0..8),
        ) {
            let data = encode(&[
                Value::from(i),
                Value::from(u),
                Value::from(f),
                Value::from(&s),
                Value::from(&b),
                Value::from(&ss),
            ]).unwrap();

            let (mut i2, mut u2, mut f2) = (0i64, 0u64, 0f64);
            let mut s2 = String::new();
            let mut b2: Vec<u8> = Vec::new();
            let mut ss2: Vec<String> = Vec::new();
            decode(&data, [
                Slot::from(&mut i2),
                Slot::from(&mut u2),
                Slot::from(&mut f2),
                Slot::from(&mut s2),
                Slot::from(&mut b2),
                Slot::from(&mut ss2),
            ]).unwrap();

            prop_assert_eq!(i2, i);
            prop_assert_eq!(u2, u);
            prop_assert_eq!(f2, f);
            prop_assert_eq!(s2, s);
            prop_assert_eq!(b2, b);
            prop_assert_eq!(ss2, ss);
        }
    }
}
