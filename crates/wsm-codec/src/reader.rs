use std::io::{self, BufRead};

use crate::error::{CodecError, CodecResult};
use crate::value::{Value, TAG_BOOLEAN, TAG_INTEGER, TAG_NULL, TAG_STRING};

/// Decodes WSM primitives from a buffered byte stream.
///
/// The reader tracks how many bytes it has consumed so errors can report the
/// offset of the value that failed.
#[derive(Debug)]
pub struct DataReader<R> {
    inner: R,
    offset: u64,
}

impl<R: BufRead> DataReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns `true` if the input is exhausted. Consumes nothing.
    pub fn at_end(&mut self) -> CodecResult<bool> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.is_empty()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CodecError::Truncated {
                offset: self.offset,
            }),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Any non-zero byte decodes as `true`.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Read a `u16` length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let start = self.offset;
        let len = self.read_u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.fill(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset: start })
    }

    /// Read a tagged value. An unknown tag is an error, never `Value::Null`.
    pub fn read_value(&mut self) -> CodecResult<Value> {
        let offset = self.offset;
        let tag = self.read_u8()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOLEAN => Ok(Value::Boolean(self.read_bool()?)),
            TAG_INTEGER => Ok(Value::Integer(self.read_i32()?)),
            TAG_STRING => Ok(Value::String(self.read_string()?)),
            other => Err(CodecError::UnknownValueTag { tag: other, offset }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &[u8]) -> DataReader<&[u8]> {
        DataReader::new(bytes)
    }

    #[test]
    fn integers_are_big_endian() {
        let mut r = reader(&[0x01, 0x02, 0xFF, 0xFE, 0, 0, 0, 42]);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.read_i16().unwrap(), -2);
        assert_eq!(r.read_i32().unwrap(), 42);
        assert_eq!(r.offset(), 8);
        assert!(r.at_end().unwrap());
    }

    #[test]
    fn bool_accepts_any_nonzero() {
        let mut r = reader(&[0, 1, 7]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn string_is_length_prefixed() {
        let mut r = reader(&[0, 3, b'a', b'b', b'c', 0, 0]);
        assert_eq!(r.read_string().unwrap(), "abc");
        assert_eq!(r.read_string().unwrap(), "");
        assert!(r.at_end().unwrap());
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let err = reader(&[0, 2, 0xC3, 0x28]).read_string().unwrap_err();
        assert!(matches!(err, CodecError::InvalidUtf8 { offset: 0 }));
    }

    #[test]
    fn truncated_read_reports_offset() {
        let mut r = reader(&[0, 0, 0, 1, 0, 5, b'x']);
        r.read_i32().unwrap();
        let err = r.read_string().unwrap_err();
        assert!(err.is_truncated());
        assert!(matches!(err, CodecError::Truncated { offset: 6 }));
    }

    #[test]
    fn at_end_does_not_consume() {
        let mut r = reader(&[9]);
        assert!(!r.at_end().unwrap());
        assert!(!r.at_end().unwrap());
        assert_eq!(r.read_u8().unwrap(), 9);
        assert!(r.at_end().unwrap());
    }

    #[test]
    fn read_tagged_values() {
        let mut bytes = vec![TAG_NULL, TAG_BOOLEAN, 1];
        bytes.extend_from_slice(&[TAG_INTEGER, 0xFF, 0xFF, 0xFF, 0xFF]);
        bytes.extend_from_slice(&[TAG_STRING, 0, 2, b'h', b'i']);
        let mut r = reader(&bytes);
        assert_eq!(r.read_value().unwrap(), Value::Null);
        assert_eq!(r.read_value().unwrap(), Value::Boolean(true));
        assert_eq!(r.read_value().unwrap(), Value::Integer(-1));
        assert_eq!(r.read_value().unwrap(), Value::String("hi".into()));
    }

    #[test]
    fn unknown_value_tag_is_an_error() {
        let mut r = reader(&[TAG_NULL, 9]);
        assert_eq!(r.read_value().unwrap(), Value::Null);
        let err = r.read_value().unwrap_err();
        assert!(matches!(err, CodecError::UnknownValueTag { tag: 9, offset: 1 }));
    }
}
