use std::io::Write;

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::MAX_STRING_LEN;

/// Encodes WSM primitives onto a byte sink.
#[derive(Debug)]
pub struct DataWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> DataWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn put(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.put(&[value])
    }

    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.put(&value.to_be_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.put(&value.to_be_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.put(&value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.put(&value.to_be_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.put(&value.to_be_bytes())
    }

    /// Write a `u16` length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> CodecResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > MAX_STRING_LEN {
            return Err(CodecError::StringTooLong(bytes.len()));
        }
        self.write_u16(bytes.len() as u16)?;
        self.put(bytes)
    }

    /// Write a tag byte followed by the value's payload.
    pub fn write_value(&mut self, value: &Value) -> CodecResult<()> {
        self.write_u8(value.tag())?;
        match value {
            Value::Null => Ok(()),
            Value::Boolean(b) => self.write_bool(*b),
            Value::Integer(i) => self.write_i32(*i),
            Value::String(s) => self.write_string(s),
        }
    }
}
