//! Error types for the codec crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding WSM primitives.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The underlying stream failed for a reason other than running out of input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input ended in the middle of a value.
    #[error("unexpected end of input at offset {offset}")]
    Truncated { offset: u64 },

    /// A typed value carried a tag byte outside `NULL`..=`STRING`.
    #[error("unknown value tag {tag} at offset {offset}")]
    UnknownValueTag { tag: u8, offset: u64 },

    /// A string too long for its `u16` length prefix.
    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    /// String bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: u64 },

    /// Well-formed bytes that violate a payload format rule.
    #[error("malformed data at offset {offset}: {reason}")]
    Malformed { offset: u64, reason: String },
}

impl CodecError {
    /// Returns `true` if the input ended in the middle of a value.
    pub fn is_truncated(&self) -> bool {
        matches!(self, CodecError::Truncated { .. })
    }
}

/// Convenience alias for codec results.
pub type CodecResult<T> = Result<T, CodecError>;
