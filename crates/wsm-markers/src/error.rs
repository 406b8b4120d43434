//! Error types for the markers crate.

use std::io;

use wsm_bucket::BucketError;
use wsm_codec::CodecError;
use wsm_types::StatusCode;

/// Errors from reading or writing marker metadata.
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// The stream is structurally invalid: unknown tag, undefined type index,
    /// negative count, or end of input inside a record.
    #[error("corrupt marker metadata at offset {offset}: {reason}")]
    CorruptMetadata { offset: u64, reason: String },

    /// The snapshot header names a format this reader does not know.
    #[error("unsupported marker snapshot version {0}")]
    UnsupportedVersion(i32),

    /// The underlying stream failed while reading.
    #[error("failed to read markers: {0}")]
    Read(#[source] CodecError),

    /// The underlying stream failed while writing, or a value cannot be encoded.
    #[error("failed to write markers: {0}")]
    Write(#[source] CodecError),

    /// A snapshot file could not be opened or created.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Bucket(#[from] BucketError),
}

impl MarkerError {
    /// The diagnostic code for this error, if it concerns metadata.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            MarkerError::CorruptMetadata { .. }
            | MarkerError::UnsupportedVersion(_)
            | MarkerError::Read(_) => Some(StatusCode::FailedReadMetadata),
            MarkerError::Write(_) => Some(StatusCode::FailedWriteMetadata),
            MarkerError::Io(_) => None,
            MarkerError::Bucket(e) => e.code(),
        }
    }

    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        MarkerError::CorruptMetadata {
            offset,
            reason: reason.into(),
        }
    }

    /// Classify a codec failure met while decoding: format violations become
    /// `CorruptMetadata`, stream failures stay `Read`.
    pub(crate) fn from_read(error: CodecError) -> Self {
        match error {
            CodecError::Truncated { offset } => {
                Self::corrupt(offset, "unexpected end of input inside a record")
            }
            CodecError::UnknownValueTag { tag, offset } => {
                Self::corrupt(offset, format!("unknown attribute value tag {tag}"))
            }
            CodecError::InvalidUtf8 { offset } => Self::corrupt(offset, "invalid UTF-8 string"),
            CodecError::Malformed { offset, reason } => Self::corrupt(offset, reason),
            other => MarkerError::Read(other),
        }
    }
}

/// Convenience alias for marker results.
pub type MarkerResult<T> = Result<T, MarkerError>;
