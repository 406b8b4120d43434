//! Error types for the bucket crate.

use std::path::PathBuf;

use wsm_codec::CodecError;
use wsm_types::{StatusCode, WorkspacePath};

/// Errors that can occur while loading, saving or traversing buckets.
#[derive(Debug, thiserror::Error)]
pub enum BucketError {
    /// A bucket file exists but could not be decoded.
    #[error("failed to read metadata at {}: {source}", location.display())]
    ReadMetadata {
        location: PathBuf,
        source: CodecError,
    },

    /// The bucket file was written with a different format version.
    #[error("unsupported bucket version {actual} at {} (expected {expected})", location.display())]
    UnsupportedVersion {
        location: PathBuf,
        expected: u8,
        actual: u8,
    },

    /// The bucket file decoded cleanly but holds entries it cannot own.
    #[error("corrupt bucket at {}: {reason}", location.display())]
    Corrupt { location: PathBuf, reason: String },

    /// A bucket could not be written.
    #[error("failed to write metadata at {}: {source}", location.display())]
    WriteMetadata {
        location: PathBuf,
        source: CodecError,
    },

    /// The path is not governed by the bucket it was addressed to.
    #[error("path {path} is outside bucket {directory}")]
    OutOfScope {
        path: WorkspacePath,
        directory: WorkspacePath,
    },
}

impl BucketError {
    /// The diagnostic code for this error, if it concerns on-disk metadata.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            BucketError::ReadMetadata { .. }
            | BucketError::UnsupportedVersion { .. }
            | BucketError::Corrupt { .. } => Some(StatusCode::FailedReadMetadata),
            BucketError::WriteMetadata { .. } => Some(StatusCode::FailedWriteMetadata),
            BucketError::OutOfScope { .. } => None,
        }
    }
}

/// Convenience alias for bucket results.
pub type BucketResult<T> = Result<T, BucketError>;
