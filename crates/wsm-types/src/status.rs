use std::fmt;

/// Fixed diagnostic codes carried by structured metadata errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    /// Metadata on disk could not be read or is corrupt.
    FailedReadMetadata = 567,
    /// Metadata could not be written to disk.
    FailedWriteMetadata = 568,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::FailedReadMetadata => "FAILED_READ_METADATA",
            StatusCode::FailedWriteMetadata => "FAILED_WRITE_METADATA",
        };
        write!(f, "{name} ({})", self.as_u16())
    }
}
