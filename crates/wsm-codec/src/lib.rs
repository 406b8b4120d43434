//! Binary codec for the workspace metadata store.
//!
//! Every on-disk format in WSM (bucket files, marker snapshots) is built from
//! the primitives in this crate:
//!
//! - fixed-width big-endian integers
//! - single-byte booleans
//! - `u16` length-prefixed UTF-8 strings
//! - tagged [`Value`]s (`NULL=0`, `BOOLEAN=1`, `INTEGER=2`, `STRING=3`)
//!
//! [`DataReader`] distinguishes a clean end of input ([`DataReader::at_end`])
//! from a read that runs out of bytes mid-value ([`CodecError::Truncated`]),
//! which lets stream formats terminate on end-of-input without a record count.

pub mod error;
pub mod reader;
pub mod value;
pub mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::DataReader;
pub use value::{Value, TAG_BOOLEAN, TAG_INTEGER, TAG_NULL, TAG_STRING};
pub use writer::DataWriter;

/// Longest string, in encoded bytes, that fits the `u16` length prefix.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;
