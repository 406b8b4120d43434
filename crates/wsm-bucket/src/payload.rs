//! The [`BucketPayload`] trait: the per-format hooks a bucket delegates to.

use std::fmt;
use std::io::{BufRead, Write};

use wsm_codec::{CodecResult, DataReader, DataWriter};

/// Encoding strategy for the values stored in a bucket.
///
/// A [`Bucket`](crate::Bucket) owns the file layout (version byte, then
/// `[path][value]` entries until end of file) and calls back into its payload
/// for everything value-specific. Implementations must be able to read back
/// exactly the bytes they write, and must consume precisely one value per
/// `read_value` call so the next entry starts at the right offset.
pub trait BucketPayload {
    /// The in-memory value stored per path.
    type Value: Clone + fmt::Debug;

    /// Format version byte written at the head of each bucket file.
    fn version(&self) -> u8;

    /// File name of the bucket file inside each directory location.
    fn index_file_name(&self) -> &str;

    /// Decode one value.
    fn read_value<R: BufRead>(&self, reader: &mut DataReader<R>) -> CodecResult<Self::Value>;

    /// Encode one value.
    fn write_value<W: Write>(
        &self,
        writer: &mut DataWriter<W>,
        value: &Self::Value,
    ) -> CodecResult<()>;
}
