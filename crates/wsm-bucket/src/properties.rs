//! String-to-string property maps stored per path.
//!
//! Entry value layout: `[count: u16][(key: string, value: string)]*`.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use wsm_codec::{CodecError, CodecResult, DataReader, DataWriter};
use wsm_types::WorkspacePath;

use crate::bucket::Bucket;
use crate::error::BucketResult;
use crate::payload::BucketPayload;
use crate::tree::BucketTree;

/// Property map attached to one path.
pub type Properties = BTreeMap<String, String>;

/// [`BucketPayload`] for [`Properties`] values.
#[derive(Clone, Copy, Debug, Default)]
pub struct PropertiesPayload;

impl BucketPayload for PropertiesPayload {
    type Value = Properties;

    fn version(&self) -> u8 {
        1
    }

    fn index_file_name(&self) -> &str {
        "properties.index"
    }

    fn read_value<R: BufRead>(&self, reader: &mut DataReader<R>) -> CodecResult<Properties> {
        let count = reader.read_u16()?;
        let mut properties = Properties::new();
        for _ in 0..count {
            let key = reader.read_string()?;
            let value = reader.read_string()?;
            properties.insert(key, value);
        }
        Ok(properties)
    }

    fn write_value<W: Write>(
        &self,
        writer: &mut DataWriter<W>,
        value: &Properties,
    ) -> CodecResult<()> {
        let count = u16::try_from(value.len()).map_err(|_| CodecError::Malformed {
            offset: writer.written(),
            reason: format!("{} properties exceed the u16 count", value.len()),
        })?;
        writer.write_u16(count)?;
        for (key, value) in value {
            writer.write_string(key)?;
            writer.write_string(value)?;
        }
        Ok(())
    }
}

impl Bucket<PropertiesPayload> {
    /// Look up one property of `path`.
    pub fn property(&self, path: &WorkspacePath, key: &str) -> Option<&str> {
        self.entry_value(path)?.get(key).map(String::as_str)
    }

    /// Set (`Some`) or remove (`None`) one property of `path`.
    ///
    /// Removing the last property removes the path's entry entirely.
    pub fn set_property(
        &mut self,
        path: &WorkspacePath,
        key: &str,
        value: Option<&str>,
    ) -> BucketResult<()> {
        let existing = self.entry_value(path).cloned();
        let updated = match (existing, value) {
            (None, None) => return Ok(()),
            (None, Some(value)) => Properties::from([(key.to_string(), value.to_string())]),
            (Some(mut properties), None) => {
                if properties.remove(key).is_none() {
                    return Ok(());
                }
                properties
            }
            (Some(mut properties), Some(value)) => {
                properties.insert(key.to_string(), value.to_string());
                properties
            }
        };
        let updated = (!updated.is_empty()).then_some(updated);
        self.set_entry_value(path, updated)?;
        Ok(())
    }
}

impl BucketTree<PropertiesPayload> {
    /// Load the bucket governing `path` and read one property.
    pub fn property(&mut self, path: &WorkspacePath, key: &str) -> BucketResult<Option<String>> {
        let bucket = self.load_bucket_for(path)?;
        Ok(bucket.property(path, key).map(str::to_string))
    }

    /// Load the bucket governing `path` and set or remove one property.
    pub fn set_property(
        &mut self,
        path: &WorkspacePath,
        key: &str,
        value: Option<&str>,
    ) -> BucketResult<()> {
        self.load_bucket_for(path)?.set_property(path, key, value)
    }
}
