//! Shared pieces of the marker encodings.
//!
//! Snapshot stream: `[version: i32]` then records until end of input.
//!
//! ```text
//! Record    := path:string count:i32 Marker*
//! Marker    := id:u64 TypeRef attr_count:u16 (key:string value:TypedValue)*
//! TypeRef   := INDEX i32 | QNAME string
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};

use wsm_codec::{CodecError, CodecResult, DataReader, DataWriter};

use crate::marker::{MarkerAttributes, MarkerInfo};

/// Current snapshot stream version.
pub const SNAPSHOT_VERSION: i32 = 2;

/// Type reference by position in the dictionary.
pub const INDEX: u8 = 1;
/// Type reference by name; the name joins the dictionary.
pub const QNAME: u8 = 2;

/// Upper bound on capacity reserved from a declared count.
pub(crate) const PREALLOCATE_LIMIT: usize = 1024;

/// Type names seen so far during one read pass, in first-seen order.
#[derive(Debug, Default)]
pub struct TypeDictionary {
    names: Vec<String>,
}

impl TypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: String) {
        self.names.push(name);
    }

    pub fn get(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Write-side counterpart of [`TypeDictionary`].
#[derive(Debug, Default)]
pub struct TypeInterner {
    indices: HashMap<String, i32>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name` if already emitted; otherwise record it and return `None`.
    pub fn intern(&mut self, name: &str) -> Option<i32> {
        if let Some(index) = self.indices.get(name) {
            return Some(*index);
        }
        let next = self.indices.len() as i32;
        self.indices.insert(name.to_string(), next);
        None
    }
}

/// Decode an attribute block, dropping null values.
pub(crate) fn read_attributes<R: BufRead>(
    reader: &mut DataReader<R>,
) -> CodecResult<Option<MarkerAttributes>> {
    let count = reader.read_u16()?;
    let mut attributes = MarkerAttributes::new();
    for _ in 0..count {
        let key = reader.read_string()?;
        let value = reader.read_value()?;
        if !value.is_null() {
            attributes.insert(key, value);
        }
    }
    Ok((!attributes.is_empty()).then_some(attributes))
}

pub(crate) fn write_attributes<W: Write>(
    writer: &mut DataWriter<W>,
    marker: &MarkerInfo,
) -> CodecResult<()> {
    let Some(attributes) = marker.attributes() else {
        return writer.write_u16(0);
    };
    let count = u16::try_from(attributes.len()).map_err(|_| CodecError::Malformed {
        offset: writer.written(),
        reason: format!(
            "marker {} has {} attributes, more than a u16 count holds",
            marker.id,
            attributes.len()
        ),
    })?;
    writer.write_u16(count)?;
    for (key, value) in attributes {
        writer.write_string(key)?;
        writer.write_value(value)?;
    }
    Ok(())
}

/// Convert a declared element count, rejecting negatives.
pub(crate) fn declared_count(count: i32, offset: u64) -> CodecResult<usize> {
    usize::try_from(count).map_err(|_| CodecError::Malformed {
        offset,
        reason: format!("negative marker count {count}"),
    })
}

pub(crate) fn declared_len(len: usize, offset: u64) -> CodecResult<i32> {
    i32::try_from(len).map_err(|_| CodecError::Malformed {
        offset,
        reason: format!("{len} markers exceed the i32 count"),
    })
}
