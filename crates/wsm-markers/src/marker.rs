use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wsm_codec::Value;

/// Attribute key that marks a marker as session-only.
///
/// Markers carrying `transient = true` are never written to a snapshot.
pub const TRANSIENT: &str = "transient";

/// Attribute map of a marker. Never holds [`Value::Null`].
pub type MarkerAttributes = BTreeMap<String, Value>;

/// One annotation attached to a resource.
///
/// Attributes are normalized on every mutation: null values are dropped and
/// an empty map is stored as "no attributes".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerInfo {
    pub id: u64,
    pub marker_type: String,
    attributes: Option<MarkerAttributes>,
}

impl MarkerInfo {
    pub fn new(id: u64, marker_type: impl Into<String>) -> Self {
        Self {
            id,
            marker_type: marker_type.into(),
            attributes: None,
        }
    }

    /// Build a marker with an initial attribute map, normalizing it.
    pub fn with_attributes(
        id: u64,
        marker_type: impl Into<String>,
        attributes: Option<MarkerAttributes>,
    ) -> Self {
        let mut marker = Self::new(id, marker_type);
        marker.set_attributes(attributes);
        marker
    }

    /// Builder form of [`MarkerInfo::set_attribute`].
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn attributes(&self) -> Option<&MarkerAttributes> {
        self.attributes.as_ref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.as_ref()?.get(key)
    }

    /// Set one attribute and return the previous value.
    ///
    /// Setting [`Value::Null`] removes the key.
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            return self.remove_attribute(&key);
        }
        self.attributes
            .get_or_insert_with(MarkerAttributes::new)
            .insert(key, value)
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        let attributes = self.attributes.as_mut()?;
        let previous = attributes.remove(key);
        if attributes.is_empty() {
            self.attributes = None;
        }
        previous
    }

    /// Replace the whole attribute map.
    pub fn set_attributes(&mut self, attributes: Option<MarkerAttributes>) {
        self.attributes = attributes
            .map(|mut map| {
                map.retain(|_, value| !value.is_null());
                map
            })
            .filter(|map| !map.is_empty());
    }

    /// Returns `true` if the marker must not outlive the session.
    pub fn is_transient(&self) -> bool {
        self.attribute(TRANSIENT).and_then(Value::as_bool) == Some(true)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.as_ref().map_or(0, BTreeMap::len)
    }
}
