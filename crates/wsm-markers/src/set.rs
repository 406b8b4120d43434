use std::collections::hash_map::{self, HashMap};

use crate::marker::MarkerInfo;

/// The markers of one resource, keyed by marker id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerSet {
    elements: HashMap<u64, MarkerInfo>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: HashMap::with_capacity(capacity),
        }
    }

    /// Insert a marker, replacing any marker with the same id.
    pub fn add(&mut self, marker: MarkerInfo) -> Option<MarkerInfo> {
        self.elements.insert(marker.id, marker)
    }

    pub fn remove(&mut self, id: u64) -> Option<MarkerInfo> {
        self.elements.remove(&id)
    }

    pub fn get(&self, id: u64) -> Option<&MarkerInfo> {
        self.elements.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate in unspecified order.
    pub fn iter(&self) -> hash_map::Values<'_, u64, MarkerInfo> {
        self.elements.values()
    }

    /// Markers sorted by id.
    pub fn sorted(&self) -> Vec<&MarkerInfo> {
        let mut markers: Vec<&MarkerInfo> = self.elements.values().collect();
        markers.sort_by_key(|marker| marker.id);
        markers
    }

    /// A copy of this set without transient markers.
    ///
    /// Encoders write every marker they are given; callers that must not
    /// persist session-only markers apply this first.
    pub fn without_transient(&self) -> MarkerSet {
        self.iter()
            .filter(|marker| !marker.is_transient())
            .cloned()
            .collect()
    }
}

impl FromIterator<MarkerInfo> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = MarkerInfo>>(iter: I) -> Self {
        let mut set = MarkerSet::new();
        for marker in iter {
            set.add(marker);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a MarkerInfo;
    type IntoIter = hash_map::Values<'a, u64, MarkerInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for MarkerSet {
    type Item = MarkerInfo;
    type IntoIter = hash_map::IntoValues<u64, MarkerInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::TRANSIENT;

    #[test]
    fn add_replaces_by_id() {
        let mut set = MarkerSet::new();
        assert!(set.add(MarkerInfo::new(1, "a")).is_none());
        let replaced = set.add(MarkerInfo::new(1, "b")).unwrap();
        assert_eq!(replaced.marker_type, "a");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(1).unwrap().marker_type, "b");
    }

    #[test]
    fn without_transient_filters_and_sorted_orders() {
        let set: MarkerSet = [
            MarkerInfo::new(9, "a"),
            MarkerInfo::new(3, "a").with_attribute(TRANSIENT, true),
            MarkerInfo::new(1, "a"),
        ]
        .into_iter()
        .collect();
        let persistent = set.without_transient();
        let ids: Vec<u64> = persistent.sorted().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 9]);
        let ids: Vec<u64> = set.sorted().iter().map(|m| m.id).collect();
        assert_eq!(ids, [1, 3, 9]);
    }
}
