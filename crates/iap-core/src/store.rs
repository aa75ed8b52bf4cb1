//! Per-point aggregation of allocator results using DashMap.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::spatial::PointKey;

/// Per-channel totals at one protection point, index-aligned across channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointTotals {
    /// Aggregate from grants managed by the local authority (mW)
    pub local: Vec<f64>,
    /// Aggregate from all grants of every authority (mW)
    pub global: Vec<f64>,
}

impl PointTotals {
    pub fn is_aligned(&self) -> bool {
        self.local.len() == self.global.len()
    }
}

/// Thread-safe store for the local-only and all-authority totals of every point.
///
/// Both totals of a channel are appended in the same call, so every key
/// carries equal-length local and global lists.
#[derive(Debug, Default)]
pub struct AggregationStore {
    points: DashMap<PointKey, PointTotals>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one channel's totals for a point.
    pub fn append(&self, key: PointKey, local_mw: f64, global_mw: f64) {
        let mut entry = self.points.entry(key).or_default();
        entry.local.push(local_mw);
        entry.global.push(global_mw);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, key: &PointKey) -> Option<PointTotals> {
        self.points.get(key).map(|r| r.value().clone())
    }

    /// Ordered copy of the store. Only meaningful once all writers have joined.
    pub fn snapshot(&self) -> BTreeMap<PointKey, PointTotals> {
        self.points
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_channel_order() {
        let store = AggregationStore::new();
        let key = PointKey::from_degrees(37.0, -122.0);
        store.append(key, 1.0, 3.0);
        store.append(key, 0.0, 2.0);

        let totals = store.get(&key).unwrap();
        assert_eq!(totals.local, vec![1.0, 0.0]);
        assert_eq!(totals.global, vec![3.0, 2.0]);
        assert!(totals.is_aligned());
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = AggregationStore::new();
        assert!(store.is_empty());
        assert!(store.get(&PointKey::from_degrees(37.0, -122.0)).is_none());
        store.append(PointKey::from_degrees(37.0, -122.0), 1.0, 1.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn concurrent_appends_to_distinct_keys() {
        let store = AggregationStore::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let store = &store;
                s.spawn(move || {
                    let key = PointKey::from_degrees(37.0 + i as f64 * 0.001, -122.0);
                    for ch in 0..10 {
                        store.append(key, ch as f64, ch as f64 * 2.0);
                    }
                });
            }
        });

        assert_eq!(store.len(), 8);
        for (_, totals) in store.snapshot() {
            assert_eq!(totals.local.len(), 10);
            assert_eq!(totals.global.len(), 10);
        }
    }
}
