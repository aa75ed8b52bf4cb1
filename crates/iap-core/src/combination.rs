//! Post-IAP combination across the peer group.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{IapError, Result};
use crate::spatial::{from_micro, to_micro};
use crate::store::AggregationStore;

/// Allowed interference per point and channel after IAP (mW per IAP bandwidth).
///
/// Nested as latitude → longitude → channel list, with coordinates keyed in
/// micro-degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostIapResult {
    pub points: BTreeMap<i64, BTreeMap<i64, Vec<f64>>>,
}

impl PostIapResult {
    pub fn get(&self, latitude: f64, longitude: f64) -> Option<&[f64]> {
        self.points
            .get(&to_micro(latitude))?
            .get(&to_micro(longitude))
            .map(Vec::as_slice)
    }

    /// Number of points with at least one contributing grant.
    pub fn point_count(&self) -> usize {
        self.points.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate `(latitude, longitude, allowed_mw)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, &[f64])> + '_ {
        self.points.iter().flat_map(|(lat, row)| {
            row.iter()
                .map(move |(lon, values)| (from_micro(*lat), from_micro(*lon), values.as_slice()))
        })
    }
}

/// Compute the post-IAP allowed interference of the local authority.
///
/// For every point and channel index:
/// `((threshold_mw - global[i]) / peer_group_size) + local[i]`.
/// The unused budget is split evenly across the peer group and each
/// authority keeps what its own grants already consume.
pub fn calculate_ap_iap_ref(
    store: &AggregationStore,
    threshold_mw: f64,
    peer_group_size: usize,
) -> Result<PostIapResult> {
    if peer_group_size == 0 {
        return Err(IapError::EmptyPeerGroup);
    }
    let peers = peer_group_size as f64;

    let mut result = PostIapResult::default();
    for (key, totals) in store.snapshot() {
        if !totals.is_aligned() {
            return Err(IapError::MisalignedStore { key });
        }
        let allowed = totals
            .global
            .iter()
            .zip(&totals.local)
            .map(|(global, local)| ((threshold_mw - global) / peers) + local)
            .collect();
        result
            .points
            .entry(key.lat_micro)
            .or_default()
            .insert(key.lon_micro, allowed);
    }
    Ok(result)
}
