//! Grant neighborhood selection.

use serde::{Deserialize, Serialize};

use crate::models::{CbsdCategory, Grant, ProtectedEntityType, ProtectionConstraint, ProtectionPoint};
use crate::spatial::haversine_distance;

/// Selects the grants geographically relevant to a protection point.
pub trait NeighborhoodFilter: Send + Sync {
    fn grants_in_neighborhood<'g>(
        &self,
        grants: &'g [Grant],
        point: ProtectionPoint,
        entity_type: ProtectedEntityType,
    ) -> Vec<&'g Grant>;
}

/// Great-circle radius filter with a radius per entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceNeighborhood {
    pub esc_category_a_m: f64,
    pub esc_category_b_m: f64,
    pub ppa_m: f64,
    pub gwpz_m: f64,
    pub fss_cochannel_m: f64,
    pub fss_blocking_m: f64,
}

impl Default for DistanceNeighborhood {
    fn default() -> Self {
        Self {
            esc_category_a_m: 40_000.0,
            esc_category_b_m: 80_000.0,
            ppa_m: 40_000.0,
            gwpz_m: 40_000.0,
            fss_cochannel_m: 150_000.0,
            fss_blocking_m: 40_000.0,
        }
    }
}

impl DistanceNeighborhood {
    pub fn radius_m(&self, entity_type: ProtectedEntityType, category: CbsdCategory) -> f64 {
        match (entity_type, category) {
            (ProtectedEntityType::Esc, CbsdCategory::A) => self.esc_category_a_m,
            (ProtectedEntityType::Esc, CbsdCategory::B) => self.esc_category_b_m,
            (ProtectedEntityType::PpaArea, _) => self.ppa_m,
            (ProtectedEntityType::GwpzArea, _) => self.gwpz_m,
            (ProtectedEntityType::FssCochannel, _) => self.fss_cochannel_m,
            (ProtectedEntityType::FssBlocking, _) => self.fss_blocking_m,
        }
    }
}

impl NeighborhoodFilter for DistanceNeighborhood {
    fn grants_in_neighborhood<'g>(
        &self,
        grants: &'g [Grant],
        point: ProtectionPoint,
        entity_type: ProtectedEntityType,
    ) -> Vec<&'g Grant> {
        grants
            .iter()
            .filter(|grant| {
                let dist =
                    haversine_distance(grant.latitude, grant.longitude, point.latitude, point.longitude);
                dist <= self.radius_m(entity_type, grant.category)
            })
            .collect()
    }
}

/// Keep the grants whose frequency range overlaps the constraint's channel.
pub fn overlapping_grants<'g>(
    grants: &[&'g Grant],
    constraint: &ProtectionConstraint,
) -> Vec<&'g Grant> {
    let channel = constraint.channel();
    grants
        .iter()
        .copied()
        .filter(|grant| grant.frequency.overlaps(&channel))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FrequencyRange;

    #[test]
    fn test_category_controls_esc_radius() {
        let filter = DistanceNeighborhood::default();
        let band = FrequencyRange::new(3550e6, 3560e6);
        // ~55 km north of the sensor
        let grants = vec![
            Grant::new("a", 37.5, -122.0, 20.0, band).with_category(CbsdCategory::A),
            Grant::new("b", 37.5, -122.0, 30.0, band).with_category(CbsdCategory::B),
        ];

        let selected = filter.grants_in_neighborhood(
            &grants,
            ProtectionPoint::new(37.0, -122.0),
            ProtectedEntityType::Esc,
        );
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "b");
    }

    #[test]
    fn overlap_filter_drops_adjacent_channels() {
        let grants = vec![
            Grant::new("in", 37.0, -122.0, 20.0, FrequencyRange::new(3550e6, 3560e6)),
            Grant::new("edge", 37.0, -122.0, 20.0, FrequencyRange::new(3560e6, 3570e6)),
        ];
        let refs: Vec<&Grant> = grants.iter().collect();
        let constraint = ProtectionConstraint::new(
            ProtectionPoint::new(37.0, -122.0),
            FrequencyRange::new(3555e6, 3560e6),
            ProtectedEntityType::PpaArea,
        );

        let selected = overlapping_grants(&refs, &constraint);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "in");
    }
}
