//! Interference model seam.
//!
//! Propagation and antenna physics sit behind [`InterferenceModel`]. The
//! allocator only relies on one property: lowering a grant's EIRP strictly
//! lowers the interference it causes.

use crate::models::{AzimuthGain, EntityGeometry, Grant, ProtectionConstraint};
use crate::spatial::{bearing_deg, haversine_distance};
use crate::units::{linear_to_db, MHZ};

/// Computes the interference one grant causes at one protection constraint.
pub trait InterferenceModel: Send + Sync {
    /// Interference in dBm over the constraint's bandwidth when the grant
    /// transmits at `eirp_dbm_per_mhz`.
    fn interference_dbm(
        &self,
        grant: &Grant,
        eirp_dbm_per_mhz: f64,
        constraint: &ProtectionConstraint,
        geometry: &EntityGeometry,
    ) -> f64;
}

/// Free-space path loss model.
///
/// Interference = EIRP density + 10·log10(overlap MHz) − FSPL + receive gain.
/// Receive gain comes from the entity geometry: ESC antennas use their
/// azimuth pattern, FSS stations their maximum gain, area incumbents a fixed
/// isotropic receiver.
#[derive(Debug, Clone)]
pub struct FreeSpaceModel {
    /// Separation below which the loss is evaluated at this distance
    pub min_distance_m: f64,
    /// Receive gain assumed for area incumbents (dBi)
    pub area_gain_dbi: f64,
}

impl Default for FreeSpaceModel {
    fn default() -> Self {
        Self {
            min_distance_m: 1.0,
            area_gain_dbi: 0.0,
        }
    }
}

impl FreeSpaceModel {
    /// Free-space path loss in dB.
    pub fn path_loss_db(distance_m: f64, frequency_hz: f64) -> f64 {
        20.0 * distance_m.log10() + 20.0 * frequency_hz.log10() - 147.55
    }

    fn receive_gain_dbi(
        &self,
        grant: &Grant,
        constraint: &ProtectionConstraint,
        geometry: &EntityGeometry,
    ) -> f64 {
        match geometry {
            EntityGeometry::Esc(antenna) => {
                if antenna.pattern.is_empty() {
                    return antenna.gain_dbi;
                }
                let toward_grant = bearing_deg(
                    constraint.latitude,
                    constraint.longitude,
                    grant.latitude,
                    grant.longitude,
                );
                antenna.gain_dbi
                    + pattern_gain_db(&antenna.pattern, antenna.azimuth_deg, toward_grant)
            }
            EntityGeometry::Fss(pointing) => pointing.max_gain_dbi,
            EntityGeometry::Area { .. } => self.area_gain_dbi,
        }
    }
}

/// Relative pattern gain toward `bearing`, taken from the sample nearest in angle.
fn pattern_gain_db(pattern: &[AzimuthGain], boresight_deg: f64, bearing: f64) -> f64 {
    let offset = (bearing - boresight_deg).rem_euclid(360.0);
    pattern
        .iter()
        .min_by(|a, b| {
            angular_gap(a.angle_deg, offset).total_cmp(&angular_gap(b.angle_deg, offset))
        })
        .map_or(0.0, |sample| sample.gain_db)
}

fn angular_gap(a_deg: f64, b_deg: f64) -> f64 {
    let gap = (a_deg - b_deg).rem_euclid(360.0);
    gap.min(360.0 - gap)
}

impl InterferenceModel for FreeSpaceModel {
    fn interference_dbm(
        &self,
        grant: &Grant,
        eirp_dbm_per_mhz: f64,
        constraint: &ProtectionConstraint,
        geometry: &EntityGeometry,
    ) -> f64 {
        let channel = constraint.channel();
        let overlap_mhz = (grant.frequency.overlap_hz(&channel) / MHZ).max(1e-3);
        let distance_m = haversine_distance(
            grant.latitude,
            grant.longitude,
            constraint.latitude,
            constraint.longitude,
        )
        .max(self.min_distance_m);
        let loss_db = Self::path_loss_db(distance_m, channel.center_hz());

        eirp_dbm_per_mhz + linear_to_db(overlap_mhz) - loss_db
            + self.receive_gain_dbi(grant, constraint, geometry)
    }
}
