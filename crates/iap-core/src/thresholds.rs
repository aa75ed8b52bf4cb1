//! Regulatory constants and pre-IAP threshold derivation.

use serde::{Deserialize, Serialize};

use crate::error::{IapError, Result};
use crate::models::ProtectedEntityType;
use crate::units::{
    db_to_linear, linear_to_db, ESC_CH21_CF_HZ, GWPZ_RBW_HZ, IAPBW_HZ, MHZ, PPA_RBW_HZ,
};

/// Protection reference of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Protection level in dBm per reference bandwidth
    pub noise_floor_dbm_per_rbw: f64,
    /// Reference bandwidth in Hz; `None` for wideband (blocking) protection
    pub reference_bandwidth_hz: Option<f64>,
    /// Pre-IAP margin in dB
    pub margin_db: f64,
}

/// Configuration for IAP protection thresholds and convergence limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionRules {
    pub esc: ThresholdRule,
    pub ppa: ThresholdRule,
    pub gwpz: ThresholdRule,
    pub fss_cochannel: ThresholdRule,
    pub fss_blocking: ThresholdRule,
    /// Channel width the thresholds are expressed in (Hz)
    pub iap_bandwidth_hz: f64,
    /// Grid resolution for area incumbents (arc-seconds)
    pub grid_resolution_arcsec: f64,
    /// ESC channels starting at or above this frequency get roll-off attenuation
    pub esc_rolloff_start_hz: f64,
    /// Center frequency the ESC roll-off is measured from
    pub esc_rolloff_reference_hz: f64,
    /// Fixed part of the ESC roll-off (dB)
    pub esc_rolloff_base_db: f64,
    /// Lowest EIRP a grant may be driven to before convergence is declared failed
    pub eirp_floor_dbm_per_mhz: f64,
}

impl Default for ProtectionRules {
    fn default() -> Self {
        // WINNF-TS-0061 table 8.4-2, 1 dB pre-IAP margin for every type
        Self {
            esc: ThresholdRule {
                noise_floor_dbm_per_rbw: -109.0,
                reference_bandwidth_hz: Some(MHZ),
                margin_db: 1.0,
            },
            ppa: ThresholdRule {
                noise_floor_dbm_per_rbw: -80.0,
                reference_bandwidth_hz: Some(PPA_RBW_HZ),
                margin_db: 1.0,
            },
            gwpz: ThresholdRule {
                noise_floor_dbm_per_rbw: -80.0,
                reference_bandwidth_hz: Some(GWPZ_RBW_HZ),
                margin_db: 1.0,
            },
            fss_cochannel: ThresholdRule {
                noise_floor_dbm_per_rbw: -129.0,
                reference_bandwidth_hz: Some(MHZ),
                margin_db: 1.0,
            },
            fss_blocking: ThresholdRule {
                noise_floor_dbm_per_rbw: -60.0,
                reference_bandwidth_hz: None,
                margin_db: 1.0,
            },
            iap_bandwidth_hz: IAPBW_HZ,
            grid_resolution_arcsec: 2.0,
            esc_rolloff_start_hz: 3650.0 * MHZ,
            esc_rolloff_reference_hz: ESC_CH21_CF_HZ,
            esc_rolloff_base_db: 2.5,
            eirp_floor_dbm_per_mhz: -150.0,
        }
    }
}

impl ProtectionRules {
    /// Reject values that would make thresholds or channel and grid
    /// enumeration meaningless.
    pub fn validate(&self) -> Result<()> {
        positive("iap", "iap_bandwidth_hz", self.iap_bandwidth_hz)?;
        positive("iap", "grid_resolution_arcsec", self.grid_resolution_arcsec)?;
        finite("iap", "esc_rolloff_start_hz", self.esc_rolloff_start_hz)?;
        finite("iap", "esc_rolloff_reference_hz", self.esc_rolloff_reference_hz)?;
        finite("iap", "esc_rolloff_base_db", self.esc_rolloff_base_db)?;
        finite("iap", "eirp_floor_dbm_per_mhz", self.eirp_floor_dbm_per_mhz)?;

        let per_type = [
            ("esc", &self.esc),
            ("ppa", &self.ppa),
            ("gwpz", &self.gwpz),
            ("fss_cochannel", &self.fss_cochannel),
            ("fss_blocking", &self.fss_blocking),
        ];
        for (name, rule) in per_type {
            finite(name, "noise_floor_dbm_per_rbw", rule.noise_floor_dbm_per_rbw)?;
            finite(name, "margin_db", rule.margin_db)?;
            if let Some(rbw_hz) = rule.reference_bandwidth_hz {
                positive(name, "reference_bandwidth_hz", rbw_hz)?;
            }
        }
        Ok(())
    }

    pub fn rule_for(&self, entity_type: ProtectedEntityType) -> &ThresholdRule {
        match entity_type {
            ProtectedEntityType::Esc => &self.esc,
            ProtectedEntityType::PpaArea => &self.ppa,
            ProtectedEntityType::GwpzArea => &self.gwpz,
            ProtectedEntityType::FssCochannel => &self.fss_cochannel,
            ProtectedEntityType::FssBlocking => &self.fss_blocking,
        }
    }

    /// Pre-IAP threshold for an entity type.
    pub fn threshold(&self, entity_type: ProtectedEntityType) -> EntityThreshold {
        let rule = self.rule_for(entity_type);
        let bandwidth_term = match (entity_type, rule.reference_bandwidth_hz) {
            (ProtectedEntityType::FssBlocking, _) | (_, None) => 0.0,
            (_, Some(rbw_hz)) => linear_to_db(self.iap_bandwidth_hz / rbw_hz),
        };
        EntityThreshold::from_dbm(rule.noise_floor_dbm_per_rbw + bandwidth_term - rule.margin_db)
    }

    /// ESC roll-off attenuation for a channel, zero below the roll-off start.
    pub fn esc_rolloff_db(&self, channel_low_hz: f64, channel_center_hz: f64) -> f64 {
        if channel_low_hz >= self.esc_rolloff_start_hz {
            self.esc_rolloff_base_db + (channel_center_hz - self.esc_rolloff_reference_hz) / MHZ
        } else {
            0.0
        }
    }
}

fn finite(rule: &'static str, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(IapError::InvalidRule { rule, field, value })
    }
}

fn positive(rule: &'static str, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(IapError::InvalidRule { rule, field, value })
    }
}

/// A threshold in both logarithmic and linear form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityThreshold {
    pub dbm: f64,
    pub mw: f64,
}

impl EntityThreshold {
    pub fn from_dbm(dbm: f64) -> Self {
        Self {
            dbm,
            mw: db_to_linear(dbm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_default_thresholds_match_regulatory_table() {
        let rules = ProtectionRules::default();
        let log5 = linear_to_db(5.0);
        let log_half = linear_to_db(0.5);

        assert_close(rules.threshold(ProtectedEntityType::Esc).dbm, -109.0 + log5 - 1.0);
        assert_close(rules.threshold(ProtectedEntityType::PpaArea).dbm, -80.0 + log_half - 1.0);
        assert_close(rules.threshold(ProtectedEntityType::GwpzArea).dbm, -80.0 + log_half - 1.0);
        assert_close(
            rules.threshold(ProtectedEntityType::FssCochannel).dbm,
            -129.0 + log5 - 1.0,
        );
        assert_close(rules.threshold(ProtectedEntityType::FssBlocking).dbm, -61.0);
    }

    #[test]
    fn test_blocking_ignores_reference_bandwidth() {
        let mut rules = ProtectionRules::default();
        rules.fss_blocking.reference_bandwidth_hz = Some(MHZ);
        assert_close(rules.threshold(ProtectedEntityType::FssBlocking).dbm, -61.0);
    }

    #[test]
    fn threshold_linear_form_is_consistent() {
        let t = ProtectionRules::default().threshold(ProtectedEntityType::Esc);
        assert_close(linear_to_db(t.mw), t.dbm);
    }

    #[test]
    fn esc_rolloff_grows_one_db_per_mhz() {
        let rules = ProtectionRules::default();
        assert_eq!(rules.esc_rolloff_db(3645e6, 3647.5e6), 0.0);
        assert_close(rules.esc_rolloff_db(3650e6, 3652.5e6), 2.5);
        assert_close(rules.esc_rolloff_db(3660e6, 3662.5e6), 12.5);
    }

    #[test]
    fn rules_deserialize_with_partial_overrides() {
        let rules: ProtectionRules =
            serde_json::from_str(r#"{ "grid_resolution_arcsec": 5.0 }"#).unwrap();
        assert_eq!(rules.grid_resolution_arcsec, 5.0);
        assert_eq!(rules.esc.noise_floor_dbm_per_rbw, -109.0);
    }

    #[test]
    fn test_default_rules_validate() {
        assert!(ProtectionRules::default().validate().is_ok());
    }

    #[test]
    fn zero_or_nan_sizes_are_rejected() {
        let rules: ProtectionRules =
            serde_json::from_str(r#"{ "iap_bandwidth_hz": 0.0 }"#).unwrap();
        assert!(matches!(
            rules.validate(),
            Err(IapError::InvalidRule {
                field: "iap_bandwidth_hz",
                ..
            })
        ));

        let mut rules = ProtectionRules::default();
        rules.grid_resolution_arcsec = -2.0;
        assert!(matches!(
            rules.validate(),
            Err(IapError::InvalidRule {
                field: "grid_resolution_arcsec",
                ..
            })
        ));

        let mut rules = ProtectionRules::default();
        rules.ppa.reference_bandwidth_hz = Some(f64::NAN);
        assert!(matches!(
            rules.validate(),
            Err(IapError::InvalidRule {
                rule: "ppa",
                field: "reference_bandwidth_hz",
                ..
            })
        ));
    }

    #[test]
    fn infinite_margin_is_rejected() {
        let mut rules = ProtectionRules::default();
        rules.esc.margin_db = f64::INFINITY;
        assert!(rules.validate().is_err());
    }
}
