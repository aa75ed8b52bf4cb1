//! Entity driver tests.
//!
//! Run with: cargo test -p iap-core --test drivers_test

use std::sync::Arc;

use iap_core::models::AzimuthGain;
use iap_core::units::linear_to_db;
use iap_core::{
    EntityGeometry, EscSensor, FreeSpaceModel, FrequencyRange, Grant, GrantSet, GwpzArea,
    IapEngine, IapError, InterferenceModel, PalRecord, PpaArea, ProtectedEntity,
    ProtectedEntityType, ProtectionConstraint, ProtectionRules, RegionType,
};

/// Interference = EIRP − constant coupling loss.
struct CouplingLoss(f64);

impl InterferenceModel for CouplingLoss {
    fn interference_dbm(
        &self,
        _grant: &Grant,
        eirp_dbm_per_mhz: f64,
        _constraint: &ProtectionConstraint,
        _geometry: &EntityGeometry,
    ) -> f64 {
        eirp_dbm_per_mhz - self.0
    }
}

fn esc_sensor() -> EscSensor {
    EscSensor {
        id: "esc-1".into(),
        latitude: 37.0,
        longitude: -122.0,
        height_agl_m: 15.0,
        antenna_azimuth_deg: 0.0,
        antenna_gain_dbi: 10.0,
        azimuth_radiation_pattern: (0..360)
            .map(|a| AzimuthGain {
                angle_deg: a as f64,
                gain_db: 0.0,
            })
            .collect(),
    }
}

/// Square zone of `side_arcsec` arc-seconds anchored at (lat, lon).
fn square_zone(lat: f64, lon: f64, side_arcsec: f64) -> Vec<[f64; 2]> {
    let side = side_arcsec / 3600.0;
    vec![
        [lat, lon],
        [lat, lon + side],
        [lat + side, lon + side],
        [lat + side, lon],
        [lat, lon],
    ]
}

fn gwpz(range: Option<FrequencyRange>) -> GwpzArea {
    GwpzArea {
        id: "gwpz-1".into(),
        zone: square_zone(37.0 + 0.5 / 3600.0, -122.0 + 0.5 / 3600.0, 10.0),
        clutter: Some(RegionType::Rural),
        operation_frequency_range: range,
    }
}

fn area_grants() -> GrantSet {
    let local = vec![
        Grant::new("l1", 37.02, -122.01, 30.0, FrequencyRange::new(3550e6, 3570e6)),
        Grant::new("l2", 36.99, -121.98, 24.0, FrequencyRange::new(3560e6, 3580e6)),
    ];
    let peers = vec![vec![
        Grant::new("p1", 37.01, -121.99, 30.0, FrequencyRange::new(3550e6, 3600e6)),
        // far outside every neighborhood
        Grant::new("p2", 39.0, -120.0, 30.0, FrequencyRange::new(3550e6, 3600e6)),
    ]];
    GrantSet::from_activity_dumps(local, peers)
}

#[test]
fn test_esc_rolloff_tightens_upper_channels() {
    let engine = IapEngine::new(Arc::new(CouplingLoss(140.0)));
    let grants = GrantSet::new(
        vec![Grant::new("peer", 37.01, -122.0, 30.0, FrequencyRange::new(3550e6, 3700e6))
            .with_managed(false)],
        2,
    );

    let result = engine.perform_iap_for_esc(&esc_sensor(), &grants).unwrap();
    let allowed = result.get(37.0, -122.0).unwrap();
    assert_eq!(allowed.len(), 26);

    let threshold_mw = ProtectionRules::default()
        .threshold(ProtectedEntityType::Esc)
        .mw;
    // allowed = (threshold - global) / 2 with no locally managed grants
    let global_db = |i: usize| linear_to_db(threshold_mw - 2.0 * allowed[i]);

    assert!((global_db(0) - -110.0).abs() < 1e-6);
    assert!((global_db(20) - -110.0).abs() < 1e-6);
    // 3655-3660 MHz: 7.5 dB roll-off, one step down
    assert!((global_db(21) - -111.0).abs() < 1e-6);
    // 3660-3665 MHz: 12.5 dB roll-off, six steps down
    assert!((global_db(22) - -116.0).abs() < 1e-6);
}

#[test]
fn test_esc_without_neighbors_has_no_entry() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let grants = GrantSet::new(
        vec![Grant::new("far", 40.0, -110.0, 30.0, FrequencyRange::new(3550e6, 3700e6))],
        1,
    );
    let result = engine.perform_iap_for_esc(&esc_sensor(), &grants).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_gwpz_grid_covers_every_point() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let result = engine
        .perform_iap_for_gwpz(&gwpz(Some(FrequencyRange::new(3550e6, 3570e6))), &area_grants())
        .unwrap();

    // 10 arc-second square at 2 arc-second resolution
    assert_eq!(result.point_count(), 25);
    for (_, _, allowed) in result.iter() {
        assert_eq!(allowed.len(), 4);
        assert!(allowed.iter().all(|v| v.is_finite() && *v > 0.0));
    }
}

#[test]
fn test_gwpz_parallel_matches_serial() {
    let model: Arc<dyn InterferenceModel> = Arc::new(FreeSpaceModel::default());
    let area = gwpz(Some(FrequencyRange::new(3550e6, 3600e6)));
    let grants = area_grants();

    let serial = IapEngine::new(model.clone())
        .with_max_workers(Some(1))
        .perform_iap_for_gwpz(&area, &grants)
        .unwrap();
    let parallel = IapEngine::new(model)
        .with_max_workers(Some(8))
        .perform_iap_for_gwpz(&area, &grants)
        .unwrap();

    assert_eq!(serial, parallel);
}

#[test]
fn test_repeated_runs_are_identical() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let area = gwpz(Some(FrequencyRange::new(3550e6, 3600e6)));
    let grants = area_grants();

    let first = engine.perform_iap_for_gwpz(&area, &grants).unwrap();
    let second = engine.perform_iap_for_gwpz(&area, &grants).unwrap();
    assert_eq!(first, second);
}

#[test]
fn zero_size_rules_are_rejected_before_any_run() {
    let model: Arc<dyn InterferenceModel> = Arc::new(FreeSpaceModel::default());
    let zero_bandwidth: ProtectionRules =
        serde_json::from_str(r#"{ "iap_bandwidth_hz": 0 }"#).unwrap();
    let err = IapEngine::new(model.clone())
        .with_rules(zero_bandwidth)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        IapError::InvalidRule {
            field: "iap_bandwidth_hz",
            ..
        }
    ));

    let mut zero_resolution = ProtectionRules::default();
    zero_resolution.grid_resolution_arcsec = 0.0;
    assert!(IapEngine::new(model).with_rules(zero_resolution).is_err());
}

#[test]
fn test_gwpz_requires_operation_range() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let err = engine
        .perform_iap_for_gwpz(&gwpz(None), &area_grants())
        .unwrap_err();
    match err {
        IapError::MissingField { entity, field } => {
            assert_eq!(entity, ProtectedEntityType::GwpzArea);
            assert_eq!(field, "operation_frequency_range");
        }
        other => panic!("expected missing field, got {other:?}"),
    }
}

#[test]
fn test_ppa_uses_matching_pal_record() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let ppa = PpaArea {
        id: "ppa-1".into(),
        zone: square_zone(37.0 + 0.5 / 3600.0, -122.0 + 0.5 / 3600.0, 6.0),
        region_type: Some(RegionType::Suburban),
        pal_ids: vec!["pal-b".into()],
    };
    let records = vec![
        PalRecord {
            pal_id: "pal-a".into(),
            primary_assignment: FrequencyRange::new(3650e6, 3660e6),
        },
        PalRecord {
            pal_id: "pal-b".into(),
            primary_assignment: FrequencyRange::new(3550e6, 3560e6),
        },
    ];

    let result = engine
        .perform_iap_for_ppa(&ppa, &area_grants(), &records)
        .unwrap()
        .expect("pal-b should match");
    assert_eq!(result.point_count(), 9);
    for (_, _, allowed) in result.iter() {
        assert_eq!(allowed.len(), 2);
    }
}

#[test]
fn test_ppa_without_pal_record_produces_nothing() {
    let engine = IapEngine::new(Arc::new(FreeSpaceModel::default()));
    let ppa = PpaArea {
        id: "ppa-2".into(),
        zone: square_zone(37.0, -122.0, 6.0),
        region_type: Some(RegionType::Urban),
        pal_ids: vec!["missing".into()],
    };
    let result = engine
        .perform_iap(&ProtectedEntity::Ppa(ppa), &area_grants(), &[])
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn local_share_grows_with_local_usage() {
    // Same physical deployment, once owned locally and once by a peer.
    let engine = IapEngine::new(Arc::new(CouplingLoss(140.0)));
    let grant = Grant::new("g", 37.01, -122.0, 30.0, FrequencyRange::new(3550e6, 3555e6));

    let owned = GrantSet::new(vec![grant.clone().with_managed(true)], 2);
    let foreign = GrantSet::new(vec![grant.with_managed(false)], 2);

    let owned = engine.perform_iap_for_esc(&esc_sensor(), &owned).unwrap();
    let foreign = engine.perform_iap_for_esc(&esc_sensor(), &foreign).unwrap();

    let owned = owned.get(37.0, -122.0).unwrap()[0];
    let foreign = foreign.get(37.0, -122.0).unwrap()[0];
    // the local authority keeps its own -110 dBm on top of the even split
    assert!(owned > foreign);
    assert!((owned - foreign - 1e-11).abs() < 1e-20);
}
