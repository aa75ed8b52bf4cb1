//! Entity drivers.
//!
//! Each driver derives its entity's threshold and channel plan, evaluates
//! its protection point(s) into a fresh aggregation store, and combines the
//! store into the post-IAP allowed interference.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::allocator::{iap_point_constraint, PointContext};
use crate::channels::ChannelPlan;
use crate::combination::{calculate_ap_iap_ref, PostIapResult};
use crate::error::{IapError, Result};
use crate::executor::{run_parallel, worker_count};
use crate::grid::{GridSampler, PolygonGridSampler};
use crate::interference::InterferenceModel;
use crate::models::{
    EntityGeometry, EscSensor, FrequencyRange, FssStation, GrantSet, GwpzArea, PalRecord,
    PpaArea, ProtectedEntity, ProtectedEntityType, ProtectionPoint,
};
use crate::neighborhood::{DistanceNeighborhood, NeighborhoodFilter};
use crate::store::AggregationStore;
use crate::thresholds::ProtectionRules;
use crate::units::{
    CBRS_HIGH_FREQ_HZ, CBRS_LOW_FREQ_HZ, ESC_HIGH_FREQ_HZ, ESC_LOW_FREQ_HZ, FSS_TTC_HIGH_FREQ_HZ,
    FSS_TTC_LOW_FREQ_HZ,
};

/// IAP engine: the collaborators plus the regulatory configuration.
#[derive(Clone)]
pub struct IapEngine {
    model: Arc<dyn InterferenceModel>,
    neighborhood: Arc<dyn NeighborhoodFilter>,
    grid: Arc<dyn GridSampler>,
    rules: ProtectionRules,
    max_workers: Option<usize>,
}

impl IapEngine {
    /// Create an engine with the default neighborhood radii, grid sampler
    /// and regulatory rules.
    pub fn new(model: Arc<dyn InterferenceModel>) -> Self {
        Self {
            model,
            neighborhood: Arc::new(DistanceNeighborhood::default()),
            grid: Arc::new(PolygonGridSampler),
            rules: ProtectionRules::default(),
            max_workers: None,
        }
    }

    pub fn with_neighborhood(mut self, neighborhood: Arc<dyn NeighborhoodFilter>) -> Self {
        self.neighborhood = neighborhood;
        self
    }

    pub fn with_grid_sampler(mut self, grid: Arc<dyn GridSampler>) -> Self {
        self.grid = grid;
        self
    }

    /// Replace the regulatory constants. Rejects rules that cannot drive a run.
    pub fn with_rules(mut self, rules: ProtectionRules) -> Result<Self> {
        rules.validate()?;
        self.rules = rules;
        Ok(self)
    }

    /// Cap the grid worker pool below the machine's available parallelism.
    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn rules(&self) -> &ProtectionRules {
        &self.rules
    }

    /// Run IAP for any protected entity.
    ///
    /// `Ok(None)` means the entity is legitimately not protected by IAP
    /// (no matching PAL record, or an exempt FSS blocking station).
    pub fn perform_iap(
        &self,
        entity: &ProtectedEntity,
        grants: &GrantSet,
        pal_records: &[PalRecord],
    ) -> Result<Option<PostIapResult>> {
        let _span = info_span!("iap", entity = entity.id(), kind = %entity.entity_type()).entered();
        match entity {
            ProtectedEntity::Esc(esc) => self.perform_iap_for_esc(esc, grants).map(Some),
            ProtectedEntity::Ppa(ppa) => self.perform_iap_for_ppa(ppa, grants, pal_records),
            ProtectedEntity::Gwpz(gwpz) => self.perform_iap_for_gwpz(gwpz, grants).map(Some),
            ProtectedEntity::FssCochannel(fss) => {
                self.perform_iap_for_fss_cochannel(fss, grants).map(Some)
            }
            ProtectedEntity::FssBlocking(fss) => self.perform_iap_for_fss_blocking(fss, grants),
        }
    }

    /// ESC sensor over its 3550-3680 MHz passband.
    pub fn perform_iap_for_esc(
        &self,
        esc: &EscSensor,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let entity_type = ProtectedEntityType::Esc;
        let geometry = EntityGeometry::Esc(esc.antenna()?);
        let span = FrequencyRange::new(ESC_LOW_FREQ_HZ, ESC_HIGH_FREQ_HZ);

        debug!(id = %esc.id, "running ESC protection");
        self.run_single_point(entity_type, span, esc.point(), &geometry, grants)
    }

    /// GWPZ over its declared operation range, on a grid of the zone.
    pub fn perform_iap_for_gwpz(
        &self,
        gwpz: &GwpzArea,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let entity_type = ProtectedEntityType::GwpzArea;
        let span = gwpz.operation_frequency_range.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "operation_frequency_range",
        })?;
        let region = gwpz.clutter.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "clutter",
        })?;
        let geometry = EntityGeometry::Area { region };

        debug!(id = %gwpz.id, "getting grid points for GWPZ protection area");
        let points = self
            .grid
            .grid_points(&gwpz.zone, self.rules.grid_resolution_arcsec)?;
        self.run_grid(entity_type, span, &points, &geometry, grants)
    }

    /// PPA over the primary assignment of its PAL, on a grid of the zone.
    ///
    /// Returns `Ok(None)` when no PAL record matches the PPA's first PAL id.
    pub fn perform_iap_for_ppa(
        &self,
        ppa: &PpaArea,
        grants: &GrantSet,
        pal_records: &[PalRecord],
    ) -> Result<Option<PostIapResult>> {
        let entity_type = ProtectedEntityType::PpaArea;
        let pal_id = ppa.pal_ids.first().ok_or(IapError::MissingField {
            entity: entity_type,
            field: "pal_ids",
        })?;
        let region = ppa.region_type.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "region_type",
        })?;

        let Some(record) = pal_records.iter().find(|r| &r.pal_id == pal_id) else {
            warn!(id = %ppa.id, %pal_id, "no PAL record for PPA, IAP not applied");
            return Ok(None);
        };
        let geometry = EntityGeometry::Area { region };

        debug!(id = %ppa.id, "getting grid points for PPA protection area");
        let points = self
            .grid
            .grid_points(&ppa.zone, self.rules.grid_resolution_arcsec)?;
        self.run_grid(
            entity_type,
            record.primary_assignment,
            &points,
            &geometry,
            grants,
        )
        .map(Some)
    }

    /// FSS co-channel protection from the station's low frequency to the top of CBRS.
    pub fn perform_iap_for_fss_cochannel(
        &self,
        fss: &FssStation,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let entity_type = ProtectedEntityType::FssCochannel;
        let range = fss.operation_frequency_range.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "operation_frequency_range",
        })?;
        if range.low_hz >= CBRS_HIGH_FREQ_HZ {
            debug!(id = %fss.id, "FSS passband above CBRS, no co-channel constraint");
            return Ok(PostIapResult::default());
        }
        let geometry = EntityGeometry::Fss(fss.pointing());
        let span = FrequencyRange::new(range.low_hz, CBRS_HIGH_FREQ_HZ);

        debug!(id = %fss.id, "running FSS co-channel protection");
        self.run_single_point(entity_type, span, fss.point(), &geometry, grants)
    }

    /// FSS blocking protection over 3550 MHz up to the station's low frequency.
    ///
    /// Returns `Ok(None)` for stations whose passband lies inside the TT&C
    /// band while their TT&C flag is false.
    pub fn perform_iap_for_fss_blocking(
        &self,
        fss: &FssStation,
        grants: &GrantSet,
    ) -> Result<Option<PostIapResult>> {
        let entity_type = ProtectedEntityType::FssBlocking;
        let range = fss.operation_frequency_range.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "operation_frequency_range",
        })?;
        let ttc_flag = fss.ttc_flag.ok_or(IapError::MissingField {
            entity: entity_type,
            field: "ttc_flag",
        })?;

        if range.low_hz >= FSS_TTC_LOW_FREQ_HZ && range.high_hz <= FSS_TTC_HIGH_FREQ_HZ && !ttc_flag
        {
            info!(
                id = %fss.id,
                "IAP for FSS not applied: passband inside 3700-4200 MHz and TT&C flag false"
            );
            return Ok(None);
        }

        if range.low_hz <= CBRS_LOW_FREQ_HZ {
            debug!(id = %fss.id, "FSS passband starts below CBRS, no blocking constraint");
            return Ok(Some(PostIapResult::default()));
        }
        let geometry = EntityGeometry::Fss(fss.pointing());
        let span = FrequencyRange::new(CBRS_LOW_FREQ_HZ, range.low_hz);

        debug!(id = %fss.id, "running FSS blocking protection");
        self.run_single_point(entity_type, span, fss.point(), &geometry, grants)
            .map(Some)
    }

    fn run_single_point(
        &self,
        entity_type: ProtectedEntityType,
        span: FrequencyRange,
        point: ProtectionPoint,
        geometry: &EntityGeometry,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let threshold = self.rules.threshold(entity_type);
        let plan = ChannelPlan::resolve(entity_type, span, threshold, &self.rules)?;
        let store = AggregationStore::new();

        let ctx = self.point_context(&plan, geometry, grants);
        iap_point_constraint(point, &ctx, &store)?;

        self.combine(entity_type, &store, threshold.mw, grants)
    }

    fn run_grid(
        &self,
        entity_type: ProtectedEntityType,
        span: FrequencyRange,
        points: &[ProtectionPoint],
        geometry: &EntityGeometry,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let threshold = self.rules.threshold(entity_type);
        let plan = ChannelPlan::resolve(entity_type, span, threshold, &self.rules)?;
        let store = AggregationStore::new();

        let ctx = self.point_context(&plan, geometry, grants);
        let workers = worker_count(points.len(), self.max_workers);
        debug!(
            points = points.len(),
            channels = plan.len(),
            workers,
            "dispatching grid points"
        );
        run_parallel(points, workers, |point| {
            iap_point_constraint(*point, &ctx, &store).map(|_| ())
        })?;

        self.combine(entity_type, &store, threshold.mw, grants)
    }

    fn point_context<'a>(
        &'a self,
        plan: &'a ChannelPlan,
        geometry: &'a EntityGeometry,
        grants: &'a GrantSet,
    ) -> PointContext<'a> {
        PointContext {
            plan,
            grants: &grants.grants,
            geometry,
            model: self.model.as_ref(),
            neighborhood: self.neighborhood.as_ref(),
            eirp_floor_dbm_per_mhz: self.rules.eirp_floor_dbm_per_mhz,
        }
    }

    fn combine(
        &self,
        entity_type: ProtectedEntityType,
        store: &AggregationStore,
        threshold_mw: f64,
        grants: &GrantSet,
    ) -> Result<PostIapResult> {
        let result = calculate_ap_iap_ref(store, threshold_mw, grants.peer_group_size)?;
        info!(
            kind = %entity_type,
            points = result.point_count(),
            peer_group_size = grants.peer_group_size,
            "IAP complete"
        );
        Ok(result)
    }
}
