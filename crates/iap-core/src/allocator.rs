//! Point/channel allocator: the IAP fair-share convergence loop.
//!
//! For one protection point, every channel of the entity's plan is
//! allocated independently. Overlapping grants start at their maximum EIRP
//! and are walked down 1 dB per sweep until their interference fits under
//! the fair share of the remaining quota.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::channels::ChannelPlan;
use crate::error::{IapError, Result};
use crate::interference::InterferenceModel;
use crate::models::{EntityGeometry, Grant, ProtectionConstraint, ProtectionPoint};
use crate::neighborhood::{overlapping_grants, NeighborhoodFilter};
use crate::store::AggregationStore;
use crate::units::db_to_linear;

/// EIRP step applied to an unsatisfied grant per sweep (dB).
pub const EIRP_STEP_DB: f64 = 1.0;

/// Final state of one grant on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantAllocation {
    pub grant_id: String,
    pub managed: bool,
    pub max_eirp_dbm_per_mhz: f64,
    pub final_eirp_dbm_per_mhz: f64,
    /// Interference at the final EIRP (mW)
    pub interference_mw: f64,
    /// Fair share the grant was compared against when it was satisfied (mW)
    pub fair_share_mw: f64,
    /// Sweep (1-based) in which the grant was satisfied
    pub sweep: usize,
}

/// Outcome of the convergence loop for one point and channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAllocation {
    pub constraint: ProtectionConstraint,
    pub quota_mw: f64,
    /// Quota left once every grant is satisfied; not redistributed
    pub remaining_quota_mw: f64,
    /// Aggregate from locally managed grants (mW)
    pub local_total_mw: f64,
    /// Aggregate from all grants (mW)
    pub global_total_mw: f64,
    pub sweeps: usize,
    /// Per-grant results, in the order the grants were supplied
    pub grants: Vec<GrantAllocation>,
}

struct WorkingGrant<'g> {
    grant: &'g Grant,
    eirp_dbm_per_mhz: f64,
    last_mw: Option<f64>,
    satisfied: Option<(f64, f64, usize)>,
}

/// Run the fair-share loop for one constraint.
///
/// Within a sweep grants are probed in input order against the current fair
/// share; each satisfied grant immediately shrinks the quota and the fair
/// share seen by the grants probed after it. Grants that do not fit drop
/// 1 dB and wait for the next sweep.
pub fn allocate_channel(
    grants: &[&Grant],
    constraint: &ProtectionConstraint,
    quota_mw: f64,
    model: &dyn InterferenceModel,
    geometry: &EntityGeometry,
    eirp_floor_dbm_per_mhz: f64,
) -> Result<ChannelAllocation> {
    let mut working: Vec<WorkingGrant<'_>> = grants
        .iter()
        .map(|&grant| WorkingGrant {
            grant,
            eirp_dbm_per_mhz: grant.max_eirp_dbm_per_mhz,
            last_mw: None,
            satisfied: None,
        })
        .collect();

    let mut remaining_mw = quota_mw;
    let mut unsatisfied = working.len();
    let mut local_total_mw = 0.0;
    let mut global_total_mw = 0.0;
    let mut sweeps = 0;
    let mut fair_share_mw = if unsatisfied > 0 {
        remaining_mw / unsatisfied as f64
    } else {
        0.0
    };

    while unsatisfied > 0 {
        sweeps += 1;
        for w in working.iter_mut().filter(|w| w.satisfied.is_none()) {
            let interference_dbm =
                model.interference_dbm(w.grant, w.eirp_dbm_per_mhz, constraint, geometry);
            let interference_mw = db_to_linear(interference_dbm);
            if !interference_mw.is_finite() {
                return Err(IapError::NonFiniteInterference {
                    grant_id: w.grant.id.clone(),
                    value: interference_dbm,
                });
            }
            if let Some(previous_mw) = w.last_mw {
                if interference_mw >= previous_mw {
                    return Err(IapError::NonMonotonicInterference {
                        grant_id: w.grant.id.clone(),
                        eirp_dbm_per_mhz: w.eirp_dbm_per_mhz,
                        previous_mw,
                        current_mw: interference_mw,
                    });
                }
            }

            if interference_mw < fair_share_mw {
                w.satisfied = Some((interference_mw, fair_share_mw, sweeps));
                remaining_mw -= interference_mw;
                unsatisfied -= 1;
                if unsatisfied != 0 {
                    fair_share_mw = remaining_mw / unsatisfied as f64;
                }
                global_total_mw += interference_mw;
                if w.grant.managed {
                    local_total_mw += interference_mw;
                }
            } else {
                let next_eirp = w.eirp_dbm_per_mhz - EIRP_STEP_DB;
                if next_eirp < eirp_floor_dbm_per_mhz {
                    return Err(IapError::EirpFloorReached {
                        grant_id: w.grant.id.clone(),
                        floor_dbm_per_mhz: eirp_floor_dbm_per_mhz,
                        fair_share_mw,
                    });
                }
                w.eirp_dbm_per_mhz = next_eirp;
                w.last_mw = Some(interference_mw);
            }
        }
    }

    let grants = working
        .into_iter()
        .filter_map(|w| {
            let (interference_mw, fair_share_mw, sweep) = w.satisfied?;
            Some(GrantAllocation {
                grant_id: w.grant.id.clone(),
                managed: w.grant.managed,
                max_eirp_dbm_per_mhz: w.grant.max_eirp_dbm_per_mhz,
                final_eirp_dbm_per_mhz: w.eirp_dbm_per_mhz,
                interference_mw,
                fair_share_mw,
                sweep,
            })
        })
        .collect();

    Ok(ChannelAllocation {
        constraint: *constraint,
        quota_mw,
        remaining_quota_mw: remaining_mw,
        local_total_mw,
        global_total_mw,
        sweeps,
        grants,
    })
}

/// Immutable inputs shared by every point of one entity run.
#[derive(Clone, Copy)]
pub struct PointContext<'a> {
    pub plan: &'a ChannelPlan,
    pub grants: &'a [Grant],
    pub geometry: &'a EntityGeometry,
    pub model: &'a dyn InterferenceModel,
    pub neighborhood: &'a dyn NeighborhoodFilter,
    pub eirp_floor_dbm_per_mhz: f64,
}

/// Allocate every channel of the plan at one protection point.
///
/// Appends `(local, global)` per channel with at least one overlapping
/// grant. A point with no neighboring grants leaves the store untouched.
/// Returns the number of channels written.
pub fn iap_point_constraint(
    point: ProtectionPoint,
    ctx: &PointContext<'_>,
    store: &AggregationStore,
) -> Result<usize> {
    let grants_inside = ctx
        .neighborhood
        .grants_in_neighborhood(ctx.grants, point, ctx.plan.entity_type);
    if grants_inside.is_empty() {
        return Ok(0);
    }

    let key = point.key();
    let mut written = 0;
    for planned in &ctx.plan.channels {
        let constraint = ProtectionConstraint::new(point, planned.channel, ctx.plan.entity_type);
        let neighborhood_grants = overlapping_grants(&grants_inside, &constraint);
        if neighborhood_grants.is_empty() {
            continue;
        }

        let allocation = allocate_channel(
            &neighborhood_grants,
            &constraint,
            planned.quota_mw,
            ctx.model,
            ctx.geometry,
            ctx.eirp_floor_dbm_per_mhz,
        )?;
        trace!(
            %key,
            low_hz = planned.channel.low_hz,
            grants = neighborhood_grants.len(),
            sweeps = allocation.sweeps,
            global_mw = allocation.global_total_mw,
            "channel allocated"
        );
        store.append(key, allocation.local_total_mw, allocation.global_total_mw);
        written += 1;
    }
    Ok(written)
}
