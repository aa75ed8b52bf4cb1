//! Iterative Allocation Process (IAP) engine.
//!
//! Computes, per protection point and per channel, the max-min fair
//! interference budget of every grant near a protected incumbent, then
//! derives the share of the incumbent's threshold each coordinating
//! authority may keep using.

pub mod allocator;
pub mod channels;
pub mod combination;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod grid;
pub mod interference;
pub mod models;
pub mod neighborhood;
pub mod spatial;
pub mod store;
pub mod thresholds;
pub mod units;

pub use allocator::{allocate_channel, iap_point_constraint, ChannelAllocation, GrantAllocation};
pub use channels::{ChannelPlan, PlannedChannel};
pub use combination::{calculate_ap_iap_ref, PostIapResult};
pub use drivers::IapEngine;
pub use error::{IapError, Result};
pub use grid::{GridSampler, PolygonGridSampler};
pub use interference::{FreeSpaceModel, InterferenceModel};
pub use models::{
    CbsdCategory, Channel, EntityGeometry, EscSensor, FrequencyRange, FssStation, Grant, GrantSet,
    GwpzArea, PalRecord, PpaArea, ProtectedEntity, ProtectedEntityType, ProtectionConstraint,
    ProtectionPoint, RegionType,
};
pub use neighborhood::{DistanceNeighborhood, NeighborhoodFilter};
pub use spatial::{haversine_distance, PointKey};
pub use store::{AggregationStore, PointTotals};
pub use thresholds::{EntityThreshold, ProtectionRules};
