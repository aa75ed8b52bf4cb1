//! Error types for the IAP engine.

use thiserror::Error;

use crate::models::ProtectedEntityType;
use crate::spatial::PointKey;

/// Result type for IAP operations.
pub type Result<T> = std::result::Result<T, IapError>;

/// Structural and precondition failures.
///
/// Empty neighborhoods, unmatched PAL lookups and TT&C exemptions are not
/// errors; drivers report those as "no result" instead.
#[derive(Debug, Error)]
pub enum IapError {
    /// A protected-entity descriptor lacks a field its type requires.
    #[error("{entity} descriptor is missing required field `{field}`")]
    MissingField {
        entity: ProtectedEntityType,
        field: &'static str,
    },

    /// A frequency range whose low edge is not below its high edge.
    #[error("invalid frequency range {low_hz} Hz .. {high_hz} Hz")]
    InvalidFrequencyRange { low_hz: f64, high_hz: f64 },

    /// A rule override that is non-finite, or not positive where a size is expected.
    #[error("invalid {rule} rule `{field}`: {value}")]
    InvalidRule {
        rule: &'static str,
        field: &'static str,
        value: f64,
    },

    /// A protection area polygon that cannot enclose anything.
    #[error("protection area polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),

    /// Combination was asked to split the budget among zero authorities.
    #[error("peer group size must be at least 1")]
    EmptyPeerGroup,

    /// Lowering a grant's EIRP by 1 dB did not lower its interference.
    #[error(
        "interference from grant {grant_id} did not decrease at {eirp_dbm_per_mhz} dBm/MHz \
         ({previous_mw} mW -> {current_mw} mW)"
    )]
    NonMonotonicInterference {
        grant_id: String,
        eirp_dbm_per_mhz: f64,
        previous_mw: f64,
        current_mw: f64,
    },

    /// The interference model produced NaN or an infinity.
    #[error("interference model returned {value} for grant {grant_id}")]
    NonFiniteInterference { grant_id: String, value: f64 },

    /// A grant was driven below the EIRP floor without fitting its fair share.
    #[error(
        "grant {grant_id} reached the EIRP floor of {floor_dbm_per_mhz} dBm/MHz \
         without fitting a fair share of {fair_share_mw} mW"
    )]
    EirpFloorReached {
        grant_id: String,
        floor_dbm_per_mhz: f64,
        fair_share_mw: f64,
    },

    /// Local and global totals disagree on a point's channel list.
    #[error("aggregation store misaligned at {key}")]
    MisalignedStore { key: PointKey },

    /// A grid worker thread panicked.
    #[error("IAP worker thread panicked")]
    WorkerPanicked,
}
