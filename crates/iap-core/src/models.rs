//! Core data models for the IAP engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IapError, Result};
use crate::spatial::PointKey;

/// Half-open frequency interval in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub low_hz: f64,
    pub high_hz: f64,
}

/// One protected channel. A 5 MHz segment, or the whole passband for
/// blocking protection.
pub type Channel = FrequencyRange;

impl FrequencyRange {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    pub fn validate(&self) -> Result<()> {
        if self.low_hz.is_finite() && self.high_hz.is_finite() && self.low_hz < self.high_hz {
            Ok(())
        } else {
            Err(IapError::InvalidFrequencyRange {
                low_hz: self.low_hz,
                high_hz: self.high_hz,
            })
        }
    }

    pub fn overlaps(&self, other: &FrequencyRange) -> bool {
        self.low_hz < other.high_hz && self.high_hz > other.low_hz
    }

    /// Width of the intersection with `other`, zero when disjoint.
    pub fn overlap_hz(&self, other: &FrequencyRange) -> f64 {
        (self.high_hz.min(other.high_hz) - self.low_hz.max(other.low_hz)).max(0.0)
    }

    pub fn center_hz(&self) -> f64 {
        (self.low_hz + self.high_hz) / 2.0
    }

    pub fn width_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }
}

/// CBSD device category. Category B devices have a larger ESC neighborhood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CbsdCategory {
    A,
    #[default]
    B,
}

/// An authorized transmitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_grant_height")]
    pub height_agl_m: f64,
    /// Maximum EIRP the grant is authorized for (dBm/MHz)
    pub max_eirp_dbm_per_mhz: f64,
    pub frequency: FrequencyRange,
    #[serde(default)]
    pub category: CbsdCategory,
    /// Managed directly by the authority running IAP (vs. learned from a peer)
    #[serde(default = "default_managed")]
    pub managed: bool,
}

fn default_grant_height() -> f64 {
    3.0
}

fn default_managed() -> bool {
    true
}

impl Grant {
    /// Create a locally-managed category B grant at the default height.
    pub fn new(
        id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        max_eirp_dbm_per_mhz: f64,
        frequency: FrequencyRange,
    ) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            height_agl_m: default_grant_height(),
            max_eirp_dbm_per_mhz,
            frequency,
            category: CbsdCategory::B,
            managed: true,
        }
    }

    pub fn with_category(mut self, category: CbsdCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }

    pub fn with_height(mut self, height_agl_m: f64) -> Self {
        self.height_agl_m = height_agl_m;
        self
    }
}

/// The flattened grant list of one IAP run plus the size of the peer group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantSet {
    pub grants: Vec<Grant>,
    /// Number of authorities sharing the budget, including the local one
    pub peer_group_size: usize,
}

impl GrantSet {
    pub fn new(grants: Vec<Grant>, peer_group_size: usize) -> Self {
        Self {
            grants,
            peer_group_size,
        }
    }

    /// Flatten the local activity dump and each peer's dump into one list.
    ///
    /// Local grants are tagged managed, peer grants unmanaged, and the peer
    /// group counts every peer dump plus the local authority.
    pub fn from_activity_dumps(local: Vec<Grant>, peers: Vec<Vec<Grant>>) -> Self {
        let peer_group_size = peers.len() + 1;
        let mut grants: Vec<Grant> = local.into_iter().map(|g| g.with_managed(true)).collect();
        for dump in peers {
            grants.extend(dump.into_iter().map(|g| g.with_managed(false)));
        }
        Self {
            grants,
            peer_group_size,
        }
    }

    pub fn managed_count(&self) -> usize {
        self.grants.iter().filter(|g| g.managed).count()
    }
}

/// A geographic coordinate at which interference must be bounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectionPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl ProtectionPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn key(&self) -> PointKey {
        PointKey::from_degrees(self.latitude, self.longitude)
    }
}

/// Protected entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectedEntityType {
    /// Environmental sensing capability sensor
    Esc,
    /// Priority access license protection area
    PpaArea,
    /// Grandfathered wireless protection zone
    GwpzArea,
    /// Fixed satellite service earth station, co-channel protection
    FssCochannel,
    /// Fixed satellite service earth station, blocking protection
    FssBlocking,
}

impl fmt::Display for ProtectedEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Esc => "ESC",
            Self::PpaArea => "PPA",
            Self::GwpzArea => "GWPZ",
            Self::FssCochannel => "FSS co-channel",
            Self::FssBlocking => "FSS blocking",
        };
        f.write_str(name)
    }
}

/// One evaluation instance of the allocator: a point, a channel and an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectionConstraint {
    pub latitude: f64,
    pub longitude: f64,
    pub low_frequency_hz: f64,
    pub high_frequency_hz: f64,
    pub entity_type: ProtectedEntityType,
}

impl ProtectionConstraint {
    pub fn new(point: ProtectionPoint, channel: Channel, entity_type: ProtectedEntityType) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            low_frequency_hz: channel.low_hz,
            high_frequency_hz: channel.high_hz,
            entity_type,
        }
    }

    pub fn channel(&self) -> Channel {
        FrequencyRange::new(self.low_frequency_hz, self.high_frequency_hz)
    }

    pub fn point(&self) -> ProtectionPoint {
        ProtectionPoint::new(self.latitude, self.longitude)
    }
}

/// Land cover / region classification of an area incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegionType {
    Urban,
    Suburban,
    Rural,
}

/// ESC receive antenna, forwarded to the interference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscAntenna {
    pub height_agl_m: f64,
    pub azimuth_deg: f64,
    pub gain_dbi: f64,
    /// Relative gain samples, angles measured clockwise from boresight
    pub pattern: Vec<AzimuthGain>,
}

/// FSS earth station pointing, forwarded to the interference model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FssPointing {
    pub latitude: f64,
    pub longitude: f64,
    pub height_agl_m: f64,
    pub max_gain_dbi: f64,
    pub pointing_azimuth_deg: f64,
    pub pointing_elevation_deg: f64,
}

/// Entity-specific geometry handed to the interference model.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityGeometry {
    Esc(EscAntenna),
    Fss(FssPointing),
    Area { region: RegionType },
}

/// One sample of an ESC azimuth radiation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzimuthGain {
    pub angle_deg: f64,
    pub gain_db: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscSensor {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub height_agl_m: f64,
    pub antenna_azimuth_deg: f64,
    pub antenna_gain_dbi: f64,
    #[serde(default)]
    pub azimuth_radiation_pattern: Vec<AzimuthGain>,
}

impl EscSensor {
    pub fn point(&self) -> ProtectionPoint {
        ProtectionPoint::new(self.latitude, self.longitude)
    }

    pub fn antenna(&self) -> Result<EscAntenna> {
        if self.azimuth_radiation_pattern.is_empty() {
            return Err(IapError::MissingField {
                entity: ProtectedEntityType::Esc,
                field: "azimuth_radiation_pattern",
            });
        }
        Ok(EscAntenna {
            height_agl_m: self.height_agl_m,
            azimuth_deg: self.antenna_azimuth_deg,
            gain_dbi: self.antenna_gain_dbi,
            pattern: self.azimuth_radiation_pattern.clone(),
        })
    }
}

/// Priority access license protection area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpaArea {
    pub id: String,
    /// Boundary as `[lat, lon]` vertices
    pub zone: Vec<[f64; 2]>,
    #[serde(default)]
    pub region_type: Option<RegionType>,
    #[serde(default)]
    pub pal_ids: Vec<String>,
}

/// Grandfathered wireless protection zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GwpzArea {
    pub id: String,
    /// Boundary as `[lat, lon]` vertices
    pub zone: Vec<[f64; 2]>,
    #[serde(default)]
    pub clutter: Option<RegionType>,
    #[serde(default)]
    pub operation_frequency_range: Option<FrequencyRange>,
}

/// FSS earth station record, shared by both FSS protection regimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FssStation {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub height_agl_m: f64,
    pub antenna_gain_dbi: f64,
    pub antenna_azimuth_deg: f64,
    pub antenna_elevation_deg: f64,
    #[serde(default)]
    pub operation_frequency_range: Option<FrequencyRange>,
    /// Telemetry, tracking and command flag
    #[serde(default)]
    pub ttc_flag: Option<bool>,
}

impl FssStation {
    pub fn point(&self) -> ProtectionPoint {
        ProtectionPoint::new(self.latitude, self.longitude)
    }

    pub fn pointing(&self) -> FssPointing {
        FssPointing {
            latitude: self.latitude,
            longitude: self.longitude,
            height_agl_m: self.height_agl_m,
            max_gain_dbi: self.antenna_gain_dbi,
            pointing_azimuth_deg: self.antenna_azimuth_deg,
            pointing_elevation_deg: self.antenna_elevation_deg,
        }
    }
}

/// A protected-entity descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtectedEntity {
    Esc(EscSensor),
    Ppa(PpaArea),
    Gwpz(GwpzArea),
    FssCochannel(FssStation),
    FssBlocking(FssStation),
}

impl ProtectedEntity {
    pub fn entity_type(&self) -> ProtectedEntityType {
        match self {
            Self::Esc(_) => ProtectedEntityType::Esc,
            Self::Ppa(_) => ProtectedEntityType::PpaArea,
            Self::Gwpz(_) => ProtectedEntityType::GwpzArea,
            Self::FssCochannel(_) => ProtectedEntityType::FssCochannel,
            Self::FssBlocking(_) => ProtectedEntityType::FssBlocking,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Esc(e) => &e.id,
            Self::Ppa(p) => &p.id,
            Self::Gwpz(g) => &g.id,
            Self::FssCochannel(f) | Self::FssBlocking(f) => &f.id,
        }
    }
}

/// PAL channel-assignment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PalRecord {
    pub pal_id: String,
    pub primary_assignment: FrequencyRange,
}
