//! Channel-list resolution.
//!
//! Each entity type gets its channel list and per-channel interference quota
//! resolved once, before any point is allocated. The allocator never rewrites
//! a channel while it runs.

use serde::{Deserialize, Serialize};

use crate::error::{IapError, Result};
use crate::models::{Channel, FrequencyRange, ProtectedEntityType};
use crate::thresholds::{EntityThreshold, ProtectionRules};
use crate::units::{db_to_linear, CBRS_HIGH_FREQ_HZ, CBRS_LOW_FREQ_HZ};

/// A channel together with the interference quota available on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedChannel {
    pub channel: Channel,
    pub quota_mw: f64,
}

/// Channels evaluated for one protected entity, in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPlan {
    pub entity_type: ProtectedEntityType,
    /// Entire protected span of the entity
    pub span: FrequencyRange,
    pub channels: Vec<PlannedChannel>,
}

impl ChannelPlan {
    /// Resolve the channel list and quotas of an entity.
    ///
    /// Blocking protection has no channelization: its single channel is the
    /// whole span. Every other type is split into IAP-bandwidth channels on
    /// the CBRS raster.
    pub fn resolve(
        entity_type: ProtectedEntityType,
        span: FrequencyRange,
        threshold: EntityThreshold,
        rules: &ProtectionRules,
    ) -> Result<Self> {
        span.validate()?;
        let channels = match entity_type {
            ProtectedEntityType::FssBlocking => vec![span],
            _ => protected_channels(span, rules.iap_bandwidth_hz)?,
        };
        let channels = channels
            .into_iter()
            .map(|channel| PlannedChannel {
                channel,
                quota_mw: channel_quota_mw(entity_type, &channel, threshold, rules),
            })
            .collect();
        Ok(Self {
            entity_type,
            span,
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Split a range into the raster channels that partially or fully cover it.
///
/// Channels are aligned to the CBRS lower edge and clipped to the CBRS band.
pub fn protected_channels(range: FrequencyRange, bandwidth_hz: f64) -> Result<Vec<Channel>> {
    range.validate()?;
    if !(bandwidth_hz.is_finite() && bandwidth_hz > 0.0) {
        return Err(IapError::InvalidRule {
            rule: "iap",
            field: "iap_bandwidth_hz",
            value: bandwidth_hz,
        });
    }
    let high = range.high_hz.min(CBRS_HIGH_FREQ_HZ);
    let low = range.low_hz.max(CBRS_LOW_FREQ_HZ);

    let first_index = ((low - CBRS_LOW_FREQ_HZ) / bandwidth_hz).floor() as i64;
    let mut channels = Vec::new();
    let mut index = first_index;
    loop {
        let ch_low = CBRS_LOW_FREQ_HZ + index as f64 * bandwidth_hz;
        if ch_low >= high {
            break;
        }
        channels.push(FrequencyRange::new(ch_low, ch_low + bandwidth_hz));
        index += 1;
    }
    Ok(channels)
}

/// Interference quota of one channel.
pub fn channel_quota_mw(
    entity_type: ProtectedEntityType,
    channel: &Channel,
    threshold: EntityThreshold,
    rules: &ProtectionRules,
) -> f64 {
    match entity_type {
        ProtectedEntityType::Esc => {
            let rolloff_db = rules.esc_rolloff_db(channel.low_hz, channel.center_hz());
            if rolloff_db == 0.0 {
                threshold.mw
            } else {
                db_to_linear(threshold.dbm - rolloff_db)
            }
        }
        ProtectedEntityType::PpaArea
        | ProtectedEntityType::GwpzArea
        | ProtectedEntityType::FssCochannel
        | ProtectedEntityType::FssBlocking => threshold.mw,
    }
}
