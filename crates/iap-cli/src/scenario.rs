//! Scenario files: activity dumps, protected entities and optional rules.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use iap_core::{
    Grant, GrantSet, IapEngine, PalRecord, PostIapResult, ProtectedEntity, ProtectedEntityType,
    ProtectionRules,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One IAP run's worth of input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Grants managed by the local authority
    #[serde(default)]
    pub local_grants: Vec<Grant>,
    /// One activity dump per peer authority
    #[serde(default)]
    pub peer_grants: Vec<Vec<Grant>>,
    pub entities: Vec<ProtectedEntity>,
    #[serde(default)]
    pub pal_records: Vec<PalRecord>,
    /// Overrides for the regulatory constants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<ProtectionRules>,
}

/// Post-IAP result of one entity. `result` is `None` when IAP does not apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub id: String,
    pub kind: ProtectedEntityType,
    pub result: Option<PostIapResult>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Flatten local and peer dumps; the peer group counts every peer plus us.
    pub fn grant_set(&self) -> GrantSet {
        GrantSet::from_activity_dumps(self.local_grants.clone(), self.peer_grants.clone())
    }

    /// Apply the scenario's rule overrides to `engine`.
    pub fn configure(&self, engine: IapEngine) -> Result<IapEngine> {
        match &self.rules {
            Some(rules) => engine
                .with_rules(rules.clone())
                .context("Invalid rule overrides in scenario"),
            None => Ok(engine),
        }
    }

    /// Run IAP for every entity in file order.
    pub fn run(&self, engine: &IapEngine) -> Result<Vec<EntityReport>> {
        let grants = self.grant_set();
        info!(
            grants = grants.grants.len(),
            managed = grants.managed_count(),
            peer_group_size = grants.peer_group_size,
            entities = self.entities.len(),
            "running scenario"
        );

        self.entities
            .iter()
            .map(|entity| {
                let result = engine
                    .perform_iap(entity, &grants, &self.pal_records)
                    .with_context(|| {
                        format!("IAP failed for {} {}", entity.entity_type(), entity.id())
                    })?;
                Ok(EntityReport {
                    id: entity.id().to_string(),
                    kind: entity.entity_type(),
                    result,
                })
            })
            .collect()
    }
}

pub fn write_reports(path: &Path, reports: &[EntityReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).context("Failed to serialize results")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
