use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of platform entity a tag policy can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Incident,
    Asset,
    Runbook,
    Exercise,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Incident,
        EntityType::Asset,
        EntityType::Runbook,
        EntityType::Exercise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Incident => "incident",
            EntityType::Asset => "asset",
            EntityType::Runbook => "runbook",
            EntityType::Exercise => "exercise",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("Unknown entity type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPolicy {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub entity_type: EntityType,
    pub required_tags: Vec<String>,
    pub auto_apply_tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTagPolicy {
    pub entity_type: EntityType,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub auto_apply_tags: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewTagPolicy {
    pub const MAX_TAGS: usize = 50;

    /// Trimmed, lowercased, de-duplicated tag names in first-seen order
    pub fn normalize(tags: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !out.contains(&tag) {
                out.push(tag);
            }
        }
        out
    }

    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        let required = Self::normalize(&self.required_tags);
        let auto_apply = Self::normalize(&self.auto_apply_tags);

        if required.is_empty() && auto_apply.is_empty() {
            errors.insert(
                "requiredTags".to_string(),
                "A policy needs at least one required or auto-applied tag".to_string(),
            );
        }
        if required.len() > Self::MAX_TAGS {
            errors.insert(
                "requiredTags".to_string(),
                format!("At most {} required tags are allowed", Self::MAX_TAGS),
            );
        }
        if auto_apply.len() > Self::MAX_TAGS {
            errors.insert(
                "autoApplyTags".to_string(),
                format!("At most {} auto-applied tags are allowed", Self::MAX_TAGS),
            );
        }

        errors
    }
}

/// Outcome of checking an entity's tags against the active policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvaluation {
    pub policy_id: Option<Uuid>,
    pub entity_type: EntityType,
    pub compliant: bool,
    pub missing_required: Vec<String>,
    pub auto_applied: Vec<String>,
    pub effective_tags: Vec<String>,
}
