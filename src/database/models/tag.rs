use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Compliance,
    Department,
    Environment,
    Location,
    Severity,
    Technology,
    ThreatType,
    Custom,
}

impl TagCategory {
    pub const ALL: [TagCategory; 8] = [
        TagCategory::Compliance,
        TagCategory::Department,
        TagCategory::Environment,
        TagCategory::Location,
        TagCategory::Severity,
        TagCategory::Technology,
        TagCategory::ThreatType,
        TagCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Compliance => "compliance",
            TagCategory::Department => "department",
            TagCategory::Environment => "environment",
            TagCategory::Location => "location",
            TagCategory::Severity => "severity",
            TagCategory::Technology => "technology",
            TagCategory::ThreatType => "threat_type",
            TagCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown tag category: {}", s))
    }
}

/// A tag row, either system-wide (`organization_id` is `None`) or owned by one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDefinition {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub name: String,
    pub category: TagCategory,
    pub color: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Tag shape inside a system default set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTemplate {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// System-wide default tag set presented to every organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSet {
    pub id: Uuid,
    pub name: String,
    pub category: TagCategory,
    pub description: Option<String>,
    pub is_required: bool,
    pub tags: Vec<TagTemplate>,
}

/// Merged tag view for one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveTags {
    pub system_defaults: Vec<TagSet>,
    pub organization_tags: Vec<TagDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub category: TagCategory,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewTag {
    pub const MAX_NAME_LEN: usize = 50;
    pub const DEFAULT_COLOR: &'static str = "#6B7280";

    /// Tag names are stored lowercase so uniqueness is case-insensitive
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn color_or_default(&self) -> String {
        self.color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(Self::DEFAULT_COLOR)
            .to_uppercase()
    }

    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        let name = self.normalized_name();
        if name.is_empty() {
            errors.insert("name".to_string(), "Tag name is required".to_string());
        } else if name.chars().count() > Self::MAX_NAME_LEN {
            errors.insert(
                "name".to_string(),
                format!("Tag name must be at most {} characters", Self::MAX_NAME_LEN),
            );
        } else if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            errors.insert(
                "name".to_string(),
                "Tag name may only contain letters, numbers, dots, hyphens, and underscores".to_string(),
            );
        }

        if !is_hex_color(&self.color_or_default()) {
            errors.insert(
                "color".to_string(),
                "Color must be a hex value like #1F2937".to_string(),
            );
        }

        errors
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}
