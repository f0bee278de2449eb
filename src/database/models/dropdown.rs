use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of dropdown categories an organization can read and extend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropdownCategory {
    AssetTypes,
    CriticalityLevels,
    IncidentClassifications,
    SeverityLevels,
    Departments,
    Locations,
    VendorTypes,
    ComplianceFrameworks,
    Custom,
}

impl DropdownCategory {
    pub const ALL: [DropdownCategory; 9] = [
        DropdownCategory::AssetTypes,
        DropdownCategory::CriticalityLevels,
        DropdownCategory::IncidentClassifications,
        DropdownCategory::SeverityLevels,
        DropdownCategory::Departments,
        DropdownCategory::Locations,
        DropdownCategory::VendorTypes,
        DropdownCategory::ComplianceFrameworks,
        DropdownCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DropdownCategory::AssetTypes => "asset_types",
            DropdownCategory::CriticalityLevels => "criticality_levels",
            DropdownCategory::IncidentClassifications => "incident_classifications",
            DropdownCategory::SeverityLevels => "severity_levels",
            DropdownCategory::Departments => "departments",
            DropdownCategory::Locations => "locations",
            DropdownCategory::VendorTypes => "vendor_types",
            DropdownCategory::ComplianceFrameworks => "compliance_frameworks",
            DropdownCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for DropdownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a path segment or column does not name a known category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown dropdown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for DropdownCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DropdownCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Whether a configuration record applies system-wide or to one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    System,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DropdownOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            description: None,
        }
    }
}

/// Ordered options of one category within one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownDefinition {
    pub category: DropdownCategory,
    pub scope: Scope,
    pub options: Vec<DropdownOption>,
}

impl DropdownDefinition {
    pub fn contains_value(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// One entry of an effective dropdown list, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedOption {
    #[serde(flatten)]
    pub option: DropdownOption,
    pub scope: Scope,
}

/// Request body for adding an organization option
#[derive(Debug, Clone, Deserialize)]
pub struct NewDropdownOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewDropdownOption {
    pub const MAX_VALUE_LEN: usize = 64;
    pub const MAX_LABEL_LEN: usize = 128;

    /// Field-level validation; an empty map means the input is acceptable
    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        let value = self.value.trim();
        if value.is_empty() {
            errors.insert("value".to_string(), "Value is required".to_string());
        } else if value.chars().count() > Self::MAX_VALUE_LEN {
            errors.insert(
                "value".to_string(),
                format!("Value must be at most {} characters", Self::MAX_VALUE_LEN),
            );
        } else if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.insert(
                "value".to_string(),
                "Value may only contain letters, numbers, hyphens, and underscores".to_string(),
            );
        }

        let label = self.label.trim();
        if label.is_empty() {
            errors.insert("label".to_string(), "Label is required".to_string());
        } else if label.chars().count() > Self::MAX_LABEL_LEN {
            errors.insert(
                "label".to_string(),
                format!("Label must be at most {} characters", Self::MAX_LABEL_LEN),
            );
        }

        errors
    }

    pub fn into_option(self) -> DropdownOption {
        DropdownOption {
            value: self.value.trim().to_string(),
            label: self.label.trim().to_string(),
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        }
    }
}
