use std::collections::BTreeMap;

use serde::Deserialize;

use crate::database::models::{DropdownCategory, DropdownOption, TagCategory, TagTemplate};

const BUNDLED_DEFAULTS: &str = include_str!("../../seeds/system_defaults.yaml");

/// System-scope defaults as shipped with the service
#[derive(Debug, Clone, Deserialize)]
pub struct SystemSeed {
    #[serde(default)]
    pub dropdowns: BTreeMap<DropdownCategory, Vec<DropdownOption>>,
    #[serde(default)]
    pub tag_sets: Vec<TagSetSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagSetSeed {
    pub name: String,
    pub category: TagCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub tags: Vec<TagTemplate>,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to parse seed file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Duplicate value '{value}' in {category}")]
    DuplicateValue {
        category: DropdownCategory,
        value: String,
    },
    #[error("Duplicate tag set '{0}'")]
    DuplicateTagSet(String),
}

impl SystemSeed {
    pub fn bundled() -> Result<Self, SeedError> {
        Self::from_yaml(BUNDLED_DEFAULTS)
    }

    pub fn from_yaml(source: &str) -> Result<Self, SeedError> {
        let seed: SystemSeed = serde_yaml::from_str(source)?;
        seed.check_unique()?;
        Ok(seed)
    }

    pub fn options(&self, category: DropdownCategory) -> &[DropdownOption] {
        self.dropdowns
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Storage enforces the same uniqueness; failing here gives a readable error
    fn check_unique(&self) -> Result<(), SeedError> {
        for (category, options) in &self.dropdowns {
            for (i, option) in options.iter().enumerate() {
                if options[..i].iter().any(|o| o.value == option.value) {
                    return Err(SeedError::DuplicateValue {
                        category: *category,
                        value: option.value.clone(),
                    });
                }
            }
        }
        for (i, set) in self.tag_sets.iter().enumerate() {
            if self.tag_sets[..i].iter().any(|s| s.name == set.name) {
                return Err(SeedError::DuplicateTagSet(set.name.clone()));
            }
        }
        Ok(())
    }
}
