use uuid::Uuid;

use crate::database::models::{EffectiveTags, TagDefinition, TagSet};

/// Presents system default sets alongside the organization's own tags.
///
/// Only rows owned by `organization_id` and not flagged as system tags are
/// kept on the organization side, whatever the caller passed in.
pub fn merge_tags(
    organization_id: Uuid,
    system_sets: &[TagSet],
    organization_tags: &[TagDefinition],
) -> EffectiveTags {
    EffectiveTags {
        system_defaults: system_sets.to_vec(),
        organization_tags: organization_tags
            .iter()
            .filter(|tag| !tag.is_system && tag.organization_id == Some(organization_id))
            .cloned()
            .collect(),
    }
}
