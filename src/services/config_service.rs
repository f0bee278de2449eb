use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheStore, ResourceKind};
use crate::config::CacheConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{
    DropdownCategory, DropdownOption, EffectiveTags, EntityType, NewDropdownOption, NewTag,
    NewTagPolicy, PolicyEvaluation, ScopedOption, TagDefinition, TagPolicy,
};
use crate::database::store::{ConfigStore, TagInsert};
use crate::resolver;

/// Merged values held by the configuration cache
#[derive(Debug, Clone)]
pub enum CachedConfig {
    Dropdown(Vec<ScopedOption>),
    Tags(EffectiveTags),
    TagPolicy(Option<TagPolicy>),
}

pub type ConfigCache = CacheStore<CachedConfig>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
}

impl ConfigError {
    fn validation(message: &str, field_errors: HashMap<String, String>) -> Self {
        ConfigError::Validation {
            message: message.to_string(),
            field_errors,
        }
    }
}

/// Serves effective configuration from the cache, falling back to storage plus the resolver
pub struct ConfigService {
    store: Arc<dyn ConfigStore>,
    cache: Arc<ConfigCache>,
    ttl: CacheConfig,
}

impl ConfigService {
    pub fn new(store: Arc<dyn ConfigStore>, cache: Arc<ConfigCache>, ttl: CacheConfig) -> Self {
        Self { store, cache, ttl }
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    fn dropdown_key(organization_id: Uuid, category: DropdownCategory) -> CacheKey {
        CacheKey::new(organization_id, ResourceKind::Dropdown, category.as_str())
    }

    fn tags_key(organization_id: Uuid) -> CacheKey {
        CacheKey::new(organization_id, ResourceKind::EffectiveTags, "effective")
    }

    fn policy_key(organization_id: Uuid, entity_type: EntityType) -> CacheKey {
        CacheKey::new(organization_id, ResourceKind::TagPolicy, entity_type.as_str())
    }

    // ---- reads ----

    pub async fn effective_dropdown(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
    ) -> Result<Vec<ScopedOption>, ConfigError> {
        let key = Self::dropdown_key(organization_id, category).to_string();
        if let Some(cached) = self.cache.get(&key).await {
            if let CachedConfig::Dropdown(options) = cached.as_ref() {
                debug!("Cache hit: {}", key);
                return Ok(options.clone());
            }
        }
        debug!("Cache miss: {}", key);
        let generation = self.cache.generation(&key).await;

        let (system, organization) = futures::try_join!(
            self.store.system_dropdown(category),
            self.store.organization_dropdown(organization_id, category),
        )?;
        let merged = resolver::merge_dropdown(&system, &organization);

        self.cache
            .set_if_generation(
                key,
                generation,
                CachedConfig::Dropdown(merged.clone()),
                self.ttl.dropdown_ttl_secs,
            )
            .await;
        Ok(merged)
    }

    pub async fn effective_tags(&self, organization_id: Uuid) -> Result<EffectiveTags, ConfigError> {
        let key = Self::tags_key(organization_id).to_string();
        if let Some(cached) = self.cache.get(&key).await {
            if let CachedConfig::Tags(tags) = cached.as_ref() {
                debug!("Cache hit: {}", key);
                return Ok(tags.clone());
            }
        }
        debug!("Cache miss: {}", key);
        let generation = self.cache.generation(&key).await;

        let (system_sets, organization_tags) = futures::try_join!(
            self.store.system_tag_sets(),
            self.store.organization_tags(organization_id),
        )?;
        let effective = resolver::merge_tags(organization_id, &system_sets, &organization_tags);

        self.cache
            .set_if_generation(
                key,
                generation,
                CachedConfig::Tags(effective.clone()),
                self.ttl.tags_ttl_secs,
            )
            .await;
        Ok(effective)
    }

    pub async fn active_policy(
        &self,
        organization_id: Uuid,
        entity_type: EntityType,
    ) -> Result<Option<TagPolicy>, ConfigError> {
        let key = Self::policy_key(organization_id, entity_type).to_string();
        if let Some(cached) = self.cache.get(&key).await {
            if let CachedConfig::TagPolicy(policy) = cached.as_ref() {
                debug!("Cache hit: {}", key);
                return Ok(policy.clone());
            }
        }
        debug!("Cache miss: {}", key);
        let generation = self.cache.generation(&key).await;

        let policies = self
            .store
            .tag_policies(organization_id, Some(entity_type))
            .await?;
        let selected =
            resolver::select_active_policy(&policies, organization_id, entity_type).cloned();

        self.cache
            .set_if_generation(
                key,
                generation,
                CachedConfig::TagPolicy(selected.clone()),
                self.ttl.tag_policy_ttl_secs,
            )
            .await;
        Ok(selected)
    }

    pub async fn list_policies(
        &self,
        organization_id: Uuid,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<TagPolicy>, ConfigError> {
        Ok(self.store.tag_policies(organization_id, entity_type).await?)
    }

    pub async fn evaluate_tags(
        &self,
        organization_id: Uuid,
        entity_type: EntityType,
        tags: &[String],
    ) -> Result<PolicyEvaluation, ConfigError> {
        let policy = self.active_policy(organization_id, entity_type).await?;
        Ok(resolver::evaluate_policy(policy.as_ref(), entity_type, tags))
    }

    // ---- writes: each one invalidates the keys it affects ----

    pub async fn create_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        input: NewDropdownOption,
    ) -> Result<DropdownOption, ConfigError> {
        let field_errors = input.validate();
        if !field_errors.is_empty() {
            return Err(ConfigError::validation("Invalid dropdown option", field_errors));
        }
        let option = input.into_option();

        let (system, organization) = futures::try_join!(
            self.store.system_dropdown(category),
            self.store.organization_dropdown(organization_id, category),
        )?;
        if system.contains_value(&option.value) {
            return Err(ConfigError::Conflict(format!(
                "'{}' is already a system option in {}",
                option.value, category
            )));
        }
        if organization.contains_value(&option.value) {
            return Err(ConfigError::Conflict(format!(
                "'{}' already exists in {}",
                option.value, category
            )));
        }

        let created = self
            .store
            .insert_dropdown_option(organization_id, category, option)
            .await
            .map_err(conflict_as(format!("Option already exists in {}", category)))?;

        self.cache
            .invalidate(&Self::dropdown_key(organization_id, category).to_string())
            .await;
        info!(
            "Organization {} added dropdown option '{}' to {}",
            organization_id, created.value, category
        );
        Ok(created)
    }

    pub async fn delete_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        value: &str,
    ) -> Result<(), ConfigError> {
        let deleted = self
            .store
            .delete_dropdown_option(organization_id, category, value)
            .await?;
        if !deleted {
            return Err(ConfigError::NotFound(format!(
                "Option '{}' not found in {}",
                value, category
            )));
        }

        self.cache
            .invalidate(&Self::dropdown_key(organization_id, category).to_string())
            .await;
        info!(
            "Organization {} removed dropdown option '{}' from {}",
            organization_id, value, category
        );
        Ok(())
    }

    pub async fn create_tag(
        &self,
        organization_id: Uuid,
        input: NewTag,
    ) -> Result<TagDefinition, ConfigError> {
        let field_errors = input.validate();
        if !field_errors.is_empty() {
            return Err(ConfigError::validation("Invalid tag", field_errors));
        }

        let insert = TagInsert {
            name: input.normalized_name(),
            category: input.category,
            color: input.color_or_default(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };

        let existing = self.store.organization_tags(organization_id).await?;
        if existing
            .iter()
            .any(|t| t.category == insert.category && t.name == insert.name)
        {
            return Err(ConfigError::Conflict(format!(
                "Tag '{}' already exists in {}",
                insert.name, insert.category
            )));
        }

        let tag = self
            .store
            .insert_tag(organization_id, insert)
            .await
            .map_err(conflict_as("Tag already exists".to_string()))?;

        self.cache
            .invalidate(&Self::tags_key(organization_id).to_string())
            .await;
        info!("Organization {} created tag '{}'", organization_id, tag.name);
        Ok(tag)
    }

    pub async fn delete_tag(&self, organization_id: Uuid, tag_id: Uuid) -> Result<(), ConfigError> {
        if !self.store.delete_tag(organization_id, tag_id).await? {
            return Err(ConfigError::NotFound("Tag not found".to_string()));
        }

        self.cache
            .invalidate(&Self::tags_key(organization_id).to_string())
            .await;
        info!("Organization {} deleted tag {}", organization_id, tag_id);
        Ok(())
    }

    pub async fn create_tag_policy(
        &self,
        organization_id: Uuid,
        input: NewTagPolicy,
    ) -> Result<TagPolicy, ConfigError> {
        let field_errors = input.validate();
        if !field_errors.is_empty() {
            return Err(ConfigError::validation("Invalid tag policy", field_errors));
        }

        let normalized = NewTagPolicy {
            entity_type: input.entity_type,
            required_tags: NewTagPolicy::normalize(&input.required_tags),
            auto_apply_tags: NewTagPolicy::normalize(&input.auto_apply_tags),
            is_active: input.is_active,
        };
        let policy = self
            .store
            .insert_tag_policy(organization_id, normalized)
            .await?;

        self.cache
            .invalidate(&Self::policy_key(organization_id, policy.entity_type).to_string())
            .await;
        info!(
            "Organization {} created {} tag policy {}",
            organization_id, policy.entity_type, policy.id
        );
        Ok(policy)
    }

    /// Drops every cached entry of one organization
    pub async fn invalidate_organization(&self, organization_id: Uuid) -> usize {
        let removed = self
            .cache
            .invalidate_prefix(&CacheKey::organization_prefix(organization_id))
            .await;
        info!(
            "Invalidated {} cache entries for organization {}",
            removed, organization_id
        );
        removed
    }
}

/// Storage-level unique violations surface as conflicts with a readable message
fn conflict_as(message: String) -> impl FnOnce(DatabaseError) -> ConfigError {
    move |err| match err {
        DatabaseError::Conflict(_) => ConfigError::Conflict(message),
        other => ConfigError::Database(other),
    }
}
