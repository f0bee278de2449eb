//! In-memory storage and fixtures for exercising the service without PostgreSQL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    DropdownCategory, DropdownDefinition, DropdownOption, EntityType, MemberRole, Membership,
    NewTagPolicy, Scope, TagCategory, TagDefinition, TagPolicy, TagSet,
};
use crate::database::seed::{SeedError, SystemSeed};
use crate::database::store::{ConfigStore, TagInsert};

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, String>,
    memberships: Vec<Membership>,
    system_dropdowns: HashMap<DropdownCategory, Vec<DropdownOption>>,
    organization_dropdowns: HashMap<(Uuid, DropdownCategory), Vec<DropdownOption>>,
    tag_sets: Vec<TagSet>,
    tags: Vec<TagDefinition>,
    policies: Vec<TagPolicy>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Tables {
    /// Strictly increasing creation timestamps, like a sequence-backed column
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }
}

/// `ConfigStore` backed by process memory
#[derive(Default)]
pub struct MemoryConfigStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    system_loads: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with the bundled system defaults
    pub fn seeded() -> Result<Self, SeedError> {
        Ok(Self::with_seed(&SystemSeed::bundled()?))
    }

    pub fn with_seed(seed: &SystemSeed) -> Self {
        let tables = Tables {
            system_dropdowns: seed
                .dropdowns
                .iter()
                .map(|(category, options)| (*category, options.clone()))
                .collect(),
            tag_sets: seed
                .tag_sets
                .iter()
                .map(|s| TagSet {
                    id: Uuid::new_v4(),
                    name: s.name.clone(),
                    category: s.category,
                    description: s.description.clone(),
                    is_required: s.is_required,
                    tags: s.tags.clone(),
                })
                .collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    pub async fn add_organization(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .write()
            .await
            .organizations
            .insert(id, name.to_string());
        id
    }

    pub async fn add_member(&self, user_id: Uuid, organization_id: Uuid, role: MemberRole) {
        let mut tables = self.tables.write().await;
        let organization_name = tables
            .organizations
            .get(&organization_id)
            .cloned()
            .unwrap_or_default();
        let joined_at = tables.next_created_at();
        tables.memberships.push(Membership {
            user_id,
            organization_id,
            organization_name,
            role,
            joined_at,
        });
    }

    pub async fn set_system_dropdown(&self, category: DropdownCategory, options: Vec<DropdownOption>) {
        self.tables
            .write()
            .await
            .system_dropdowns
            .insert(category, options);
    }

    /// Inserts a system-wide tag row, the kind an organization must never receive as its own
    pub async fn add_system_tag(&self, name: &str, category: TagCategory) {
        let mut tables = self.tables.write().await;
        let created_at = tables.next_created_at();
        tables.tags.push(TagDefinition {
            id: Uuid::new_v4(),
            organization_id: None,
            name: name.to_string(),
            category,
            color: "#111827".to_string(),
            description: None,
            is_system: true,
            usage_count: 0,
            created_at,
        });
    }

    /// Makes every call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// How many times system defaults were read, across both resource kinds
    pub fn system_loads(&self) -> usize {
        self.system_loads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DatabaseError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError(
                "connection refused (memory store marked unavailable)".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check_available()
    }

    async fn find_membership(&self, user_id: Uuid) -> Result<Option<Membership>, DatabaseError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .min_by(|a, b| {
                a.joined_at
                    .cmp(&b.joined_at)
                    .then_with(|| a.organization_id.cmp(&b.organization_id))
            })
            .cloned())
    }

    async fn system_dropdown(
        &self,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError> {
        self.check_available()?;
        self.system_loads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.read().await;
        Ok(DropdownDefinition {
            category,
            scope: Scope::System,
            options: tables
                .system_dropdowns
                .get(&category)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn organization_dropdown(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(DropdownDefinition {
            category,
            scope: Scope::Organization,
            options: tables
                .organization_dropdowns
                .get(&(organization_id, category))
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn insert_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        option: DropdownOption,
    ) -> Result<DropdownOption, DatabaseError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let options = tables
            .organization_dropdowns
            .entry((organization_id, category))
            .or_default();
        if options.iter().any(|o| o.value == option.value) {
            return Err(DatabaseError::Conflict(
                "unique constraint dropdown_options_org_uniq violated".to_string(),
            ));
        }
        options.push(option.clone());
        Ok(option)
    }

    async fn delete_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        value: &str,
    ) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let Some(options) = tables.organization_dropdowns.get_mut(&(organization_id, category))
        else {
            return Ok(false);
        };
        let before = options.len();
        options.retain(|o| o.value != value);
        Ok(options.len() < before)
    }

    async fn system_tag_sets(&self) -> Result<Vec<TagSet>, DatabaseError> {
        self.check_available()?;
        self.system_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.read().await.tag_sets.clone())
    }

    async fn organization_tags(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<TagDefinition>, DatabaseError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut tags: Vec<TagDefinition> = tables
            .tags
            .iter()
            .filter(|t| t.organization_id == Some(organization_id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| {
            a.category
                .as_str()
                .cmp(b.category.as_str())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(tags)
    }

    async fn insert_tag(
        &self,
        organization_id: Uuid,
        tag: TagInsert,
    ) -> Result<TagDefinition, DatabaseError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let duplicate = tables.tags.iter().any(|t| {
            t.organization_id == Some(organization_id)
                && t.category == tag.category
                && t.name == tag.name
        });
        if duplicate {
            return Err(DatabaseError::Conflict(
                "unique constraint tags_org_category_name_uniq violated".to_string(),
            ));
        }
        let created_at = tables.next_created_at();
        let row = TagDefinition {
            id: Uuid::new_v4(),
            organization_id: Some(organization_id),
            name: tag.name,
            category: tag.category,
            color: tag.color,
            description: tag.description,
            is_system: false,
            usage_count: 0,
            created_at,
        };
        tables.tags.push(row.clone());
        Ok(row)
    }

    async fn delete_tag(&self, organization_id: Uuid, tag_id: Uuid) -> Result<bool, DatabaseError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let before = tables.tags.len();
        tables.tags.retain(|t| {
            !(t.id == tag_id && t.organization_id == Some(organization_id) && !t.is_system)
        });
        Ok(tables.tags.len() < before)
    }

    async fn tag_policies(
        &self,
        organization_id: Uuid,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<TagPolicy>, DatabaseError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut policies: Vec<TagPolicy> = tables
            .policies
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .filter(|p| entity_type.map_or(true, |e| p.entity_type == e))
            .cloned()
            .collect();
        policies.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(policies)
    }

    async fn insert_tag_policy(
        &self,
        organization_id: Uuid,
        policy: NewTagPolicy,
    ) -> Result<TagPolicy, DatabaseError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let created_at = tables.next_created_at();
        let row = TagPolicy {
            id: Uuid::new_v4(),
            organization_id,
            entity_type: policy.entity_type,
            required_tags: policy.required_tags,
            auto_apply_tags: policy.auto_apply_tags,
            is_active: policy.is_active,
            created_at,
        };
        tables.policies.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn earliest_membership_wins() {
        let store = MemoryConfigStore::new();
        let first = store.add_organization("First").await;
        let second = store.add_organization("Second").await;
        let user = Uuid::new_v4();
        store.add_member(user, first, MemberRole::Viewer).await;
        store.add_member(user, second, MemberRole::Owner).await;

        let membership = store.find_membership(user).await.unwrap().unwrap();
        assert_eq!(membership.organization_id, first);
        assert_eq!(membership.organization_name, "First");
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryConfigStore::seeded().unwrap();
        store.set_unavailable(true);
        assert!(store.ping().await.is_err());
        assert!(store
            .system_dropdown(DropdownCategory::SeverityLevels)
            .await
            .is_err());
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn policies_come_back_newest_first() {
        let store = MemoryConfigStore::new();
        let org = Uuid::new_v4();
        for _ in 0..3 {
            let policy = NewTagPolicy {
                entity_type: EntityType::Incident,
                required_tags: vec!["owner".to_string()],
                auto_apply_tags: vec![],
                is_active: true,
            };
            store.insert_tag_policy(org, policy).await.unwrap();
        }
        let policies = store.tag_policies(org, None).await.unwrap();
        assert_eq!(policies.len(), 3);
        assert!(policies.windows(2).all(|w| w[0].created_at > w[1].created_at));
    }
}
