use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    DropdownCategory, DropdownDefinition, DropdownOption, EntityType, Membership, NewTagPolicy,
    TagCategory, TagDefinition, TagPolicy, TagSet,
};

/// Validated tag ready to be written
#[derive(Debug, Clone)]
pub struct TagInsert {
    pub name: String,
    pub category: TagCategory,
    pub color: String,
    pub description: Option<String>,
}

/// Storage seam for everything the configuration service reads and writes.
///
/// Every organization-scoped method takes the organization id explicitly;
/// implementations must never return rows of another organization.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Earliest joined membership of the user, if any
    async fn find_membership(&self, user_id: Uuid) -> Result<Option<Membership>, DatabaseError>;

    async fn system_dropdown(
        &self,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError>;

    async fn organization_dropdown(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError>;

    /// Appends an option after the organization's existing ones
    async fn insert_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        option: DropdownOption,
    ) -> Result<DropdownOption, DatabaseError>;

    /// Returns false when no such organization option existed
    async fn delete_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        value: &str,
    ) -> Result<bool, DatabaseError>;

    async fn system_tag_sets(&self) -> Result<Vec<TagSet>, DatabaseError>;

    async fn organization_tags(&self, organization_id: Uuid)
        -> Result<Vec<TagDefinition>, DatabaseError>;

    async fn insert_tag(
        &self,
        organization_id: Uuid,
        tag: TagInsert,
    ) -> Result<TagDefinition, DatabaseError>;

    async fn delete_tag(&self, organization_id: Uuid, tag_id: Uuid) -> Result<bool, DatabaseError>;

    /// Policies of one organization, newest first, optionally narrowed to one entity type
    async fn tag_policies(
        &self,
        organization_id: Uuid,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<TagPolicy>, DatabaseError>;

    async fn insert_tag_policy(
        &self,
        organization_id: Uuid,
        policy: NewTagPolicy,
    ) -> Result<TagPolicy, DatabaseError>;
}
