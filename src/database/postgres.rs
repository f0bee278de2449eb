use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    DropdownCategory, DropdownDefinition, DropdownOption, EntityType, Membership, NewTagPolicy,
    Scope, TagDefinition, TagPolicy, TagSet, TagTemplate,
};
use crate::database::seed::SystemSeed;
use crate::database::store::{ConfigStore, TagInsert};

/// PostgreSQL-backed configuration storage
#[derive(Clone)]
pub struct PgConfigStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    user_id: Uuid,
    organization_id: Uuid,
    organization_name: String,
    role: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DatabaseError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            user_id: row.user_id,
            organization_id: row.organization_id,
            organization_name: row.organization_name,
            role: row.role.parse().map_err(DatabaseError::Decode)?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DropdownOptionRow {
    value: String,
    label: String,
    description: Option<String>,
}

impl From<DropdownOptionRow> for DropdownOption {
    fn from(row: DropdownOptionRow) -> Self {
        DropdownOption {
            value: row.value,
            label: row.label,
            description: row.description,
        }
    }
}

#[derive(Debug, FromRow)]
struct TagSetRow {
    id: Uuid,
    name: String,
    category: String,
    description: Option<String>,
    is_required: bool,
    tags: Json<Vec<TagTemplate>>,
}

impl TryFrom<TagSetRow> for TagSet {
    type Error = DatabaseError;

    fn try_from(row: TagSetRow) -> Result<Self, Self::Error> {
        Ok(TagSet {
            id: row.id,
            name: row.name,
            category: row.category.parse().map_err(DatabaseError::Decode)?,
            description: row.description,
            is_required: row.is_required,
            tags: row.tags.0,
        })
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: Uuid,
    organization_id: Option<Uuid>,
    name: String,
    category: String,
    color: String,
    description: Option<String>,
    is_system: bool,
    usage_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<TagRow> for TagDefinition {
    type Error = DatabaseError;

    fn try_from(row: TagRow) -> Result<Self, Self::Error> {
        Ok(TagDefinition {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            category: row.category.parse().map_err(DatabaseError::Decode)?,
            color: row.color,
            description: row.description,
            is_system: row.is_system,
            usage_count: row.usage_count,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TagPolicyRow {
    id: Uuid,
    organization_id: Uuid,
    entity_type: String,
    required_tags: Vec<String>,
    auto_apply_tags: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TagPolicyRow> for TagPolicy {
    type Error = DatabaseError;

    fn try_from(row: TagPolicyRow) -> Result<Self, Self::Error> {
        Ok(TagPolicy {
            id: row.id,
            organization_id: row.organization_id,
            entity_type: row.entity_type.parse().map_err(DatabaseError::Decode)?,
            required_tags: row.required_tags,
            auto_apply_tags: row.auto_apply_tags,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

const TAG_COLUMNS: &str =
    "id, organization_id, name, category, color, description, is_system, usage_count, created_at";
const TAG_POLICY_COLUMNS: &str =
    "id, organization_id, entity_type, required_tags, auto_apply_tags, is_active, created_at";

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_dropdown(
        &self,
        organization_id: Option<Uuid>,
        category: DropdownCategory,
    ) -> Result<Vec<DropdownOption>, DatabaseError> {
        // IS NOT DISTINCT FROM lets one query serve both scopes
        let rows = sqlx::query_as::<_, DropdownOptionRow>(
            "SELECT value, label, description
             FROM dropdown_options
             WHERE category = $1 AND organization_id IS NOT DISTINCT FROM $2
             ORDER BY sort_order, created_at, value",
        )
        .bind(category.as_str())
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DropdownOption::from).collect())
    }

    /// Makes system scope match the seed: upserts its rows and removes system
    /// rows the seed no longer lists. Safe to run repeatedly.
    pub async fn apply_seed(&self, seed: &SystemSeed) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut pruned = 0;

        for category in DropdownCategory::ALL {
            let values: Vec<String> = seed
                .options(category)
                .iter()
                .map(|o| o.value.clone())
                .collect();
            let result = sqlx::query(
                "DELETE FROM dropdown_options
                 WHERE organization_id IS NULL AND category = $1 AND NOT (value = ANY($2))",
            )
            .bind(category.as_str())
            .bind(&values)
            .execute(&mut *tx)
            .await?;
            pruned += result.rows_affected();
        }

        let names: Vec<String> = seed.tag_sets.iter().map(|s| s.name.clone()).collect();
        let result = sqlx::query("DELETE FROM tag_sets WHERE NOT (name = ANY($1))")
            .bind(&names)
            .execute(&mut *tx)
            .await?;
        pruned += result.rows_affected();

        for (category, options) in &seed.dropdowns {
            for (position, option) in options.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO dropdown_options
                         (id, organization_id, category, value, label, description, sort_order)
                     VALUES ($1, NULL, $2, $3, $4, $5, $6)
                     ON CONFLICT (category, value) WHERE organization_id IS NULL
                     DO UPDATE SET label = EXCLUDED.label,
                                   description = EXCLUDED.description,
                                   sort_order = EXCLUDED.sort_order",
                )
                .bind(Uuid::new_v4())
                .bind(category.as_str())
                .bind(&option.value)
                .bind(&option.label)
                .bind(&option.description)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        for (position, set) in seed.tag_sets.iter().enumerate() {
            sqlx::query(
                "INSERT INTO tag_sets (id, name, category, description, is_required, tags, sort_order)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (name)
                 DO UPDATE SET category = EXCLUDED.category,
                               description = EXCLUDED.description,
                               is_required = EXCLUDED.is_required,
                               tags = EXCLUDED.tags,
                               sort_order = EXCLUDED.sort_order",
            )
            .bind(Uuid::new_v4())
            .bind(&set.name)
            .bind(set.category.as_str())
            .bind(&set.description)
            .bind(set.is_required)
            .bind(Json(&set.tags))
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Seeded {} dropdown categories and {} tag sets, removed {} stale system rows",
            seed.dropdowns.len(),
            seed.tag_sets.len(),
            pruned
        );
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_membership(&self, user_id: Uuid) -> Result<Option<Membership>, DatabaseError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            "SELECT m.user_id, m.organization_id, o.name AS organization_name, m.role, m.joined_at
             FROM team_members m
             JOIN organizations o ON o.id = m.organization_id
             WHERE m.user_id = $1
             ORDER BY m.joined_at, m.organization_id
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Membership::try_from).transpose()
    }

    async fn system_dropdown(
        &self,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError> {
        Ok(DropdownDefinition {
            category,
            scope: Scope::System,
            options: self.load_dropdown(None, category).await?,
        })
    }

    async fn organization_dropdown(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
    ) -> Result<DropdownDefinition, DatabaseError> {
        Ok(DropdownDefinition {
            category,
            scope: Scope::Organization,
            options: self.load_dropdown(Some(organization_id), category).await?,
        })
    }

    async fn insert_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        option: DropdownOption,
    ) -> Result<DropdownOption, DatabaseError> {
        let row = sqlx::query_as::<_, DropdownOptionRow>(
            "INSERT INTO dropdown_options
                 (id, organization_id, category, value, label, description, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6,
                     (SELECT COALESCE(MAX(sort_order) + 1, 0)
                      FROM dropdown_options
                      WHERE organization_id = $2 AND category = $3))
             RETURNING value, label, description",
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(category.as_str())
        .bind(&option.value)
        .bind(&option.label)
        .bind(&option.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete_dropdown_option(
        &self,
        organization_id: Uuid,
        category: DropdownCategory,
        value: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM dropdown_options
             WHERE organization_id = $1 AND category = $2 AND value = $3",
        )
        .bind(organization_id)
        .bind(category.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn system_tag_sets(&self) -> Result<Vec<TagSet>, DatabaseError> {
        let rows = sqlx::query_as::<_, TagSetRow>(
            "SELECT id, name, category, description, is_required, tags
             FROM tag_sets
             ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TagSet::try_from).collect()
    }

    async fn organization_tags(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<TagDefinition>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM tags WHERE organization_id = $1 ORDER BY category, name",
            TAG_COLUMNS
        );
        let rows = sqlx::query_as::<_, TagRow>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TagDefinition::try_from).collect()
    }

    async fn insert_tag(
        &self,
        organization_id: Uuid,
        tag: TagInsert,
    ) -> Result<TagDefinition, DatabaseError> {
        let sql = format!(
            "INSERT INTO tags (id, organization_id, name, category, color, description, is_system, usage_count, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, false, 0, $7)
             RETURNING {}",
            TAG_COLUMNS
        );
        let row = sqlx::query_as::<_, TagRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(organization_id)
            .bind(&tag.name)
            .bind(tag.category.as_str())
            .bind(&tag.color)
            .bind(&tag.description)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn delete_tag(&self, organization_id: Uuid, tag_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM tags WHERE id = $1 AND organization_id = $2 AND is_system = false",
        )
        .bind(tag_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn tag_policies(
        &self,
        organization_id: Uuid,
        entity_type: Option<EntityType>,
    ) -> Result<Vec<TagPolicy>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM tag_policies
             WHERE organization_id = $1 AND ($2::TEXT IS NULL OR entity_type = $2)
             ORDER BY created_at DESC, id DESC",
            TAG_POLICY_COLUMNS
        );
        let rows = sqlx::query_as::<_, TagPolicyRow>(&sql)
            .bind(organization_id)
            .bind(entity_type.map(|e| e.as_str()))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TagPolicy::try_from).collect()
    }

    async fn insert_tag_policy(
        &self,
        organization_id: Uuid,
        policy: NewTagPolicy,
    ) -> Result<TagPolicy, DatabaseError> {
        let sql = format!(
            "INSERT INTO tag_policies (id, organization_id, entity_type, required_tags, auto_apply_tags, is_active, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TAG_POLICY_COLUMNS
        );
        let row = sqlx::query_as::<_, TagPolicyRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(organization_id)
            .bind(policy.entity_type.as_str())
            .bind(&policy.required_tags)
            .bind(&policy.auto_apply_tags)
            .bind(policy.is_active)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }
}
