use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{EntityType, NewTagPolicy, PolicyEvaluation, TagPolicy};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyQuery {
    pub entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub entity_type: EntityType,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn parse_entity_type(raw: &str) -> Result<EntityType, ApiError> {
    raw.parse::<EntityType>().map_err(ApiError::bad_request)
}

/// GET /api/organization/tag-policies[?entityType=] - Newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Query(query): Query<PolicyQuery>,
) -> ApiResult<Vec<TagPolicy>> {
    let entity_type = query
        .entity_type
        .as_deref()
        .map(parse_entity_type)
        .transpose()?;

    let policies = state
        .service
        .list_policies(ctx.organization_id, entity_type)
        .await?;
    Ok(ApiResponse::success(policies))
}

/// POST /api/organization/tag-policies
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    payload: Result<Json<NewTagPolicy>, JsonRejection>,
) -> ApiResult<TagPolicy> {
    ctx.require_manager()?;
    let Json(input) = payload?;

    let policy = state
        .service
        .create_tag_policy(ctx.organization_id, input)
        .await?;
    Ok(ApiResponse::created(policy))
}

/// GET /api/organization/tag-policies/active/:entityType
pub async fn active(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Path(entity_type): Path<String>,
) -> ApiResult<TagPolicy> {
    let entity_type = parse_entity_type(&entity_type)?;

    state
        .service
        .active_policy(ctx.organization_id, entity_type)
        .await?
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found(format!("No active {} tag policy", entity_type)))
}

/// POST /api/organization/tag-policies/evaluate - Check tags against the active policy
pub async fn evaluate(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<PolicyEvaluation> {
    let Json(request) = payload?;

    let evaluation = state
        .service
        .evaluate_tags(ctx.organization_id, request.entity_type, &request.tags)
        .await?;
    Ok(ApiResponse::success(evaluation))
}
