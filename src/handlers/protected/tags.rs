use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{EffectiveTags, NewTag, TagDefinition};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext};

/// GET /api/organization/tags/effective
pub async fn effective(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
) -> ApiResult<EffectiveTags> {
    let tags = state.service.effective_tags(ctx.organization_id).await?;
    Ok(ApiResponse::success(tags))
}

/// POST /api/organization/tags
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    payload: Result<Json<NewTag>, JsonRejection>,
) -> ApiResult<TagDefinition> {
    ctx.require_manager()?;
    let Json(input) = payload?;

    let tag = state.service.create_tag(ctx.organization_id, input).await?;
    Ok(ApiResponse::created(tag))
}

/// DELETE /api/organization/tags/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let tag_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::bad_request(format!("Invalid tag id: {}", id)))?;
    ctx.require_manager()?;

    state.service.delete_tag(ctx.organization_id, tag_id).await?;
    Ok(ApiResponse::success(json!({ "id": tag_id, "deleted": true })))
}
