use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext};

/// DELETE /api/organization/cache - Drop every cached entry of the caller's organization
pub async fn clear(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
) -> ApiResult<Value> {
    ctx.require_manager()?;
    let removed = state
        .service
        .invalidate_organization(ctx.organization_id)
        .await;
    Ok(ApiResponse::success(json!({ "invalidated": removed })))
}
