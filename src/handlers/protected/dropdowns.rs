use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{DropdownCategory, DropdownOption, NewDropdownOption, ScopedOption};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, OrganizationContext};

fn parse_category(raw: &str) -> Result<DropdownCategory, ApiError> {
    raw.parse::<DropdownCategory>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

/// GET /api/dropdowns/:category - System options followed by the organization's own
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Path(category): Path<String>,
) -> ApiResult<Vec<ScopedOption>> {
    let category = parse_category(&category)?;
    let options = state
        .service
        .effective_dropdown(ctx.organization_id, category)
        .await?;
    Ok(ApiResponse::success(options))
}

/// POST /api/dropdowns/:category - Add an organization option
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Path(category): Path<String>,
    payload: Result<Json<NewDropdownOption>, JsonRejection>,
) -> ApiResult<DropdownOption> {
    let category = parse_category(&category)?;
    ctx.require_manager()?;
    let Json(input) = payload?;

    let option = state
        .service
        .create_dropdown_option(ctx.organization_id, category, input)
        .await?;
    Ok(ApiResponse::created(option))
}

/// DELETE /api/dropdowns/:category/:value - Remove an organization option
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<OrganizationContext>,
    Path((category, value)): Path<(String, String)>,
) -> ApiResult<Value> {
    let category = parse_category(&category)?;
    ctx.require_manager()?;

    state
        .service
        .delete_dropdown_option(ctx.organization_id, category, &value)
        .await?;
    Ok(ApiResponse::success(json!({
        "category": category,
        "value": value,
        "deleted": true
    })))
}
