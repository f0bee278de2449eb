use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::MemberRole;
use crate::error::ApiError;

use super::auth::AuthUser;

/// Organization the request acts on, always derived from the caller's membership
#[derive(Clone, Debug)]
pub struct OrganizationContext {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub role: MemberRole,
}

impl OrganizationContext {
    pub fn require_manager(&self) -> Result<(), ApiError> {
        if self.role.can_manage_configuration() {
            Ok(())
        } else {
            tracing::warn!(
                "User {} ({}) attempted a configuration change in organization {}",
                self.user_id,
                self.role,
                self.organization_id
            );
            Err(ApiError::forbidden(
                "Only organization owners and admins can change configuration",
            ))
        }
    }
}

/// Resolves the authenticated user's organization. Runs after `jwt_auth_middleware`.
pub async fn organization_context_middleware(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let membership = state
        .store
        .find_membership(user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No organization membership for this user"))?;

    tracing::debug!(
        "User {} acting in organization {} as {}",
        user.user_id,
        membership.organization_id,
        membership.role
    );

    request.extensions_mut().insert(OrganizationContext {
        user_id: membership.user_id,
        organization_id: membership.organization_id,
        organization_name: membership.organization_name,
        role: membership.role,
    });

    Ok(next.run(request).await)
}
