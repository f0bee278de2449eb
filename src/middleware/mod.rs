pub mod auth;
pub mod membership;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use membership::{organization_context_middleware, OrganizationContext};
pub use response::{ApiResponse, ApiResult};
