// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: JWT + organization membership
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware → organization_context_middleware
//
// Every handler takes its organization from `OrganizationContext`. Nothing
// in a path, query string or body can select another organization.
// Mutations additionally require an owner or admin role.

pub mod cache;
pub mod dropdowns;
pub mod policies;
pub mod tags;
