use axum::response::Json;
use serde_json::{json, Value};

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Incident Ops Configuration API",
            "version": version,
            "description": "Effective dropdowns, tags and tag policies per organization",
            "endpoints": {
                "health": "/health (public)",
                "dropdowns": "/api/dropdowns/:category[/:value] (protected)",
                "tags": "/api/organization/tags[/effective|/:id] (protected)",
                "tag_policies": "/api/organization/tag-policies[/active/:entityType|/evaluate] (protected)",
                "cache": "/api/organization/cache (protected, owner/admin)"
            }
        }
    }))
}
