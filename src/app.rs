use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::store::ConfigStore;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, organization_context_middleware};
use crate::services::{ConfigCache, ConfigService};

/// Shared handles every handler and middleware receives
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConfigService>,
    pub store: Arc<dyn ConfigStore>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn ConfigStore>, cache: Arc<ConfigCache>, jwt: JwtKeys, config: &AppConfig) -> Self {
        let service = ConfigService::new(store.clone(), cache, config.cache.clone());
        Self {
            service: Arc::new(service),
            store,
            jwt: Arc::new(jwt),
        }
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{cache, dropdowns, policies, tags};

    Router::new()
        .route(
            "/api/dropdowns/:category",
            get(dropdowns::list).post(dropdowns::create),
        )
        .route("/api/dropdowns/:category/:value", delete(dropdowns::delete))
        .route("/api/organization/tags", post(tags::create))
        .route("/api/organization/tags/effective", get(tags::effective))
        .route("/api/organization/tags/:id", delete(tags::delete))
        .route(
            "/api/organization/tag-policies",
            get(policies::list).post(policies::create),
        )
        .route(
            "/api/organization/tag-policies/active/:entity_type",
            get(policies::active),
        )
        .route(
            "/api/organization/tag-policies/evaluate",
            post(policies::evaluate),
        )
        .route("/api/organization/cache", delete(cache::clear))
        // Layers run bottom-up: authenticate first, then resolve the organization
        .route_layer(from_fn_with_state(state.clone(), organization_context_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
