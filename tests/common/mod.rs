#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use incident_ops_api::app::{app, AppState};
use incident_ops_api::auth::JwtKeys;
use incident_ops_api::cache::ManualClock;
use incident_ops_api::config::{AppConfig, CacheConfig};
use incident_ops_api::database::models::MemberRole;
use incident_ops_api::services::ConfigCache;
use incident_ops_api::testing::MemoryConfigStore;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Router wired to an in-memory store and a manual clock
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryConfigStore>,
    pub clock: Arc<ManualClock>,
    pub jwt: JwtKeys,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryConfigStore::seeded().expect("bundled seed parses"));
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(ConfigCache::with_clock(clock.clone()));
        let jwt = JwtKeys::from_secret(TEST_SECRET, 1).expect("secret is set");

        let mut config = AppConfig::development();
        config.cache = CacheConfig::default();
        config.api.enable_request_logging = false;

        let state = AppState::new(store.clone(), cache, jwt.clone(), &config);
        Self {
            router: app(state, &config),
            store,
            clock,
            jwt,
        }
    }

    pub async fn organization(&self, name: &str) -> Uuid {
        self.store.add_organization(name).await
    }

    /// Adds a fresh user to the organization and returns their bearer token
    pub async fn member(&self, organization_id: Uuid, role: MemberRole) -> String {
        let user = Uuid::new_v4();
        self.store.add_member(user, organization_id, role).await;
        self.token_for(user)
    }

    pub fn token_for(&self, user: Uuid) -> String {
        self.jwt.issue(user, None).expect("token issues")
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }
}

pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(
        |_| serde_json::json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }),
    )
}

/// Values of a dropdown response, in order
pub fn option_values(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|o| o["value"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ---- spawned binary ----

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_incident-ops"));
        cmd.arg("serve")
            .env("INCIDENT_OPS_PORT", port.to_string())
            .env("JWT_SECRET", TEST_SECRET)
            .env("DATABASE_CONNECTION_TIMEOUT", "2")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Inherit environment so a DATABASE_URL from the shell or .env is honoured
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Ready once it answers, with or without a database behind it
                if resp.status() == reqwest::StatusCode::OK
                    || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Starts a server process that is killed when the handle drops
pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}
