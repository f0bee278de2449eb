mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{start_server, TestApp};

#[tokio::test]
async fn test_health_endpoint_answers_with_or_without_database() -> Result<()> {
    let server = start_server().await?;
    let resp = reqwest::get(format!("{}/health", server.base_url)).await?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;

    assert!(
        status == reqwest::StatusCode::OK || status == reqwest::StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {}",
        status
    );
    assert_eq!(body["success"], status == reqwest::StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_root_describes_service() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["data"]["endpoints"]["dropdowns"].is_string());
}

#[tokio::test]
async fn test_health_reflects_store_availability() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    app.store.set_unavailable(true);
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/dropdowns/severity_levels", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send(Method::GET, "/api/dropdowns/severity_levels", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_another_secret_is_rejected() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let user = uuid::Uuid::new_v4();
    app.store
        .add_member(user, org, incident_ops_api::database::models::MemberRole::Owner)
        .await;

    let forged = incident_ops_api::auth::JwtKeys::from_secret("someone-else", 1)
        .unwrap()
        .issue(user, None)
        .unwrap();
    let (status, _) = app.get("/api/organization/tags/effective", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_without_membership_gets_not_found() {
    let app = TestApp::new();
    let token = app.token_for(uuid::Uuid::new_v4());
    let (status, body) = app.get("/api/dropdowns/severity_levels", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
