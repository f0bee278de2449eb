mod common;

use axum::http::StatusCode;
use common::TestApp;
use incident_ops_api::database::models::MemberRole;
use serde_json::json;

#[tokio::test]
async fn test_no_active_policy_is_not_found() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Viewer).await;

    let (status, body) = app
        .get("/api/organization/tag-policies/active/incident", &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_most_recent_policy_wins() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Admin).await;

    let (status, _) = app
        .post(
            "/api/organization/tag-policies",
            &token,
            json!({ "entityType": "incident", "requiredTags": ["severity"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, second) = app
        .post(
            "/api/organization/tag-policies",
            &token,
            json!({ "entityType": "incident", "requiredTags": ["owner"], "autoApplyTags": ["triage"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .get("/api/organization/tag-policies/active/incident", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], second["data"]["id"]);
    assert_eq!(body["data"]["requiredTags"], json!(["owner"]));

    let (_, list) = app.get("/api/organization/tag-policies", &token).await;
    let list = list["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["data"]["id"]);
}

#[tokio::test]
async fn test_list_filters_by_entity_type() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Owner).await;

    for entity in ["incident", "asset", "asset"] {
        app.post(
            "/api/organization/tag-policies",
            &token,
            json!({ "entityType": entity, "requiredTags": ["owner"] }),
        )
        .await;
    }

    let (status, body) = app
        .get("/api/organization/tag-policies?entityType=asset", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|p| p["entityType"] == "asset"));

    let (status, _) = app
        .get("/api/organization/tag-policies?entityType=spaceship", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_policy_tags_are_normalized() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Owner).await;

    let (status, body) = app
        .post(
            "/api/organization/tag-policies",
            &token,
            json!({ "entityType": "runbook", "requiredTags": [" Owner ", "owner", "SEV"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["requiredTags"], json!(["owner", "sev"]));
    assert_eq!(body["data"]["isActive"], true);
}

#[tokio::test]
async fn test_empty_policy_is_rejected() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Owner).await;

    let (status, body) = app
        .post(
            "/api/organization/tag-policies",
            &token,
            json!({ "entityType": "exercise" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["requiredTags"].is_string());
}

#[tokio::test]
async fn test_evaluate_applies_and_reports_missing() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let admin = app.member(org, MemberRole::Admin).await;
    let viewer = app.member(org, MemberRole::Viewer).await;

    app.post(
        "/api/organization/tag-policies",
        &admin,
        json!({
            "entityType": "incident",
            "requiredTags": ["owner", "severity"],
            "autoApplyTags": ["triage", "owner"]
        }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/organization/tag-policies/evaluate",
            &viewer,
            json!({ "entityType": "incident", "tags": ["phishing"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["compliant"], false);
    assert_eq!(data["autoApplied"], json!(["triage", "owner"]));
    assert_eq!(data["effectiveTags"], json!(["phishing", "triage", "owner"]));
    assert_eq!(data["missingRequired"], json!(["severity"]));
}

#[tokio::test]
async fn test_evaluate_without_policy_is_compliant() {
    let app = TestApp::new();
    let org = app.organization("Acme").await;
    let token = app.member(org, MemberRole::Viewer).await;

    let (status, body) = app
        .post(
            "/api/organization/tag-policies/evaluate",
            &token,
            json!({ "entityType": "asset", "tags": ["server"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["compliant"], true);
    assert!(body["data"]["policyId"].is_null());
    assert_eq!(body["data"]["effectiveTags"], json!(["server"]));
}
