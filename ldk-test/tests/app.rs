use std::sync::Arc;

use ldk_core::snapshot::Snapshot;
use ldk_chaos::registry::ChaosRegistry;
use ldk_orchestrator::iam_config::IamAuthConfig;
use ldk_orchestrator::management::{management_router, ManagementState};
use ldk_orchestrator::orchestrator::Orchestrator;
use ldk_test::TestApp;
use serde_json::{json, Value};

fn management_app() -> TestApp {
    let state = Arc::new(ManagementState {
        orchestrator: Arc::new(Orchestrator::new(4000)),
        chaos: Arc::new(ChaosRegistry::new()),
        iam: Arc::new(Snapshot::new(IamAuthConfig::default())),
        reset_hooks: Vec::new(),
    });
    TestApp::new(management_router(state))
}

#[tokio::test]
async fn status_on_an_empty_fleet_reports_no_services() {
    let resp = management_app().get("/_ldk/status").await.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["services"], json!({}));
}

#[tokio::test]
async fn chaos_patch_is_visible_on_the_next_get() {
    let app = management_app();
    app.post_json("/_ldk/chaos", &json!({ "service": "dynamodb", "enabled": true, "latency_max_ms": 50 })).await.assert_ok();

    let resp = app.get("/_ldk/chaos").await.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["dynamodb"]["enabled"], true);
    assert_eq!(body["dynamodb"]["latency_max_ms"], 50);
}

#[tokio::test]
async fn iam_auth_patch_enables_a_service() {
    let app = management_app();
    app.post_json("/_ldk/iam-auth", &json!({ "mode": "enforce", "enable_service": "s3" })).await.assert_ok();

    let resp = app.get("/_ldk/iam-auth").await.assert_ok();
    let body: Value = resp.json();
    assert_eq!(body["mode"], "enforce");
    assert_eq!(body["enabled_services"], json!(["s3"]));
}

#[tokio::test]
async fn unknown_management_route_is_not_found() {
    management_app().get("/_ldk/nonexistent").await.assert_not_found();
}
