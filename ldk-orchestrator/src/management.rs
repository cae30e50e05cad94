//! Management Plane (spec §4.14): runtime endpoints for status, resource
//! introspection, and chaos/IAM tuning. Lives on the fleet port; bypassed
//! entirely by the middleware pipeline (spec §4.4 step 1) — callers mount
//! this router outside `pipeline`'s layer, never through it.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use ldk_chaos::config::ChaosPatch;
use ldk_chaos::registry::ChaosRegistry;
use ldk_core::snapshot::Snapshot;

use crate::iam_config::{IamAuthConfig, IamAuthPatch};
use crate::orchestrator::Orchestrator;

/// A callback a provider registers so `POST /_ldk/reset` can drop its
/// in-memory data while `ldk-security`'s identities/permissions survive
/// (spec §4.14's carve-out).
pub type ResetHook = Arc<dyn Fn() + Send + Sync>;

pub struct ManagementState {
    pub orchestrator: Arc<Orchestrator>,
    pub chaos: Arc<ChaosRegistry>,
    pub iam: Arc<Snapshot<IamAuthConfig>>,
    pub reset_hooks: Vec<ResetHook>,
}

pub fn management_router(state: Arc<ManagementState>) -> Router {
    Router::new()
        .route("/_ldk/status", get(get_status))
        .route("/_ldk/resources", get(get_resources))
        .route("/_ldk/chaos", get(get_chaos).post(post_chaos))
        .route("/_ldk/iam-auth", get(get_iam_auth).post(post_iam_auth))
        .route("/_ldk/reset", post(post_reset))
        .with_state(state)
}

#[derive(Serialize)]
struct ServiceStatus {
    port: u16,
    healthy: bool,
}

#[derive(Serialize)]
struct StatusResponse {
    running: bool,
    services: std::collections::BTreeMap<String, ServiceStatus>,
}

async fn get_status(State(state): State<Arc<ManagementState>>) -> Json<StatusResponse> {
    let services = state
        .orchestrator
        .status()
        .await
        .into_iter()
        .map(|(name, port, healthy)| (name, ServiceStatus { port, healthy }))
        .collect::<std::collections::BTreeMap<_, _>>();
    let running = !services.is_empty() && services.values().all(|s| s.healthy);
    Json(StatusResponse { running, services })
}

/// Per-operation handler catalogues are out of scope (spec §1); this
/// returns the known service endpoints with an empty resource tree per
/// service, the extension point a concrete service integrates into.
async fn get_resources(State(state): State<Arc<ManagementState>>) -> Json<Value> {
    let tree: serde_json::Map<String, Value> = state
        .orchestrator
        .service_registry()
        .all_endpoints()
        .into_iter()
        .map(|ep| (ep.service_name, serde_json::json!({ "resources": [] })))
        .collect();
    Json(Value::Object(tree))
}

async fn get_chaos(State(state): State<Arc<ManagementState>>) -> Json<Value> {
    let all: serde_json::Map<String, Value> =
        state.chaos.all().into_iter().map(|(service, cfg)| (service, serde_json::to_value(&*cfg).unwrap_or(Value::Null))).collect();
    Json(Value::Object(all))
}

#[derive(serde::Deserialize)]
struct ChaosPatchRequest {
    service: String,
    #[serde(flatten)]
    patch: ChaosPatch,
}

async fn post_chaos(State(state): State<Arc<ManagementState>>, Json(req): Json<ChaosPatchRequest>) -> Json<Value> {
    state.chaos.patch(&req.service, req.patch);
    Json(serde_json::json!({ "ok": true }))
}

async fn get_iam_auth(State(state): State<Arc<ManagementState>>) -> Json<IamAuthConfig> {
    Json((*state.iam.load()).clone())
}

async fn post_iam_auth(State(state): State<Arc<ManagementState>>, Json(patch): Json<IamAuthPatch>) -> Json<IamAuthConfig> {
    state.iam.rcu(|current| current.apply_patch(&patch));
    Json((*state.iam.load()).clone())
}

async fn post_reset(State(state): State<Arc<ManagementState>>) -> Json<Value> {
    for hook in &state.reset_hooks {
        hook();
    }
    Json(serde_json::json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ldk_security::evaluate::Mode;
    use tower::ServiceExt;

    fn state() -> Arc<ManagementState> {
        Arc::new(ManagementState {
            orchestrator: Arc::new(Orchestrator::new(4000)),
            chaos: Arc::new(ChaosRegistry::new()),
            iam: Arc::new(Snapshot::new(IamAuthConfig::default())),
            reset_hooks: Vec::new(),
        })
    }

    #[tokio::test]
    async fn status_reports_empty_fleet_as_running_false() {
        let resp = management_router(state()).oneshot(Request::get("/_ldk/status").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let parsed: StatusResponseDe = serde_json::from_slice(&body).unwrap();
        assert!(!parsed.running);
    }

    #[derive(serde::Deserialize)]
    struct StatusResponseDe {
        running: bool,
    }

    #[tokio::test]
    async fn chaos_patch_then_get_round_trips() {
        let st = state();
        let router = management_router(st);
        let patch_body = serde_json::json!({ "service": "dynamodb", "enabled": true, "error_rate": 0.5 });
        let req = Request::post("/_ldk/chaos").header("content-type", "application/json").body(Body::from(patch_body.to_string())).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let req = Request::get("/_ldk/chaos").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["dynamodb"]["enabled"], true);
        assert_eq!(parsed["dynamodb"]["error_rate"], 0.5);
    }

    #[tokio::test]
    async fn iam_auth_patch_persists_across_requests() {
        let st = state();
        let router = management_router(st);
        let patch_body = serde_json::json!({ "mode": "enforce", "enable_service": "s3" });
        let req = Request::post("/_ldk/iam-auth").header("content-type", "application/json").body(Body::from(patch_body.to_string())).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let parsed: IamAuthConfig = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.mode, Mode::Enforce);
        assert!(parsed.enabled_services.contains("s3"));
    }

    #[tokio::test]
    async fn reset_invokes_every_registered_hook() {
        let called = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = called.clone();
        let state = Arc::new(ManagementState {
            orchestrator: Arc::new(Orchestrator::new(4000)),
            chaos: Arc::new(ChaosRegistry::new()),
            iam: Arc::new(Snapshot::new(IamAuthConfig::default())),
            reset_hooks: vec![Arc::new(move || {
                c.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })],
        });
        let resp = management_router(state).oneshot(Request::post("/_ldk/reset").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        assert_eq!(called.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
