//! Middleware Pipeline (spec §4.4): mock override → chaos → IAM auth →
//! service handler. The management path gate (step 1) is not implemented
//! here — callers mount `/_ldk`/`/_mock` routes outside this layer
//! entirely, so they never pass through it, matching spec §4.4's
//! "bypasses all middleware" wording literally rather than re-checking it
//! on every request.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use bytes::Bytes;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use serde_json::Value;

use ldk_chaos::registry::ChaosRegistry;
use ldk_chaos::sample::{roll, ChaosOutcome};
use ldk_core::error::{FleetError, Kind, WireFamily};
use ldk_core::snapshot::Snapshot;
use ldk_mock::registry::MockRegistry;
use ldk_security::evaluate::{evaluate, Decision, Mode};
use ldk_security::identity::IdentityStore;
use ldk_security::permissions::PermissionsMap;

use crate::iam_config::IamAuthConfig;

/// Derives the operation name, and optionally a resource id, from an
/// inbound request. Wire-style extraction (`X-Amz-Target` header for
/// JSON-1.1 services, the SOAP-ish `Action` form field for queues, the
/// HTTP verb/path for S3) lives with each service's handler per spec §6;
/// this crate only needs the result.
pub type OperationExtractor = Arc<dyn Fn(&BTreeMap<String, String>, &Value) -> (String, Option<String>) + Send + Sync>;

pub struct PipelineState {
    pub service_name: String,
    pub wire_family: WireFamily,
    pub extract_operation: OperationExtractor,
    pub mocks: Arc<MockRegistry>,
    pub chaos: Arc<ChaosRegistry>,
    pub identities: Arc<IdentityStore>,
    pub permissions: Arc<PermissionsMap>,
    pub iam: Arc<Snapshot<IamAuthConfig>>,
}

/// The mock → chaos → IAM pipeline, installed via
/// `axum::middleware::from_fn_with_state`. Mounted only on service routes,
/// never on `/_ldk`/`/_mock` management routes.
pub async fn pipeline(State(state): State<Arc<PipelineState>>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => return FleetError::internal(err.to_string()).render(state.wire_family, ""),
    };

    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .map(|(name, value)| (name.as_str().to_lowercase(), value.to_str().unwrap_or_default().to_string()))
        .collect();
    let body_json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    let (operation, resource_id) = (state.extract_operation)(&headers, &body_json);

    // Step 2: mock override.
    if let Some(rule) = state.mocks.find_match(&state.service_name, &operation, &headers, &body_json) {
        if rule.delay().as_millis() > 0 {
            tokio::time::sleep(rule.delay()).await;
        }
        return render_mock(&rule.response);
    }

    // Step 3: chaos.
    let chaos_cfg = state.chaos.load(&state.service_name);
    let (outcome, latency) = roll(&chaos_cfg);
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
    match outcome {
        ChaosOutcome::ConnectionReset => {
            let mut resp = FleetError::new(Kind::TransportFailure, "ConnectionReset", "chaos-injected connection reset").render(state.wire_family, "");
            resp.headers_mut().insert(axum::http::header::CONNECTION, HeaderValue::from_static("close"));
            return resp;
        }
        ChaosOutcome::Timeout => {
            tokio::time::sleep(std::time::Duration::from_secs(29)).await;
            return FleetError::new(Kind::TransportFailure, "GatewayTimeout", "chaos-injected timeout").render(state.wire_family, "");
        }
        ChaosOutcome::Error(spec) => {
            let status = axum::http::StatusCode::from_u16(spec.status).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            return FleetError::new(Kind::ChaosInjected, spec.exception, spec.message).with_status(status).render(state.wire_family, "");
        }
        ChaosOutcome::None => {}
    }

    // Step 4: IAM auth.
    let iam = state.iam.load();
    if iam.is_enabled_for(&state.service_name) {
        let identity_name = headers.get("x-lws-identity").cloned().or_else(|| iam.default_identity.clone());
        let decision = match &identity_name {
            Some(name) => evaluate(&state.identities, &state.permissions, name, &state.service_name, &operation, resource_id.as_deref()),
            None => Decision::Deny,
        };
        if decision == Decision::Deny {
            match iam.mode {
                Mode::Enforce => {
                    return FleetError::access_denied(format!("identity '{}' is not authorized to perform {operation}", identity_name.unwrap_or_default()))
                        .render(state.wire_family, "");
                }
                Mode::Audit => {
                    tracing::warn!(service = %state.service_name, operation = %operation, identity = ?identity_name, "IAM audit: would deny");
                }
                Mode::Disabled => {}
            }
        }
    }

    // Step 5: hand off to the service handler, with the body intact.
    let req = Request::from_parts(parts, Body::from(body_bytes));
    next.run(req).await
}

fn render_mock(response: &ldk_mock::rule::MockResponse) -> Response {
    let mut builder = Response::builder().status(response.status);
    for (name, value) in &response.headers {
        builder = builder.header(name, value);
    }
    let body = match &response.body {
        Value::Null => Bytes::new(),
        Value::String(s) => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    };
    builder.body(Body::from(body)).unwrap_or_else(|_| FleetError::internal("malformed mock response").render(WireFamily::Json1_1, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn extractor() -> OperationExtractor {
        Arc::new(|headers, _body| (headers.get("x-op").cloned().unwrap_or_default(), None))
    }

    fn state() -> Arc<PipelineState> {
        Arc::new(PipelineState {
            service_name: "dynamodb".to_string(),
            wire_family: WireFamily::Json1_1,
            extract_operation: extractor(),
            mocks: Arc::new(MockRegistry::new()),
            chaos: Arc::new(ChaosRegistry::new()),
            identities: Arc::new(IdentityStore::new()),
            permissions: Arc::new(PermissionsMap::load(None).unwrap()),
            iam: Arc::new(Snapshot::new(IamAuthConfig::default())),
        })
    }

    fn app(state: Arc<PipelineState>) -> Router {
        Router::new().route("/", post(|| async { "handled" })).layer(axum::middleware::from_fn_with_state(state, pipeline))
    }

    #[tokio::test]
    async fn request_without_mock_or_chaos_reaches_handler() {
        let req = Request::post("/").header("x-op", "PutItem").body(Body::empty()).unwrap();
        let resp = app(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn matching_mock_rule_short_circuits_handler() {
        let st = state();
        st.mocks.set_rules(
            "dynamodb",
            vec![ldk_mock::rule::MockRule {
                operation: "PutItem".to_string(),
                header_matchers: BTreeMap::new(),
                body_matchers: BTreeMap::new(),
                response: ldk_mock::rule::MockResponse { status: 503, ..Default::default() },
            }],
        );
        let req = Request::post("/").header("x-op", "PutItem").body(Body::empty()).unwrap();
        let resp = app(st).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn certain_chaos_error_short_circuits_before_handler() {
        let st = state();
        st.chaos.patch(
            "dynamodb",
            ldk_chaos::config::ChaosPatch {
                enabled: Some(true),
                error_rate: Some(1.0),
                error_specs: Some(vec![ldk_chaos::config::ErrorSpec {
                    exception: "ProvisionedThroughputExceededException".to_string(),
                    message: "Rate exceeded".to_string(),
                    status: 400,
                    weight: 1.0,
                }]),
                ..Default::default()
            },
        );
        let req = Request::post("/").header("x-op", "PutItem").body(Body::empty()).unwrap();
        let resp = app(st).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn enforced_iam_denies_without_identity() {
        let st = state();
        st.iam.store(IamAuthConfig { mode: Mode::Enforce, default_identity: None, enabled_services: std::iter::once("dynamodb".to_string()).collect() });
        let req = Request::post("/").header("x-op", "PutItem").body(Body::empty()).unwrap();
        let resp = app(st).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn audit_mode_denies_but_still_reaches_handler() {
        let st = state();
        st.iam.store(IamAuthConfig { mode: Mode::Audit, default_identity: None, enabled_services: std::iter::once("dynamodb".to_string()).collect() });
        let req = Request::post("/").header("x-op", "PutItem").body(Body::empty()).unwrap();
        let resp = app(st).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }
}
