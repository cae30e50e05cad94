//! In-process HTTP test client wrapping an `axum::Router`. Dispatches with
//! `tower::ServiceExt::oneshot`, so a provider's `Router` (per spec §6's
//! HTTP App Mounting Contract) can be exercised without binding a socket.

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::util::ServiceExt;

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(router: Router) -> Self {
        TestApp { router }
    }

    /// Send an arbitrary request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("failed to send request");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.expect("failed to read response body").to_bytes();
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_with_identity(path, None).await
    }

    /// Send a GET with the fleet's identity header (spec §4.1's
    /// `X-Lws-Identity`), or none when `identity` is `None`.
    pub async fn get_with_identity(&self, path: &str, identity: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(id) = identity {
            builder = builder.header("x-lws-identity", id);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, body: &impl serde::Serialize) -> TestResponse {
        self.post_json_with_identity(path, body, None).await
    }

    pub async fn post_json_with_identity(&self, path: &str, body: &impl serde::Serialize, identity: Option<&str>) -> TestResponse {
        let json = serde_json::to_vec(body).unwrap();
        let mut builder = Request::builder().method(Method::POST).uri(path).header(CONTENT_TYPE, "application/json");
        if let Some(id) = identity {
            builder = builder.header("x-lws-identity", id);
        }
        self.send(builder.body(Body::from(json)).unwrap()).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let req = Request::builder().method(Method::DELETE).uri(path).body(Body::empty()).unwrap();
        self.send(req).await
    }
}

/// Response wrapper with assertion helpers.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn assert_ok(self) -> Self {
        assert_eq!(self.status, StatusCode::OK, "expected 200 OK, got {}: {}", self.status, self.text());
        self
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(self.status, expected, "expected {expected}, got {}: {}", self.status, self.text());
        self
    }

    pub fn assert_forbidden(self) -> Self {
        self.assert_status(StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(self) -> Self {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| panic!("failed to parse JSON: {e}\nbody: {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
