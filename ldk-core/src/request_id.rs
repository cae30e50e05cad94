//! Request ID propagation — every provider logs internal errors with the
//! request id (spec §7). Reads `X-Request-Id` from the incoming request, or
//! generates a UUID v4 when absent; copies it onto the response.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(|s| RequestId(s.to_string()))
            .unwrap_or_else(RequestId::generate)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let id = parts
                .extensions
                .get::<RequestId>()
                .cloned()
                .unwrap_or_else(RequestId::generate);
            Ok(id)
        }
    }
}

impl IntoResponse for RequestId {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Middleware function that injects and echoes the request id.
pub async fn request_id_middleware(
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let request_id = RequestId::from_headers(req.headers());
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&request_id.0) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), val);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_nonempty_id() {
        let id = RequestId::generate();
        assert!(!id.0.is_empty());
    }

    #[test]
    fn from_headers_preserves_provided_id() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
        let id = RequestId::from_headers(&headers);
        assert_eq!(id.0, "abc-123");
    }

    #[test]
    fn from_headers_generates_when_absent() {
        let headers = axum::http::HeaderMap::new();
        let id = RequestId::from_headers(&headers);
        assert!(!id.0.is_empty());
    }
}
