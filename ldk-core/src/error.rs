//! Error taxonomy shared by every provider (spec §7).
//!
//! A [`FleetError`] carries a [`Kind`] plus a family-specific exception name
//! and message. Providers construct it and hand it to [`FleetError::render`]
//! at the edge, where it becomes bytes in the wire family the service speaks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Broad error categories from spec §7. Distinct from the exception name,
/// which varies per AWS service family (`ResourceNotFoundException` vs
/// `NoSuchBucket` are both `Kind::ResourceNotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Validation,
    ResourceExists,
    ResourceNotFound,
    ConditionalFailure,
    AccessDenied,
    ChaosInjected,
    TransportFailure,
    Internal,
}

impl Kind {
    fn default_status(self) -> StatusCode {
        match self {
            Kind::Validation => StatusCode::BAD_REQUEST,
            Kind::ResourceExists => StatusCode::BAD_REQUEST,
            Kind::ResourceNotFound => StatusCode::BAD_REQUEST,
            Kind::ConditionalFailure => StatusCode::BAD_REQUEST,
            Kind::AccessDenied => StatusCode::FORBIDDEN,
            Kind::ChaosInjected => StatusCode::INTERNAL_SERVER_ERROR,
            Kind::TransportFailure => StatusCode::SERVICE_UNAVAILABLE,
            Kind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The wire protocol family a service speaks, each with its own error
/// envelope shape (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFamily {
    Json1_1,
    FormEncoded,
    S3Xml,
    RestXml,
}

/// A family-native error: a [`Kind`] plus the exact exception name and
/// message a caller of that AWS-shaped API would see.
#[derive(Debug, Clone)]
pub struct FleetError {
    pub kind: Kind,
    pub exception: String,
    pub message: String,
    pub status: Option<StatusCode>,
}

impl FleetError {
    pub fn new(kind: Kind, exception: impl Into<String>, message: impl Into<String>) -> Self {
        FleetError {
            kind,
            exception: exception.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        FleetError::new(Kind::Validation, "ValidationException", message)
    }

    pub fn not_found(exception: impl Into<String>, message: impl Into<String>) -> Self {
        FleetError::new(Kind::ResourceNotFound, exception, message)
    }

    pub fn already_exists(exception: impl Into<String>, message: impl Into<String>) -> Self {
        FleetError::new(Kind::ResourceExists, exception, message)
    }

    pub fn conditional_failure(message: impl Into<String>) -> Self {
        FleetError::new(
            Kind::ConditionalFailure,
            "ConditionalCheckFailedException",
            message,
        )
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        FleetError::new(Kind::AccessDenied, "AccessDeniedException", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        FleetError::new(Kind::Internal, "InternalServerError", message)
    }

    /// Override the default status code this kind would otherwise render
    /// with (used for REST families whose status for a given kind differs
    /// from the JSON-1.1 default, e.g. `AccessDenied` is 403 for REST but
    /// 400 for JSON-1.1 per spec §8's testable property).
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.kind.default_status())
    }

    /// Render this error in the given wire family's envelope shape (spec §6).
    pub fn render(&self, family: WireFamily, request_id: &str) -> Response {
        let status = self.status();
        match family {
            WireFamily::Json1_1 | WireFamily::FormEncoded => {
                let body = serde_json::json!({
                    "__type": self.exception,
                    "message": self.message,
                });
                (status, axum::Json(body)).into_response()
            }
            WireFamily::RestXml => {
                let xml = format!(
                    "<ErrorResponse><Error><Type>Sender</Type><Code>{}</Code><Message>{}</Message></Error><RequestId>{}</RequestId></ErrorResponse>",
                    xml_escape(&self.exception),
                    xml_escape(&self.message),
                    xml_escape(request_id),
                );
                (status, [("content-type", "application/xml")], xml).into_response()
            }
            WireFamily::S3Xml => {
                let xml = format!(
                    "<Error><Code>{}</Code><Message>{}</Message><RequestId>{}</RequestId></Error>",
                    xml_escape(&self.exception),
                    xml_escape(&self.message),
                    xml_escape(request_id),
                );
                (status, [("content-type", "application/xml")], xml).into_response()
            }
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl std::fmt::Display for FleetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.exception, self.message)
    }
}

impl std::error::Error for FleetError {}

/// Default `IntoResponse` renders JSON-1.1 shape; providers whose wire
/// family differs call [`FleetError::render`] directly from their handler.
impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        self.render(WireFamily::Json1_1, "")
    }
}

impl From<std::io::Error> for FleetError {
    fn from(err: std::io::Error) -> Self {
        FleetError::internal(err.to_string())
    }
}
