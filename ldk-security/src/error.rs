use ldk_core::error::FleetError;

#[derive(Debug)]
pub enum SecurityError {
    LoadFailed(String),
    MissingIdentity(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::LoadFailed(msg) => write!(f, "failed to load IAM config: {msg}"),
            SecurityError::MissingIdentity(name) => write!(f, "unknown identity: {name}"),
        }
    }
}

impl std::error::Error for SecurityError {}

impl From<SecurityError> for FleetError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::LoadFailed(msg) => FleetError::internal(msg),
            SecurityError::MissingIdentity(name) => {
                FleetError::access_denied(format!("no such identity: {name}"))
            }
        }
    }
}
