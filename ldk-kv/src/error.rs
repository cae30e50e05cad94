use ldk_core::error::FleetError;

/// Errors that can occur in the KV engine.
#[derive(Debug)]
pub enum KvError {
    TableExists(String),
    TableNotFound(String),
    ConditionalCheckFailed(String),
    ValidationError(String),
    TransactionCanceled(Vec<Option<String>>),
}

impl KvError {
    pub fn validation(message: impl Into<String>) -> Self {
        KvError::ValidationError(message.into())
    }
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KvError::TableExists(name) => write!(f, "table '{name}' already exists"),
            KvError::TableNotFound(name) => write!(f, "table '{name}' does not exist"),
            KvError::ConditionalCheckFailed(msg) => write!(f, "conditional check failed: {msg}"),
            KvError::ValidationError(msg) => write!(f, "validation error: {msg}"),
            KvError::TransactionCanceled(reasons) => {
                write!(f, "transaction canceled: {reasons:?}")
            }
        }
    }
}

impl std::error::Error for KvError {}

impl From<KvError> for FleetError {
    fn from(err: KvError) -> Self {
        match err {
            KvError::TableExists(name) => {
                FleetError::already_exists("ResourceInUseException", format!("table '{name}' already exists"))
            }
            KvError::TableNotFound(name) => {
                FleetError::not_found("ResourceNotFoundException", format!("table '{name}' does not exist"))
            }
            KvError::ConditionalCheckFailed(msg) => FleetError::conditional_failure(msg),
            KvError::ValidationError(msg) => FleetError::validation(msg),
            KvError::TransactionCanceled(_) => {
                FleetError::new(
                    ldk_core::error::Kind::ConditionalFailure,
                    "TransactionCanceledException",
                    err.to_string(),
                )
            }
        }
    }
}
