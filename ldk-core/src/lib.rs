//! Runtime fabric shared by every fleet provider: lifecycle contract,
//! service discovery, error taxonomy, config, and the small set of
//! cross-cutting request concerns (request id, copy-on-read snapshots).

pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod provider;
pub mod registry;
pub mod request_id;
pub mod snapshot;

pub const MANAGEMENT_PATH_PREFIXES: &[&str] = &["/_ldk", "/_mock"];

/// Whether a request path should bypass the middleware pipeline entirely
/// (spec §4.4 step 1): management and mock-admin endpoints must stay
/// reachable even when chaos/mocks would otherwise intercept everything.
pub fn is_management_path(path: &str) -> bool {
    MANAGEMENT_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

pub mod prelude {
    pub use crate::config::FleetConfig;
    pub use crate::error::{FleetError, Kind, WireFamily};
    pub use crate::provider::{BoxFuture, Provider, DEFAULT_STOP_GRACE};
    pub use crate::registry::{ServiceEndpoint, ServiceRegistry};
    pub use crate::request_id::RequestId;
    pub use crate::snapshot::Snapshot;
}
