//! Orchestrator (spec §4.7): the runtime that brings the fleet up in
//! dependency order, composes the mock → chaos → IAM middleware pipeline
//! (spec §4.4) every service mounts, and serves the management plane
//! (spec §4.14).

pub mod iam_config;
pub mod management;
pub mod middleware;
pub mod orchestrator;

pub mod prelude {
    pub use crate::iam_config::{IamAuthConfig, IamAuthPatch};
    pub use crate::management::{management_router, ManagementState, ResetHook};
    pub use crate::middleware::{pipeline, OperationExtractor, PipelineState};
    pub use crate::orchestrator::Orchestrator;
}
