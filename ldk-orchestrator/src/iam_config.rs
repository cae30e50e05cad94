//! Runtime-tunable IAM enforcement settings consulted by middleware step 4
//! (spec §4.4) and exposed read/write on the management plane (spec §4.14
//! `GET|POST /_ldk/iam-auth`).

use std::collections::BTreeSet;

use ldk_security::evaluate::Mode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamAuthConfig {
    pub mode: Mode,
    pub default_identity: Option<String>,
    pub enabled_services: BTreeSet<String>,
}

impl Default for IamAuthConfig {
    fn default() -> Self {
        IamAuthConfig { mode: Mode::Disabled, default_identity: None, enabled_services: BTreeSet::new() }
    }
}

impl IamAuthConfig {
    pub fn is_enabled_for(&self, service: &str) -> bool {
        self.mode != Mode::Disabled && self.enabled_services.contains(service)
    }
}

/// Partial update applied via `POST /_ldk/iam-auth`: only fields present
/// override the current snapshot (same merge discipline as chaos patches).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IamAuthPatch {
    pub mode: Option<Mode>,
    pub default_identity: Option<Option<String>>,
    pub enable_service: Option<String>,
    pub disable_service: Option<String>,
}

impl IamAuthConfig {
    pub fn apply_patch(&self, patch: &IamAuthPatch) -> IamAuthConfig {
        let mut enabled_services = self.enabled_services.clone();
        if let Some(service) = &patch.enable_service {
            enabled_services.insert(service.clone());
        }
        if let Some(service) = &patch.disable_service {
            enabled_services.remove(service);
        }
        IamAuthConfig {
            mode: patch.mode.unwrap_or(self.mode),
            default_identity: patch.default_identity.clone().unwrap_or_else(|| self.default_identity.clone()),
            enabled_services,
        }
    }
}
