//! Identity store: loads IAM identities from a single `identities:` map in
//! YAML, mirroring `iam_identity_store.py`, and supports runtime upsert.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;

use crate::error::SecurityError;
use crate::policy::PolicyDocument;

#[derive(Debug, Clone, Deserialize)]
struct RawInlinePolicy {
    document: PolicyDocument,
}

#[derive(Debug, Clone, Deserialize)]
struct RawIdentity {
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    inline_policies: Vec<RawInlinePolicy>,
    #[serde(default)]
    policies: Vec<String>,
    #[serde(default)]
    boundary_policy: Option<PolicyDocument>,
}

#[derive(Debug, Deserialize)]
struct RawIdentitiesFile {
    #[serde(default)]
    identities: HashMap<String, RawIdentity>,
}

/// A single IAM identity (user or role).
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub kind: String,
    pub inline_policies: Vec<PolicyDocument>,
    pub managed_policy_arns: Vec<String>,
    pub boundary_policy: Option<PolicyDocument>,
}

/// Thread-safe store of IAM identities, loaded from YAML and mutable at
/// runtime via `register_identity` (spec §4.1).
#[derive(Default)]
pub struct IdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        IdentityStore::default()
    }

    pub fn load_yaml(path: &Path) -> Result<Self, SecurityError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SecurityError::LoadFailed(e.to_string()))?;
        let raw: RawIdentitiesFile =
            serde_yaml::from_str(&content).map_err(|e| SecurityError::LoadFailed(e.to_string()))?;

        let mut identities = HashMap::new();
        for (name, props) in raw.identities {
            identities.insert(
                name.clone(),
                Identity {
                    name,
                    kind: props.r#type.unwrap_or_else(|| "user".to_string()),
                    inline_policies: props.inline_policies.into_iter().map(|p| p.document).collect(),
                    managed_policy_arns: props.policies,
                    boundary_policy: props.boundary_policy,
                },
            );
        }
        Ok(IdentityStore {
            identities: RwLock::new(identities),
        })
    }

    pub fn get_identity(&self, name: &str) -> Option<Identity> {
        self.identities
            .read()
            .expect("identity store lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn get_policies(&self, name: &str) -> Vec<PolicyDocument> {
        self.get_identity(name)
            .map(|i| i.inline_policies)
            .unwrap_or_default()
    }

    pub fn get_boundary(&self, name: &str) -> Option<PolicyDocument> {
        self.get_identity(name).and_then(|i| i.boundary_policy)
    }

    pub fn register_identity(
        &self,
        name: &str,
        inline_policies: Vec<PolicyDocument>,
        boundary_policy: Option<PolicyDocument>,
    ) {
        self.identities.write().expect("identity store lock poisoned").insert(
            name.to_string(),
            Identity {
                name: name.to_string(),
                kind: "user".to_string(),
                inline_policies,
                managed_policy_arns: Vec::new(),
                boundary_policy,
            },
        );
    }
}
