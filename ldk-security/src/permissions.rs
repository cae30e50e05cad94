//! Maps (service, operation) pairs to required IAM actions. Loads a bundled
//! default map and optionally merges a user-supplied override on top,
//! mirroring `iam_permissions_map.py`'s merge-then-override behavior.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::SecurityError;

const BUNDLED_DEFAULTS: &str = include_str!("../assets/default_permissions.yaml");

#[derive(Debug, Deserialize)]
struct OperationSpec {
    #[serde(default)]
    actions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPermissionsFile {
    #[serde(default)]
    permissions: HashMap<String, HashMap<String, OperationSpec>>,
}

/// Map (service, operation) → required IAM actions. An operation absent
/// from the map resolves to `None`, which callers treat as allow-through
/// (spec §4.1: "unknown operation ⇒ allow-through, not an error").
#[derive(Default)]
pub struct PermissionsMap {
    map: HashMap<String, HashMap<String, Vec<String>>>,
}

impl PermissionsMap {
    /// Load the bundled defaults, then merge a user override file on top
    /// if one is supplied.
    pub fn load(override_path: Option<&Path>) -> Result<Self, SecurityError> {
        let mut map = PermissionsMap::default();
        map.merge_str(BUNDLED_DEFAULTS)?;
        if let Some(path) = override_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| SecurityError::LoadFailed(e.to_string()))?;
                map.merge_str(&content)?;
            }
        }
        Ok(map)
    }

    fn merge_str(&mut self, content: &str) -> Result<(), SecurityError> {
        let raw: RawPermissionsFile =
            serde_yaml::from_str(content).map_err(|e| SecurityError::LoadFailed(e.to_string()))?;
        for (service, ops) in raw.permissions {
            let entry = self.map.entry(service).or_default();
            for (op, spec) in ops {
                entry.insert(op, spec.actions);
            }
        }
        Ok(())
    }

    pub fn get_required_actions(&self, service: &str, operation: &str) -> Option<&[String]> {
        self.map
            .get(service)
            .and_then(|ops| ops.get(operation))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_cover_dynamodb_put_item() {
        let map = PermissionsMap::load(None).unwrap();
        let actions = map.get_required_actions("dynamodb", "PutItem").unwrap();
        assert_eq!(actions, &["dynamodb:PutItem".to_string()]);
    }

    #[test]
    fn unknown_operation_resolves_to_none() {
        let map = PermissionsMap::load(None).unwrap();
        assert!(map.get_required_actions("dynamodb", "NotARealOp").is_none());
    }

    #[test]
    fn override_file_adds_new_operations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("override.yaml");
        std::fs::write(
            &path,
            "permissions:\n  custom:\n    DoThing:\n      actions: [\"custom:DoThing\"]\n",
        )
        .unwrap();
        let map = PermissionsMap::load(Some(&path)).unwrap();
        assert!(map.get_required_actions("custom", "DoThing").is_some());
        // defaults are still present alongside the override
        assert!(map.get_required_actions("dynamodb", "PutItem").is_some());
    }
}
