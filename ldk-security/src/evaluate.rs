//! The C1 `evaluate` algorithm (spec §4.1): resolve required actions,
//! gather candidate statements, apply explicit-deny-wins, then intersect
//! with a boundary policy if one is attached.

use crate::identity::IdentityStore;
use crate::permissions::PermissionsMap;
use crate::policy::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Enforcement mode for the IAM auth middleware step (spec §4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Enforce,
    Audit,
    Disabled,
}

/// Evaluate whether `identity_name` may perform `operation` against
/// `service` (and optional `resource_id`).
///
/// An operation with no entry in the permissions map allows through
/// unconditionally (unknown operation ⇒ forward-compatible allow). A
/// missing identity is NOT allow-through: it denies, since the caller is
/// asserting an identity that doesn't exist.
pub fn evaluate(
    identities: &IdentityStore,
    permissions: &PermissionsMap,
    identity_name: &str,
    service: &str,
    operation: &str,
    resource_id: Option<&str>,
) -> Decision {
    let required_actions = match permissions.get_required_actions(service, operation) {
        Some(actions) => actions,
        None => return Decision::Allow,
    };

    let identity = match identities.get_identity(identity_name) {
        Some(id) => id,
        None => return Decision::Deny,
    };

    let identity_decision = required_actions
        .iter()
        .map(|action| {
            identity
                .inline_policies
                .iter()
                .map(|doc| doc.evaluate(action, resource_id))
                .fold(Effect::Deny, |acc, eff| {
                    if acc == Effect::Deny {
                        eff
                    } else {
                        acc
                    }
                })
        })
        .fold(Decision::Allow, |acc, eff| match (acc, eff) {
            (Decision::Deny, _) | (_, Effect::Deny) => Decision::Deny,
            _ => Decision::Allow,
        });

    if identity_decision == Decision::Deny {
        return Decision::Deny;
    }

    // Boundary policy further constrains: effective permission is the
    // intersection of identity-policy allow and boundary allow; boundary
    // denies win.
    if let Some(boundary) = identity.boundary_policy {
        let boundary_decision = required_actions
            .iter()
            .map(|action| boundary.evaluate(action, resource_id))
            .fold(Decision::Allow, |acc, eff| match (acc, eff) {
                (Decision::Deny, _) | (_, Effect::Deny) => Decision::Deny,
                _ => Decision::Allow,
            });
        if boundary_decision == Decision::Deny {
            return Decision::Deny;
        }
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyDocument, Statement};

    fn allow_doc(action: &str) -> PolicyDocument {
        PolicyDocument {
            statements: vec![Statement {
                effect: Effect::Allow,
                actions: vec![action.to_string()],
                resources: vec![],
            }],
        }
    }

    #[test]
    fn unknown_operation_allows_through() {
        let identities = IdentityStore::new();
        let permissions = PermissionsMap::default();
        let decision = evaluate(&identities, &permissions, "nobody", "foo", "Bar", None);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn missing_identity_denies() {
        let identities = IdentityStore::new();
        let permissions = PermissionsMap::load(None).unwrap();
        let decision = evaluate(&identities, &permissions, "ghost", "dynamodb", "PutItem", None);
        assert_eq!(decision, Decision::Deny);
    }

    #[test]
    fn identity_with_matching_allow_grants() {
        let identities = IdentityStore::new();
        identities.register_identity("alice", vec![allow_doc("dynamodb:PutItem")], None);
        let permissions = PermissionsMap::load(None).unwrap();
        let decision = evaluate(&identities, &permissions, "alice", "dynamodb", "PutItem", None);
        assert_eq!(decision, Decision::Allow);
    }

    #[test]
    fn boundary_policy_without_matching_allow_denies() {
        let identities = IdentityStore::new();
        let boundary = allow_doc("dynamodb:GetItem");
        identities.register_identity(
            "alice",
            vec![allow_doc("dynamodb:PutItem")],
            Some(boundary),
        );
        let permissions = PermissionsMap::load(None).unwrap();
        let decision = evaluate(&identities, &permissions, "alice", "dynamodb", "PutItem", None);
        assert_eq!(decision, Decision::Deny);
    }
}
