//! IAM-shaped policy documents and the `*`-wildcard matching rules spec
//! §4.1 requires for both actions and resource ARNs.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Statement {
    pub effect: Effect,
    pub actions: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "Allow" | "allow" => Ok(Effect::Allow),
            "Deny" | "deny" => Ok(Effect::Deny),
            other => Err(serde::de::Error::custom(format!("unknown effect: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Match an action against a statement's action list. Supports a trailing
/// `*` wildcard (e.g. `dynamodb:*`) and a bare `*` matching everything.
pub fn action_matches(pattern: &str, action: &str) -> bool {
    glob_match(pattern, action)
}

/// Match a resource id against a statement's resource list. Supports a
/// trailing `*` suffix wildcard on an ARN prefix.
pub fn resource_matches(pattern: &str, resource: &str) -> bool {
    glob_match(pattern, resource)
}

fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return value.starts_with(prefix);
    }
    pattern == value
}

impl PolicyDocument {
    /// Statements in this document whose action list matches `action` and
    /// (when resources are specified) whose resource list matches
    /// `resource`, if given. A statement with an empty resource list
    /// matches any resource.
    pub fn matching_statements<'a>(
        &'a self,
        action: &'a str,
        resource: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements.iter().filter(move |stmt| {
            let action_ok = stmt.actions.iter().any(|p| action_matches(p, action));
            if !action_ok {
                return false;
            }
            match resource {
                None => true,
                Some(res) => {
                    stmt.resources.is_empty()
                        || stmt.resources.iter().any(|p| resource_matches(p, res))
                }
            }
        })
    }

    /// Explicit-deny-wins evaluation over this single document: any
    /// matching Deny wins; else any matching Allow; else implicit deny.
    pub fn evaluate(&self, action: &str, resource: Option<&str>) -> Effect {
        let mut allowed = false;
        for stmt in self.matching_statements(action, resource) {
            match stmt.effect {
                Effect::Deny => return Effect::Deny,
                Effect::Allow => allowed = true,
            }
        }
        if allowed {
            Effect::Allow
        } else {
            Effect::Deny
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(effect: Effect, actions: &[&str], resources: &[&str]) -> PolicyDocument {
        PolicyDocument {
            statements: vec![Statement {
                effect,
                actions: actions.iter().map(|s| s.to_string()).collect(),
                resources: resources.iter().map(|s| s.to_string()).collect(),
            }],
        }
    }

    #[test]
    fn wildcard_action_matches() {
        assert!(action_matches("dynamodb:*", "dynamodb:PutItem"));
        assert!(action_matches("*", "anything"));
        assert!(!action_matches("dynamodb:Get*", "dynamodb:PutItem"));
    }

    #[test]
    fn resource_prefix_wildcard() {
        assert!(resource_matches(
            "arn:aws:s3:::bucket/*",
            "arn:aws:s3:::bucket/key.txt"
        ));
        assert!(!resource_matches(
            "arn:aws:s3:::bucket/*",
            "arn:aws:s3:::other/key.txt"
        ));
    }

    #[test]
    fn allow_statement_grants() {
        let d = doc(Effect::Allow, &["dynamodb:PutItem"], &[]);
        assert_eq!(d.evaluate("dynamodb:PutItem", None), Effect::Allow);
    }

    #[test]
    fn unmatched_action_is_implicit_deny() {
        let d = doc(Effect::Allow, &["dynamodb:PutItem"], &[]);
        assert_eq!(d.evaluate("dynamodb:DeleteItem", None), Effect::Deny);
    }

    #[test]
    fn explicit_deny_wins_over_allow_in_same_document() {
        let mut d = doc(Effect::Allow, &["dynamodb:*"], &[]);
        d.statements.push(Statement {
            effect: Effect::Deny,
            actions: vec!["dynamodb:DeleteItem".to_string()],
            resources: vec![],
        });
        assert_eq!(d.evaluate("dynamodb:PutItem", None), Effect::Allow);
        assert_eq!(d.evaluate("dynamodb:DeleteItem", None), Effect::Deny);
    }
}
