//! Filter policy evaluation (spec §4.10): a policy is a map from
//! attribute-name to a list of matchers; a message matches iff every
//! attribute in the policy is present on the message and satisfies at
//! least one of its matchers.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterMatcher {
    Literal(String),
    Numeric { numeric: Vec<Value> },
    Prefix { prefix: String },
    AnythingBut { #[serde(rename = "anything-but")] anything_but: Vec<String> },
    Exists { exists: bool },
}

impl FilterMatcher {
    fn matches(&self, actual: Option<&str>) -> bool {
        match self {
            FilterMatcher::Literal(expected) => actual == Some(expected.as_str()),
            FilterMatcher::Numeric { numeric } => {
                let Some(actual) = actual.and_then(|s| s.parse::<f64>().ok()) else {
                    return false;
                };
                numeric_ops_match(numeric, actual)
            }
            FilterMatcher::Prefix { prefix } => {
                actual.map(|a| a.starts_with(prefix.as_str())).unwrap_or(false)
            }
            FilterMatcher::AnythingBut { anything_but } => match actual {
                Some(a) => !anything_but.iter().any(|v| v == a),
                None => false,
            },
            FilterMatcher::Exists { exists } => actual.is_some() == *exists,
        }
    }
}

/// `numeric` matchers come as a flat `[op, n, op, n, ...]` sequence, e.g.
/// `["=", 100]` or `[">", 0, "<=", 100]` (every clause must hold).
fn numeric_ops_match(ops: &[Value], actual: f64) -> bool {
    ops.chunks(2).all(|pair| {
        let (Some(op), Some(n)) = (pair.first().and_then(Value::as_str), pair.get(1).and_then(Value::as_f64))
        else {
            return false;
        };
        match op {
            "=" => (actual - n).abs() < f64::EPSILON,
            "<" => actual < n,
            "<=" => actual <= n,
            ">" => actual > n,
            ">=" => actual >= n,
            _ => false,
        }
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterPolicy {
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Vec<FilterMatcher>>,
}

impl FilterPolicy {
    pub fn matches(&self, message_attributes: &BTreeMap<String, String>) -> bool {
        self.attributes.iter().all(|(name, matchers)| {
            let actual = message_attributes.get(name).map(String::as_str);
            matchers.iter().any(|m| m.matches(actual))
        })
    }
}
