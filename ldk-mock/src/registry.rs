//! `MockRegistry`: a `DashMap<service, Arc<Vec<MockRule>>>` where
//! registering a new rule set swaps the whole `Vec`, keeping "ordered,
//! immutable per snapshot" exactly as spec §4.3 requires.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::rule::MockRule;

#[derive(Default)]
pub struct MockRegistry {
    rules: DashMap<String, Arc<Vec<MockRule>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        MockRegistry::default()
    }

    /// Replace the entire ordered rule set for a service.
    pub fn set_rules(&self, service: &str, rules: Vec<MockRule>) {
        self.rules.insert(service.to_string(), Arc::new(rules));
    }

    /// First matching rule for `service`, or `None` if no rule matches or
    /// the service has no rules registered.
    pub fn find_match(
        &self,
        service: &str,
        operation: &str,
        headers: &BTreeMap<String, String>,
        body: &Value,
    ) -> Option<MockRule> {
        let rules = self.rules.get(service)?.clone();
        rules
            .iter()
            .find(|rule| rule.matches(operation, headers, body))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MockResponse;

    fn simple_rule(operation: &str, status: u16) -> MockRule {
        MockRule {
            operation: operation.to_string(),
            header_matchers: BTreeMap::new(),
            body_matchers: BTreeMap::new(),
            response: MockResponse {
                status,
                ..Default::default()
            },
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let registry = MockRegistry::new();
        registry.set_rules(
            "dynamodb",
            vec![simple_rule("PutItem", 200), simple_rule("PutItem", 500)],
        );
        let found = registry
            .find_match("dynamodb", "PutItem", &BTreeMap::new(), &Value::Null)
            .unwrap();
        assert_eq!(found.response.status, 200);
    }

    #[test]
    fn no_rules_registered_returns_none() {
        let registry = MockRegistry::new();
        assert!(registry
            .find_match("s3", "PutObject", &BTreeMap::new(), &Value::Null)
            .is_none());
    }

    #[test]
    fn replacing_rules_swaps_the_whole_set() {
        let registry = MockRegistry::new();
        registry.set_rules("sqs", vec![simple_rule("SendMessage", 200)]);
        registry.set_rules("sqs", vec![simple_rule("SendMessage", 503)]);
        let found = registry
            .find_match("sqs", "SendMessage", &BTreeMap::new(), &Value::Null)
            .unwrap();
        assert_eq!(found.response.status, 503);
    }
}
