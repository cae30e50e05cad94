//! Mock Rule Registry entities (spec §4.3): an ordered rule list per
//! service; first match wins, response returned verbatim.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use crate::operators::Matcher;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    pub delay_ms: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        MockResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: Value::Null,
            delay_ms: 0,
        }
    }
}

/// A single ordered rule: matches an extracted `operation`, every header
/// matcher (case-insensitive header names), and every body matcher.
#[derive(Debug, Clone)]
pub struct MockRule {
    pub operation: String,
    pub header_matchers: BTreeMap<String, Matcher>,
    pub body_matchers: BTreeMap<String, Matcher>,
    pub response: MockResponse,
}

impl MockRule {
    /// `headers` and `body` describe the actual incoming request. Header
    /// lookups are case-insensitive (header names are normalized to
    /// lowercase by the caller and by the matcher keys here).
    pub fn matches(&self, operation: &str, headers: &BTreeMap<String, String>, body: &Value) -> bool {
        if self.operation != operation {
            return false;
        }
        let headers_ok = self.header_matchers.iter().all(|(name, matcher)| {
            let actual = headers
                .get(&name.to_lowercase())
                .map(|v| Value::String(v.clone()));
            matcher.matches(actual.as_ref())
        });
        if !headers_ok {
            return false;
        }
        self.body_matchers.iter().all(|(path, matcher)| {
            let actual = body.get(path);
            matcher.matches(actual)
        })
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.response.delay_ms)
    }
}
