//! Bucket configuration: website mode, policy, and event notifications
//! (spec §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    pub index_document: String,
    pub error_document: Option<String>,
}

/// Where a notification target routes: an SNS topic ARN goes through
/// fan-out, a queue ARN enqueues directly, a function name invokes
/// compute. Kept as plain strings — resolution is the orchestrator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationTarget {
    Topic(String),
    Queue(String),
    Function(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
    pub target: NotificationTarget,
    /// S3 event names this rule fires on, e.g. `s3:ObjectCreated:Put`.
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub rules: Vec<NotificationRule>,
}

impl NotificationConfig {
    pub fn targets_for(&self, event: &str) -> Vec<&NotificationTarget> {
        self.rules.iter().filter(|r| r.events.iter().any(|e| e == event)).map(|r| &r.target).collect()
    }
}

pub struct Bucket {
    pub name: String,
    pub created: DateTime<Utc>,
    pub website: Option<WebsiteConfig>,
    pub policy: Option<Json>,
    pub notification: NotificationConfig,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Bucket { name: name.into(), created: Utc::now(), website: None, policy: None, notification: NotificationConfig::default() }
    }

    /// `GetBucketPolicy` returns a default allow-all document when none
    /// has been explicitly set (spec §4.9).
    pub fn policy_or_default(&self) -> Json {
        self.policy.clone().unwrap_or_else(|| {
            serde_json::json!({
                "Version": "2012-10-17",
                "Statement": [{"Effect": "Allow", "Principal": "*", "Action": "*", "Resource": "*"}],
            })
        })
    }
}
