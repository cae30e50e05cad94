//! Topic fan-out (SNS-shaped half of C10): flat subscribe/publish with
//! filter-policy matching and per-subscription retrying dispatch.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::envelope::{sns_to_lambda_envelope, sns_to_sqs_envelope};
use crate::filter::FilterPolicy;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type DeliverFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Exponential backoff schedule for subscription delivery retries (spec §4.10).
const RETRY_BACKOFFS_MS: [u64; 3] = [250, 500, 1000];

/// Bounded channel capacity between `publish` and a subscription's delivery
/// worker; publish is non-blocking, so a full channel drops the oldest
/// pending delivery attempt by declining to enqueue a new one.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionProtocol {
    Sqs,
    Lambda,
}

struct SubscriptionHandle {
    id: String,
    filter_policy: FilterPolicy,
    protocol: SubscriptionProtocol,
    raw_message_delivery: bool,
    tx: mpsc::Sender<Value>,
    cancel: CancellationToken,
}

/// A single SNS-shaped topic: holds its subscriptions and publishes
/// messages to every one whose filter policy matches.
pub struct Topic {
    pub arn: String,
    subscriptions: std::sync::RwLock<Vec<SubscriptionHandle>>,
}

impl Topic {
    pub fn new(arn: impl Into<String>) -> Self {
        Topic {
            arn: arn.into(),
            subscriptions: std::sync::RwLock::new(Vec::new()),
        }
    }

    /// Register a subscription and spawn its delivery worker. `deliver`
    /// performs the actual hand-off to the subscriber's transport (queue
    /// enqueue, compute invocation, ...).
    pub fn subscribe(
        &self,
        id: impl Into<String>,
        protocol: SubscriptionProtocol,
        filter_policy: FilterPolicy,
        raw_message_delivery: bool,
        deliver: DeliverFn,
    ) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let id = id.into();
        spawn_worker(id.clone(), rx, deliver, cancel.clone());
        self.subscriptions
            .write()
            .expect("topic subscriptions lock poisoned")
            .push(SubscriptionHandle {
                id,
                filter_policy,
                protocol,
                raw_message_delivery,
                tx,
                cancel,
            });
    }

    pub fn unsubscribe(&self, id: &str) {
        let mut subs = self.subscriptions.write().expect("topic subscriptions lock poisoned");
        if let Some(pos) = subs.iter().position(|s| s.id == id) {
            subs.remove(pos).cancel.cancel();
        }
    }

    /// Publish a message. Non-blocking: for each matching subscription the
    /// envelope is enqueued onto its bounded channel; topic publish
    /// ordering is not guaranteed across subscriptions but is FIFO per
    /// subscription (spec §5).
    pub fn publish(
        &self,
        message_id: &str,
        message: &str,
        timestamp: &str,
        message_attributes: &BTreeMap<String, String>,
    ) {
        let subs = self.subscriptions.read().expect("topic subscriptions lock poisoned");
        for sub in subs.iter() {
            if !sub.filter_policy.matches(message_attributes) {
                continue;
            }
            let envelope = match sub.protocol {
                SubscriptionProtocol::Sqs => sns_to_sqs_envelope(
                    message_id,
                    &self.arn,
                    message,
                    timestamp,
                    message_attributes,
                    sub.raw_message_delivery,
                ),
                SubscriptionProtocol::Lambda => {
                    sns_to_lambda_envelope(message_id, &self.arn, message, timestamp, message_attributes)
                }
            };
            if sub.tx.try_send(envelope).is_err() {
                tracing::warn!(subscription = %sub.id, "dispatch channel full, dropping message");
            }
        }
    }
}

fn spawn_worker(
    subscription_id: String,
    mut rx: mpsc::Receiver<Value>,
    deliver: DeliverFn,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                item = rx.recv() => {
                    match item {
                        Some(envelope) => deliver_with_retry(&subscription_id, &deliver, envelope).await,
                        None => break,
                    }
                }
            }
        }
    });
}

async fn deliver_with_retry(subscription_id: &str, deliver: &DeliverFn, envelope: Value) {
    if deliver(envelope.clone()).await.is_ok() {
        return;
    }
    for backoff_ms in RETRY_BACKOFFS_MS {
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        if deliver(envelope.clone()).await.is_ok() {
            return;
        }
    }
    tracing::warn!(subscription = subscription_id, "delivery failed after retries, dropping");
}

/// Registry of topics by ARN.
#[derive(Default)]
pub struct TopicRegistry {
    topics: DashMap<String, Arc<Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        TopicRegistry::default()
    }

    pub fn get_or_create(&self, arn: &str) -> Arc<Topic> {
        self.topics
            .entry(arn.to_string())
            .or_insert_with(|| Arc::new(Topic::new(arn)))
            .clone()
    }

    pub fn get(&self, arn: &str) -> Option<Arc<Topic>> {
        self.topics.get(arn).map(|t| t.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn publish_delivers_to_matching_subscription() {
        let topic = Topic::new("arn:topic:1");
        let received = Arc::new(AtomicUsize::new(0));
        let r = received.clone();
        topic.subscribe(
            "sub-1",
            SubscriptionProtocol::Sqs,
            FilterPolicy::default(),
            false,
            Arc::new(move |_| {
                let r = r.clone();
                Box::pin(async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );
        topic.publish("m1", "hello", "2024-01-01T00:00:00Z", &BTreeMap::new());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_delivery_retries_then_drops() {
        let topic = Topic::new("arn:topic:2");
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();
        topic.subscribe(
            "sub-2",
            SubscriptionProtocol::Sqs,
            FilterPolicy::default(),
            false,
            Arc::new(move |_| {
                let a = a.clone();
                Box::pin(async move {
                    a.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                })
            }),
        );
        topic.publish("m1", "hello", "2024-01-01T00:00:00Z", &BTreeMap::new());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_matching_filter_policy_skips_subscription() {
        let topic = Topic::new("arn:topic:3");
        let received = Arc::new(AtomicUsize::new(0));
        let mut attrs = BTreeMap::new();
        attrs.insert(
            "color".to_string(),
            vec![crate::filter::FilterMatcher::Literal("red".into())],
        );
        let r = received.clone();
        topic.subscribe(
            "sub-3",
            SubscriptionProtocol::Sqs,
            FilterPolicy { attributes: attrs },
            false,
            Arc::new(move |_| {
                let r = r.clone();
                Box::pin(async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
        );
        let mut msg_attrs = BTreeMap::new();
        msg_attrs.insert("color".to_string(), "blue".to_string());
        topic.publish("m1", "hello", "2024-01-01T00:00:00Z", &msg_attrs);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(received.load(Ordering::SeqCst), 0);
    }
}
