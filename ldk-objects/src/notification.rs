//! S3-event notification envelopes and asynchronous, retried dispatch to
//! configured targets (spec §4.9). Like the stream/fan-out dispatchers,
//! the actual hand-off is an injected closure so this crate never
//! depends on `ldk-events`/`ldk-queue`/`ldk-compute` directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value as Json;
use tracing::warn;

use crate::bucket::{NotificationConfig, NotificationTarget};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type DeliverFn = Arc<dyn Fn(NotificationTarget, Json) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

const RETRY_BACKOFFS_MS: [u64; 3] = [250, 500, 1000];

pub fn s3_event_envelope(event_name: &str, bucket: &str, key: &str, size: u64, etag: &str) -> Json {
    serde_json::json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventTime": Utc::now().to_rfc3339(),
            "eventName": event_name,
            "s3": {
                "bucket": {"name": bucket},
                "object": {"key": key, "size": size, "eTag": etag},
            },
        }]
    })
}

/// Dispatches `envelope` to every target subscribed to `event_name`,
/// each on its own retried background task; delivery errors are logged
/// and dropped after retries are exhausted (spec §4.9, at-least-once).
pub fn dispatch_notifications(config: &NotificationConfig, event_name: &str, envelope: Json, deliver: DeliverFn) {
    for target in config.targets_for(event_name) {
        let target = target.clone();
        let deliver = deliver.clone();
        let envelope = envelope.clone();
        tokio::spawn(async move {
            deliver_with_retry(&deliver, target, envelope).await;
        });
    }
}

async fn deliver_with_retry(deliver: &DeliverFn, target: NotificationTarget, envelope: Json) {
    if deliver(clone_target(&target), envelope.clone()).await.is_ok() {
        return;
    }
    for backoff_ms in RETRY_BACKOFFS_MS {
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        if deliver(clone_target(&target), envelope.clone()).await.is_ok() {
            return;
        }
    }
    warn!("S3 event notification delivery failed after retries, dropping");
}

fn clone_target(target: &NotificationTarget) -> NotificationTarget {
    match target {
        NotificationTarget::Topic(arn) => NotificationTarget::Topic(arn.clone()),
        NotificationTarget::Queue(arn) => NotificationTarget::Queue(arn.clone()),
        NotificationTarget::Function(name) => NotificationTarget::Function(name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatches_to_every_matching_target() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let delivered_clone = delivered.clone();
        let deliver: DeliverFn = Arc::new(move |target, _envelope| {
            let delivered = delivered_clone.clone();
            Box::pin(async move {
                delivered.lock().unwrap().push(target);
                Ok(())
            })
        });
        let config = NotificationConfig {
            rules: vec![
                crate::bucket::NotificationRule {
                    target: NotificationTarget::Queue("q1".to_string()),
                    events: vec!["s3:ObjectCreated:Put".to_string()],
                },
                crate::bucket::NotificationRule {
                    target: NotificationTarget::Topic("t1".to_string()),
                    events: vec!["s3:ObjectRemoved:Delete".to_string()],
                },
            ],
        };
        dispatch_notifications(&config, "s3:ObjectCreated:Put", serde_json::json!({}), deliver);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_delivery_retries_then_drops() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let deliver: DeliverFn = Arc::new(move |_target, _envelope| {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            })
        });
        let config = NotificationConfig {
            rules: vec![crate::bucket::NotificationRule {
                target: NotificationTarget::Function("fn1".to_string()),
                events: vec!["s3:ObjectCreated:Put".to_string()],
            }],
        };
        dispatch_notifications(&config, "s3:ObjectCreated:Put", serde_json::json!({}), deliver);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
