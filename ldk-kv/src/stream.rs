//! Per-table change stream: an append-only ring of `StreamRecord`s fed
//! by writes, drained in order by a background dispatcher (spec §4.8).

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::value::Item;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type DeliverFn = Arc<dyn Fn(StreamRecord) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

const RETRY_BACKOFFS_MS: [u64; 3] = [250, 500, 1000];
const RING_CAPACITY: usize = 10_000;
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    Insert,
    Modify,
    Remove,
}

#[derive(Debug, Clone)]
pub struct StreamRecord {
    pub sequence_number: u64,
    pub event_name: EventName,
    pub keys: Item,
    pub new_image: Option<Item>,
    pub old_image: Option<Item>,
    pub approximate_creation_date_time: DateTime<Utc>,
}

/// Append-only, bounded-memory log of a table's stream records plus the
/// monotonic sequence counter writes draw from.
pub struct StreamLog {
    next_sequence: AtomicU64,
    ring: Mutex<std::collections::VecDeque<StreamRecord>>,
    tx: Option<mpsc::Sender<StreamRecord>>,
    cancel: CancellationToken,
}

impl StreamLog {
    pub fn new() -> Arc<Self> {
        Arc::new(StreamLog {
            next_sequence: AtomicU64::new(1),
            ring: Mutex::new(std::collections::VecDeque::new()),
            tx: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Registers a subscriber and starts the dispatcher task; returns a
    /// new `StreamLog` wired to it (the unregistered log above has no
    /// `tx`, so `append` only grows the ring without dispatching).
    pub fn with_subscriber(deliver: DeliverFn) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let log = Arc::new(StreamLog {
            next_sequence: AtomicU64::new(1),
            ring: Mutex::new(std::collections::VecDeque::new()),
            tx: Some(tx),
            cancel: cancel.clone(),
        });
        spawn_dispatcher(rx, deliver, cancel);
        log
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, AtomicOrdering::SeqCst)
    }

    pub fn append(&self, record: StreamRecord) {
        {
            let mut ring = self.ring.lock().unwrap();
            ring.push_back(record.clone());
            while ring.len() > RING_CAPACITY {
                ring.pop_front();
            }
        }
        if let Some(tx) = &self.tx {
            if tx.try_send(record).is_err() {
                warn!("stream dispatch channel full or closed, dropping record");
            }
        }
    }

    pub fn records_since(&self, sequence_number: u64) -> Vec<StreamRecord> {
        self.ring
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.sequence_number > sequence_number)
            .cloned()
            .collect()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

fn spawn_dispatcher(mut rx: mpsc::Receiver<StreamRecord>, deliver: DeliverFn, cancel: CancellationToken) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                record = rx.recv() => {
                    match record {
                        Some(record) => deliver_with_retry(&deliver, record).await,
                        None => break,
                    }
                }
            }
        }
    });
}

async fn deliver_with_retry(deliver: &DeliverFn, record: StreamRecord) {
    let sequence_number = record.sequence_number;
    if deliver(record.clone()).await.is_ok() {
        return;
    }
    for backoff_ms in RETRY_BACKOFFS_MS {
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        if deliver(record.clone()).await.is_ok() {
            return;
        }
    }
    warn!(sequence_number, "stream subscriber delivery failed after retries, dropping record");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn record(seq: u64) -> StreamRecord {
        StreamRecord {
            sequence_number: seq,
            event_name: EventName::Insert,
            keys: Item::new(),
            new_image: None,
            old_image: None,
            approximate_creation_date_time: Utc::now(),
        }
    }

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let log = StreamLog::new();
        let a = log.next_sequence();
        let b = log.next_sequence();
        assert!(b > a);
    }

    #[test]
    fn records_since_excludes_already_seen() {
        let log = StreamLog::new();
        log.append(record(1));
        log.append(record(2));
        log.append(record(3));
        let since = log.records_since(1);
        assert_eq!(since.iter().map(|r| r.sequence_number).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subscriber_receives_records_in_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let deliver: DeliverFn = Arc::new(move |record: StreamRecord| {
            let received = received_clone.clone();
            Box::pin(async move {
                received.lock().unwrap().push(record.sequence_number);
                Ok(())
            })
        });
        let log = StreamLog::with_subscriber(deliver);
        log.append(record(1));
        log.append(record(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*received.lock().unwrap(), vec![1, 2]);
        log.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_delivery_retries_then_drops() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let deliver: DeliverFn = Arc::new(move |_record: StreamRecord| {
            let attempts = attempts_clone.clone();
            Box::pin(async move {
                attempts.fetch_add(1, AtomicOrdering::SeqCst);
                Err("boom".to_string())
            })
        });
        let log = StreamLog::with_subscriber(deliver);
        log.append(record(1));
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(attempts.load(AtomicOrdering::SeqCst), 4);
        log.stop();
    }
}
