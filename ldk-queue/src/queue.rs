//! Standard/FIFO queue with visibility timeouts, receipt handles, and a
//! background sweeper that requeues expired in-flight messages, routing to
//! a dead-letter queue once `max_receive_count` is exceeded (spec §4.11).

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use ldk_core::error::FleetError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::message::{Message, ReceivedMessage};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub fifo: bool,
    pub visibility_timeout_secs: u64,
    pub max_receive_count: Option<u32>,
    pub dead_letter_target: Option<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            fifo: false,
            visibility_timeout_secs: 30,
            max_receive_count: None,
            dead_letter_target: None,
        }
    }
}

struct PendingEntry {
    message: Message,
    available_at: Instant,
}

struct InFlightEntry {
    message: Message,
    group_id: Option<String>,
    deadline: Instant,
}

/// A single SQS-shaped queue. Visible messages live in `pending`; dequeued
/// messages move to `in_flight` keyed by their receipt handle until deleted,
/// requeued by the sweeper, or routed to a DLQ.
pub struct Queue {
    pub name: String,
    pub url: String,
    pub config: QueueConfig,
    pending: Mutex<VecDeque<PendingEntry>>,
    in_flight: DashMap<String, InFlightEntry>,
    cancel: CancellationToken,
}

impl Queue {
    pub fn new(name: impl Into<String>, url: impl Into<String>, config: QueueConfig) -> Arc<Self> {
        Arc::new(Queue {
            name: name.into(),
            url: url.into(),
            config,
            pending: Mutex::new(VecDeque::new()),
            in_flight: DashMap::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn send_message(
        &self,
        body: impl Into<String>,
        attributes: BTreeMap<String, String>,
        delay_secs: u64,
        message_group_id: Option<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let mut message = Message::new(id.clone(), body, attributes);
        message.message_group_id = message_group_id;
        self.pending.lock().expect("queue pending lock poisoned").push_back(PendingEntry {
            message,
            available_at: Instant::now() + Duration::from_secs(delay_secs),
        });
        id
    }

    /// Dequeue up to `max_messages`, marking each in-flight with a fresh
    /// receipt handle and a visibility deadline `visibility_timeout_secs`
    /// from now. FIFO queues skip groups that already have an in-flight
    /// message.
    pub fn receive_message(&self, max_messages: usize) -> Vec<ReceivedMessage> {
        let now = Instant::now();
        let mut pending = self.pending.lock().expect("queue pending lock poisoned");
        let mut taken = Vec::new();
        let mut skip_groups: Vec<String> = Vec::new();
        let mut i = 0;
        while taken.len() < max_messages && i < pending.len() {
            let ready = pending[i].available_at <= now;
            let blocked_group = self.config.fifo
                && pending[i]
                    .message
                    .message_group_id
                    .as_ref()
                    .map(|g| skip_groups.contains(g) || self.group_in_flight(g))
                    .unwrap_or(false);
            if ready && !blocked_group {
                let entry = pending.remove(i).expect("index within bounds");
                if let Some(group) = &entry.message.message_group_id {
                    skip_groups.push(group.clone());
                }
                taken.push(entry);
            } else {
                i += 1;
            }
        }
        drop(pending);

        taken
            .into_iter()
            .map(|entry| {
                let mut message = entry.message;
                message.receive_count += 1;
                let receipt_handle = Uuid::new_v4().to_string();
                let deadline = now + Duration::from_secs(self.config.visibility_timeout_secs);
                let received = ReceivedMessage {
                    message: message.clone(),
                    receipt_handle: receipt_handle.clone(),
                };
                self.in_flight.insert(
                    receipt_handle,
                    InFlightEntry {
                        message,
                        group_id: received.message.message_group_id.clone(),
                        deadline,
                    },
                );
                received
            })
            .collect()
    }

    fn group_in_flight(&self, group_id: &str) -> bool {
        self.in_flight.iter().any(|e| e.group_id.as_deref() == Some(group_id))
    }

    pub fn delete_message(&self, receipt_handle: &str) -> Result<(), FleetError> {
        self.in_flight
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or_else(|| FleetError::not_found("ReceiptHandleIsInvalid", "receipt handle not found or already expired"))
    }

    pub fn change_message_visibility(&self, receipt_handle: &str, timeout_secs: u64) -> Result<(), FleetError> {
        let mut entry = self
            .in_flight
            .get_mut(receipt_handle)
            .ok_or_else(|| FleetError::not_found("ReceiptHandleIsInvalid", "receipt handle not found or already expired"))?;
        entry.deadline = Instant::now() + Duration::from_secs(timeout_secs);
        Ok(())
    }

    pub fn approximate_visible_count(&self) -> usize {
        self.pending.lock().expect("queue pending lock poisoned").len()
    }

    pub fn approximate_in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Sweep expired in-flight messages: requeue them (bumping receive
    /// count is already done at receive time; the sweeper only increments
    /// for *this* expiry), or move them to a DLQ if configured and the
    /// receive count now exceeds `max_receive_count`.
    fn sweep(&self, dead_letter: Option<&Arc<Queue>>) {
        let now = Instant::now();
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|e| e.deadline <= now)
            .map(|e| e.key().clone())
            .collect();
        for receipt_handle in expired {
            let Some((_, entry)) = self.in_flight.remove(&receipt_handle) else {
                continue;
            };
            let over_limit = self
                .config
                .max_receive_count
                .map(|max| entry.message.receive_count > max)
                .unwrap_or(false);
            if over_limit {
                if let Some(dlq) = dead_letter {
                    dlq.send_message(entry.message.body, entry.message.attributes, 0, entry.group_id);
                    continue;
                }
            }
            self.pending.lock().expect("queue pending lock poisoned").push_back(PendingEntry {
                message: entry.message,
                available_at: now,
            });
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the background sweeper owned by `queue`, requeuing or DLQ-routing
/// expired in-flight messages until cancelled.
pub fn spawn_sweeper(queue: Arc<Queue>, dead_letter: Option<Arc<Queue>>) {
    let cancel = queue.cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(DEFAULT_SWEEP_INTERVAL) => {
                    queue.sweep(dead_letter.as_ref());
                }
            }
        }
    });
}
