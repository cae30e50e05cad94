//! Min-heap rule registry and the background tick task that fires scheduled
//! events (spec §4.12).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use crate::expr::{next_fire_after, ScheduleExpr};

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub arn: String,
    pub schedule: ScheduleExpr,
}

#[derive(Debug, Clone)]
struct HeapEntry {
    fire_at: DateTime<Utc>,
    rule: Rule,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at.cmp(&other.fire_at)
    }
}

fn initial_fire_at(schedule: &ScheduleExpr, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        ScheduleExpr::Rate(duration) => {
            Some(now + ChronoDuration::from_std(*duration).ok()?)
        }
        ScheduleExpr::Cron(cron) => next_fire_after(cron, now),
    }
}

/// Publishes a scheduled-event envelope for the rule named by the ARN; the
/// fan-out engine owns the actual delivery mechanics.
pub type PublishFn = Arc<dyn Fn(&Rule, DateTime<Utc>) + Send + Sync>;

/// Holds rules in a min-heap keyed by next-fire time and runs the single
/// background tick task that pops due entries and republishes them.
pub struct SchedulerRegistry {
    heap: Mutex<BinaryHeap<Reverse<HeapEntry>>>,
    cancel: CancellationToken,
    notify: Arc<tokio::sync::Notify>,
}

impl Default for SchedulerRegistry {
    fn default() -> Self {
        SchedulerRegistry {
            heap: Mutex::new(BinaryHeap::new()),
            cancel: CancellationToken::new(),
            notify: Arc::new(tokio::sync::Notify::new()),
        }
    }
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        SchedulerRegistry::default()
    }

    pub fn register(&self, rule: Rule, now: DateTime<Utc>) -> Result<(), String> {
        let fire_at = initial_fire_at(&rule.schedule, now)
            .ok_or_else(|| format!("rule '{}' has no future fire time", rule.name))?;
        self.heap.lock().expect("scheduler heap lock poisoned").push(Reverse(HeapEntry { fire_at, rule }));
        self.notify.notify_one();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.heap.lock().expect("scheduler heap lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn peek_fire_at(&self) -> Option<DateTime<Utc>> {
        self.heap
            .lock()
            .expect("scheduler heap lock poisoned")
            .peek()
            .map(|Reverse(entry)| entry.fire_at)
    }

    /// Pop every entry whose fire time is `<= now`, re-pushing each with
    /// its next occurrence, and return the fired rules for dispatch.
    fn drain_due(&self, now: DateTime<Utc>) -> Vec<Rule> {
        let mut heap = self.heap.lock().expect("scheduler heap lock poisoned");
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = heap.peek() {
            if entry.fire_at > now {
                break;
            }
            let Reverse(entry) = heap.pop().expect("peeked entry must be present");
            due.push(entry.rule.clone());
            if let Some(next) = initial_fire_at(&entry.rule.schedule, now) {
                heap.push(Reverse(HeapEntry { fire_at: next, rule: entry.rule }));
            }
        }
        due
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the scheduler's single background tick task: sleeps until the
/// heap head's fire time (or is woken early by a new, earlier registration),
/// fires everything due, and repeats until cancelled.
pub fn spawn_tick_task(registry: Arc<SchedulerRegistry>, publish: PublishFn) {
    let cancel = registry.cancel.clone();
    let notify = registry.notify.clone();
    tokio::spawn(async move {
        loop {
            let sleep_duration = match registry.peek_fire_at() {
                Some(fire_at) => {
                    let delta = fire_at - Utc::now();
                    delta.to_std().unwrap_or(std::time::Duration::ZERO)
                }
                None => std::time::Duration::from_secs(3600),
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = notify.notified() => continue,
                _ = tokio::time::sleep(sleep_duration) => {}
            }
            let due = registry.drain_due(Utc::now());
            for rule in due {
                let fire_at = Utc::now();
                publish(&rule, fire_at);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_schedule;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;

    fn rule(name: &str, schedule_raw: &str) -> Rule {
        Rule {
            name: name.to_string(),
            arn: format!("arn:ldk:scheduler::rule/{name}"),
            schedule: parse_schedule(schedule_raw).unwrap(),
        }
    }

    #[test]
    fn register_tracks_rule_count() {
        let registry = SchedulerRegistry::new();
        registry.register(rule("r1", "rate(1 minute)"), Utc::now()).unwrap();
        registry.register(rule("r2", "rate(5 minutes)"), Utc::now()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn earliest_rule_sorts_to_heap_head() {
        let registry = SchedulerRegistry::new();
        let now = Utc::now();
        registry.register(rule("slow", "rate(1 hour)"), now).unwrap();
        registry.register(rule("fast", "rate(1 minute)"), now).unwrap();
        assert_eq!(registry.peek_fire_at().unwrap() < now + ChronoDuration::minutes(2), true);
    }

    #[tokio::test]
    async fn tick_task_fires_due_rule_and_reschedules() {
        let registry = Arc::new(SchedulerRegistry::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        registry
            .register(
                Rule {
                    name: "tight-loop".to_string(),
                    arn: "arn:ldk:scheduler::rule/tight-loop".to_string(),
                    schedule: ScheduleExpr::Rate(Duration::from_millis(50)),
                },
                Utc::now(),
            )
            .unwrap();
        spawn_tick_task(
            registry.clone(),
            Arc::new(move |_rule, _fire_at| {
                f.fetch_add(1, AtomicOrdering::SeqCst);
            }),
        );
        tokio::time::sleep(Duration::from_millis(220)).await;
        registry.stop();
        assert!(fired.load(AtomicOrdering::SeqCst) >= 2);
    }
}
