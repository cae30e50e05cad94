//! Registry of queues by name, wiring each queue's sweeper to its
//! configured dead-letter queue.

use std::sync::Arc;

use dashmap::DashMap;
use ldk_core::error::FleetError;

use crate::queue::{spawn_sweeper, Queue, QueueConfig};

#[derive(Default)]
pub struct QueueRegistry {
    queues: DashMap<String, Arc<Queue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        QueueRegistry::default()
    }

    pub fn create_queue(&self, name: &str, url: &str, config: QueueConfig) -> Arc<Queue> {
        let dead_letter = config
            .dead_letter_target
            .as_ref()
            .and_then(|target| self.get(target));
        let queue = Queue::new(name, url, config);
        spawn_sweeper(queue.clone(), dead_letter);
        self.queues.insert(name.to_string(), queue.clone());
        queue
    }

    pub fn get(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.get(name).map(|q| q.clone())
    }

    pub fn require(&self, name: &str) -> Result<Arc<Queue>, FleetError> {
        self.get(name).ok_or_else(|| FleetError::not_found("QueueDoesNotExist", format!("queue '{name}' does not exist")))
    }

    pub fn delete_queue(&self, name: &str) {
        if let Some((_, queue)) = self.queues.remove(name) {
            queue.stop();
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        self.queues.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_require_round_trips() {
        let registry = QueueRegistry::new();
        registry.create_queue("orders", "http://localhost/orders", QueueConfig::default());
        assert!(registry.require("orders").is_ok());
        assert!(registry.require("missing").is_err());
    }

    #[tokio::test]
    async fn delete_queue_removes_it_from_the_registry() {
        let registry = QueueRegistry::new();
        registry.create_queue("orders", "http://localhost/orders", QueueConfig::default());
        registry.delete_queue("orders");
        assert!(registry.get("orders").is_none());
    }

    #[tokio::test]
    async fn dlq_target_is_resolved_at_creation_time() {
        let registry = QueueRegistry::new();
        registry.create_queue("orders-dlq", "http://localhost/orders-dlq", QueueConfig::default());
        let mut config = QueueConfig::default();
        config.dead_letter_target = Some("orders-dlq".to_string());
        registry.create_queue("orders", "http://localhost/orders", config);
        assert_eq!(registry.list_names().len(), 2);
    }
}
