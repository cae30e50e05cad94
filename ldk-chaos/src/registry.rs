//! Chaos Config Registry (spec §4.2): one mutable `ChaosConfig` per
//! service, published as a copy-on-read snapshot so the hot request path
//! never locks (spec §5).

use std::sync::Arc;

use dashmap::DashMap;

use ldk_core::snapshot::Snapshot;

use crate::config::{ChaosConfig, ChaosPatch};

#[derive(Default)]
pub struct ChaosRegistry {
    services: DashMap<String, Arc<Snapshot<ChaosConfig>>>,
}

impl ChaosRegistry {
    pub fn new() -> Self {
        ChaosRegistry::default()
    }

    /// Load the current snapshot for `service`, creating a disabled
    /// default one if this is the first time the service is consulted.
    pub fn load(&self, service: &str) -> Arc<ChaosConfig> {
        self.services
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Snapshot::new(ChaosConfig::default())))
            .load()
    }

    /// Merge `patch` onto the current snapshot and publish the result.
    /// Fields absent from the patch are preserved (spec §4.2).
    pub fn patch(&self, service: &str, patch: ChaosPatch) {
        let entry = self
            .services
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Snapshot::new(ChaosConfig::default())));
        entry.rcu(|current| current.apply_patch(&patch));
    }

    pub fn all(&self) -> Vec<(String, Arc<ChaosConfig>)> {
        self.services
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load()))
            .collect()
    }
}
