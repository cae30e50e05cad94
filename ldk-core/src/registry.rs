//! Service Registry / Discovery (spec §4.5): an in-memory map from service
//! name to its bound endpoint, consulted by the Compute Invoker Contract to
//! synthesize environment variables for child processes.

use std::collections::BTreeMap;
use std::sync::RwLock;

/// A single registered service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub service_name: String,
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(service_name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        ServiceEndpoint {
            service_name: service_name.into(),
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Thread-safe in-memory registry of service endpoints.
///
/// Services register on start and deregister on stop; other components
/// query the registry to discover where a service is reachable. Backed by
/// a `BTreeMap` under a single `RwLock` rather than per-entry locking,
/// since registration only happens during bring-up/shutdown while lookups
/// happen on the hot request path.
#[derive(Default)]
pub struct ServiceRegistry {
    endpoints: RwLock<BTreeMap<String, ServiceEndpoint>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        ServiceRegistry::default()
    }

    pub fn register(&self, endpoint: ServiceEndpoint) {
        tracing::info!(service = %endpoint.service_name, url = %endpoint.url(), "service registered");
        self.endpoints
            .write()
            .expect("service registry lock poisoned")
            .insert(endpoint.service_name.clone(), endpoint);
    }

    pub fn deregister(&self, service_name: &str) {
        let removed = self
            .endpoints
            .write()
            .expect("service registry lock poisoned")
            .remove(service_name);
        if removed.is_some() {
            tracing::info!(service = service_name, "service deregistered");
        }
    }

    pub fn lookup(&self, service_name: &str) -> Option<ServiceEndpoint> {
        self.endpoints
            .read()
            .expect("service registry lock poisoned")
            .get(service_name)
            .cloned()
    }

    /// Snapshot of every registered endpoint, ordered by service name.
    pub fn all_endpoints(&self) -> Vec<ServiceEndpoint> {
        self.endpoints
            .read()
            .expect("service registry lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Build `LWS_ECS_{UPPER_WITH_UNDERSCORES(name)}={url}` env vars for
    /// every registered endpoint (spec §4.5).
    pub fn build_ecs_env_vars(&self, prefix: &str) -> BTreeMap<String, String> {
        self.endpoints
            .read()
            .expect("service registry lock poisoned")
            .iter()
            .map(|(name, ep)| {
                let key = format!("{prefix}{}", name.to_uppercase().replace('-', "_"));
                (key, ep.url())
            })
            .collect()
    }
}
