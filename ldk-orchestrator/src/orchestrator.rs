//! Orchestrator (spec §4.7): port allocation, provider bring-up order,
//! cross-provider wiring, and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use ldk_core::error::FleetError;
use ldk_core::provider::{Provider, DEFAULT_STOP_GRACE};
use ldk_core::registry::{ServiceEndpoint, ServiceRegistry};

/// A provider entry in bring-up order, paired with its allocated port.
struct Entry {
    provider: Arc<dyn Provider>,
    port: u16,
}

/// Brings the fleet up in the order providers are registered (the caller
/// is responsible for registering dependencies first — spec §4.7's
/// topological order: KV engine, object store, queue, scheduler,
/// identity/policy, fan-out/rules, compute, URL fronts), allocates each a
/// port `base_port + i + 1`, and tears the fleet down in reverse order.
pub struct Orchestrator {
    base_port: u16,
    registry: Arc<ServiceRegistry>,
    entries: Vec<Entry>,
    stop_grace: Duration,
}

impl Orchestrator {
    pub fn new(base_port: u16) -> Self {
        Orchestrator { base_port, registry: Arc::new(ServiceRegistry::new()), entries: Vec::new(), stop_grace: DEFAULT_STOP_GRACE }
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn service_registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    pub fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Registers a provider, assigning it the next port in bring-up order.
    /// Two providers registered under the same name is a fatal
    /// configuration error (spec §4.7's port-collision abort, generalized
    /// to name collisions since ports are derived from registration index).
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<(), FleetError> {
        if self.entries.iter().any(|e| e.provider.name() == provider.name()) {
            return Err(FleetError::already_exists(
                "ProviderAlreadyRegistered",
                format!("provider '{}' is already registered", provider.name()),
            ));
        }
        let port = self.base_port + self.entries.len() as u16 + 1;
        self.entries.push(Entry { provider, port });
        Ok(())
    }

    pub fn port_of(&self, name: &str) -> Option<u16> {
        self.entries.iter().find(|e| e.provider.name() == name).map(|e| e.port)
    }

    /// Starts every registered provider in registration order, registering
    /// its endpoint before `start()` runs so cross-provider wiring done
    /// during `start()` can already look services up.
    pub async fn bring_up(&self) -> Result<(), FleetError> {
        for entry in &self.entries {
            self.registry.register(ServiceEndpoint::new(entry.provider.name(), "localhost", entry.port));
            tracing::info!(service = entry.provider.name(), port = entry.port, "starting provider");
            entry.provider.start().await?;
        }
        Ok(())
    }

    /// Stops every provider in reverse bring-up order, each given
    /// `stop_grace` before being abandoned (stdlib futures cannot be
    /// force-killed, so a provider that overruns its grace window is
    /// logged and left running in the background rather than aborted).
    pub async fn shutdown(&self) {
        for entry in self.entries.iter().rev() {
            tracing::info!(service = entry.provider.name(), "stopping provider");
            if tokio::time::timeout(self.stop_grace, entry.provider.stop()).await.is_err() {
                tracing::warn!(service = entry.provider.name(), grace_ms = self.stop_grace.as_millis() as u64, "provider exceeded stop grace window");
            }
            self.registry.deregister(entry.provider.name());
        }
    }

    pub async fn status(&self) -> Vec<(String, u16, bool)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            out.push((entry.provider.name().to_string(), entry.port, entry.provider.health().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldk_core::provider::BoxFuture;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toy {
        name: String,
        started: AtomicBool,
        stop_delay: Duration,
    }

    impl Provider for Toy {
        fn name(&self) -> &str {
            &self.name
        }
        fn start(&self) -> BoxFuture<'_, Result<(), FleetError>> {
            Box::pin(async {
                self.started.store(true, Ordering::SeqCst);
                Ok(())
            })
        }
        fn stop(&self) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                tokio::time::sleep(self.stop_delay).await;
                self.started.store(false, Ordering::SeqCst);
            })
        }
        fn health(&self) -> BoxFuture<'_, bool> {
            Box::pin(async { self.started.load(Ordering::SeqCst) })
        }
    }

    fn toy(name: &str) -> Arc<Toy> {
        Arc::new(Toy { name: name.to_string(), started: AtomicBool::new(false), stop_delay: Duration::ZERO })
    }

    #[test]
    fn registration_order_determines_port_assignment() {
        let mut orch = Orchestrator::new(4000);
        orch.register(toy("dynamodb")).unwrap();
        orch.register(toy("s3")).unwrap();
        assert_eq!(orch.port_of("dynamodb"), Some(4001));
        assert_eq!(orch.port_of("s3"), Some(4002));
    }

    #[test]
    fn duplicate_name_registration_errors() {
        let mut orch = Orchestrator::new(4000);
        orch.register(toy("dynamodb")).unwrap();
        assert!(orch.register(toy("dynamodb")).is_err());
    }

    #[tokio::test]
    async fn bring_up_starts_every_provider_and_registers_endpoints() {
        let mut orch = Orchestrator::new(4000);
        orch.register(toy("dynamodb")).unwrap();
        orch.register(toy("s3")).unwrap();
        orch.bring_up().await.unwrap();
        let status = orch.status().await;
        assert_eq!(status, vec![("dynamodb".to_string(), 4001, true), ("s3".to_string(), 4002, true)]);
        assert!(orch.service_registry().lookup("dynamodb").is_some());
    }

    #[tokio::test]
    async fn shutdown_stops_in_reverse_order_and_deregisters() {
        let mut orch = Orchestrator::new(4000);
        for name in ["dynamodb", "s3"] {
            orch.register(toy(name)).unwrap();
        }
        orch.bring_up().await.unwrap();
        orch.shutdown().await;
        assert!(orch.service_registry().lookup("dynamodb").is_none());
        assert!(orch.service_registry().lookup("s3").is_none());
    }

    #[tokio::test]
    async fn shutdown_logs_and_continues_past_grace_window_overrun() {
        let mut orch = Orchestrator::new(4000).with_stop_grace(Duration::from_millis(20));
        let slow = Arc::new(Toy { name: "slow".to_string(), started: AtomicBool::new(false), stop_delay: Duration::from_millis(200) });
        orch.register(slow).unwrap();
        orch.bring_up().await.unwrap();
        let start = std::time::Instant::now();
        orch.shutdown().await;
        assert!(start.elapsed() < Duration::from_millis(150));
    }
}
