//! Provider Lifecycle (spec §4.6): every service implements the same
//! three-method contract so the orchestrator can bring services up and
//! down uniformly, without duck-typing on method presence.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default grace window `stop()` is given before the orchestrator force-kills
/// a provider (spec §4.7).
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// A boxed future, used for the trait's object-safe methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The contract every emulated AWS service implements.
///
/// `start` binds the service's listener, creates its stores, and starts its
/// background tasks. `stop` drains the listener, flushes state, and cancels
/// background tasks; it must be idempotent — calling it twice is not an
/// error. `health` reports whether the provider is currently serving.
pub trait Provider: Send + Sync {
    /// Stable service name, used as the key in the [`crate::registry::ServiceRegistry`].
    fn name(&self) -> &str;

    fn start(&self) -> BoxFuture<'_, Result<(), crate::error::FleetError>>;

    fn stop(&self) -> BoxFuture<'_, ()>;

    fn health(&self) -> BoxFuture<'_, bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toy {
        started: AtomicBool,
    }

    impl Provider for Toy {
        fn name(&self) -> &str {
            "toy"
        }

        fn start(&self) -> BoxFuture<'_, Result<(), FleetError>> {
            Box::pin(async {
                self.started.store(true, Ordering::SeqCst);
                Ok(())
            })
        }

        fn stop(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {
                self.started.store(false, Ordering::SeqCst);
            })
        }

        fn health(&self) -> BoxFuture<'_, bool> {
            Box::pin(async { self.started.load(Ordering::SeqCst) })
        }
    }

    #[tokio::test]
    async fn start_then_health_reports_true() {
        let toy = Toy {
            started: AtomicBool::new(false),
        };
        toy.start().await.unwrap();
        assert!(toy.health().await);
        toy.stop().await;
        assert!(!toy.health().await);
    }
}
