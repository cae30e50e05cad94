//! Tracing setup shared by every provider and by `ldk-cli`.

use tracing_subscriber::EnvFilter;

/// Initialise the global `tracing` subscriber.
///
/// Respects `RUST_LOG`. Falls back to `info,tower_http=debug` when unset.
/// Call once, at the very start of `main`, before any tracing macro fires.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".parse().unwrap()),
        )
        .init();
}
