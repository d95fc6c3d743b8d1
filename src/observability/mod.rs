//! Logging setup for hosts embedding the core.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize the global tracing subscriber. `STEWARD_LOG` overrides the
/// default `info` level. Safe to call once per process; later calls are
/// ignored.
pub fn init() {
    let filter = EnvFilter::try_from_env("STEWARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
