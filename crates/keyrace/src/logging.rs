//! Logging setup for Keyrace binaries.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// Crates whose events the default filter lets through.
const KEYRACE_TARGETS: &[&str] = &[
    "keyrace",
    "keyrace_transport",
    "keyrace_session",
    "keyrace_store",
    "keyrace_room",
    "keyrace_sync",
];

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_level` for the Keyrace crates and `binary_name`.
///
/// ```no_run
/// keyrace::logging::setup_logger("race-server", "info").ok();
/// ```
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn setup_logger(binary_name: &str, default_level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(binary_name, default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn default_directives(binary_name: &str, level: &str) -> String {
    KEYRACE_TARGETS
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}
