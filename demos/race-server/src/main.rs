use std::sync::Arc;
use std::time::Duration;

use keyrace::prelude::*;

/// How often rooms past their TTL are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

struct Settings {
    bind: String,
    coordinator: CoordinatorConfig,
}

impl Settings {
    /// Reads `KEYRACE_BIND` and `KEYRACE_ROOM_TTL_SECS`, keeping defaults
    /// for anything unset or unparsable.
    fn from_env() -> Self {
        let bind = std::env::var("KEYRACE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let mut coordinator = CoordinatorConfig::default();
        match std::env::var("KEYRACE_ROOM_TTL_SECS").map(|raw| raw.parse::<u64>()) {
            Ok(Ok(secs)) => coordinator.room_ttl = Duration::from_secs(secs),
            Ok(Err(e)) => tracing::warn!(error = %e, "ignoring KEYRACE_ROOM_TTL_SECS"),
            Err(_) => {}
        }

        Self { bind, coordinator }
    }
}

// ---------------------------------------------------------------------------
// Expiry sweep
// ---------------------------------------------------------------------------

async fn purge_loop(coordinator: Arc<Coordinator>) {
    let mut ticker = tokio::time::interval(PURGE_INTERVAL);
    loop {
        ticker.tick().await;
        let purged = coordinator.purge_expired().await;
        if !purged.is_empty() {
            tracing::info!(count = purged.len(), "swept expired rooms");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    keyrace::logging::setup_logger(env!("CARGO_PKG_NAME"), "info")?;
    let settings = Settings::from_env();

    let server = KeyraceServerBuilder::new()
        .bind(&settings.bind)
        .coordinator_config(settings.coordinator)
        .build(AnonymousIdentity)
        .await?;

    tracing::info!(addr = %server.local_addr()?, "race server listening");
    tokio::spawn(purge_loop(Arc::clone(server.coordinator())));

    server.run().await?;
    Ok(())
}
