//! Politics feed client binary.
//! Loads config, starts the dashboard core (snapshot + live channel) and
//! serves the read model over a local HTTP status surface.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use politics_feed::config::FeedConfig;
use politics_feed::metrics::Metrics;
use politics_feed::{router, Dashboard};

/// Compact logs by default; JSON lines when FEED_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("politics_feed=info,warn"));

    let json = std::env::var("FEED_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedConfig::load_default()?;
    info!(
        api = %cfg.api_base_url,
        ws = %cfg.ws_url,
        token = cfg.api_token.is_some(),
        "feed config loaded"
    );

    let metrics = match Metrics::init(cfg.feed_capacity) {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let dashboard = Arc::new(Dashboard::from_config(&cfg));
    if let Err(e) = dashboard.start().await {
        warn!(error = %e, "initial snapshot failed; waiting for live updates");
    }

    let app = router(Arc::clone(&dashboard), metrics.as_ref());
    let listener = tokio::net::TcpListener::bind(&cfg.status_addr)
        .await
        .with_context(|| format!("binding status server on {}", cfg.status_addr))?;
    info!(addr = %cfg.status_addr, "status server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("status server")?;

    dashboard.shutdown();
    info!("shutdown complete");
    Ok(())
}
