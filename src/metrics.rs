use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("live_frames_total", "Inbound live channel frames.");
        describe_counter!(
            "live_malformed_frames_total",
            "Inbound frames dropped because they failed to decode."
        );
        describe_counter!(
            "live_connections_total",
            "Live channel connections that reached the subscribed state."
        );
        describe_counter!(
            "live_reconnects_scheduled_total",
            "Reconnect attempts scheduled after a close."
        );
        describe_counter!("feed_snapshot_loads_total", "Successful snapshot loads.");
        describe_counter!("feed_snapshot_errors_total", "Failed snapshot loads.");
        describe_counter!("feed_search_errors_total", "Failed searches.");
        describe_counter!(
            "feed_live_articles_total",
            "Articles prepended from the live channel."
        );
        describe_gauge!("feed_articles", "Articles currently displayed.");
        describe_gauge!("feed_capacity", "Maximum number of displayed articles.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the static feed capacity.
    pub fn init(feed_capacity: usize) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_metrics_described();
        gauge!("feed_capacity").set(feed_capacity as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
