use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Fails if another
    /// recorder is already installed.
    pub fn init(cache_capacity: usize) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        gauge!("sentiment_cache_capacity").set(cache_capacity as f64);
        Ok(Self { handle })
    }

    /// Same recorder for every caller in this process (tests build many routers).
    pub fn shared(cache_capacity: usize) -> Result<Self> {
        static SHARED: OnceCell<Metrics> = OnceCell::new();
        SHARED
            .get_or_try_init(|| Self::init(cache_capacity))
            .cloned()
    }

    /// `/metrics` in the Prometheus exposition format.
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

/// One-time metrics registration (so series show up on /metrics with help text).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_headlines_total",
            "Headlines accepted by the normalizer."
        );
        describe_counter!(
            "scrape_rejected_total",
            "Candidates dropped by the normalizer."
        );
        describe_counter!("scrape_stored_total", "Headlines persisted.");
        describe_counter!(
            "scrape_skipped_total",
            "Headlines skipped because the URL is already stored."
        );
        describe_counter!(
            "scrape_errors_total",
            "Per-headline persistence failures."
        );
        describe_counter!("scrape_fetch_errors_total", "Listing page fetch failures.");
        describe_histogram!("scrape_fetch_ms", "Listing page fetch time in milliseconds.");
        describe_gauge!("scrape_last_run_ts", "Unix time of the last finished run.");
        describe_counter!(
            "sentiment_cache_hits_total",
            "Sentiment lookups served from cache."
        );
        describe_counter!(
            "sentiment_fallback_total",
            "Classifications that used the keyword fallback."
        );
        describe_gauge!("sentiment_cache_capacity", "Sentiment cache capacity.");
    });
}
