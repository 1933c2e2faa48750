// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod scrape;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::ingest::{Ingestor, RunStats};

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::scrape::HttpFetcher;
use crate::sentiment::{DynClassifier, SentimentClassifier};
use crate::store::{DynStore, JsonFileStore, MemoryStore};

/// Build the classifier from config and try to load the model right away,
/// so the first request does not pay for it. A failed load is not fatal.
pub fn build_classifier(cfg: &AppConfig) -> DynClassifier {
    let classifier = SentimentClassifier::new(
        cfg.sentiment.model_path.clone(),
        cfg.sentiment.cache_capacity,
    );
    if classifier.preload() {
        info!("sentiment model preloaded");
    } else {
        warn!("no sentiment model; keyword analysis only");
    }
    Arc::new(classifier)
}

pub fn build_store(cfg: &AppConfig) -> Result<DynStore> {
    Ok(match &cfg.store.path {
        Some(p) => Arc::new(JsonFileStore::open(p)?),
        None => {
            info!("headline store is in-memory only");
            Arc::new(MemoryStore::new())
        }
    })
}

/// Full application router (API + `/metrics`) wired from config.
pub fn app(cfg: &AppConfig) -> Result<axum::Router> {
    let classifier = build_classifier(cfg);
    let store = build_store(cfg)?;
    let fetcher = Arc::new(HttpFetcher::new(cfg.scrape.fetch_timeout())?);
    let state = AppState::new(classifier, store, fetcher, cfg.scrape.clone());
    let metrics = crate::metrics::Metrics::shared(cfg.sentiment.cache_capacity)?;
    Ok(router(state).merge(metrics.router()))
}
