// src/ingest/mod.rs
//! Ingestion run: fetch → extract → normalize → classify → dedup → persist.
//!
//! Failures are contained at the smallest unit: a failed fetch empties that
//! source's run, a failed write only costs that one headline.

use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::metrics::ensure_metrics_described;
use crate::scrape::{harvest, NormalizedHeadline, PageFetcher, Source};
use crate::sentiment::DynClassifier;
use crate::store::{DynStore, NewHeadline};

/// Per-source counters for one run. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub scraped: usize,
    pub stored: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Pipeline context. Collaborators are injected so tests can fake any of them.
#[derive(Clone)]
pub struct Ingestor {
    fetcher: Arc<dyn PageFetcher>,
    classifier: DynClassifier,
    store: DynStore,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, classifier: DynClassifier, store: DynStore) -> Self {
        Self {
            fetcher,
            classifier,
            store,
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn classifier(&self) -> &DynClassifier {
        &self.classifier
    }

    /// Run by source name. Unknown names produce zeroed stats, not an error.
    pub async fn ingest(&self, source: &str, max_headlines: usize, skip_existing: bool) -> RunStats {
        match Source::from_name(source) {
            Some(s) => self.ingest_source(s, max_headlines, skip_existing).await,
            None => {
                warn!(target: "ingest", source, "unknown source");
                RunStats::default()
            }
        }
    }

    pub async fn ingest_source(
        &self,
        source: Source,
        max_headlines: usize,
        skip_existing: bool,
    ) -> RunStats {
        ensure_metrics_described();
        let mut stats = RunStats::default();
        let label = source.name();

        let t0 = std::time::Instant::now();
        let html = match self.fetcher.fetch(source.news_url()).await {
            Ok(html) => html,
            Err(e) => {
                warn!(target: "ingest", source = label, error = ?e, "fetch failed");
                counter!("scrape_fetch_errors_total", "source" => label).increment(1);
                return stats;
            }
        };
        histogram!("scrape_fetch_ms", "source" => label)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        // The parsed document is not Send; keep it inside this block.
        let batch = {
            let doc = Html::parse_document(&html);
            harvest(&doc, source, max_headlines, Utc::now())
        };
        stats.scraped = batch.headlines.len();
        counter!("scrape_headlines_total", "source" => label).increment(stats.scraped as u64);
        counter!("scrape_rejected_total", "source" => label).increment(batch.rejected as u64);
        info!(
            target: "ingest",
            source = label,
            scraped = stats.scraped,
            rejected = batch.rejected,
            "headlines extracted"
        );

        for headline in batch.headlines {
            self.store_one(headline, skip_existing, &mut stats).await;
        }

        counter!("scrape_stored_total", "source" => label).increment(stats.stored as u64);
        counter!("scrape_skipped_total", "source" => label).increment(stats.skipped as u64);
        counter!("scrape_errors_total", "source" => label).increment(stats.errors as u64);
        gauge!("scrape_last_run_ts", "source" => label).set(Utc::now().timestamp() as f64);

        info!(
            target: "ingest",
            source = label,
            scraped = stats.scraped,
            stored = stats.stored,
            skipped = stats.skipped,
            errors = stats.errors,
            "ingest run complete"
        );
        stats
    }

    async fn store_one(&self, h: NormalizedHeadline, skip_existing: bool, stats: &mut RunStats) {
        if skip_existing {
            match self.store.exists_by_url(&h.url).await {
                Ok(true) => {
                    stats.skipped += 1;
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(target: "ingest", url = %h.url, error = ?e, "existence check failed");
                    stats.errors += 1;
                    return;
                }
            }
        }

        let sentiment = self.classifier.classify(&h.title);
        let record = NewHeadline {
            source: h.source.name().to_string(),
            title: h.title,
            url: h.url,
            published_at: Some(h.published_at),
            raw_text: None,
            sentiment: Some(sentiment.label),
            commentary: Some(sentiment.rationale),
            model_confidence: Some(sentiment.confidence),
        };

        match self.store.insert(record).await {
            Ok(row) => {
                stats.stored += 1;
                debug!(target: "ingest", id = row.id, title = %row.title, "stored headline");
            }
            Err(e) => {
                warn!(target: "ingest", error = ?e, "failed to store headline");
                stats.errors += 1;
            }
        }
    }

    /// Every known source, concurrently. Keyed by display name.
    pub async fn ingest_all(
        &self,
        max_headlines_per_source: usize,
        skip_existing: bool,
    ) -> BTreeMap<String, RunStats> {
        let runs = Source::ALL.iter().map(|&s| async move {
            let stats = self
                .ingest_source(s, max_headlines_per_source, skip_existing)
                .await;
            (s.name().to_string(), stats)
        });
        join_all(runs).await.into_iter().collect()
    }
}

/// Sum of `scraped` and `stored` across a multi-source run.
pub fn totals(results: &BTreeMap<String, RunStats>) -> (usize, usize) {
    results
        .values()
        .fold((0, 0), |(sc, st), r| (sc + r.scraped, st + r.stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_across_sources() {
        let mut m = BTreeMap::new();
        m.insert(
            "CNBC".to_string(),
            RunStats {
                scraped: 3,
                stored: 2,
                skipped: 1,
                errors: 0,
            },
        );
        m.insert(
            "Reuters".to_string(),
            RunStats {
                scraped: 4,
                stored: 4,
                ..Default::default()
            },
        );
        assert_eq!(totals(&m), (7, 6));
    }
}
