//! Headline persistence boundary.
//!
//! URL uniqueness is enforced by the caller (`exists_by_url` before
//! `insert`), not by the store, so two concurrent ingesters can still race
//! and write the same URL twice.

pub mod json_file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::sentiment::SentimentLabel;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHeadline {
    pub id: u64,
    pub source: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub raw_text: Option<String>,
    pub sentiment: Option<SentimentLabel>,
    pub commentary: Option<String>,
    pub model_confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHeadline {
    pub source: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub sentiment: Option<SentimentLabel>,
    #[serde(default)]
    pub commentary: Option<String>,
    #[serde(default)]
    pub model_confidence: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlineQuery {
    pub source: Option<String>,
    pub sentiment: Option<SentimentLabel>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the title.
    pub text: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeStats {
    pub total_headlines: usize,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub sources: BTreeMap<String, usize>,
}

#[async_trait]
pub trait HeadlineStore: Send + Sync {
    async fn exists_by_url(&self, url: &str) -> Result<bool>;
    async fn insert(&self, headline: NewHeadline) -> Result<StoredHeadline>;
    async fn get(&self, id: u64) -> Result<Option<StoredHeadline>>;
    /// Filtered page plus the total number of matches before pagination.
    async fn query(&self, q: &HeadlineQuery) -> Result<(Vec<StoredHeadline>, usize)>;
    async fn delete(&self, id: u64) -> Result<bool>;
    async fn delete_all(&self) -> Result<usize>;
    /// Newest-created first.
    async fn recent(&self, source: Option<&str>, limit: usize) -> Result<Vec<StoredHeadline>>;
    async fn stats(&self) -> Result<ScrapeStats>;
}

pub type DynStore = Arc<dyn HeadlineStore>;

pub(crate) fn matches_query(q: &HeadlineQuery, h: &StoredHeadline) -> bool {
    if q.source.as_deref().is_some_and(|s| s != h.source) {
        return false;
    }
    if q.sentiment.is_some() && q.sentiment != h.sentiment {
        return false;
    }
    if let Some(start) = q.start {
        if !h.published_at.is_some_and(|p| p >= start) {
            return false;
        }
    }
    if let Some(end) = q.end {
        if !h.published_at.is_some_and(|p| p <= end) {
            return false;
        }
    }
    if let Some(text) = q.text.as_deref() {
        if !h.title.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    true
}

/// Listing order: published desc (unknown last), then created desc.
pub(crate) fn sort_for_listing(rows: &mut [StoredHeadline]) {
    rows.sort_by_key(|h| {
        (
            h.published_at.is_none(),
            Reverse(h.published_at),
            Reverse(h.created_at),
            Reverse(h.id),
        )
    });
}

pub(crate) fn compute_stats<'a>(rows: impl IntoIterator<Item = &'a StoredHeadline>) -> ScrapeStats {
    let mut stats = ScrapeStats::default();
    for h in rows {
        stats.total_headlines += 1;
        match h.sentiment {
            Some(SentimentLabel::Positive) => stats.positive += 1,
            Some(SentimentLabel::Negative) => stats.negative += 1,
            Some(SentimentLabel::Neutral) => stats.neutral += 1,
            None => {}
        }
        *stats.sources.entry(h.source.clone()).or_default() += 1;
    }
    stats
}
