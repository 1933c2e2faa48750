//! Headline sentiment: primary model with keyword fallback and a result cache.
//!
//! `SentimentClassifier` is an explicitly constructed context object; callers
//! hold it behind `Arc<dyn HeadlineClassifier>` so tests can swap in fakes.

pub mod cache;
pub mod keywords;
pub mod model;

use metrics::counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use cache::{SentimentCache, DEFAULT_CACHE_CAPACITY};
pub use model::{LinearModel, ModelOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            other => Err(anyhow::anyhow!("unknown sentiment label: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub rationale: String,
}

/// Anything that can label a headline. Implementations must not fail.
pub trait HeadlineClassifier: Send + Sync {
    fn classify(&self, headline: &str) -> SentimentResult;
    fn name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn HeadlineClassifier>;

/// Two-tier classifier: lazily-loaded linear model, keyword scorer fallback,
/// exact-text result cache.
pub struct SentimentClassifier {
    model_path: Option<PathBuf>,
    /// `Some(None)` once a load was attempted and failed: keyword-only from then on.
    model: OnceCell<Option<Arc<LinearModel>>>,
    cache: SentimentCache,
}

impl SentimentClassifier {
    pub fn new(model_path: Option<PathBuf>, cache_capacity: usize) -> Self {
        Self {
            model_path,
            model: OnceCell::new(),
            cache: SentimentCache::with_capacity(cache_capacity),
        }
    }

    /// No model at all; every miss goes to the keyword scorer.
    pub fn keyword_only(cache_capacity: usize) -> Self {
        Self::new(None, cache_capacity)
    }

    /// Use an already-built model (tests, embedding).
    pub fn with_model(model: LinearModel, cache_capacity: usize) -> Self {
        let s = Self::new(None, cache_capacity);
        let _ = s.model.set(Some(Arc::new(model)));
        s
    }

    /// Force model construction now. Returns whether a model is available.
    pub fn preload(&self) -> bool {
        self.model().is_some()
    }

    pub fn cache(&self) -> &SentimentCache {
        &self.cache
    }

    fn model(&self) -> Option<&Arc<LinearModel>> {
        self.model
            .get_or_init(|| {
                let path = self.model_path.as_ref()?;
                match LinearModel::load(path) {
                    Ok((m, fingerprint)) => {
                        info!(
                            model = %m.name,
                            path = %path.display(),
                            %fingerprint,
                            classes = m.num_classes(),
                            vocab = m.vocab.len(),
                            "sentiment model loaded"
                        );
                        Some(Arc::new(m))
                    }
                    Err(e) => {
                        warn!(error = ?e, path = %path.display(), "sentiment model unavailable; using keyword fallback");
                        None
                    }
                }
            })
            .as_ref()
    }

    fn classify_uncached(&self, headline: &str) -> SentimentResult {
        let outcome = match self.model() {
            Some(m) => m.predict(headline),
            None => ModelOutcome::Failed {
                reason: "model not loaded".to_string(),
            },
        };

        match outcome {
            ModelOutcome::Classified { label, confidence } => SentimentResult {
                label,
                confidence,
                rationale: format!(
                    "Model {} classified headline as {}",
                    self.model().map(|m| m.name.as_str()).unwrap_or("unknown"),
                    label
                ),
            },
            ModelOutcome::Failed { reason } => {
                debug!(%reason, "primary classifier failed; keyword fallback");
                counter!("sentiment_fallback_total").increment(1);
                keywords::analyze(headline)
            }
        }
    }
}

impl HeadlineClassifier for SentimentClassifier {
    fn classify(&self, headline: &str) -> SentimentResult {
        if let Some(hit) = self.cache.get(headline) {
            counter!("sentiment_cache_hits_total").increment(1);
            return hit;
        }

        let mut result = self.classify_uncached(headline);
        result.confidence = result.confidence.clamp(0.0, 1.0);
        result.rationale = format!("{} (confidence: {:.2})", result.rationale, result.confidence);

        self.cache.insert(headline, result.clone());
        result
    }

    fn name(&self) -> &'static str {
        if self.model().is_some() {
            "model+keywords"
        } else {
            "keywords"
        }
    }
}
