//! Primary headline classifier: a pre-trained linear bag-of-words model.
//!
//! The model file is JSON:
//! ```json
//! {
//!   "name": "finance-headlines-bow-v1",
//!   "max_tokens": 64,
//!   "bias": [0.1, 0.4, 0.0],
//!   "vocab": { "surge": [-1.2, -0.3, 1.9] },
//!   "id2label": { "0": "negative", "1": "neutral", "2": "positive" }
//! }
//! ```
//! Logits are `bias + sum(vocab[token])` over the (truncated) token stream,
//! followed by softmax and arg-max. Without `id2label` the class index maps
//! as `{0: negative, 1: neutral, 2: positive}`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::SentimentLabel;

fn default_max_tokens() -> usize {
    128
}

fn default_name() -> String {
    "linear-bow".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    #[serde(default = "default_name")]
    pub name: String,
    /// Input is truncated to this many tokens before inference.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    pub bias: Vec<f32>,
    pub vocab: HashMap<String, Vec<f32>>,
    #[serde(default)]
    pub id2label: Option<HashMap<String, String>>,
}

/// Outcome of one primary-model call. The classifier matches on this to
/// decide whether the keyword fallback runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    Classified {
        label: SentimentLabel,
        confidence: f32,
    },
    Failed {
        reason: String,
    },
}

impl LinearModel {
    /// Read, parse and validate a model file. Returns the model plus a short
    /// SHA-256 fingerprint of the file bytes for logging.
    pub fn load(path: &Path) -> Result<(Self, String)> {
        let raw = fs::read(path).with_context(|| format!("reading model {}", path.display()))?;
        let fingerprint = fingerprint(&raw);
        let text = std::str::from_utf8(&raw).context("model file is not utf-8")?;
        let model = Self::from_json(text)?;
        Ok((model, fingerprint))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(s).context("parsing model json")?;
        model.validate()?;
        Ok(model)
    }

    pub fn num_classes(&self) -> usize {
        self.bias.len()
    }

    fn validate(&self) -> Result<()> {
        if self.bias.is_empty() {
            bail!("model has no classes");
        }
        if self.max_tokens == 0 {
            bail!("max_tokens must be > 0");
        }
        if let Some((term, w)) = self
            .vocab
            .iter()
            .find(|(_, w)| w.len() != self.bias.len())
        {
            bail!(
                "vocab entry '{term}' has {} weights, expected {}",
                w.len(),
                self.bias.len()
            );
        }
        Ok(())
    }

    /// Run inference. Never panics; any problem becomes `ModelOutcome::Failed`.
    pub fn predict(&self, text: &str) -> ModelOutcome {
        let mut logits = self.bias.clone();
        for token in tokenize(text).take(self.max_tokens) {
            if let Some(weights) = self.vocab.get(&token) {
                for (l, w) in logits.iter_mut().zip(weights) {
                    *l += w;
                }
            }
        }

        let probs = match softmax(&logits) {
            Some(p) => p,
            None => {
                return ModelOutcome::Failed {
                    reason: "non-finite logits".to_string(),
                }
            }
        };

        let Some((idx, &confidence)) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            return ModelOutcome::Failed {
                reason: "empty output".to_string(),
            };
        };

        match self.label_for(idx) {
            Some(label) => ModelOutcome::Classified { label, confidence },
            None => ModelOutcome::Failed {
                reason: format!("class {idx} has no sentiment mapping"),
            },
        }
    }

    fn label_for(&self, idx: usize) -> Option<SentimentLabel> {
        match &self.id2label {
            Some(map) => map
                .get(&idx.to_string())
                .and_then(|name| SentimentLabel::from_str(name).ok()),
            None => match idx {
                0 => Some(SentimentLabel::Negative),
                1 => Some(SentimentLabel::Neutral),
                2 => Some(SentimentLabel::Positive),
                _ => None,
            },
        }
    }
}

/// Lowercase alphanumeric tokens (apostrophes dropped).
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn softmax(logits: &[f32]) -> Option<Vec<f32>> {
    if logits.iter().any(|l| !l.is_finite()) {
        return None;
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(exps.into_iter().map(|e| e / sum).collect())
}

fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
