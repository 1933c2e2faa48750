//! Deterministic keyword scorer used when the model path is unavailable.
//!
//! Terms are matched by substring containment against the lowercased text,
//! so `"rise"` also fires on `"rises"` and `"rising"` does not. Weights are
//! 1 (mild) or 2 (strong). The scorer is pure and total.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

use super::{SentimentLabel, SentimentResult};

/// Per-term bonus for finance-register vocabulary.
const FINANCE_BONUS: f32 = 0.1;
/// Flat bonus when any crisis-register term is present.
const CRISIS_BONUS: f32 = 0.2;
/// Upper bound for the summed context bonus.
const MAX_CONTEXT_BONUS: f32 = 0.3;
/// A side must lead by more than this to win the label.
const LABEL_MARGIN: f32 = 0.5;

#[derive(Debug, Deserialize)]
struct Lexicon {
    positive: HashMap<String, u8>,
    negative: HashMap<String, u8>,
    #[serde(default)]
    finance_context: Vec<String>,
    #[serde(default)]
    crisis_context: Vec<String>,
}

static LEXICON: Lazy<Lexicon> = Lazy::new(|| {
    let raw = include_str!("../../keyword_lexicon.json");
    serde_json::from_str::<Lexicon>(raw).expect("valid keyword lexicon")
});

/// Raw scores behind a keyword classification, exposed for diagnostics/tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordScores {
    pub positive: f32,
    pub negative: f32,
    pub context_bonus: f32,
}

impl KeywordScores {
    pub fn total(&self) -> f32 {
        self.positive + self.negative
    }
}

fn weighted_hits(table: &HashMap<String, u8>, lowered: &str) -> f32 {
    // Integer sum: an empty f32 sum is -0.0 and would leak into rationales.
    let total: u32 = table
        .iter()
        .filter(|(term, _)| lowered.contains(term.as_str()))
        .map(|(_, w)| u32::from(*w))
        .sum();
    total as f32
}

/// Compute positive/negative scores and the context bonus for `text`.
pub fn score(text: &str) -> KeywordScores {
    let lowered = text.to_lowercase();
    let lex = &*LEXICON;

    let positive = weighted_hits(&lex.positive, &lowered);
    let negative = weighted_hits(&lex.negative, &lowered);

    let finance_hits = lex
        .finance_context
        .iter()
        .filter(|t| lowered.contains(t.as_str()))
        .count();
    let crisis = lex
        .crisis_context
        .iter()
        .any(|t| lowered.contains(t.as_str()));

    let mut bonus = finance_hits as f32 * FINANCE_BONUS;
    if crisis {
        bonus += CRISIS_BONUS;
    }

    KeywordScores {
        positive,
        negative,
        context_bonus: bonus.min(MAX_CONTEXT_BONUS),
    }
}

/// Label decision with an asymmetric margin; ties and near-ties are neutral.
pub fn label_for(scores: &KeywordScores) -> SentimentLabel {
    if scores.positive > scores.negative + LABEL_MARGIN {
        SentimentLabel::Positive
    } else if scores.negative > scores.positive + LABEL_MARGIN {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Confidence estimate in `[0.4, 0.95]`.
pub fn confidence_for(scores: &KeywordScores) -> f32 {
    let total = scores.total();
    let base = if total > 0.0 {
        (total * 0.05 + 0.4).min(0.9)
    } else {
        0.5
    };
    (base + scores.context_bonus).min(0.95)
}

/// Classify `text` by keyword scoring. Never fails.
pub fn analyze(text: &str) -> SentimentResult {
    let scores = score(text);
    let label = label_for(&scores);
    SentimentResult {
        label,
        confidence: confidence_for(&scores),
        rationale: format!(
            "Keyword analysis found {} sentiment (positive score {:.1}, negative score {:.1})",
            label.as_str(),
            scores.positive,
            scores.negative
        ),
    }
}
