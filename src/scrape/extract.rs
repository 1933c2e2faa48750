//! Ranked-selector extraction of headline candidates from a listing page.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::normalize::{absolutize, normalize, NormalizedHeadline, Rejection};
use super::Source;

static TIME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time[datetime]").expect("time selector"));

/// Raw (title, link) pair pulled from a page. May be navigation or ads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineCandidate {
    pub title: String,
    pub href: String,
    pub source: Source,
    /// `datetime` of a `<time>` element next to the link, if any.
    pub time_hint: Option<String>,
}

fn compiled_selectors(source: Source) -> Vec<Selector> {
    source
        .selectors()
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                warn!(source = %source, selector = %s, error = ?e, "skipping unparseable selector");
                None
            }
        })
        .collect()
}

fn nearby_time(element: &ElementRef<'_>) -> Option<String> {
    let parent = element.parent().and_then(ElementRef::wrap)?;
    parent
        .select(&TIME_SELECTOR)
        .find_map(|t| t.value().attr("datetime"))
        .map(|s| s.to_string())
}

fn to_candidate(source: Source, element: ElementRef<'_>) -> HeadlineCandidate {
    HeadlineCandidate {
        title: element.text().collect::<String>(),
        href: element.value().attr("href").unwrap_or_default().to_string(),
        source,
        time_hint: nearby_time(&element),
    }
}

/// Every selector match in rank order, duplicates included.
fn ranked(document: &Html, source: Source) -> Vec<HeadlineCandidate> {
    compiled_selectors(source)
        .iter()
        .flat_map(|selector| {
            document
                .select(selector)
                .map(|e| to_candidate(source, e))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Every candidate on the page in selector rank order, deduplicated by
/// absolute URL (first seen wins). Links without `href` are passed through
/// so the normalizer can reject them.
pub fn candidates(document: &Html, source: Source) -> Vec<HeadlineCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    ranked(document, source)
        .into_iter()
        .filter(|c| {
            c.href.trim().is_empty()
                || seen.insert(absolutize(source, &c.href).unwrap_or_else(|| c.href.clone()))
        })
        .collect()
}

/// At most `max_count` candidates; earlier selectors take priority.
pub fn extract(document: &Html, source: Source, max_count: usize) -> Vec<HeadlineCandidate> {
    let mut all = candidates(document, source);
    all.truncate(max_count);
    all
}

/// Accepted headlines from one page plus the number of rejected candidates.
#[derive(Debug, Default)]
pub struct Harvest {
    pub headlines: Vec<NormalizedHeadline>,
    pub rejected: usize,
}

/// Walk the ranked candidate stream through the normalizer and keep the
/// first `max` accepted headlines. `max` bounds valid headlines, so junk
/// links early in the page do not starve the batch. URL dedup applies to
/// accepted headlines only: a thumbnail link cannot shadow the text link
/// to the same article. Later copies of an accepted URL are dropped
/// without counting as rejections.
pub fn harvest(document: &Html, source: Source, max: usize, now: DateTime<Utc>) -> Harvest {
    let mut h = Harvest::default();
    let mut seen: HashSet<String> = HashSet::new();
    for c in ranked(document, source) {
        if h.headlines.len() >= max {
            break;
        }
        match normalize(&c, now) {
            Ok(n) => {
                if seen.insert(n.url.clone()) {
                    h.headlines.push(n);
                }
            }
            Err(reason) => {
                h.rejected += 1;
                log_rejection(&c, reason);
            }
        }
    }
    h
}

fn log_rejection(c: &HeadlineCandidate, reason: Rejection) {
    debug!(source = %c.source, href = %c.href, ?reason, "candidate rejected");
}
