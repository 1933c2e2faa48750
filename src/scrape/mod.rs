//! Per-site scraping: source table, HTML extraction, normalization, fetching.
//!
//! Each known site is a `Source` variant backed by one `SourceProfile` row:
//! base URL, listing page, ranked CSS selectors and the article-URL
//! predicate. Adding a site means adding a variant and a row.

pub mod extract;
pub mod fetch;
pub mod normalize;

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use extract::{candidates, extract, harvest, Harvest, HeadlineCandidate};
pub use fetch::{FixtureFetcher, HttpFetcher, PageFetcher};
pub use normalize::{normalize, NormalizedHeadline, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "CNBC")]
    Cnbc,
    #[serde(rename = "Yahoo Finance")]
    YahooFinance,
    #[serde(rename = "Reuters")]
    Reuters,
    #[serde(rename = "MarketWatch")]
    MarketWatch,
}

/// Static description of one site.
#[derive(Debug)]
pub struct SourceProfile {
    pub name: &'static str,
    pub base_url: &'static str,
    pub news_url: &'static str,
    /// Ranked; earlier selectors fill the batch first. `{year}` is replaced
    /// with the current UTC year.
    pub selectors: &'static [&'static str],
    /// Regexes; any match marks an article URL.
    pub article_patterns: &'static [&'static str],
    /// Plain substrings; any match marks an article URL.
    pub article_markers: &'static [&'static str],
}

const DATED_PATH: &str = r"/\d{4}/\d{1,2}/\d{1,2}/";

static CNBC: SourceProfile = SourceProfile {
    name: "CNBC",
    base_url: "https://www.cnbc.com",
    news_url: "https://www.cnbc.com/finance/",
    selectors: &[
        r#"a[data-module="ArticleLink"]"#,
        r#"a[href*="/{year}/"]"#,
        ".ArticleWrap a",
        ".RiverHeadline a",
        "h2 a",
        "h3 a",
    ],
    article_patterns: &[DATED_PATH],
    article_markers: &["/finance/", "/business/", "/markets/", "/investing/"],
};

static YAHOO_FINANCE: SourceProfile = SourceProfile {
    name: "Yahoo Finance",
    base_url: "https://finance.yahoo.com",
    news_url: "https://finance.yahoo.com/news/",
    selectors: &[
        "h3 a",
        "h2 a",
        ".js-content-viewer a",
        r#"[data-module="ArticleItem"] a"#,
        r".Ov\(h\) a",
        r#"a[href*="/news/"]"#,
    ],
    article_patterns: &[r"/news/[^/]+-", r"/news/\d{4}-\d{2}-\d{2}"],
    article_markers: &[],
};

static REUTERS: SourceProfile = SourceProfile {
    name: "Reuters",
    base_url: "https://www.reuters.com",
    news_url: "https://www.reuters.com/markets/",
    selectors: &[
        r#"a[data-testid="Link"]"#,
        "h3 a",
        "h2 a",
        ".media-story-card a",
        ".story-card a",
        r#"a[href*="/business/"]"#,
        r#"a[href*="/markets/"]"#,
    ],
    article_patterns: &[r"/business/[^/]+-", r"/markets/[^/]+-", DATED_PATH],
    article_markers: &["/business/", "/markets/"],
};

static MARKETWATCH: SourceProfile = SourceProfile {
    name: "MarketWatch",
    base_url: "https://www.marketwatch.com",
    news_url: "https://www.marketwatch.com/latest-news",
    selectors: &[
        "h3 a",
        "h2 a",
        ".article__headline a",
        ".link",
        r#"a[href*="/story/"]"#,
        r#"a[href*="/article/"]"#,
    ],
    article_patterns: &[r"/story/", r"/article/", DATED_PATH],
    article_markers: &["/story/", "/article/"],
};

static COMPILED_PATTERNS: Lazy<HashMap<Source, Vec<Regex>>> = Lazy::new(|| {
    Source::ALL
        .iter()
        .map(|s| {
            let res = s
                .profile()
                .article_patterns
                .iter()
                .map(|p| Regex::new(p).expect("article pattern regex"))
                .collect();
            (*s, res)
        })
        .collect()
});

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Cnbc,
        Source::YahooFinance,
        Source::Reuters,
        Source::MarketWatch,
    ];

    pub fn profile(&self) -> &'static SourceProfile {
        match self {
            Source::Cnbc => &CNBC,
            Source::YahooFinance => &YAHOO_FINANCE,
            Source::Reuters => &REUTERS,
            Source::MarketWatch => &MARKETWATCH,
        }
    }

    /// Display name, also the `source` value persisted with each headline.
    pub fn name(&self) -> &'static str {
        self.profile().name
    }

    pub fn base_url(&self) -> &'static str {
        self.profile().base_url
    }

    pub fn news_url(&self) -> &'static str {
        self.profile().news_url
    }

    /// Case-insensitive lookup; accepts the `YAHOO` alias.
    pub fn from_name(name: &str) -> Option<Source> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CNBC" => Some(Source::Cnbc),
            "YAHOO" | "YAHOO FINANCE" => Some(Source::YahooFinance),
            "REUTERS" => Some(Source::Reuters),
            "MARKETWATCH" => Some(Source::MarketWatch),
            _ => None,
        }
    }

    /// Selector strings in rank order with `{year}` expanded.
    pub fn selectors(&self) -> Vec<String> {
        let year = Utc::now().year().to_string();
        self.profile()
            .selectors
            .iter()
            .map(|s| s.replace("{year}", &year))
            .collect()
    }

    /// Heuristic: does this absolute URL look like an article on this site?
    pub fn is_article_url(&self, url: &str) -> bool {
        let p = self.profile();
        if COMPILED_PATTERNS
            .get(self)
            .is_some_and(|res| res.iter().any(|re| re.is_match(url)))
        {
            return true;
        }
        if p.article_markers.iter().any(|m| url.contains(m)) {
            return true;
        }
        match self {
            // Any deeper /news/ path on Yahoo is treated as a story.
            Source::YahooFinance => url.contains("/news/") && url.split('/').count() > 4,
            _ => false,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
