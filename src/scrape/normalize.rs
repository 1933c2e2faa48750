//! Candidate → canonical headline. Each step either passes or rejects.
//!
//! Publish time comes from a `/YYYY/M/D/` URL segment, then from a nearby
//! `<time datetime>` marker, and otherwise defaults to "now". The last case
//! is an approximation and can misorder date-sorted listings; it is kept
//! as-is so ordering stays stable across runs of the same data.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{HeadlineCandidate, Source};

pub const MIN_RAW_TITLE_CHARS: usize = 10;
pub const MIN_TITLE_CHARS: usize = 15;
pub const MAX_TITLE_CHARS: usize = 200;

static RE_URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})/").expect("url date regex"));

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Navigation, promo and section-banner text that shows up inside links.
static CHROME_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(Subscribe|Sign|Login|Register|Menu|Search)",
        r"(?i)^(Watch|Listen|Read|More)",
        r"(?i)^(Yahoo|CNBC|Reuters|MarketWatch|Pro|Club)",
        r"(?i)^(Markets|Business|Investing|Tech|Politics)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("chrome prefix regex"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedHeadline {
    pub title: String,
    pub url: String,
    pub source: Source,
    pub published_at: DateTime<Utc>,
}

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TitleTooShort,
    MissingHref,
    UnresolvableUrl,
    NotArticle,
    LengthOutOfRange,
    ChromeText,
}

/// Decode entities, collapse whitespace, trim.
pub fn clean_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

pub fn is_chrome_title(title: &str) -> bool {
    CHROME_PREFIXES.iter().any(|re| re.is_match(title))
}

pub fn published_at_from_url(url: &str) -> Option<DateTime<Utc>> {
    let caps = RE_URL_DATE.captures(url)?;
    let y = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let m = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let d = caps.get(3)?.as_str().parse::<u32>().ok()?;
    let date = NaiveDate::from_ymd_opt(y, m, d)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Accepts RFC 3339 and naive ISO-8601 (`2025-09-17T14:30:00`) values.
pub fn parse_time_hint(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Resolve `href` against the site's base URL.
pub fn absolutize(source: Source, href: &str) -> Option<String> {
    let base = Url::parse(source.base_url()).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Validate and canonicalize one candidate. `now` is the publish-time fallback.
pub fn normalize(
    candidate: &HeadlineCandidate,
    now: DateTime<Utc>,
) -> Result<NormalizedHeadline, Rejection> {
    let source = candidate.source;
    let title = clean_title(&candidate.title);

    if title.chars().count() < MIN_RAW_TITLE_CHARS {
        return Err(Rejection::TitleTooShort);
    }
    if candidate.href.trim().is_empty() {
        return Err(Rejection::MissingHref);
    }
    let url = absolutize(source, &candidate.href).ok_or(Rejection::UnresolvableUrl)?;
    if !source.is_article_url(&url) {
        return Err(Rejection::NotArticle);
    }

    let published_at = published_at_from_url(&url)
        .or_else(|| candidate.time_hint.as_deref().and_then(parse_time_hint))
        .unwrap_or(now);

    let n = title.chars().count();
    if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&n) {
        return Err(Rejection::LengthOutOfRange);
    }
    if is_chrome_title(&title) {
        return Err(Rejection::ChromeText);
    }

    Ok(NormalizedHeadline {
        title,
        url,
        source,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cand(title: &str, href: &str) -> HeadlineCandidate {
        HeadlineCandidate {
            title: title.to_string(),
            href: href.to_string(),
            source: Source::Cnbc,
            time_hint: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_href_is_resolved_and_dated() {
        let h = normalize(
            &cand("Fed holds rates steady as inflation cools", "/2025/9/17/fed-holds.html"),
            now(),
        )
        .unwrap();
        assert_eq!(h.url, "https://www.cnbc.com/2025/9/17/fed-holds.html");
        assert_eq!(
            h.published_at,
            Utc.with_ymd_and_hms(2025, 9, 17, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn time_hint_used_when_url_has_no_date() {
        let mut c = cand("Oil prices climb on supply worries", "/finance/oil-climbs.html");
        c.time_hint = Some("2025-09-18T14:30:00+00:00".into());
        let h = normalize(&c, now()).unwrap();
        assert_eq!(
            h.published_at,
            Utc.with_ymd_and_hms(2025, 9, 18, 14, 30, 0).unwrap()
        );
    }

    #[test]
    fn defaults_to_now_without_any_date() {
        let h = normalize(&cand("Oil prices climb on supply worries", "/finance/oil.html"), now())
            .unwrap();
        assert_eq!(h.published_at, now());
    }

    #[test]
    fn invalid_calendar_date_falls_through() {
        assert!(published_at_from_url("https://x.test/2025/13/40/a").is_none());
    }

    #[test]
    fn rejection_steps() {
        let n = now();
        assert_eq!(normalize(&cand("Short", "/2025/9/1/a"), n), Err(Rejection::TitleTooShort));
        assert_eq!(
            normalize(&cand("A perfectly fine headline", ""), n),
            Err(Rejection::MissingHref)
        );
        assert_eq!(
            normalize(&cand("A perfectly fine headline", "/video/clip"), n),
            Err(Rejection::NotArticle)
        );
        // 10..15 chars passes the first gate but not the second
        assert_eq!(
            normalize(&cand("Dow up 1% now", "/2025/9/1/a"), n),
            Err(Rejection::LengthOutOfRange)
        );
        assert_eq!(
            normalize(&cand(&"x".repeat(201), "/2025/9/1/a"), n),
            Err(Rejection::LengthOutOfRange)
        );
        assert_eq!(
            normalize(&cand("Subscribe to our daily newsletter", "/2025/9/1/a"), n),
            Err(Rejection::ChromeText)
        );
        assert_eq!(
            normalize(&cand("markets live: what to watch today", "/2025/9/1/a"), n),
            Err(Rejection::ChromeText)
        );
    }

    #[test]
    fn title_bounds_are_inclusive() {
        let n = now();
        assert!(normalize(&cand(&"a".repeat(15), "/2025/9/1/a"), n).is_ok());
        assert!(normalize(&cand(&"a".repeat(200), "/2025/9/1/a"), n).is_ok());
    }

    #[test]
    fn clean_title_collapses_whitespace_and_entities() {
        assert_eq!(
            clean_title("  Apple &amp; Google\n\t shares   rise "),
            "Apple & Google shares rise"
        );
    }
}
