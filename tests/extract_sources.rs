// tests/extract_sources.rs
//
// Per-site extraction against saved listing pages (tests/fixtures/*.html).

use chrono::{TimeZone, Utc};
use scraper::Html;

use finnews_sentiment::scrape::{candidates, harvest, Source};

fn fixture(name: &str) -> Html {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = std::fs::read_to_string(&path).expect("read fixture");
    Html::parse_document(&raw)
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 20, 12, 0, 0).unwrap()
}

fn titles(source: Source, page: &str) -> Vec<String> {
    harvest(&fixture(page), source, 20, now())
        .headlines
        .into_iter()
        .map(|h| h.title)
        .collect()
}

#[test]
fn cnbc_keeps_articles_in_rank_order() {
    let doc = fixture("cnbc.html");
    let h = harvest(&doc, Source::Cnbc, 20, now());

    let t: Vec<_> = h.headlines.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(
        t,
        vec![
            "Stocks surge to record highs on strong earnings",
            "Oil prices crash amid recession fears",
            "Federal Reserve announces quarterly meeting schedule",
        ]
    );
    // "Markets" (too short), Pro promo and the video link
    assert_eq!(h.rejected, 3);

    let first = &h.headlines[0];
    assert_eq!(
        first.url,
        "https://www.cnbc.com/2025/09/17/stocks-surge-to-record-highs-on-strong-earnings.html"
    );
    assert_eq!(
        first.published_at,
        Utc.with_ymd_and_hms(2025, 9, 17, 0, 0, 0).unwrap()
    );
    assert!(h.headlines.iter().all(|h| h.source == Source::Cnbc));
}

#[test]
fn duplicate_links_collapse_to_one_candidate() {
    let doc = fixture("cnbc.html");
    let c = candidates(&doc, Source::Cnbc);
    let surge = c
        .iter()
        .filter(|c| c.href.contains("stocks-surge-to-record-highs"))
        .count();
    assert_eq!(surge, 1);
}

#[test]
fn max_bounds_accepted_headlines() {
    let doc = fixture("cnbc.html");
    let h = harvest(&doc, Source::Cnbc, 2, now());
    assert_eq!(h.headlines.len(), 2);
    assert_eq!(h.rejected, 0);

    assert!(harvest(&doc, Source::Cnbc, 0, now()).headlines.is_empty());
}

#[test]
fn yahoo_uses_time_marker_and_skips_quotes() {
    let doc = fixture("yahoo.html");
    let h = harvest(&doc, Source::YahooFinance, 20, now());
    assert_eq!(h.headlines.len(), 2);
    assert_eq!(h.rejected, 1);

    assert_eq!(h.headlines[0].title, "Bank stocks slide on credit & loan concerns");
    assert_eq!(h.headlines[0].published_at, now());

    let apple = &h.headlines[1];
    assert_eq!(
        apple.url,
        "https://finance.yahoo.com/news/apple-shares-climb-after-upbeat-forecast-123456.html"
    );
    assert_eq!(
        apple.published_at,
        Utc.with_ymd_and_hms(2025, 9, 18, 8, 0, 0).unwrap()
    );
}

#[test]
fn reuters_and_marketwatch_pages() {
    assert_eq!(
        titles(Source::Reuters, "reuters.html"),
        vec![
            "Wall Street rallies as inflation cools",
            "OPEC output talks stall as prices drop",
        ]
    );
    assert_eq!(
        titles(Source::MarketWatch, "marketwatch.html"),
        vec!["Dow rises as tech stocks rebound", "Gold slips as the dollar firms"]
    );
}

#[test]
fn page_without_matches_is_empty_not_an_error() {
    let doc = Html::parse_document("<html><body><p>Maintenance</p></body></html>");
    for s in Source::ALL {
        let h = harvest(&doc, s, 20, now());
        assert!(h.headlines.is_empty());
        assert_eq!(h.rejected, 0);
    }
}
