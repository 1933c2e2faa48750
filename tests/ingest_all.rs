// tests/ingest_all.rs
//
// Multi-source runs: one entry per known source, failures stay local.

use std::sync::Arc;

use finnews_sentiment::ingest::{totals, Ingestor};
use finnews_sentiment::scrape::{FixtureFetcher, Source};
use finnews_sentiment::sentiment::SentimentClassifier;
use finnews_sentiment::store::{HeadlineStore, MemoryStore};

fn page(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path).expect("read fixture")
}

#[tokio::test]
async fn one_failing_source_does_not_affect_the_others() {
    // No Reuters page: its fetch fails.
    let fetcher = FixtureFetcher::new()
        .with_page(Source::Cnbc.news_url(), &page("cnbc.html"))
        .with_page(Source::YahooFinance.news_url(), &page("yahoo.html"))
        .with_page(Source::MarketWatch.news_url(), &page("marketwatch.html"));
    let store = Arc::new(MemoryStore::new());
    let ing = Ingestor::new(
        Arc::new(fetcher),
        Arc::new(SentimentClassifier::keyword_only(64)),
        store.clone(),
    );

    let results = ing.ingest_all(10, true).await;

    let keys: Vec<_> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["CNBC", "MarketWatch", "Reuters", "Yahoo Finance"]);

    assert_eq!(results["Reuters"].scraped, 0);
    assert_eq!(results["Reuters"].stored, 0);
    assert_eq!(results["CNBC"].stored, 3);
    assert_eq!(results["Yahoo Finance"].stored, 2);
    assert_eq!(results["MarketWatch"].stored, 2);

    assert_eq!(totals(&results), (7, 7));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_headlines, 7);
    assert_eq!(stats.sources.get("Yahoo Finance"), Some(&2));
    assert!(!stats.sources.contains_key("Reuters"));
}

#[tokio::test]
async fn per_source_limit_applies_to_each_site() {
    let mut fetcher = FixtureFetcher::new();
    for (s, f) in [
        (Source::Cnbc, "cnbc.html"),
        (Source::YahooFinance, "yahoo.html"),
        (Source::Reuters, "reuters.html"),
        (Source::MarketWatch, "marketwatch.html"),
    ] {
        fetcher = fetcher.with_page(s.news_url(), &page(f));
    }
    let ing = Ingestor::new(
        Arc::new(fetcher),
        Arc::new(SentimentClassifier::keyword_only(64)),
        Arc::new(MemoryStore::new()),
    );

    let results = ing.ingest_all(1, true).await;
    assert_eq!(results.len(), Source::ALL.len());
    assert!(results.values().all(|r| r.scraped == 1 && r.stored == 1));

    // Everything already stored on the second pass.
    let again = ing.ingest_all(1, true).await;
    assert!(again.values().all(|r| r.stored == 0 && r.skipped == 1));
}
