// tests/store_json.rs
//
// File-backed store: persistence across reopen, listing order, rollback.

use chrono::{TimeZone, Utc};

use finnews_sentiment::sentiment::SentimentLabel;
use finnews_sentiment::store::{HeadlineQuery, HeadlineStore, JsonFileStore, NewHeadline};

fn new_headline(title: &str, url: &str, day: Option<u32>) -> NewHeadline {
    NewHeadline {
        source: "CNBC".to_string(),
        title: title.to_string(),
        url: url.to_string(),
        published_at: day.map(|d| Utc.with_ymd_and_hms(2025, 9, d, 0, 0, 0).unwrap()),
        raw_text: None,
        sentiment: Some(SentimentLabel::Neutral),
        commentary: None,
        model_confidence: None,
    }
}

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/headlines.json");

    {
        let store = JsonFileStore::open(&path).unwrap();
        store
            .insert(new_headline("Stocks rally into the close", "https://x.test/a", Some(1)))
            .await
            .unwrap();
        store
            .insert(new_headline("Treasury yields edge higher", "https://x.test/b", Some(2)))
            .await
            .unwrap();
    }

    let reopened = JsonFileStore::open(&path).unwrap();
    assert!(reopened.exists_by_url("https://x.test/a").await.unwrap());
    assert_eq!(reopened.stats().await.unwrap().total_headlines, 2);

    // Ids keep increasing after reopen.
    let c = reopened
        .insert(new_headline("Oil slips on demand worries", "https://x.test/c", None))
        .await
        .unwrap();
    assert_eq!(c.id, 3);
    assert!(!dir.path().join("nested/headlines.json.tmp").exists());
}

#[tokio::test]
async fn listing_puts_undated_rows_last() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("h.json")).unwrap();
    for (t, u, d) in [
        ("Undated headline for order", "https://x.test/u", None),
        ("Older dated headline here", "https://x.test/o", Some(1)),
        ("Newer dated headline here", "https://x.test/n", Some(5)),
    ] {
        store.insert(new_headline(t, u, d)).await.unwrap();
    }

    let (rows, total) = store
        .query(&HeadlineQuery {
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 3);
    let urls: Vec<_> = rows.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec!["https://x.test/n", "https://x.test/o", "https://x.test/u"]);

    let (page, total) = store
        .query(&HeadlineQuery {
            text: Some("DATED".into()),
            limit: 1,
            offset: 1,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].url, "https://x.test/o");
}

#[tokio::test]
async fn delete_and_delete_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.json");
    let store = JsonFileStore::open(&path).unwrap();
    let a = store
        .insert(new_headline("First headline to delete", "https://x.test/1", Some(1)))
        .await
        .unwrap();
    store
        .insert(new_headline("Second headline to keep", "https://x.test/2", Some(2)))
        .await
        .unwrap();

    assert!(store.delete(a.id).await.unwrap());
    assert!(!store.delete(a.id).await.unwrap());
    assert!(JsonFileStore::open(&path)
        .unwrap()
        .get(a.id)
        .await
        .unwrap()
        .is_none());

    assert_eq!(store.delete_all().await.unwrap(), 1);
    assert_eq!(
        JsonFileStore::open(&path).unwrap().stats().await.unwrap().total_headlines,
        0
    );
}

#[tokio::test]
async fn failed_snapshot_rolls_back_insert() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.json");
    let store = JsonFileStore::open(&path).unwrap();

    // A directory squatting on the temp path makes the snapshot write fail.
    std::fs::create_dir(dir.path().join("h.json.tmp")).unwrap();

    let err = store
        .insert(new_headline("This write cannot land", "https://x.test/z", None))
        .await;
    assert!(err.is_err());
    assert!(!store.exists_by_url("https://x.test/z").await.unwrap());
    assert_eq!(store.stats().await.unwrap().total_headlines, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_all_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.json");
    let store = std::sync::Arc::new(JsonFileStore::open(&path).unwrap());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .insert(new_headline(
                        &format!("Concurrent headline number {i}"),
                        &format!("https://x.test/c{i}"),
                        Some(1),
                    ))
                    .await
                    .unwrap()
                    .id
            })
        })
        .collect();
    let mut ids = Vec::new();
    for t in tasks {
        ids.push(t.await.unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 16);

    let reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.stats().await.unwrap().total_headlines, 16);
    for i in 0..16 {
        assert!(reopened.exists_by_url(&format!("https://x.test/c{i}")).await.unwrap());
    }
}

#[test]
fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(JsonFileStore::open(&path).is_err());
}
