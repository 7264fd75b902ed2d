use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio_test::assert_ok;

use estuary::app::{AppContext, EstuaryError, Result};
use estuary::config::Config;
use estuary::domain::stable_id;
use estuary::fetcher::Fetcher;
use estuary::query::ItemsRequest;
use estuary::store::{MemoryStore, SqliteStore, Store};

/// Serves canned documents; anything else is a 404.
#[derive(Default)]
struct CannedFetcher {
    documents: Mutex<HashMap<String, String>>,
}

impl CannedFetcher {
    fn serve(&self, url: &str, body: String) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), body);
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .map(String::into_bytes)
            .ok_or_else(|| EstuaryError::Other(format!("404 for {}", url)))
    }
}

fn rss(title: &str, links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|link| format!("<item><title>Post {0}</title><link>{0}</link></item>", link))
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>{}</title>{}</channel></rss>",
        title, items
    )
}

const CONFIG: &str = r#"
[settings]
concurrency = 4
fetch_timeout = "5s"
retention_days = 7
default_page_size = 2
max_page_size = 10
storage = "memory"

[[groups]]
name = "news"
feeds = ["https://news.example/rss", "https://wire.example/rss"]

[[groups]]
name = "tech"
feeds = ["https://tech.example/rss", "https://down.example/rss"]
"#;

fn context(store: Arc<dyn Store>) -> (AppContext, Arc<CannedFetcher>) {
    let config = Config::from_toml(CONFIG).unwrap();
    let transport = Arc::new(CannedFetcher::default());
    transport.serve(
        "https://news.example/rss",
        rss("News", &["https://news.example/1", "https://shared.example/x"]),
    );
    transport.serve(
        "https://wire.example/rss",
        rss("Wire", &["https://wire.example/1", "https://shared.example/x"]),
    );
    transport.serve("https://tech.example/rss", rss("Tech", &["https://tech.example/1"]));

    let ctx = AppContext::with_parts(&config, store, transport.clone());
    (ctx, transport)
}

#[tokio::test]
async fn test_cycle_then_paginate() {
    let (ctx, _) = context(Arc::new(MemoryStore::new()));

    let report = ctx.scheduler.run_cycle().await;
    assert_eq!(report.sources, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.new_items, 4);

    let mut seen = Vec::new();
    let mut request = ItemsRequest::default();
    loop {
        let page = ctx.query.list_items(&request).unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 2);
        request.after = page.last().map(|item| item.id.clone());
        seen.extend(page);
    }
    assert_eq!(seen.len(), 4);
    let shared = seen
        .iter()
        .find(|item| item.link == "https://shared.example/x")
        .unwrap();
    assert_eq!(shared.id, stable_id("https://shared.example/x"));

    let tech = ctx
        .query
        .list_items(&ItemsRequest {
            group_id: Some("tech".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(tech.len(), 1);
    assert_eq!(tech[0].feed_id, stable_id("https://tech.example/rss"));

    assert_eq!(ctx.query.list_groups(), ["news", "tech"]);
    let titles: Vec<_> = ctx
        .query
        .list_feeds()
        .unwrap()
        .into_iter()
        .filter_map(|feed| feed.title)
        .collect();
    assert_eq!(titles, ["News", "Tech", "Wire"]);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("estuary.db");

    {
        let store = Arc::new(SqliteStore::new(&path).unwrap());
        let (ctx, _) = context(store);
        assert_eq!(ctx.scheduler.run_cycle().await.new_items, 4);
    }

    let store = Arc::new(SqliteStore::new(&path).unwrap());
    let (ctx, transport) = context(store.clone());
    transport.serve(
        "https://down.example/rss",
        rss("Down", &["https://down.example/1", "https://news.example/1"]),
    );

    let report = ctx.scheduler.run_cycle().await;
    assert_eq!(report.failed, 0);
    assert_eq!(report.new_items, 1);
    assert_eq!(assert_ok!(store.count_items()), 5);
}

#[tokio::test]
async fn test_cleanup_blocks_purged_entries() {
    let (ctx, transport) = context(Arc::new(MemoryStore::new()));
    transport.serve(
        "https://news.example/rss",
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>News</title>
<item><title>Ancient</title><link>https://news.example/old</link><pubDate>Mon, 01 Jan 2001 00:00:00 GMT</pubDate></item>
</channel></rss>"#
            .to_string(),
    );

    // A cleanup run far in the future expires everything ingested today.
    let later = Utc::now().timestamp() + 30 * 86_400;
    ctx.scheduler.run_cycle().await;
    assert!(ctx.store.count_items().unwrap() > 0);
    let cleanup = ctx.retention.run_once(later).unwrap();
    assert_eq!(ctx.store.count_items().unwrap(), 0);
    assert!(cleanup.watermark > 978_307_200);

    // Every upstream entry is now at or before the watermark and stays out.
    let report = ctx.scheduler.run_cycle().await;
    assert_eq!(report.new_items, 0);
    assert_eq!(report.discarded, 4);
    assert_eq!(ctx.store.count_items().unwrap(), 0);
}
