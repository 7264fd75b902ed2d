pub mod http_fetcher;
pub mod parallel;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::app::{EstuaryError, Result};
use crate::domain::{FeedInfo, Item};
use crate::normalizer::{Normalizer, ParsedFeed};
use crate::registry::Source;

/// Raw transport: fetch the document at `url`.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Items and feed metadata from one successful fetch of a source.
#[derive(Debug, Clone)]
pub struct FetchedSource {
    pub info: FeedInfo,
    /// Entries in the document, including the ones that were skipped.
    pub entries: usize,
    pub items: Vec<Item>,
}

/// Fetch + parse for a single source. Every failure, including a timeout,
/// comes back as `FetchFailed` for that source alone.
#[derive(Clone)]
pub struct SourceFetcher {
    transport: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(transport: Arc<dyn Fetcher + Send + Sync>, timeout: Duration) -> Self {
        Self {
            transport,
            normalizer: Normalizer::new(),
            timeout,
        }
    }

    pub async fn fetch_info(&self, url: &str) -> Result<FeedInfo> {
        let parsed = self.fetch_parsed(url).await?;
        Ok(Self::info(url, &parsed))
    }

    pub async fn fetch_items(&self, source: &Source) -> Result<FetchedSource> {
        let parsed = self.fetch_parsed(&source.url).await?;
        let now = Utc::now().timestamp();
        let items = self.normalizer.normalize(source, &parsed.entries, now);

        Ok(FetchedSource {
            info: Self::info(&source.url, &parsed),
            entries: parsed.entries.len(),
            items,
        })
    }

    async fn fetch_parsed(&self, url: &str) -> Result<ParsedFeed> {
        let body = match tokio::time::timeout(self.timeout, self.transport.fetch(url)).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return Err(EstuaryError::fetch_failed(url, e)),
            Err(_) => {
                return Err(EstuaryError::fetch_failed(
                    url,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        self.normalizer
            .parse(&body)
            .map_err(|e| EstuaryError::fetch_failed(url, e))
    }

    fn info(url: &str, parsed: &ParsedFeed) -> FeedInfo {
        FeedInfo {
            title: parsed.title.clone(),
            link: parsed.link.clone().unwrap_or_else(|| url.to_string()),
        }
    }
}
