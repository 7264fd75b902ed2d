use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::app::{EstuaryError, Result};
use crate::config::default_concurrency;
use crate::domain::FeedInfo;
use crate::fetcher::{FetchedSource, SourceFetcher};
use crate::registry::Source;

/// Runs one fetch per source with at most `workers` in flight, and returns
/// only once every fetch has finished or failed.
pub struct ParallelFetcher {
    fetcher: SourceFetcher,
    semaphore: Arc<Semaphore>,
    workers: usize,
}

impl ParallelFetcher {
    pub fn new(fetcher: SourceFetcher) -> Self {
        Self::with_workers(fetcher, default_concurrency())
    }

    pub fn with_workers(fetcher: SourceFetcher, workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn fetch_info_all(&self, sources: &[Source]) -> Vec<(Source, Result<FeedInfo>)> {
        self.run_all(sources, |fetcher, source| async move {
            fetcher.fetch_info(&source.url).await
        })
        .await
    }

    pub async fn fetch_items_all(&self, sources: &[Source]) -> Vec<(Source, Result<FetchedSource>)> {
        self.run_all(sources, |fetcher, source| async move {
            fetcher.fetch_items(&source).await
        })
        .await
    }

    /// Results come back in the order of `sources`.
    async fn run_all<T, F, Fut>(&self, sources: &[Source], task: F) -> Vec<(Source, Result<T>)>
    where
        T: Send + 'static,
        F: Fn(SourceFetcher, Source) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let handles = sources.iter().map(|source| {
            let semaphore = self.semaphore.clone();
            let job = task(self.fetcher.clone(), source.clone());

            tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| EstuaryError::Other(e.to_string()))?;
                job.await
            })
        });
        let joined = join_all(handles).await;

        sources
            .iter()
            .cloned()
            .zip(joined)
            .map(|(source, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    tracing::error!("Task join error for {}: {}", source.url, e);
                    Err(EstuaryError::fetch_failed(&source.url, e))
                });
                (source, result)
            })
            .collect()
    }
}
