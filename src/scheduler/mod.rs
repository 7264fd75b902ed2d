//! Background fetch cycles.
//!
//! One cycle fetches every configured source on the bounded pool, waits for
//! all of them, then merges the batches into the store. The next cycle
//! starts `update_interval` after the previous one finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::app::Result;
use crate::config::format_interval;
use crate::domain::{Feed, Item};
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::FetchedSource;
use crate::registry::{Source, SourceRegistry};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fetching,
    Merging,
}

/// Summary of one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sources: usize,
    pub failed: usize,
    pub new_items: usize,
    /// Items published at or before the watermark.
    pub discarded: usize,
    /// Entries dropped for lacking a link or title.
    pub skipped: usize,
}

pub struct Scheduler {
    store: Arc<dyn Store>,
    registry: Arc<SourceRegistry>,
    fetcher: ParallelFetcher,
    interval: Duration,
    phase: watch::Sender<CyclePhase>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<SourceRegistry>,
        fetcher: ParallelFetcher,
        interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(CyclePhase::Idle);
        Self {
            store,
            registry,
            fetcher,
            interval,
            phase,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<CyclePhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: CyclePhase) {
        debug!("Scheduler phase: {:?}", phase);
        self.phase.send_replace(phase);
    }

    /// Fetch feed info for every source and upsert the feed records.
    /// Returns how many sources were synced.
    pub async fn sync_sources(&self) -> usize {
        let results = self.fetcher.fetch_info_all(self.registry.sources()).await;
        let mut synced = 0;

        for (source, result) in results {
            match result {
                Ok(info) => {
                    let feed = Feed {
                        title: info.title.clone(),
                        ..source.to_feed()
                    };
                    match self.store.upsert_feed(&feed) {
                        Ok(()) => {
                            info!("Synced '{}' <{}>", feed.display_title(), info.link);
                            synced += 1;
                        }
                        Err(e) => error!("Failed to store feed {}: {}", source.url, e),
                    }
                }
                Err(e) => warn!("Error fetching info: {}", e),
            }
        }

        synced
    }

    /// One complete fetch-all-then-merge pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();

        self.set_phase(CyclePhase::Fetching);
        let results = self.fetcher.fetch_items_all(self.registry.sources()).await;

        self.set_phase(CyclePhase::Merging);
        let report = self.merge(results);

        self.set_phase(CyclePhase::Idle);
        info!(
            "Update complete: {} new items, {} errors, {} discarded, {} skipped ({:.1}s)",
            report.new_items,
            report.failed,
            report.discarded,
            report.skipped,
            start.elapsed().as_secs_f64()
        );

        report
    }

    fn merge(&self, results: Vec<(Source, Result<FetchedSource>)>) -> CycleReport {
        let mut report = CycleReport {
            sources: results.len(),
            ..Default::default()
        };

        let watermark = match self.store.watermark() {
            Ok(watermark) => watermark,
            Err(e) => {
                error!("Failed to read watermark: {}", e);
                0
            }
        };

        for (source, result) in results {
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(e) => {
                    report.failed += 1;
                    warn!("Error updating: {}", e);
                    continue;
                }
            };

            let feed = Feed {
                title: fetched.info.title.clone(),
                ..source.to_feed()
            };
            report.skipped += fetched.entries - fetched.items.len();
            if let Err(e) = self.store.upsert_feed(&feed) {
                error!("Failed to store feed {}: {}", source.url, e);
            }

            let (fresh, stale): (Vec<Item>, Vec<Item>) = fetched
                .items
                .into_iter()
                .partition(|item| item.published > watermark);
            report.discarded += stale.len();

            match self.store.insert_items(&fresh) {
                Ok(count) => {
                    report.new_items += count;
                    if count > 0 {
                        info!("Fetched '{}' ({})", feed.display_title(), count);
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to store items from {}: {}", source.url, e);
                }
            }
        }

        report
    }

    /// Loop until `shutdown` flips to true (or its sender goes away).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Scheduler started ({} sources, {} workers, interval {})",
            self.registry.len(),
            self.fetcher.workers(),
            format_interval(self.interval)
        );

        while !*shutdown.borrow() {
            self.run_cycle().await;

            if pause(self.interval, &mut shutdown).await {
                break;
            }
        }

        info!("Scheduler stopped");
    }
}

/// Sleep for `interval` unless shutdown is requested first. Returns true
/// when the caller should stop.
pub(crate) async fn pause(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
