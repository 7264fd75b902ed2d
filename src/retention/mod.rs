//! Periodic cleanup: orphaned feeds, item caps, and the ignore-before
//! watermark that keeps purged entries from coming back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::app::Result;
use crate::config::format_interval;
use crate::registry::SourceRegistry;
use crate::scheduler::pause;
use crate::store::Store;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub orphans_removed: usize,
    pub trimmed_by_count: usize,
    pub expired: usize,
    /// Watermark after this run.
    pub watermark: i64,
}

pub struct RetentionManager {
    store: Arc<dyn Store>,
    registry: Arc<SourceRegistry>,
    retention_days: u32,
    retention_items: Option<usize>,
    interval: Duration,
}

impl RetentionManager {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<SourceRegistry>,
        retention_days: u32,
        retention_items: Option<usize>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            retention_days,
            retention_items,
            interval,
        }
    }

    /// Items ingested before this instant are expired.
    pub fn age_cutoff(&self, now: i64) -> i64 {
        now - i64::from(self.retention_days) * SECONDS_PER_DAY
    }

    pub fn run_once(&self, now: i64) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        // Feeds whose url left the configuration take their items with them.
        for feed in self.store.list_feeds()? {
            if !self.registry.contains_url(&feed.url) && self.store.delete_feed(&feed.id)? {
                info!("Removed feed '{}'", feed.display_title());
                report.orphans_removed += 1;
            }
        }

        let mut boundary = None;
        if let Some(keep) = self.retention_items {
            let trim = self.store.delete_items_beyond_count(keep)?;
            report.trimmed_by_count = trim.deleted;
            boundary = trim.boundary;
        }

        let cutoff = self.age_cutoff(now);
        report.expired = self.store.delete_items_older_than(cutoff)?;

        let ignore_before = boundary.map_or(cutoff, |b| b.min(cutoff));
        report.watermark = self.store.set_watermark(ignore_before)?;

        info!(
            "Cleanup complete: {} feeds removed, {} items over limit, {} expired (ignore before {})",
            report.orphans_removed, report.trimmed_by_count, report.expired, report.watermark
        );
        Ok(report)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Cleanup started (keep {} days, interval {})",
            self.retention_days,
            format_interval(self.interval)
        );

        while !*shutdown.borrow() {
            if let Err(e) = self.run_once(Utc::now().timestamp()) {
                error!("Cleanup failed: {}", e);
            }

            if pause(self.interval, &mut shutdown).await {
                break;
            }
        }

        info!("Cleanup stopped");
    }
}
