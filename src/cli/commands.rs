use chrono::{TimeZone, Utc};
use tokio::sync::watch;
use tracing::{error, info};

use super::signal::ShutdownSignal;
use crate::app::{AppContext, EstuaryError, Result};
use crate::domain::stable_id;
use crate::query::ItemsRequest;

pub async fn run(ctx: &AppContext, sync: bool) -> Result<()> {
    let mut signal = ShutdownSignal::install()?;

    if sync {
        let synced = ctx.scheduler.sync_sources().await;
        info!("Synced {} of {} sources", synced, ctx.registry.len());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = {
        let scheduler = ctx.scheduler.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };
    let retention = {
        let retention = ctx.retention.clone();
        tokio::spawn(async move { retention.run(shutdown_rx).await })
    };

    let name = signal.recv().await;
    info!("Received {}, shutting down", name);
    // Both loops hold receivers, so the send only fails if they already exited.
    let _ = shutdown_tx.send(true);

    for handle in [scheduler, retention] {
        if let Err(e) = handle.await {
            error!("Background task failed: {}", e);
        }
    }

    Ok(())
}

pub async fn update(ctx: &AppContext) -> Result<()> {
    if ctx.registry.is_empty() {
        println!("No feeds to update");
        return Ok(());
    }

    println!("Updating {} feeds...", ctx.registry.len());
    let report = ctx.scheduler.run_cycle().await;
    println!(
        "Update complete: {} new items, {} errors, {} discarded, {} skipped",
        report.new_items, report.failed, report.discarded, report.skipped
    );
    Ok(())
}

pub fn cleanup(ctx: &AppContext) -> Result<()> {
    let report = ctx.retention.run_once(Utc::now().timestamp())?;
    println!(
        "Removed {} feeds, {} items over limit, {} expired items",
        report.orphans_removed, report.trimmed_by_count, report.expired
    );
    println!("Ignoring entries published before {}", format_time(report.watermark));
    Ok(())
}

pub fn list_feeds(ctx: &AppContext, json: bool) -> Result<()> {
    let feeds = ctx.query.list_feeds()?;

    if json {
        return print_json(&feeds);
    }
    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        println!("{} [{}]\n  {}\n  {}", feed.display_title(), feed.group, feed.url, feed.id);
    }

    Ok(())
}

pub fn list_groups(ctx: &AppContext) {
    for group in ctx.query.list_groups() {
        println!("{}", group);
    }
}

pub fn list_items(ctx: &AppContext, mut request: ItemsRequest, json: bool) -> Result<()> {
    // Accept a feed URL wherever a feed id is expected.
    request.feed_id = request.feed_id.map(|feed| {
        if feed.starts_with("http://") || feed.starts_with("https://") {
            stable_id(&feed)
        } else {
            feed
        }
    });

    let items = ctx.query.list_items(&request)?;

    if json {
        return print_json(&items);
    }
    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for item in items {
        println!("{} {}", format_time(item.published), item.title);
        println!("  {}", item.link);
        println!("  {}", item.id);
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| EstuaryError::Other(format!("JSON encoding failed: {}", e)))?;
    println!("{}", out);
    Ok(())
}

fn format_time(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
