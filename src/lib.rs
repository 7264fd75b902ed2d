//! # Estuary
//!
//! A periodic RSS/Atom feed aggregator.
//!
//! ## Architecture
//!
//! Estuary runs two long-lived loops over a shared store:
//!
//! ```text
//! Registry → Scheduler → Fetcher → Normalizer → Store ← Query
//!                                                 ↑
//!                                             Retention
//! ```
//!
//! - [`scheduler`]: fetches every source on a bounded pool, then merges
//! - [`retention`]: drops orphaned feeds and old items, advances the watermark
//! - [`query`]: paginated reads with an item-id cursor
//!
//! ## Quick Start
//!
//! ```bash
//! # Run one fetch cycle
//! estuary update
//!
//! # List the newest items of a group
//! estuary items --group news --limit 20
//!
//! # Run continuously
//! estuary run
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, registry, scheduler, retention, query.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loading and validation.
///
/// Loads from `~/.config/estuary/config.toml`: settings plus the grouped
/// source list.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a configured source as stored
/// - [`Item`](domain::Item): a normalized entry with a SHA-256 id
/// - [`ItemQuery`](domain::ItemQuery): filter and cursor for listings
pub mod domain;

/// Feed fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async transport trait
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ParallelFetcher`](fetcher::parallel::ParallelFetcher): Bounded concurrent fetching with semaphore
pub mod fetcher;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0
/// into unified [`Item`](domain::Item) structs.
pub mod normalizer;

/// Feed, group and paginated item listings.
pub mod query;

/// The configured sources, grouped by label.
pub mod registry;

/// Periodic cleanup of orphaned feeds and old items, and the ignore-before watermark.
pub mod retention;

/// Fetch cycles: fetch every source on the bounded pool, then merge.
pub mod scheduler;

/// Persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`MemoryStore`](store::MemoryStore): In-process implementation
pub mod store;
