pub mod memory;
pub mod sqlite;

use crate::app::Result;
use crate::domain::{CountTrim, Feed, Item, ItemQuery};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// The single shared mutable state of the aggregator.
///
/// Implementations must make `insert_item_if_absent` atomic: concurrent
/// inserts of the same id result in exactly one stored item, and the first
/// one wins.
pub trait Store: Send + Sync {
    // Feed operations
    fn upsert_feed(&self, feed: &Feed) -> Result<()>;
    fn get_feed(&self, id: &str) -> Result<Option<Feed>>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;
    /// Removes the feed and every item it owns.
    fn delete_feed(&self, id: &str) -> Result<bool>;

    // Item operations
    fn insert_item_if_absent(&self, item: &Item) -> Result<bool>;
    /// Inserts a batch atomically; returns how many items were new.
    fn insert_items(&self, items: &[Item]) -> Result<usize>;
    fn get_item(&self, id: &str) -> Result<Option<Item>>;
    fn count_items(&self) -> Result<usize>;
    fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    // Retention operations
    fn delete_items_older_than(&self, added_before: i64) -> Result<usize>;
    fn delete_items_beyond_count(&self, keep: usize) -> Result<CountTrim>;
    fn watermark(&self) -> Result<i64>;
    /// Raises the watermark; a lower value leaves it unchanged. Returns the
    /// stored value.
    fn set_watermark(&self, ignore_before: i64) -> Result<i64>;
}
