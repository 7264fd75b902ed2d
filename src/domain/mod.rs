pub mod feed;
pub mod item;
pub mod query;

use sha2::{Digest, Sha256};

pub use feed::{Feed, FeedInfo};
pub use item::Item;
pub use query::{CountTrim, ItemQuery};

/// Content-addressed identity shared by feeds (keyed on their URL) and items
/// (keyed on their link). Stable across restarts and config reordering.
pub fn stable_id(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
