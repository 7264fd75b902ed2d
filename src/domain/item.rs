use serde::{Deserialize, Serialize};

use super::stable_id;

/// A normalized entry. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub feed_id: String,
    pub group: String,
    pub link: String,
    pub title: String,
    pub description: String,
    pub published: i64,
    pub added: i64,
}

impl Item {
    pub fn new(feed_id: &str, group: &str, link: &str, title: &str, added: i64) -> Self {
        Self {
            id: Self::generate_id(link),
            feed_id: feed_id.to_string(),
            group: group.to_string(),
            link: link.to_string(),
            title: title.to_string(),
            description: String::new(),
            published: added,
            added,
        }
    }

    /// Identity depends on the link only, so title edits upstream never
    /// produce a second copy of the same entry.
    pub fn generate_id(link: &str) -> String {
        stable_id(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ignores_title() {
        let a = Item::new("f", "g", "https://example.com/a", "Original", 10);
        let b = Item::new("f", "g", "https://example.com/a", "Edited", 20);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_new_defaults_published_to_added() {
        let item = Item::new("f", "g", "https://example.com/a", "A", 42);
        assert_eq!(item.published, 42);
        assert_eq!(item.description, "");
    }
}
