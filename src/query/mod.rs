//! Read side of the store: feed and group listings plus paginated items.

use std::sync::Arc;

use crate::app::Result;
use crate::domain::{Feed, Item, ItemQuery};
use crate::registry::SourceRegistry;
use crate::store::Store;

/// Parameters of an item listing. Everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemsRequest {
    pub feed_id: Option<String>,
    pub group_id: Option<String>,
    /// Only items added strictly after this unix time.
    pub since: i64,
    /// Id of the last item of the previous page.
    pub after: Option<String>,
    pub limit: Option<usize>,
}

pub struct QueryService {
    store: Arc<dyn Store>,
    registry: Arc<SourceRegistry>,
    default_page_size: usize,
    max_page_size: usize,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<SourceRegistry>,
        default_page_size: usize,
        max_page_size: usize,
    ) -> Self {
        Self {
            store,
            registry,
            default_page_size,
            max_page_size,
        }
    }

    pub fn list_feeds(&self) -> Result<Vec<Feed>> {
        self.store.list_feeds()
    }

    /// Group labels in configuration order.
    pub fn list_groups(&self) -> Vec<String> {
        self.registry.groups().to_vec()
    }

    /// Effective page size for a requested limit.
    pub fn page_size(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }

    pub fn list_items(&self, request: &ItemsRequest) -> Result<Vec<Item>> {
        let limit = self.page_size(request.limit);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = ItemQuery::new(limit).since(request.since);
        if let Some(ref feed_id) = request.feed_id {
            query = query.feed(feed_id.as_str());
        }
        if let Some(ref group) = request.group_id {
            query = query.group(group.as_str());
        }
        if let Some(ref cursor) = request.after {
            query = query.after(cursor.as_str());
        }

        self.store.query_items(&query)
    }
}
