/// Filter and window for an item listing.
///
/// `since` is an exclusive lower bound on `added`. `after` is a cursor item
/// id; results resume strictly past it, and an unknown cursor yields nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub feed_id: Option<String>,
    pub group: Option<String>,
    pub since: i64,
    pub after: Option<String>,
    pub limit: usize,
}

impl ItemQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn feed(mut self, feed_id: impl Into<String>) -> Self {
        self.feed_id = Some(feed_id.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn since(mut self, since: i64) -> Self {
        self.since = since;
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }
}

/// Outcome of trimming the store down to a fixed item count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountTrim {
    pub deleted: usize,
    /// Oldest `published` among the removed items.
    pub boundary: Option<i64>,
}
