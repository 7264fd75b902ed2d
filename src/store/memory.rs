use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::app::{EstuaryError, Result};
use crate::domain::{CountTrim, Feed, Item, ItemQuery};
use crate::store::Store;

/// In-process store guarded by a reader-writer lock. Queries share the read
/// side; every mutation takes the write side, which makes check-then-insert
/// on item ids atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    feeds: HashMap<String, Feed>,
    // Insertion order; `seq` only grows.
    items: Vec<Stored>,
    ids: HashSet<String>,
    next_seq: u64,
    watermark: i64,
}

struct Stored {
    seq: u64,
    item: Item,
}

impl Inner {
    fn insert(&mut self, item: &Item) -> bool {
        if !self.ids.insert(item.id.clone()) {
            return false;
        }
        self.items.push(Stored {
            seq: self.next_seq,
            item: item.clone(),
        });
        self.next_seq += 1;
        true
    }

    /// Items in listing order: newest `added` first, ties in insertion order.
    fn ordered(&self) -> Vec<&Stored> {
        let mut ordered: Vec<&Stored> = self.items.iter().collect();
        ordered.sort_by_key(|s| (Reverse(s.item.added), s.seq));
        ordered
    }

    fn remove_where(&mut self, mut doomed: impl FnMut(&Stored) -> bool) -> usize {
        let before = self.items.len();
        let ids = &mut self.ids;
        self.items.retain(|stored| {
            if doomed(stored) {
                ids.remove(&stored.item.id);
                false
            } else {
                true
            }
        });
        before - self.items.len()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| EstuaryError::Lock(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| EstuaryError::Lock(e.to_string()))
    }
}

fn matches(query: &ItemQuery, item: &Item) -> bool {
    item.added > query.since
        && query.feed_id.as_ref().map_or(true, |id| &item.feed_id == id)
        && query.group.as_ref().map_or(true, |group| &item.group == group)
}

impl Store for MemoryStore {
    fn upsert_feed(&self, feed: &Feed) -> Result<()> {
        let mut inner = self.write()?;

        match inner.feeds.get_mut(&feed.id) {
            Some(existing) => {
                existing.url = feed.url.clone();
                existing.group = feed.group.clone();
                if feed.title.is_some() {
                    existing.title = feed.title.clone();
                }
                if feed.icon.is_some() {
                    existing.icon = feed.icon.clone();
                }
            }
            None => {
                inner.feeds.insert(feed.id.clone(), feed.clone());
            }
        }

        Ok(())
    }

    fn get_feed(&self, id: &str) -> Result<Option<Feed>> {
        Ok(self.read()?.feeds.get(id).cloned())
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let mut feeds: Vec<Feed> = self.read()?.feeds.values().cloned().collect();
        feeds.sort_by(|a, b| (&a.title, &a.url).cmp(&(&b.title, &b.url)));
        Ok(feeds)
    }

    fn delete_feed(&self, id: &str) -> Result<bool> {
        let mut inner = self.write()?;
        inner.remove_where(|stored| stored.item.feed_id == id);
        Ok(inner.feeds.remove(id).is_some())
    }

    fn insert_item_if_absent(&self, item: &Item) -> Result<bool> {
        Ok(self.write()?.insert(item))
    }

    fn insert_items(&self, items: &[Item]) -> Result<usize> {
        let mut inner = self.write()?;
        Ok(items.iter().filter(|item| inner.insert(item)).count())
    }

    fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let inner = self.read()?;
        Ok(inner
            .items
            .iter()
            .find(|stored| stored.item.id == id)
            .map(|stored| stored.item.clone()))
    }

    fn count_items(&self) -> Result<usize> {
        Ok(self.read()?.items.len())
    }

    fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let inner = self.read()?;

        let base: Vec<&Item> = inner
            .ordered()
            .into_iter()
            .map(|stored| &stored.item)
            .filter(|item| matches(query, item))
            .collect();

        let start = match query.after {
            Some(ref cursor) => match base.iter().position(|item| &item.id == cursor) {
                Some(pos) => pos + 1,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };

        Ok(base
            .into_iter()
            .skip(start)
            .take(query.limit)
            .cloned()
            .collect())
    }

    fn delete_items_older_than(&self, added_before: i64) -> Result<usize> {
        Ok(self
            .write()?
            .remove_where(|stored| stored.item.added < added_before))
    }

    fn delete_items_beyond_count(&self, keep: usize) -> Result<CountTrim> {
        let mut inner = self.write()?;

        let trimmed: Vec<(u64, i64)> = inner
            .ordered()
            .into_iter()
            .skip(keep)
            .map(|stored| (stored.seq, stored.item.published))
            .collect();
        let boundary = trimmed.iter().map(|(_, published)| *published).min();
        let doomed: HashSet<u64> = trimmed.into_iter().map(|(seq, _)| seq).collect();
        let deleted = inner.remove_where(|stored| doomed.contains(&stored.seq));

        Ok(CountTrim { deleted, boundary })
    }

    fn watermark(&self) -> Result<i64> {
        Ok(self.read()?.watermark)
    }

    fn set_watermark(&self, ignore_before: i64) -> Result<i64> {
        let mut inner = self.write()?;
        inner.watermark = inner.watermark.max(ignore_before);
        Ok(inner.watermark)
    }
}
