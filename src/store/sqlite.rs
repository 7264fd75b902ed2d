use std::iter;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{EstuaryError, Result};
use crate::domain::{CountTrim, Feed, Item, ItemQuery};
use crate::store::Store;

const WATERMARK_KEY: &str = "ignore_before";

const ITEM_COLUMNS: &str =
    "id, feed_id, group_id, link, title, description, published, added";

/// Items kept by a count trim, in listing order.
const NEWEST_SEQS: &str = "SELECT seq FROM items ORDER BY added DESC, seq ASC LIMIT ?1";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.busy_timeout(std::time::Duration::from_secs(10))?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EstuaryError::Lock(e.to_string()))
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            group: row.get(2)?,
            link: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            published: row.get(6)?,
            added: row.get(7)?,
        })
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            group: row.get(3)?,
            icon: row.get(4)?,
        })
    }

    fn insert_item(conn: &Connection, item: &Item) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO items (id, feed_id, group_id, link, title, description, published, added)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.feed_id,
                item.group,
                item.link,
                item.title,
                item.description,
                item.published,
                item.added
            ],
        )?;
        Ok(inserted == 1)
    }
}

impl Store for SqliteStore {
    fn upsert_feed(&self, feed: &Feed) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (id, url, title, group_id, icon) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                url = excluded.url,
                title = COALESCE(excluded.title, feeds.title),
                group_id = excluded.group_id,
                icon = COALESCE(excluded.icon, feeds.icon)",
            params![feed.id, feed.url, feed.title, feed.group, feed.icon],
        )?;

        Ok(())
    }

    fn get_feed(&self, id: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let feed = conn
            .query_row(
                "SELECT id, url, title, group_id, icon FROM feeds WHERE id = ?1",
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(feed)
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, url, title, group_id, icon FROM feeds ORDER BY title, url")?;
        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn delete_feed(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM items WHERE feed_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        tx.commit()?;

        Ok(removed > 0)
    }

    fn insert_item_if_absent(&self, item: &Item) -> Result<bool> {
        let conn = self.conn()?;
        Self::insert_item(&conn, item)
    }

    fn insert_items(&self, items: &[Item]) -> Result<usize> {
        let mut conn = self.conn()?;

        let tx = conn.transaction()?;
        let mut count = 0;
        for item in items {
            if Self::insert_item(&tx, item)? {
                count += 1;
            }
        }
        tx.commit()?;

        Ok(count)
    }

    fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let conn = self.conn()?;

        let item = conn
            .query_row(
                &format!("SELECT {} FROM items WHERE id = ?1", ITEM_COLUMNS),
                params![id],
                Self::item_from_row,
            )
            .optional()?;

        Ok(item)
    }

    fn count_items(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;

        let mut clauses = vec!["added > ?"];
        let mut values = vec![Value::Integer(query.since)];
        if let Some(ref feed_id) = query.feed_id {
            clauses.push("feed_id = ?");
            values.push(Value::Text(feed_id.clone()));
        }
        if let Some(ref group) = query.group {
            clauses.push("group_id = ?");
            values.push(Value::Text(group.clone()));
        }

        if let Some(ref cursor) = query.after {
            // The cursor must be part of the base set, otherwise the page is empty.
            let boundary: Option<(i64, i64)> = conn
                .query_row(
                    &format!(
                        "SELECT added, seq FROM items WHERE {} AND id = ?",
                        clauses.join(" AND ")
                    ),
                    params_from_iter(values.iter().chain(iter::once(&Value::Text(cursor.clone())))),
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((added, seq)) = boundary else {
                return Ok(Vec::new());
            };
            clauses.push("(added < ? OR (added = ? AND seq > ?))");
            values.extend([
                Value::Integer(added),
                Value::Integer(added),
                Value::Integer(seq),
            ]);
        }

        values.push(Value::Integer(query.limit as i64));
        let sql = format!(
            "SELECT {} FROM items WHERE {} ORDER BY added DESC, seq ASC LIMIT ?",
            ITEM_COLUMNS,
            clauses.join(" AND ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn delete_items_older_than(&self, added_before: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM items WHERE added < ?1", params![added_before])?;
        Ok(deleted)
    }

    fn delete_items_beyond_count(&self, keep: usize) -> Result<CountTrim> {
        let mut conn = self.conn()?;
        let keep = keep as i64;

        let tx = conn.transaction()?;
        let boundary: Option<i64> = tx.query_row(
            &format!(
                "SELECT MIN(published) FROM items WHERE seq NOT IN ({})",
                NEWEST_SEQS
            ),
            params![keep],
            |row| row.get(0),
        )?;
        let deleted = tx.execute(
            &format!("DELETE FROM items WHERE seq NOT IN ({})", NEWEST_SEQS),
            params![keep],
        )?;
        tx.commit()?;

        Ok(CountTrim { deleted, boundary })
    }

    fn watermark(&self) -> Result<i64> {
        let conn = self.conn()?;

        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM maintenance WHERE key = ?1",
                params![WATERMARK_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value.unwrap_or(0))
    }

    fn set_watermark(&self, ignore_before: i64) -> Result<i64> {
        let conn = self.conn()?;

        let value = conn.query_row(
            "INSERT INTO maintenance (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = MAX(value, excluded.value)
             RETURNING value",
            params![WATERMARK_KEY, ignore_before],
            |row| row.get(0),
        )?;

        Ok(value)
    }
}
