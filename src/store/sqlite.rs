use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, RoostError};
use crate::domain::StatusMap;
use crate::store::{FeedRecord, Store};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
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

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| RoostError::Other(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| RoostError::Lock(e.to_string()))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl Store for SqliteStore {
    fn write_feed(&self, record: &FeedRecord) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO feeds (url, nick, first_seen) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET nick = ?2, first_seen = ?3",
            params![record.url, record.nick, record.first_seen.to_rfc3339()],
        )?;

        // The durable record is a full snapshot, so stale rows go first.
        tx.execute(
            "DELETE FROM statuses WHERE feed_url = ?1",
            params![record.url],
        )?;

        for (posted_at, body) in &record.statuses {
            tx.execute(
                "INSERT OR REPLACE INTO statuses (feed_url, posted_at, body)
                 VALUES (?1, ?2, ?3)",
                params![record.url, posted_at.to_rfc3339(), body],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<FeedRecord>> {
        let conn = self.lock()?;

        let mut feeds_stmt =
            conn.prepare("SELECT url, nick, first_seen FROM feeds ORDER BY url")?;
        let feeds = feeds_stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut statuses_stmt = conn.prepare(
            "SELECT posted_at, body FROM statuses WHERE feed_url = ?1 ORDER BY posted_at",
        )?;

        let mut records = Vec::with_capacity(feeds.len());
        for (url, nick, first_seen) in feeds {
            let mut statuses = StatusMap::new();
            let rows = statuses_stmt.query_map(params![url], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (posted_at, body) = row?;
                if let Some(ts) = Self::parse_datetime(&posted_at) {
                    statuses.insert(ts, body);
                }
            }

            let first_seen = Self::parse_datetime(&first_seen).ok_or_else(|| {
                RoostError::Other(format!("corrupt first_seen for {}", url))
            })?;

            records.push(FeedRecord {
                nick,
                url,
                first_seen,
                statuses,
            });
        }

        Ok(records)
    }

    fn delete_feed(&self, url: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM feeds WHERE url = ?1", params![url])?;
        Ok(())
    }
}
