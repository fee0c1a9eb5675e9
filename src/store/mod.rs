pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{FeedEntry, StatusMap};

pub use sqlite::SqliteStore;

/// One feed as persisted: enough to rebuild its registry entry.
#[derive(Debug, Clone)]
pub struct FeedRecord {
    pub nick: String,
    pub url: String,
    pub first_seen: DateTime<Utc>,
    pub statuses: StatusMap,
}

impl From<&FeedEntry> for FeedRecord {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            nick: entry.nick.clone(),
            url: entry.url.clone(),
            first_seen: entry.first_seen,
            statuses: entry.statuses.clone(),
        }
    }
}

impl FeedRecord {
    /// Rebuild the in-memory entry this record was snapshotted from.
    /// Submitter address and HTTP validators are not persisted.
    pub fn into_entry(self) -> FeedEntry {
        FeedEntry {
            nick: self.nick,
            first_seen_fmt: self.first_seen.to_rfc3339(),
            first_seen: self.first_seen,
            url: self.url,
            submitter: None,
            etag: None,
            last_modified: None,
            statuses: self.statuses,
        }
    }
}

/// The durable store boundary. Authoritative for recovery only; the
/// in-memory registry stays authoritative for live queries.
pub trait Store {
    /// Write one feed's record, replacing any prior durable record for it.
    fn write_feed(&self, record: &FeedRecord) -> Result<()>;

    /// Every persisted feed record.
    fn read_all(&self) -> Result<Vec<FeedRecord>>;

    /// Drop a feed's durable record. Absence is not an error.
    fn delete_feed(&self, url: &str) -> Result<()>;
}
