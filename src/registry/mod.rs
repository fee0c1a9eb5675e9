//! The in-memory feed index.
//!
//! A [`Registry`] owns every known feed and its posts behind one
//! reader/writer lock. Queries take the shared lock, mutations take the
//! exclusive lock, so a reader never observes a partially updated entry.
//! Coarse by design; the map is small and critical sections are short.

pub mod query;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::app::{Result, RoostError};
use crate::domain::{FeedEntry, RefreshTarget, StatusMap};

pub struct Registry {
    feeds: RwLock<HashMap<String, FeedEntry>>,
    last_refresh: RwLock<DateTime<Utc>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(Utc::now()),
        }
    }

    fn read_feeds(&self) -> Result<RwLockReadGuard<'_, HashMap<String, FeedEntry>>> {
        self.feeds
            .read()
            .map_err(|e| RoostError::Lock(e.to_string()))
    }

    fn write_feeds(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, FeedEntry>>> {
        self.feeds
            .write()
            .map_err(|e| RoostError::Lock(e.to_string()))
    }

    /// Register a feed, or fully refresh it if already registered.
    ///
    /// A new URL gets a fresh entry with `first_seen = now`. An existing URL
    /// has its nick, submitter, and status map replaced wholesale; its
    /// `first_seen` and HTTP validators are left alone.
    pub fn add_or_update(
        &self,
        nick: &str,
        url: &str,
        submitter: Option<IpAddr>,
        statuses: StatusMap,
    ) -> Result<()> {
        if url.trim().is_empty() {
            return Err(RoostError::InvalidFeed("empty feed URL".into()));
        }

        let mut feeds = self.write_feeds()?;
        match feeds.get_mut(url) {
            Some(entry) => {
                entry.nick = nick.to_string();
                entry.submitter = submitter;
                entry.statuses = statuses;
            }
            None => {
                feeds.insert(
                    url.to_string(),
                    FeedEntry::new(nick.to_string(), url.to_string(), submitter, statuses),
                );
            }
        }
        Ok(())
    }

    /// Insert a fully formed entry, keeping its recorded `first_seen`.
    /// Used by the persistence bridge's pull path.
    pub fn restore(&self, entry: FeedEntry) -> Result<()> {
        if entry.url.trim().is_empty() {
            return Err(RoostError::InvalidFeed("empty feed URL".into()));
        }
        let mut feeds = self.write_feeds()?;
        feeds.insert(entry.url.clone(), entry);
        Ok(())
    }

    pub fn remove(&self, url: &str) -> Result<()> {
        let mut feeds = self.write_feeds()?;
        feeds
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| RoostError::FeedNotFound(url.to_string()))
    }

    pub fn contains(&self, url: &str) -> Result<bool> {
        Ok(self.read_feeds()?.contains_key(url))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_feeds()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read_feeds()?.is_empty())
    }

    /// One feed's status map, cloned out from under the lock.
    pub fn statuses_of(&self, url: &str) -> Result<StatusMap> {
        let feeds = self.read_feeds()?;
        feeds
            .get(url)
            .map(|entry| entry.statuses.clone())
            .ok_or_else(|| RoostError::FeedNotFound(url.to_string()))
    }

    /// Every post from every feed, ascending by timestamp.
    ///
    /// Cross-feed posts sharing an exact timestamp collapse to one line
    /// (last write wins), same as within a single feed.
    pub fn all_statuses(&self) -> Result<Vec<String>> {
        let feeds = self.read_feeds()?;
        let mut merged = StatusMap::new();
        for entry in feeds.values() {
            for (ts, line) in &entry.statuses {
                merged.insert(*ts, line.clone());
            }
        }
        Ok(merged.into_values().collect())
    }

    pub fn urls(&self) -> Result<Vec<String>> {
        Ok(self.read_feeds()?.keys().cloned().collect())
    }

    /// Clone of every entry, for pushing to the durable store.
    pub fn snapshot(&self) -> Result<Vec<FeedEntry>> {
        Ok(self.read_feeds()?.values().cloned().collect())
    }

    /// What the scheduler needs to re-crawl every feed.
    pub fn refresh_targets(&self) -> Result<Vec<RefreshTarget>> {
        Ok(self
            .read_feeds()?
            .values()
            .map(|entry| RefreshTarget {
                url: entry.url.clone(),
                nick: entry.nick.clone(),
                submitter: entry.submitter,
                etag: entry.etag.clone(),
                last_modified: entry.last_modified.clone(),
            })
            .collect())
    }

    /// Record the HTTP validators returned by the last fetch of `url`.
    pub fn set_validators(
        &self,
        url: &str,
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> Result<()> {
        let mut feeds = self.write_feeds()?;
        let entry = feeds
            .get_mut(url)
            .ok_or_else(|| RoostError::FeedNotFound(url.to_string()))?;
        entry.etag = etag;
        entry.last_modified = last_modified;
        Ok(())
    }

    pub fn last_refresh(&self) -> Result<DateTime<Utc>> {
        self.last_refresh
            .read()
            .map(|ts| *ts)
            .map_err(|e| RoostError::Lock(e.to_string()))
    }

    /// Record the completion of a refresh cycle.
    ///
    /// The recorded timestamp strictly increases on every call, even when
    /// the clock hasn't visibly advanced since the previous cycle.
    pub fn mark_refreshed(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .last_refresh
            .write()
            .map_err(|e| RoostError::Lock(e.to_string()))?;
        let now = Utc::now();
        *last = if now > *last {
            now
        } else {
            *last + Duration::nanoseconds(1)
        };
        Ok(*last)
    }
}
