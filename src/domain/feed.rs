use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp-keyed post lines for one feed.
///
/// Keyed by timestamp alone, so two posts from the same feed with an
/// identical timestamp collapse to one (last write wins). Accepted
/// limitation of the format.
pub type StatusMap = BTreeMap<DateTime<Utc>, String>;

/// One registered feed and its indexed posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub nick: String,
    pub url: String,
    /// When this feed was first registered. Never changes on refresh.
    pub first_seen: DateTime<Utc>,
    /// Pre-formatted `first_seen`, cached so query output never re-formats.
    pub first_seen_fmt: String,
    /// Network address of whoever submitted the feed, when known.
    pub submitter: Option<IpAddr>,
    /// HTTP validators from the last fetch, for conditional re-crawls.
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub statuses: StatusMap,
}

impl FeedEntry {
    pub fn new(nick: String, url: String, submitter: Option<IpAddr>, statuses: StatusMap) -> Self {
        let first_seen = Utc::now();
        Self {
            nick,
            url,
            first_seen,
            first_seen_fmt: first_seen.to_rfc3339(),
            submitter,
            etag: None,
            last_modified: None,
            statuses,
        }
    }

    /// The identity line returned by nickname queries:
    /// `nick <TAB> url <TAB> first-seen`.
    pub fn identity_line(&self) -> String {
        format!("{}\t{}\t{}", self.nick, self.url, self.first_seen_fmt)
    }

    /// Posts from this feed carrying `tag` as a hashtag.
    pub fn find_tag(&self, tag: &str) -> StatusMap {
        self.statuses
            .iter()
            .filter(|(_, line)| super::post::has_tag(line, tag))
            .map(|(ts, line)| (*ts, line.clone()))
            .collect()
    }
}

/// What the refresh scheduler needs to know about a feed to re-crawl it.
#[derive(Debug, Clone)]
pub struct RefreshTarget {
    pub url: String,
    pub nick: String,
    pub submitter: Option<IpAddr>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}
