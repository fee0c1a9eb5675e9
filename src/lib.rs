//! # Roost
//!
//! A registry for twtxt-style plain-text social feeds: it crawls feed
//! documents published at remote URLs, indexes their posts in memory, and
//! answers nickname, tag, and content searches over the whole corpus.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Parser → Registry ⇄ Persistence Bridge → SQLite
//!                       ↑
//!               Refresh Scheduler
//! ```
//!
//! - [`fetcher`]: HTTP client with ETag/conditional request support
//! - [`parser`]: turns raw feed bytes into timestamp-keyed post records
//! - [`registry`]: the lock-guarded in-memory index and its query engine
//! - [`refresh`]: periodic re-crawl of every registered feed
//! - [`bridge`]: write-behind queue to the durable store, plus recovery
//! - [`store`]: SQLite persistence layer
//!
//! The in-memory registry is authoritative for live queries; the durable
//! store only matters for recovery.

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together the registry, store,
/// fetcher, refresher, and persistence bridge.
pub mod app;

/// Asynchronous push/pull between registry and durable store.
pub mod bridge;

/// Command-line interface using clap.
pub mod cli;

/// Configuration, read from `~/.config/roost/config.toml`.
pub mod config;

/// Background daemon that refreshes feeds on a timer.
///
/// - `roost daemon start` - run the refresher loop
/// - `roost daemon stop` - stop a running daemon
/// - `roost daemon status` - check if a daemon is running
pub mod daemon;

/// Core domain models: [`FeedEntry`](domain::FeedEntry), post record
/// lines, and the timestamp-keyed [`StatusMap`](domain::StatusMap).
pub mod domain;

/// HTTP fetching with conditional request support.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Plain-text feed parsing into status maps.
pub mod parser;

/// Periodic re-crawl of every registered feed with bounded concurrency
/// and per-feed timeouts.
pub mod refresh;

/// The concurrent in-memory feed index and its query engine.
///
/// - [`Registry`](registry::Registry): reader/writer-locked feed map
/// - [`query`](registry::query): nick/tag/content/composite searches
pub mod registry;

/// Durable persistence.
///
/// - [`Store`](store::Store): trait defining the storage boundary
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
