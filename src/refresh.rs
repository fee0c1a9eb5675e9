//! Periodic re-crawl of every registered feed.
//!
//! Each cycle fetches every feed with a bounded number of concurrent
//! workers, parses what came back, and replaces that feed's posts in the
//! registry. One bad feed never aborts the cycle. A cycle that's already
//! running drops any further trigger instead of running twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::app::{Result, RoostError};
use crate::domain::RefreshTarget;
use crate::fetcher::{FetchResult, Fetcher};
use crate::parser;
use crate::registry::Registry;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Feeds whose posts were replaced with a fresh snapshot.
    pub updated: usize,
    /// Feeds the remote reported unchanged (HTTP 304).
    pub unchanged: usize,
    /// Feeds skipped this cycle after a fetch, timeout, or parse failure.
    pub failed: usize,
}

enum FeedOutcome {
    Updated(usize),
    Unchanged,
}

pub struct Refresher {
    registry: Arc<Registry>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    semaphore: Arc<Semaphore>,
    fetch_timeout: Duration,
    in_flight: AtomicBool,
}

impl Refresher {
    pub fn new(registry: Arc<Registry>, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self::with_limits(
            registry,
            fetcher,
            DEFAULT_WORKERS,
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        )
    }

    pub fn with_limits(
        registry: Arc<Registry>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        workers: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers)),
            fetch_timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one full refresh cycle.
    ///
    /// Returns `None` when another cycle is already in flight; the trigger
    /// is dropped rather than queued. On completion the registry's
    /// last-refresh timestamp advances even if nothing changed.
    pub async fn refresh_all(&self) -> Result<Option<RefreshSummary>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("refresh already in progress, dropping trigger");
            return Ok(None);
        }
        let result = self.run_cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn run_cycle(&self) -> Result<RefreshSummary> {
        let targets = self.registry.refresh_targets()?;
        let mut handles = Vec::new();

        for target in targets {
            let fetcher = self.fetcher.clone();
            let semaphore = self.semaphore.clone();
            let registry = self.registry.clone();
            let fetch_timeout = self.fetch_timeout;

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let url = target.url.clone();
                let outcome = refresh_single(&fetcher, target, &registry, fetch_timeout).await;
                (url, outcome)
            }));
        }

        let mut summary = RefreshSummary::default();
        for handle in handles {
            match handle.await {
                Ok((url, Ok(FeedOutcome::Updated(count)))) => {
                    summary.updated += 1;
                    tracing::debug!("refreshed {} ({} statuses)", url, count);
                }
                Ok((_, Ok(FeedOutcome::Unchanged))) => summary.unchanged += 1,
                Ok((url, Err(e))) => {
                    summary.failed += 1;
                    tracing::warn!("skipping {} this cycle: {}", url, e);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        let completed = self.registry.mark_refreshed()?;
        tracing::info!(
            "refresh complete at {}: {} updated, {} unchanged, {} failed",
            completed.to_rfc3339(),
            summary.updated,
            summary.unchanged,
            summary.failed
        );

        Ok(summary)
    }
}

async fn refresh_single(
    fetcher: &Arc<dyn Fetcher + Send + Sync>,
    target: RefreshTarget,
    registry: &Arc<Registry>,
    fetch_timeout: Duration,
) -> Result<FeedOutcome> {
    let fetched = tokio::time::timeout(
        fetch_timeout,
        fetcher.fetch(
            &target.url,
            target.etag.as_deref(),
            target.last_modified.as_deref(),
        ),
    )
    .await
    .map_err(|_| RoostError::Timeout(target.url.clone()))??;

    match fetched {
        FetchResult::NotModified => Ok(FeedOutcome::Unchanged),
        FetchResult::Content {
            body,
            etag,
            last_modified,
        } => {
            let statuses = parser::parse_feed(&body, &target.nick, &target.url)?;
            let count = statuses.len();
            registry.add_or_update(&target.nick, &target.url, target.submitter, statuses)?;
            registry.set_validators(&target.url, etag, last_modified)?;
            Ok(FeedOutcome::Updated(count))
        }
    }
}
