//! Read-through cache for the remotely hosted script bundle.

use arc_swap::ArcSwapOption;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::observability::metrics;

/// Errors fetching the bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The bundle host answered with a non-success status.
    #[error("bundle source answered {0}")]
    Status(StatusCode),

    /// The bundle host could not be reached or the body could not be read.
    #[error("bundle fetch failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The cached bundle text and when it was fetched.
#[derive(Debug)]
pub struct BundleEntry {
    text: Arc<str>,
    fetched_at: Instant,
}

impl BundleEntry {
    pub fn new(text: impl Into<Arc<str>>, fetched_at: Instant) -> Self {
        Self {
            text: text.into(),
            fetched_at,
        }
    }

    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    /// Whether the entry may still be served at `now`. Stale only once its
    /// age exceeds `ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) <= ttl
    }
}

/// Single-entry cache in front of the bundle source.
pub struct BundleCache {
    client: reqwest::Client,
    source: Url,
    ttl: Duration,
    entry: ArcSwapOption<BundleEntry>,
}

impl BundleCache {
    pub fn new(client: reqwest::Client, source: Url, ttl: Duration) -> Self {
        Self {
            client,
            source,
            ttl,
            entry: ArcSwapOption::empty(),
        }
    }

    /// Return the bundle text, refetching when missing or stale.
    pub async fn get(&self) -> Result<Arc<str>, BundleError> {
        let now = Instant::now();
        if let Some(entry) = self.entry.load_full() {
            if entry.is_fresh(now, self.ttl) {
                return Ok(entry.text.clone());
            }
        }

        tracing::debug!(source = %self.source, "Fetching bundle");
        let text: Arc<str> = match self.fetch().await {
            Ok(text) => {
                metrics::record_bundle_fetch("ok");
                text.into()
            }
            Err(e) => {
                metrics::record_bundle_fetch("error");
                return Err(e);
            }
        };

        self.entry
            .store(Some(Arc::new(BundleEntry::new(text.clone(), now))));
        tracing::info!(bytes = text.len(), "Bundle cache refreshed");
        Ok(text)
    }

    /// The current entry, fresh or not.
    pub fn cached(&self) -> Option<Arc<BundleEntry>> {
        self.entry.load_full()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self) -> Result<String, BundleError> {
        let response = self.client.get(self.source.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BundleError::Status(status));
        }
        Ok(response.text().await?)
    }
}
