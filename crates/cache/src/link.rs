//! Link preview metadata and its in-memory cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::signals::{Signal, SignalHub, Subscription};
use crate::worker::{CacheStats, CacheWorker};

/// Metadata record rendered in a link preview card.
///
/// Produced by an external fetch provider; this crate only stores and
/// retrieves it. The cache key is the URL the user saved, which may
/// differ from the canonical URL the provider resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Canonical URL reported by the metadata provider.
    pub url: Url,
    /// Page title, when the provider found one.
    pub title: Option<String>,
    /// Site or publisher name.
    pub site_name: Option<String>,
    /// Encoded preview image bytes, when the provider supplied one.
    pub image_data: Option<Vec<u8>>,
}

impl LinkMetadata {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            title: None,
            site_name: None,
            image_data: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }
}

/// Common interface of the link preview tiers.
///
/// Implemented by the memory tier, the disk tier, and the hybrid facade
/// that composes them. Operations never fail; a miss is `None` and the
/// caller falls back to fetching metadata from the network.
pub trait LinkPreviewCache {
    /// Look up the metadata cached for `url`.
    fn get(&self, url: &Url) -> Option<LinkMetadata>;
    /// Store `metadata` under `url`.
    fn set(&self, metadata: LinkMetadata, url: &Url);
    /// Drop every cached record.
    fn remove_all(&self);
}

/// In-memory LRU tier for link metadata.
///
/// Single instance, structured like the photo caches: one serialized
/// worker, a maintenance tick, and prune/clear signal handlers. The pool
/// is small; link preview cards are few per screen.
pub struct LinkMetadataCache {
    worker: CacheWorker<Url, LinkMetadata>,
    _pressure: Subscription,
    _terminate: Subscription,
}

impl LinkMetadataCache {
    /// Create the cache and register its signal handlers.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero or `prune_fraction` is outside
    /// (0, 1].
    pub fn new(
        max_entries: usize,
        prune_fraction: f64,
        maintenance_interval: Duration,
        signals: &SignalHub,
    ) -> Self {
        let worker = CacheWorker::spawn(
            "link-metadata-cache",
            max_entries,
            prune_fraction,
            maintenance_interval,
        );

        let handle = worker.handle();
        let pressure = signals.subscribe(Signal::MemoryPressure, move || handle.prune());

        let handle = worker.handle();
        let terminate = signals.subscribe(Signal::WillTerminate, move || handle.remove_all());

        Self {
            worker,
            _pressure: pressure,
            _terminate: terminate,
        }
    }

    /// Snapshot of the instance's counters.
    pub fn stats(&self) -> CacheStats {
        self.worker.stats()
    }
}

impl LinkPreviewCache for LinkMetadataCache {
    fn get(&self, url: &Url) -> Option<LinkMetadata> {
        self.worker.get(url.clone())
    }

    fn set(&self, metadata: LinkMetadata, url: &Url) {
        self.worker.set(url.clone(), metadata);
    }

    fn remove_all(&self) {
        self.worker.remove_all();
    }
}
