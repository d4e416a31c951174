//! Composition root for the preview caches.
//!
//! One `PreviewCaches` is constructed at startup and owned for the
//! process lifetime; components that need a cache borrow it from here
//! instead of reaching for a global. The platform shell forwards OS
//! notifications into the hub returned by [`PreviewCaches::signals`].

use shelfmark_store::SharedStore;

use crate::config::{CacheConfig, ConfigError};
use crate::disk::DiskLinkPreviewCache;
use crate::hybrid::HybridLinkPreviewCache;
use crate::link::LinkMetadataCache;
use crate::preview::PhotoPreviewCache;
use crate::signals::SignalHub;

/// Errors from wiring up the cache subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CacheSetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] shelfmark_store::StoreError),
}

/// Owner of every cache instance in the process.
pub struct PreviewCaches {
    signals: SignalHub,
    photos: PhotoPreviewCache,
    link_previews: HybridLinkPreviewCache,
}

impl PreviewCaches {
    /// Validate `config`, open the shared store, and build all tiers.
    pub fn new(config: CacheConfig) -> Result<Self, CacheSetupError> {
        config.validate()?;

        let signals = SignalHub::new();
        let photos = PhotoPreviewCache::new(&config, &signals);

        let store = SharedStore::with_root(&config.disk_cache_dir)?;
        let memory = LinkMetadataCache::new(
            config.link_entries,
            config.link_prune_fraction,
            config.maintenance_interval,
            &signals,
        );
        let disk = DiskLinkPreviewCache::new(store);
        let link_previews = HybridLinkPreviewCache::new(memory, disk);

        Ok(Self {
            signals,
            photos,
            link_previews,
        })
    }

    /// Hub the platform shell posts OS signals into.
    pub fn signals(&self) -> &SignalHub {
        &self.signals
    }

    pub fn photos(&self) -> &PhotoPreviewCache {
        &self.photos
    }

    pub fn link_previews(&self) -> &HybridLinkPreviewCache {
        &self.link_previews
    }
}
