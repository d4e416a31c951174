//! Photo preview facade.
//!
//! Routes requests to the full-image or thumbnail pool by intent and
//! fans removals out to both. Pure delegation; the facade holds no cache
//! state of its own.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::CacheConfig;
use crate::photo::{PhotoImage, PhotoMemoryCache, PhotoSizeClass};
use crate::signals::SignalHub;
use crate::worker::CacheStats;

/// Combined interface over the two photo size-class caches.
pub struct PhotoPreviewCache {
    full_image: PhotoMemoryCache,
    thumbnail: PhotoMemoryCache,
}

impl PhotoPreviewCache {
    /// Build both size-class caches from `config`, subscribing each to
    /// the signal hub.
    pub fn new(config: &CacheConfig, signals: &SignalHub) -> Self {
        Self {
            full_image: PhotoMemoryCache::new(
                PhotoSizeClass::FullImage,
                config.full_image_entries,
                config.full_image_prune_fraction,
                config.maintenance_interval,
                signals,
            ),
            thumbnail: PhotoMemoryCache::new(
                PhotoSizeClass::Thumbnail,
                config.thumbnail_entries,
                config.thumbnail_prune_fraction,
                config.maintenance_interval,
                signals,
            ),
        }
    }

    pub fn get_full_image(&self, photo_id: Uuid) -> Option<Arc<PhotoImage>> {
        self.full_image.get(photo_id)
    }

    pub fn get_thumbnail(&self, photo_id: Uuid) -> Option<Arc<PhotoImage>> {
        self.thumbnail.get(photo_id)
    }

    pub fn set_full_image(&self, image: PhotoImage, photo_id: Uuid) {
        self.full_image.set(image, photo_id);
    }

    pub fn set_thumbnail(&self, image: PhotoImage, photo_id: Uuid) {
        self.thumbnail.set(image, photo_id);
    }

    /// Remove both renditions of a photo.
    pub fn remove_images(&self, photo_id: Uuid) {
        self.full_image.remove(photo_id);
        self.thumbnail.remove(photo_id);
    }

    /// Clear both pools synchronously.
    pub fn remove_all(&self) {
        self.full_image.remove_all();
        self.thumbnail.remove_all();
    }

    pub fn full_image_stats(&self) -> CacheStats {
        self.full_image.stats()
    }

    pub fn thumbnail_stats(&self) -> CacheStats {
        self.thumbnail.stats()
    }
}
