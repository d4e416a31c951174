//! In-memory photo cache.
//!
//! One `PhotoMemoryCache` exists per photo size class. Each instance owns
//! its own serialized worker, LRU store, maintenance tick and signal
//! subscriptions; the two size classes never share state, so filling one
//! pool cannot evict from the other.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::signals::{Signal, SignalHub, Subscription};
use crate::worker::{CacheStats, CacheWorker};

/// Decoded image payload held by the photo caches.
///
/// The cache treats the bitmap as opaque bytes; decoding and rendering
/// belong to the image pipeline, not to this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoImage {
    /// Raw pixel data (RGBA format).
    pub pixels: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PhotoImage {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Memory footprint of the bitmap in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}

/// The two photo pools kept in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSizeClass {
    /// Full-resolution decode of the stored photo.
    FullImage,
    /// Small preview used in list rows.
    Thumbnail,
}

impl PhotoSizeClass {
    fn label(self) -> &'static str {
        match self {
            PhotoSizeClass::FullImage => "photo-cache-full",
            PhotoSizeClass::Thumbnail => "photo-cache-thumb",
        }
    }
}

/// LRU cache for decoded photos of one size class.
///
/// `get` blocks the caller until the serialized worker reaches the
/// lookup; `set` and `remove` return immediately and apply later on the
/// worker, so a write is not guaranteed to be visible to a read issued
/// from another thread in between. `remove_all` is synchronous.
///
/// Lookups never fail: a miss is `None`, and the caller falls back to
/// the authoritative photo store.
pub struct PhotoMemoryCache {
    worker: CacheWorker<Uuid, Arc<PhotoImage>>,
    _pressure: Subscription,
    _terminate: Subscription,
}

impl PhotoMemoryCache {
    /// Create the cache for `class` and register its signal handlers.
    ///
    /// A memory-pressure signal queues a fractional prune; a termination
    /// signal clears the cache synchronously. Both subscriptions are
    /// dropped with the cache.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero or `prune_fraction` is outside
    /// (0, 1].
    pub fn new(
        class: PhotoSizeClass,
        max_entries: usize,
        prune_fraction: f64,
        maintenance_interval: Duration,
        signals: &SignalHub,
    ) -> Self {
        let worker = CacheWorker::spawn(
            class.label(),
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

    /// Retrieve the photo and bump it to most-recently-used.
    pub fn get(&self, photo_id: Uuid) -> Option<Arc<PhotoImage>> {
        self.worker.get(photo_id)
    }

    /// Insert or update the photo; returns before the write applies.
    pub fn set(&self, image: PhotoImage, photo_id: Uuid) {
        self.worker.set(photo_id, Arc::new(image));
    }

    /// Remove one photo; returns before the removal applies.
    pub fn remove(&self, photo_id: Uuid) {
        self.worker.remove(photo_id);
    }

    /// Remove every cached photo, waiting for the clear to complete.
    pub fn remove_all(&self) {
        self.worker.remove_all();
    }

    /// Snapshot of the instance's counters.
    pub fn stats(&self) -> CacheStats {
        self.worker.stats()
    }
}
