//! Two-tier link preview cache.
//!
//! Read-through composition of the memory and disk tiers: memory first,
//! disk on miss with the memory tier warmed from the hit, `None` on a
//! total miss. The facade never fetches metadata itself; that stays with
//! the caller.

use url::Url;

use crate::disk::DiskLinkPreviewCache;
use crate::link::{LinkMetadata, LinkMetadataCache, LinkPreviewCache};

/// Memory-over-disk link preview cache.
///
/// Writes go through to both tiers; beyond that the tiers are allowed to
/// drift. The disk tier may hold entries the memory tier has evicted,
/// and that is the point of keeping it.
pub struct HybridLinkPreviewCache {
    memory: LinkMetadataCache,
    disk: DiskLinkPreviewCache,
}

impl HybridLinkPreviewCache {
    pub fn new(memory: LinkMetadataCache, disk: DiskLinkPreviewCache) -> Self {
        Self { memory, disk }
    }

    /// The in-memory tier, for inspection.
    pub fn memory(&self) -> &LinkMetadataCache {
        &self.memory
    }

    /// The persistent tier, for inspection.
    pub fn disk(&self) -> &DiskLinkPreviewCache {
        &self.disk
    }
}

impl LinkPreviewCache for HybridLinkPreviewCache {
    fn get(&self, url: &Url) -> Option<LinkMetadata> {
        if let Some(metadata) = self.memory.get(url) {
            return Some(metadata);
        }

        if let Some(metadata) = self.disk.get(url) {
            // Warm the memory tier so the next lookup skips the disk.
            self.memory.set(metadata.clone(), url);
            return Some(metadata);
        }

        None
    }

    fn set(&self, metadata: LinkMetadata, url: &Url) {
        self.memory.set(metadata.clone(), url);
        self.disk.set(metadata, url);
    }

    fn remove_all(&self) {
        self.memory.remove_all();
        self.disk.remove_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalHub;
    use shelfmark_store::SharedStore;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn fixture() -> (tempfile::TempDir, SharedStore, SignalHub, HybridLinkPreviewCache) {
        let temp = tempfile::tempdir().unwrap();
        let store = SharedStore::with_root(temp.path()).unwrap();
        let signals = SignalHub::new();
        let memory = LinkMetadataCache::new(10, 0.25, HOUR, &signals);
        let disk = DiskLinkPreviewCache::new(store.clone());
        let hybrid = HybridLinkPreviewCache::new(memory, disk);
        (temp, store, signals, hybrid)
    }

    fn url(n: usize) -> Url {
        Url::parse(&format!("https://example.com/saved/{n}")).unwrap()
    }

    fn metadata(n: usize) -> LinkMetadata {
        LinkMetadata::new(url(n)).with_title(format!("Saved {n}"))
    }

    #[test]
    fn set_then_get_hits_memory() {
        let (_temp, _store, _signals, hybrid) = fixture();

        hybrid.set(metadata(1), &url(1));
        assert_eq!(hybrid.get(&url(1)), Some(metadata(1)));
        assert_eq!(hybrid.memory().stats().hits, 1);
    }

    #[test]
    fn disk_hit_warms_the_memory_tier() {
        let (_temp, store, _signals, hybrid) = fixture();

        // Seed only the disk tier, as if written by the share extension.
        let key = DiskLinkPreviewCache::cache_key(&url(1));
        store
            .set(&key, &serde_json::to_vec(&metadata(1)).unwrap())
            .unwrap();

        assert_eq!(hybrid.get(&url(1)), Some(metadata(1)));
        // The memory tier now answers directly, without another facade get.
        assert_eq!(hybrid.memory().get(&url(1)), Some(metadata(1)));
    }

    #[test]
    fn total_miss_returns_none() {
        let (_temp, _store, _signals, hybrid) = fixture();
        assert_eq!(hybrid.get(&url(9)), None);
    }

    #[test]
    fn set_writes_through_to_disk() {
        let (_temp, store, _signals, hybrid) = fixture();

        hybrid.set(metadata(1), &url(1));
        // Settle the disk queue behind the write.
        let _ = hybrid.disk().get(&url(1));

        let key = DiskLinkPreviewCache::cache_key(&url(1));
        assert!(store.contains(&key).unwrap());
    }

    #[test]
    fn entry_survives_memory_eviction_via_disk() {
        let (_temp, _store, _signals, hybrid) = fixture();

        // Push the first entry out of the 10-entry memory tier.
        for n in 0..11 {
            hybrid.set(metadata(n), &url(n));
        }
        assert_eq!(hybrid.memory().get(&url(0)), None);

        // The facade still serves it from disk and re-warms memory.
        assert_eq!(hybrid.get(&url(0)), Some(metadata(0)));
        assert_eq!(hybrid.memory().get(&url(0)), Some(metadata(0)));
    }

    #[test]
    fn remove_all_clears_both_tiers() {
        let (_temp, store, _signals, hybrid) = fixture();

        for n in 0..3 {
            hybrid.set(metadata(n), &url(n));
        }
        hybrid.remove_all();

        for n in 0..3 {
            assert_eq!(hybrid.get(&url(n)), None);
        }
        assert_eq!(hybrid.memory().stats().entry_count, 0);
        assert!(store.keys_with_prefix("linkpreview_").unwrap().is_empty());
    }
}
