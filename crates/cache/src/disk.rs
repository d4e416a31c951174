//! Persistent link preview tier.
//!
//! Stores serialized [`LinkMetadata`] records in the shared key-value
//! store under a namespaced key, so entries survive process restarts and
//! are visible to the share-extension process. All I/O for one instance
//! runs on a single background queue; reads block the caller for the
//! (short) duration of the disk access, writes are fire-and-forget and
//! best-effort.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use url::Url;

use shelfmark_store::SharedStore;

use crate::link::{LinkMetadata, LinkPreviewCache};

/// Namespace prefix for every key this tier owns in the shared store.
const KEY_PREFIX: &str = "linkpreview_";

enum DiskOp {
    Get {
        key: String,
        reply: Sender<Option<LinkMetadata>>,
    },
    Set {
        key: String,
        metadata: LinkMetadata,
    },
    RemoveAll,
    Shutdown,
}

/// On-disk cache for link metadata, keyed by URL.
///
/// A failed write never surfaces to the caller; a corrupted entry is
/// deleted on read and reported as a miss. The only pruning is an
/// explicit [`LinkPreviewCache::remove_all`] or that self-healing
/// deletion; there is no capacity-driven eviction on disk.
pub struct DiskLinkPreviewCache {
    ops: Sender<DiskOp>,
    thread: Option<JoinHandle<()>>,
}

impl DiskLinkPreviewCache {
    /// Take ownership of `store` and start the I/O queue.
    pub fn new(store: SharedStore) -> Self {
        let (ops_tx, ops_rx) = mpsc::channel::<DiskOp>();
        let thread = thread::Builder::new()
            .name("link-preview-disk".to_string())
            .spawn(move || {
                while let Ok(op) = ops_rx.recv() {
                    match op {
                        DiskOp::Get { key, reply } => {
                            let _ = reply.send(read_entry(&store, &key));
                        }
                        DiskOp::Set { key, metadata } => write_entry(&store, &key, &metadata),
                        DiskOp::RemoveAll => remove_namespace(&store),
                        DiskOp::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn disk cache thread");

        Self {
            ops: ops_tx,
            thread: Some(thread),
        }
    }

    /// Store key for `url`: the namespace prefix plus the URL encoded
    /// into the store's filename-safe alphabet.
    pub(crate) fn cache_key(url: &Url) -> String {
        format!("{KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(url.as_str()))
    }
}

impl LinkPreviewCache for DiskLinkPreviewCache {
    fn get(&self, url: &Url) -> Option<LinkMetadata> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.ops
            .send(DiskOp::Get {
                key: Self::cache_key(url),
                reply: reply_tx,
            })
            .ok()?;
        reply_rx.recv().ok().flatten()
    }

    fn set(&self, metadata: LinkMetadata, url: &Url) {
        let _ = self.ops.send(DiskOp::Set {
            key: Self::cache_key(url),
            metadata,
        });
    }

    fn remove_all(&self) {
        let _ = self.ops.send(DiskOp::RemoveAll);
    }
}

impl Drop for DiskLinkPreviewCache {
    fn drop(&mut self) {
        let _ = self.ops.send(DiskOp::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn read_entry(store: &SharedStore, key: &str) -> Option<LinkMetadata> {
    let bytes = match store.get(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "disk cache read failed");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            // Corrupted entry: delete it so the next read is a clean miss.
            tracing::warn!(key = %key, error = %e, "removing corrupted link preview entry");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key = %key, error = %e, "failed to remove corrupted entry");
            }
            None
        }
    }
}

fn write_entry(store: &SharedStore, key: &str, metadata: &LinkMetadata) {
    let bytes = match serde_json::to_vec(metadata) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to serialize link preview entry");
            return;
        }
    };
    if let Err(e) = store.set(key, &bytes) {
        tracing::warn!(key = %key, error = %e, "disk cache write failed");
    }
}

fn remove_namespace(store: &SharedStore) {
    let keys = match store.keys_with_prefix(KEY_PREFIX) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(error = %e, "disk cache scan failed");
            return;
        }
    };
    for key in keys {
        if let Err(e) = store.remove(&key) {
            tracing::warn!(key = %key, error = %e, "disk cache delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, SharedStore, DiskLinkPreviewCache) {
        let temp = tempfile::tempdir().unwrap();
        let store = SharedStore::with_root(temp.path()).unwrap();
        let cache = DiskLinkPreviewCache::new(store.clone());
        (temp, store, cache)
    }

    fn url(n: usize) -> Url {
        Url::parse(&format!("https://example.com/article/{n}")).unwrap()
    }

    fn metadata(n: usize) -> LinkMetadata {
        LinkMetadata::new(url(n)).with_title(format!("Article {n}"))
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_temp, _store, cache) = fixture();

        cache.set(metadata(1), &url(1));
        assert_eq!(cache.get(&url(1)), Some(metadata(1)));
    }

    #[test]
    fn entries_survive_reopening_the_store() {
        let temp = tempfile::tempdir().unwrap();
        {
            let store = SharedStore::with_root(temp.path()).unwrap();
            let cache = DiskLinkPreviewCache::new(store);
            cache.set(metadata(1), &url(1));
            // Drop drains the queue before the thread exits.
        }

        let store = SharedStore::with_root(temp.path()).unwrap();
        let cache = DiskLinkPreviewCache::new(store);
        assert_eq!(cache.get(&url(1)), Some(metadata(1)));
    }

    #[test]
    fn corrupted_entry_is_deleted_and_reported_as_miss() {
        let (_temp, store, cache) = fixture();
        let key = DiskLinkPreviewCache::cache_key(&url(1));

        store.set(&key, b"{not json").unwrap();

        assert_eq!(cache.get(&url(1)), None);
        // Self-healed: the malformed bytes are gone from the store.
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn remove_all_only_touches_namespaced_keys() {
        let (_temp, store, cache) = fixture();

        cache.set(metadata(1), &url(1));
        cache.set(metadata(2), &url(2));
        store.set("unrelated_entry", b"keep me").unwrap();

        cache.remove_all();

        // The follow-up get queues behind the clear.
        assert_eq!(cache.get(&url(1)), None);
        assert_eq!(cache.get(&url(2)), None);
        assert!(store.keys_with_prefix(KEY_PREFIX).unwrap().is_empty());
        assert_eq!(store.get("unrelated_entry").unwrap(), Some(b"keep me".to_vec()));
    }

    #[test]
    fn distinct_urls_map_to_distinct_keys() {
        let a = DiskLinkPreviewCache::cache_key(&url(1));
        let b = DiskLinkPreviewCache::cache_key(&url(2));
        assert_ne!(a, b);
        assert!(a.starts_with(KEY_PREFIX));
    }
}
