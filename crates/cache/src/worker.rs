//! Serialized execution context for the in-memory cache tiers.
//!
//! Each cache instance owns exactly one worker thread; the thread owns
//! the LRU store outright, so every mutation is linearized without
//! locking. Reads are request/reply round-trips that block the caller
//! until the queue drains to them; writes are fire-and-forget enqueues.
//! Ops from one calling thread are observed in issue order, but a write
//! is not guaranteed to be visible to a read issued from a *different*
//! thread before the queue reaches it.
//!
//! Between ops the thread waits with a deadline that doubles as the
//! periodic maintenance tick, which re-enforces capacity as a safety net.

use std::hash::Hash;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::lru::LruStore;

/// Point-in-time counters for one memory cache instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries currently held.
    pub entry_count: usize,
    /// Configured capacity.
    pub max_entries: usize,
    /// Number of lookups that found an entry.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Entries evicted by capacity enforcement.
    pub evictions: u64,
    /// Entries removed by memory-pressure prunes.
    pub pruned: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 to 1.0.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum Op<K, V> {
    Get {
        key: K,
        reply: Sender<Option<V>>,
    },
    Set {
        key: K,
        value: V,
    },
    Remove {
        key: K,
    },
    RemoveAll {
        done: Sender<()>,
    },
    Prune,
    Stats {
        reply: Sender<CacheStats>,
    },
    Shutdown,
}

/// Cheap, clonable handle for enqueueing ops from signal handlers.
pub(crate) struct OpHandle<K, V> {
    ops: Sender<Op<K, V>>,
}

impl<K, V> Clone for OpHandle<K, V> {
    fn clone(&self) -> Self {
        Self {
            ops: self.ops.clone(),
        }
    }
}

impl<K: Send, V: Send> OpHandle<K, V> {
    /// Queue a fractional prune; returns immediately.
    pub(crate) fn prune(&self) {
        let _ = self.ops.send(Op::Prune);
    }

    /// Clear the store and wait for completion.
    pub(crate) fn remove_all(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        if self.ops.send(Op::RemoveAll { done: done_tx }).is_ok() {
            let _ = done_rx.recv();
        }
    }
}

/// One serialized worker owning an [`LruStore`].
///
/// Dropping the worker shuts the thread down after draining already
/// queued ops.
pub(crate) struct CacheWorker<K, V> {
    ops: Sender<Op<K, V>>,
    thread: Option<JoinHandle<()>>,
}

impl<K, V> CacheWorker<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Spawn the worker thread for a cache instance.
    ///
    /// `label` names the thread. `tick` is the maintenance interval; the
    /// capacity invariant holds even if it never fires.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero or `prune_fraction` is outside
    /// (0, 1], both construction-time programming errors.
    pub(crate) fn spawn(
        label: &str,
        max_entries: usize,
        prune_fraction: f64,
        tick: Duration,
    ) -> Self {
        assert!(max_entries > 0, "LRU store capacity must be at least 1");
        assert!(
            prune_fraction > 0.0 && prune_fraction <= 1.0,
            "prune fraction must be in (0, 1]"
        );
        let (ops_tx, ops_rx) = mpsc::channel::<Op<K, V>>();
        let thread = thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                let mut store = LruStore::new(max_entries);
                let mut hits = 0u64;
                let mut misses = 0u64;
                let mut pruned = 0u64;
                let mut next_tick = Instant::now() + tick;

                loop {
                    let timeout = next_tick.saturating_duration_since(Instant::now());
                    let op = match ops_rx.recv_timeout(timeout) {
                        Ok(op) => op,
                        Err(RecvTimeoutError::Timeout) => {
                            store.enforce_capacity();
                            next_tick = Instant::now() + tick;
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    };
                    match op {
                        Op::Get { key, reply } => {
                            let value = store.get(&key).cloned();
                            if value.is_some() {
                                hits += 1;
                            } else {
                                misses += 1;
                            }
                            let _ = reply.send(value);
                        }
                        Op::Set { key, value } => store.set(key, value),
                        Op::Remove { key } => {
                            store.remove(&key);
                        }
                        Op::RemoveAll { done } => {
                            store.remove_all();
                            let _ = done.send(());
                        }
                        Op::Prune => {
                            let removed = store.prune_fractional(prune_fraction);
                            pruned += removed as u64;
                            tracing::debug!(removed, "pruned cache entries under memory pressure");
                        }
                        Op::Stats { reply } => {
                            let _ = reply.send(CacheStats {
                                entry_count: store.len(),
                                max_entries: store.max_entries(),
                                hits,
                                misses,
                                evictions: store.evictions(),
                                pruned,
                            });
                        }
                        Op::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn cache worker thread");

        Self {
            ops: ops_tx,
            thread: Some(thread),
        }
    }

    /// Synchronous lookup; blocks until the worker reaches this op.
    pub(crate) fn get(&self, key: K) -> Option<V> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.ops
            .send(Op::Get {
                key,
                reply: reply_tx,
            })
            .ok()?;
        reply_rx.recv().ok().flatten()
    }

    /// Fire-and-forget insert or update.
    pub(crate) fn set(&self, key: K, value: V) {
        let _ = self.ops.send(Op::Set { key, value });
    }

    /// Fire-and-forget removal.
    pub(crate) fn remove(&self, key: K) {
        let _ = self.ops.send(Op::Remove { key });
    }

    /// Synchronous full clear.
    pub(crate) fn remove_all(&self) {
        self.handle().remove_all();
    }

    /// Synchronous stats snapshot.
    pub(crate) fn stats(&self) -> CacheStats {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self
            .ops
            .send(Op::Stats { reply: reply_tx })
            .is_err()
        {
            return CacheStats::default();
        }
        reply_rx.recv().unwrap_or_default()
    }

    pub(crate) fn handle(&self) -> OpHandle<K, V> {
        OpHandle {
            ops: self.ops.clone(),
        }
    }
}

impl<K, V> Drop for CacheWorker<K, V> {
    fn drop(&mut self) {
        let _ = self.ops.send(Op::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
