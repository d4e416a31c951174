//! Process-wide maintenance signals.
//!
//! The caches react to two broadcast events: a low-memory warning and
//! process termination. `SignalHub` models the delivery as an explicit
//! subscription contract so the cache core stays platform-agnostic: the
//! platform shell posts signals into the hub, and tests can post them
//! directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A process-wide event the caches subscribe to for their lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The OS reports system-wide low memory; caches should shed entries.
    MemoryPressure,
    /// The process is about to exit; caches release everything.
    WillTerminate,
}

type Handler = Arc<dyn Fn() + Send + Sync>;

struct HubState {
    next_id: u64,
    handlers: HashMap<u64, (Signal, Handler)>,
}

/// Broadcast hub for [`Signal`] delivery.
///
/// Cloning the hub produces another handle to the same subscriber set.
/// Handlers run on the posting thread; a handler that needs to do real
/// work should hand it off to its own execution context.
#[derive(Clone)]
pub struct SignalHub {
    state: Arc<Mutex<HubState>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Register `handler` for `signal`. Delivery stops when the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, signal: Signal, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.handlers.insert(id, (signal, Arc::new(handler)));
        Subscription {
            state: Arc::clone(&self.state),
            id,
        }
    }

    /// Deliver `signal` to every current subscriber.
    ///
    /// Handlers are invoked outside the hub lock, so a handler may
    /// subscribe, unsubscribe, or post without deadlocking.
    pub fn post(&self, signal: Signal) {
        let matching: Vec<Handler> = {
            let state = self.state.lock().unwrap();
            state
                .handlers
                .values()
                .filter(|(s, _)| *s == signal)
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        for handler in matching {
            handler();
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().handlers.len()
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration handle returned by [`SignalHub::subscribe`].
///
/// Dropping it deregisters the handler.
pub struct Subscription {
    state: Arc<Mutex<HubState>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.handlers.remove(&self.id);
        }
    }
}
