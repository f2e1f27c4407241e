// src/run/subscribers.rs

//! Per-run subscription table.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::types::SubscriberId;

/// Receives a run's output.
///
/// Called synchronously from the run's broadcast loop while the run's lock is
/// held: a slow listener delays every other listener of the same run (but
/// never other runs). Listeners must not call back into the same run.
///
/// Any `Fn(&str, bool)` closure is a listener.
pub trait Listener: Send + Sync {
    /// `terminal` is true exactly once, on the last delivery.
    fn deliver(&self, chunk: &str, terminal: bool);
}

impl<F> Listener for F
where
    F: Fn(&str, bool) + Send + Sync,
{
    fn deliver(&self, chunk: &str, terminal: bool) {
        self(chunk, terminal)
    }
}

/// Subscriber id → listener. Only touched under the owning run's lock.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: HashMap<SubscriberId, Box<dyn Listener>>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl Subscribers {
    /// Register a listener; returns true when it replaced an existing one.
    pub(crate) fn insert(&mut self, id: SubscriberId, listener: Box<dyn Listener>) -> bool {
        self.entries.insert(id, listener).is_some()
    }

    pub(crate) fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Deliver to every listener. A listener that panics is dropped and the
    /// rest still get the chunk.
    pub(crate) fn broadcast(&mut self, chunk: &str, terminal: bool) {
        let mut panicked = Vec::new();
        for (id, listener) in &self.entries {
            if catch_unwind(AssertUnwindSafe(|| listener.deliver(chunk, terminal))).is_err() {
                panicked.push(id.clone());
            }
        }
        for id in panicked {
            warn!(subscriber = %id, "listener panicked; dropping subscriber");
            self.entries.remove(&id);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
