//! Codec registry reloads.
//!
//! The active registry is swapped atomically and every subscriber receives a
//! [`ReloadEvent`] over its own channel. Holders of codec instances (see
//! [`CodecCache`]) drop them when they observe an event, so no codec outlives
//! the registry generation it was created from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::codec::{CodecKey, CodecRegistry, MessageCodec};

/// Broadcast after the active registry has been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Generation of the registry now active.
    pub generation: u64,
    pub definitions_hash: Option<u64>,
}

struct Shared {
    registry: RwLock<Arc<CodecRegistry>>,
    generation: AtomicU64,
    subscribers: Mutex<Vec<Sender<ReloadEvent>>>,
}

/// Handle to the active codec registry. Clones share the same registry.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<Shared>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new(registry: CodecRegistry) -> Self {
        Self {
            inner: Arc::new(Shared {
                registry: RwLock::new(Arc::new(registry)),
                generation: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Returns the registry active right now.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CodecRegistry> {
        let guard = self
            .inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Registers a new listener for reload events.
    ///
    /// Listeners whose receiver was dropped are pruned first.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<ReloadEvent> {
        let (tx, rx) = unbounded();
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.receiver_count() > 0);
        subscribers.push(tx);
        rx
    }

    /// Number of listeners that still hold their receiver.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|tx| tx.receiver_count() > 0)
            .count()
    }

    /// Replaces the active registry and notifies subscribers.
    ///
    /// Returns `None` without notifying anyone when both registries were built
    /// from definitions with the same hash.
    pub fn reload(&self, registry: CodecRegistry) -> Option<ReloadEvent> {
        let definitions_hash = registry.definitions_hash();
        {
            let mut guard = self
                .inner
                .registry
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if definitions_hash.is_some() && guard.definitions_hash() == definitions_hash {
                debug!(target: "peep::catalog", "codec definitions unchanged, skipping reload");
                return None;
            }
            *guard = Arc::new(registry);
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let event = ReloadEvent {
            generation,
            definitions_hash,
        };

        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event).is_ok());
        info!(
            target: "peep::catalog",
            generation,
            subscribers = subscribers.len(),
            "codec registry reloaded"
        );
        Some(event)
    }
}

impl std::fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

/// Long-lived per-holder codec cache that invalidates itself on reload.
#[derive(Debug)]
pub struct CodecCache {
    registry: SharedRegistry,
    events: Receiver<ReloadEvent>,
    snapshot: Arc<CodecRegistry>,
    codecs: HashMap<CodecKey, Option<Box<dyn MessageCodec>>>,
    generation: u64,
}

impl CodecCache {
    #[must_use]
    pub fn new(registry: &SharedRegistry) -> Self {
        let events = registry.subscribe();
        Self {
            registry: registry.clone(),
            events,
            snapshot: registry.snapshot(),
            codecs: HashMap::new(),
            generation: registry.generation(),
        }
    }

    /// Drains pending reload events; returns `true` if the cache was cleared.
    pub fn sync(&mut self) -> bool {
        let mut latest = None;
        for event in self.events.try_iter() {
            latest = Some(event);
        }
        let Some(event) = latest else {
            return false;
        };
        self.codecs.clear();
        self.snapshot = self.registry.snapshot();
        self.generation = event.generation;
        debug!(target: "peep::catalog", generation = event.generation, "codec cache invalidated");
        true
    }

    /// Returns the cached codec for `key`, resolving it on first use.
    pub fn get(&mut self, key: CodecKey) -> Option<&mut (dyn MessageCodec + 'static)> {
        self.sync();
        let snapshot = &self.snapshot;
        self.codecs
            .entry(key)
            .or_insert_with(|| snapshot.resolve_key(key))
            .as_deref_mut()
    }

    /// Generation of the registry the cached codecs came from.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
