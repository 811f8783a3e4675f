// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! The bounded, reference-counted store of canonical scene graphs.
//!
//! Every decoded asset lives here exactly once, as an immutable canonical
//! graph. Consumers never see it: [`AssetCache::checkout`] deep-clones it into a
//! [`WorkingCopy`] with freshly allocated GPU resources, and the entry counts
//! how many copies are out. Entries with no copies out are evicted in
//! least-recently-used order once the cache holds more than
//! [`AssetCacheConfig::max_entries`] of them.

mod state;
mod working_copy;

pub use working_copy::*;

use parking_lot::Mutex;
use state::{CacheEntry, CacheState, CanonicalGraph};
use std::sync::Arc;
use vitrine_core::asset::AssetKey;
use vitrine_core::config::AssetCacheConfig;
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::SceneGraph;
use vitrine_lanes::resource_lane::optimize;

/// An error returned by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// No canonical entry exists for the key.
    #[error("no cached asset for '{0}'")]
    NotFound(AssetKey),
    /// A canonical entry already exists for the key.
    #[error("asset '{0}' is already cached")]
    AlreadyPresent(AssetKey),
}

/// Bookkeeping of one canonical entry, without access to the graph itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSnapshot {
    /// The entry's key.
    pub key: AssetKey,
    /// Working copies currently checked out.
    pub ref_count: usize,
    /// Logical time of the last access; larger is more recent.
    pub last_accessed: u64,
    /// Nodes in the canonical graph.
    pub node_count: usize,
    /// Resources owned by the canonical graph.
    pub resource_count: usize,
    /// Bytes of GPU memory held by the canonical graph.
    pub live_bytes: u64,
}

/// Counters describing the cache since it was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Canonical entries currently stored.
    pub entries: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Working copies and reservations currently outstanding.
    pub checked_out: usize,
    /// Lookups and checkouts that found their key.
    pub hits: u64,
    /// Lookups and checkouts that did not.
    pub misses: u64,
    /// Entries inserted.
    pub insertions: u64,
    /// Entries evicted, automatically or on request.
    pub evictions: u64,
}

/// A decoded graph, optimized and ready to become a canonical entry.
///
/// Created by [`AssetCache::prepare`]. Dropping it disposes its resources.
#[derive(Debug)]
pub struct PreparedGraph(CanonicalGraph);

impl PreparedGraph {
    /// The key the graph will be cached under.
    pub fn key(&self) -> &AssetKey {
        &self.0.key
    }
}

/// The result of [`AssetCache::insert_prepared`].
#[derive(Debug)]
#[must_use]
pub struct Insertion {
    /// Reservations on the new entry, or why it was not inserted.
    pub result: Result<Vec<Reservation>, CacheError>,
    /// Graphs removed from the cache by the insertion, not yet disposed.
    pub disposal: DeferredDisposal,
}

/// Canonical graphs that left the cache and still hold their resources.
///
/// [`DeferredDisposal::dispose`] releases them. Dropping the value releases
/// them as well, without logging.
#[derive(Debug, Default)]
#[must_use]
pub struct DeferredDisposal {
    evicted: Vec<(AssetKey, CacheEntry)>,
    rejected: Option<CanonicalGraph>,
}

impl DeferredDisposal {
    /// Keys of the evicted entries, in eviction order.
    pub fn evicted_keys(&self) -> Vec<AssetKey> {
        self.evicted.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Returns `true` if there is nothing to dispose.
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.rejected.is_none()
    }

    /// Disposes every graph. Returns the evicted keys.
    pub fn dispose(self) -> Vec<AssetKey> {
        let Self { evicted, rejected } = self;
        drop(rejected);
        evicted
            .into_iter()
            .map(|(key, entry)| {
                log::info!(
                    "Evicted '{}' ({} resource(s))",
                    key,
                    entry.graph.graph.resource_count()
                );
                // Dropping the last reference disposes the canonical resources.
                drop(entry);
                key
            })
            .collect()
    }
}

pub(crate) struct CacheInner {
    config: AssetCacheConfig,
    allocator: Arc<dyn GpuAllocator>,
    state: Mutex<CacheState>,
}

impl CacheInner {
    /// Gives back one reference taken by a reservation or a working copy.
    pub(crate) fn unpin(&self, key: &AssetKey) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::NotFound(key.clone()))?;
        if entry.ref_count == 0 {
            log::error!("Reference count of '{}' would drop below zero", key);
        }
        entry.ref_count = entry.ref_count.saturating_sub(1);
        Ok(())
    }

    pub(crate) fn allocator(&self) -> &dyn GpuAllocator {
        self.allocator.as_ref()
    }

    fn reserve_locked(
        self: &Arc<Self>,
        state: &mut CacheState,
        key: &AssetKey,
    ) -> Option<Reservation> {
        let now = state.tick();
        let entry = state.entries.get_mut(key)?;
        entry.ref_count += 1;
        entry.last_accessed = now;
        Some(Reservation::new(key.clone(), entry.graph.clone(), self.clone()))
    }
}

/// The asset cache. Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

impl AssetCache {
    /// Creates an empty cache whose graphs allocate from `allocator`.
    pub fn new(config: AssetCacheConfig, allocator: Arc<dyn GpuAllocator>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                allocator,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// The capacity configuration.
    pub fn config(&self) -> &AssetCacheConfig {
        &self.inner.config
    }

    /// The allocator working copies are cloned into.
    pub fn allocator(&self) -> &Arc<dyn GpuAllocator> {
        &self.inner.allocator
    }

    /// Returns the entry's bookkeeping and marks it as recently used.
    pub fn lookup(&self, key: &AssetKey) -> Option<CanonicalSnapshot> {
        let mut state = self.inner.state.lock();
        let now = state.tick();
        let snapshot = state.entries.get_mut(key).map(|entry| {
            entry.last_accessed = now;
            entry.snapshot(key)
        });
        state.record_lookup(snapshot.is_some());
        snapshot
    }

    /// Stores a freshly decoded graph as the canonical copy of `key`.
    ///
    /// The graph is optimized first. On success, returns the keys evicted to
    /// stay within capacity. If `key` is already cached the graph is disposed
    /// and [`CacheError::AlreadyPresent`] is returned.
    pub fn insert(&self, key: AssetKey, graph: SceneGraph) -> Result<Vec<AssetKey>, CacheError> {
        self.insert_reserving(key, graph, 0)
            .map(|(_, evicted)| evicted)
    }

    /// Like [`AssetCache::insert`], and atomically reserves `copies` working
    /// copies of the new entry so that it cannot be evicted before they are
    /// taken.
    pub fn insert_reserving(
        &self,
        key: AssetKey,
        graph: SceneGraph,
        copies: usize,
    ) -> Result<(Vec<Reservation>, Vec<AssetKey>), CacheError> {
        let prepared = self.prepare(key, graph);
        let Insertion { result, disposal } = self.insert_prepared(prepared, copies);
        let evicted = disposal.dispose();
        result.map(|reservations| (reservations, evicted))
    }

    /// Optimizes a decoded graph for insertion. Takes no lock.
    ///
    /// The returned graph is disposed if it is dropped without being inserted.
    pub fn prepare(&self, key: AssetKey, mut graph: SceneGraph) -> PreparedGraph {
        let root = graph.root();
        optimize(&mut graph, root);
        PreparedGraph(CanonicalGraph::new(key, graph, self.inner.allocator.clone()))
    }

    /// Inserts a prepared graph and reserves `copies` working copies of it,
    /// without disposing anything.
    ///
    /// Entries evicted to stay within capacity, or the graph itself if its
    /// key is already cached, come back in [`Insertion::disposal`]. Only
    /// bookkeeping happens under the cache lock, so callers may hold their
    /// own locks across this call and dispose once they have released them.
    pub fn insert_prepared(&self, prepared: PreparedGraph, copies: usize) -> Insertion {
        let PreparedGraph(canonical) = prepared;
        let key = canonical.key.clone();

        let mut state = self.inner.state.lock();
        if state.entries.contains_key(&key) {
            drop(state);
            log::error!("Rejected duplicate canonical entry for '{}'", key);
            return Insertion {
                result: Err(CacheError::AlreadyPresent(key)),
                disposal: DeferredDisposal {
                    evicted: Vec::new(),
                    rejected: Some(canonical),
                },
            };
        }

        let now = state.tick();
        let graph = Arc::new(canonical);
        state.entries.insert(
            key.clone(),
            CacheEntry {
                graph: graph.clone(),
                last_accessed: now,
                ref_count: copies,
            },
        );
        state.insertions += 1;

        let mut evicted = Vec::new();
        while state.entries.len() > self.inner.config.max_entries {
            let Some(victim) = state.least_recently_used(&key) else {
                log::warn!(
                    "Asset cache over capacity ({}/{}): every other entry is referenced",
                    state.entries.len(),
                    self.inner.config.max_entries
                );
                break;
            };
            if let Some(entry) = state.entries.remove(&victim) {
                evicted.push((victim, entry));
            }
        }
        state.evictions += evicted.len() as u64;
        let entries = state.entries.len();
        drop(state);

        let reservations = (0..copies)
            .map(|_| Reservation::new(key.clone(), graph.clone(), self.inner.clone()))
            .collect();
        log::info!("Cached '{}' ({} entries)", key, entries);
        Insertion {
            result: Ok(reservations),
            disposal: DeferredDisposal {
                evicted,
                rejected: None,
            },
        }
    }

    /// Pins the entry for one working copy without cloning it yet.
    ///
    /// The clone is produced by [`Reservation::into_working_copy`]; dropping
    /// the reservation instead gives the reference back.
    pub fn reserve(&self, key: &AssetKey) -> Result<Reservation, CacheError> {
        let mut state = self.inner.state.lock();
        let reservation = self.inner.reserve_locked(&mut state, key);
        state.record_lookup(reservation.is_some());
        match reservation {
            Some(reservation) => {
                log::debug!("Cache hit for '{}'", key);
                Ok(reservation)
            }
            None => Err(CacheError::NotFound(key.clone())),
        }
    }

    /// Hands out a new, independent working copy of `key`.
    ///
    /// The reference count is taken under the lock; the deep clone happens
    /// after it is released.
    pub fn checkout(&self, key: &AssetKey) -> Result<WorkingCopy, CacheError> {
        Ok(self.reserve(key)?.into_working_copy())
    }

    /// Disposes a working copy and gives its reference back.
    ///
    /// The copy's resources are always disposed. If its entry is no longer
    /// known, [`CacheError::NotFound`] is returned. A copy checked out from
    /// another cache is also [`CacheError::NotFound`] here; it is handed back
    /// to the cache it came from.
    pub fn release(&self, copy: WorkingCopy) -> Result<(), CacheError> {
        if !copy.is_from(&self.inner) {
            log::warn!("{} of '{}' belongs to another cache", copy.id(), copy.key());
            let key = copy.key().clone();
            drop(copy);
            return Err(CacheError::NotFound(key));
        }
        copy.release()
    }

    /// Removes an unreferenced entry and disposes its canonical resources.
    ///
    /// Returns `Ok(false)` and keeps the entry if copies are still out.
    pub fn evict(&self, key: &AssetKey) -> Result<bool, CacheError> {
        let mut state = self.inner.state.lock();
        let entry = state
            .entries
            .get(key)
            .ok_or_else(|| CacheError::NotFound(key.clone()))?;
        if entry.ref_count > 0 {
            log::debug!(
                "Not evicting '{}': {} working copies out",
                key,
                entry.ref_count
            );
            return Ok(false);
        }
        let evicted = state
            .entries
            .remove(key)
            .map(|entry| (key.clone(), entry))
            .into_iter()
            .collect();
        state.evictions += 1;
        drop(state);

        DeferredDisposal {
            evicted,
            rejected: None,
        }
        .dispose();
        Ok(true)
    }

    /// Evicts every unreferenced entry. Returns the evicted keys.
    pub fn clear(&self) -> Vec<AssetKey> {
        let mut state = self.inner.state.lock();
        let victims: Vec<AssetKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.ref_count == 0)
            .map(|(key, _)| key.clone())
            .collect();
        let evicted: Vec<(AssetKey, CacheEntry)> = victims
            .into_iter()
            .filter_map(|key| state.entries.remove(&key).map(|entry| (key, entry)))
            .collect();
        state.evictions += evicted.len() as u64;
        drop(state);

        DeferredDisposal {
            evicted,
            rejected: None,
        }
        .dispose()
    }

    /// Number of canonical entries.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` has a canonical entry. Does not touch recency.
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    /// Working copies of `key` currently out, `None` if it is not cached.
    pub fn ref_count(&self, key: &AssetKey) -> Option<usize> {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.ref_count)
    }

    /// Cached keys, least recently used first.
    pub fn keys_by_recency(&self) -> Vec<AssetKey> {
        let state = self.inner.state.lock();
        let mut keys: Vec<(u64, AssetKey)> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_accessed, key.clone()))
            .collect();
        keys.sort();
        keys.into_iter().map(|(_, key)| key).collect()
    }

    /// A snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.inner.config.max_entries,
            checked_out: state.entries.values().map(|entry| entry.ref_count).sum(),
            hits: state.hits,
            misses: state.misses,
            insertions: state.insertions,
            evictions: state.evictions,
        }
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests;
