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


//! Lock-protected cache bookkeeping.

use super::CanonicalSnapshot;
use std::collections::HashMap;
use std::sync::Arc;
use vitrine_core::asset::AssetKey;
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::SceneGraph;
use vitrine_lanes::resource_lane::dispose_graph;

/// The canonical graph of an entry. Its resources are disposed when the last
/// reference to it goes away.
pub(crate) struct CanonicalGraph {
    pub(crate) key: AssetKey,
    pub(crate) graph: SceneGraph,
    allocator: Arc<dyn GpuAllocator>,
}

impl CanonicalGraph {
    pub(crate) fn new(key: AssetKey, graph: SceneGraph, allocator: Arc<dyn GpuAllocator>) -> Self {
        Self {
            key,
            graph,
            allocator,
        }
    }
}

impl Drop for CanonicalGraph {
    fn drop(&mut self) {
        let report = dispose_graph(&mut self.graph, self.allocator.as_ref());
        log::debug!(
            "Disposed canonical graph of '{}' ({} resource(s) released)",
            self.key,
            report.released()
        );
    }
}

impl std::fmt::Debug for CanonicalGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalGraph")
            .field("key", &self.key)
            .field("nodes", &self.graph.node_count())
            .finish_non_exhaustive()
    }
}

/// One canonical entry.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    /// Shared only while a reservation is being turned into a working copy.
    pub(crate) graph: Arc<CanonicalGraph>,
    pub(crate) last_accessed: u64,
    pub(crate) ref_count: usize,
}

impl CacheEntry {
    pub(crate) fn snapshot(&self, key: &AssetKey) -> CanonicalSnapshot {
        CanonicalSnapshot {
            key: key.clone(),
            ref_count: self.ref_count,
            last_accessed: self.last_accessed,
            node_count: self.graph.graph.node_count(),
            resource_count: self.graph.graph.resource_count(),
            live_bytes: self.graph.graph.live_bytes(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CacheState {
    pub(crate) entries: HashMap<AssetKey, CacheEntry>,
    clock: u64,
    pub(crate) hits: u64,
    pub(crate) misses: u64,
    pub(crate) insertions: u64,
    pub(crate) evictions: u64,
}

impl CacheState {
    /// Advances the logical clock used for recency.
    pub(crate) fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    /// The least recently used unreferenced entry other than `keep`.
    pub(crate) fn least_recently_used(&self, keep: &AssetKey) -> Option<AssetKey> {
        self.entries
            .iter()
            .filter(|(key, entry)| entry.ref_count == 0 && *key != keep)
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
    }
}
