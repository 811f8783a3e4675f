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


//! Consumer-owned clones of canonical assets.

use super::state::CanonicalGraph;
use super::{CacheError, CacheInner};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use vitrine_core::asset::AssetKey;
use vitrine_core::gpu::GpuAllocator;
use vitrine_core::scene::SceneGraph;
use vitrine_lanes::resource_lane::dispose_graph;

static NEXT_COPY_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a working copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkingCopyId(u64);

impl WorkingCopyId {
    fn next() -> Self {
        Self(NEXT_COPY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkingCopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "copy#{}", self.0)
    }
}

/// A pinned claim on one future working copy.
///
/// The entry's reference count was incremented when the reservation was made,
/// so the entry cannot be evicted while the reservation exists. Dropping an
/// unused reservation gives the reference back.
pub struct Reservation {
    key: AssetKey,
    canonical: Arc<CanonicalGraph>,
    cache: Arc<CacheInner>,
    consumed: bool,
}

impl Reservation {
    pub(crate) fn new(key: AssetKey, canonical: Arc<CanonicalGraph>, cache: Arc<CacheInner>) -> Self {
        Self {
            key,
            canonical,
            cache,
            consumed: false,
        }
    }

    /// The reserved key.
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    /// Deep-clones the canonical graph into a working copy.
    pub fn into_working_copy(mut self) -> WorkingCopy {
        let graph = self.canonical.graph.deep_clone(self.cache.allocator());
        self.consumed = true;

        let copy = WorkingCopy {
            id: WorkingCopyId::next(),
            key: self.key.clone(),
            graph,
            allocator: self.cache.allocator.clone(),
            cache: Arc::downgrade(&self.cache),
            released: false,
        };
        log::debug!("Checked out {} of '{}'", copy.id, copy.key);
        copy
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.consumed {
            log::debug!("Unused reservation of '{}' returned", self.key);
            if let Err(e) = self.cache.unpin(&self.key) {
                log::error!("Failed to return reservation: {}", e);
            }
        }
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("key", &self.key)
            .field("consumed", &self.consumed)
            .finish()
    }
}

/// An independent, mutable clone of a cached asset.
///
/// The copy owns its GPU resources; nothing it does affects the canonical
/// graph or any other copy. Hand it back with
/// [`AssetCache::release`](super::AssetCache::release). A copy that is simply
/// dropped is released the same way.
pub struct WorkingCopy {
    id: WorkingCopyId,
    key: AssetKey,
    graph: SceneGraph,
    allocator: Arc<dyn GpuAllocator>,
    cache: Weak<CacheInner>,
    released: bool,
}

impl WorkingCopy {
    /// The copy's identity.
    pub fn id(&self) -> WorkingCopyId {
        self.id
    }

    /// The asset this copy was cloned from.
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    /// The copy's scene graph.
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The copy's scene graph, mutably.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub(crate) fn is_from(&self, cache: &Arc<CacheInner>) -> bool {
        std::ptr::eq(self.cache.as_ptr(), Arc::as_ptr(cache))
    }

    pub(crate) fn release(mut self) -> Result<(), CacheError> {
        self.release_in_place()
    }

    fn release_in_place(&mut self) -> Result<(), CacheError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let report = dispose_graph(&mut self.graph, self.allocator.as_ref());
        log::debug!(
            "Released {} of '{}' ({} resource(s) disposed)",
            self.id,
            self.key,
            report.released()
        );
        match self.cache.upgrade() {
            Some(cache) => cache.unpin(&self.key),
            None => Err(CacheError::NotFound(self.key.clone())),
        }
    }
}

impl Deref for WorkingCopy {
    type Target = SceneGraph;

    fn deref(&self) -> &SceneGraph {
        &self.graph
    }
}

impl DerefMut for WorkingCopy {
    fn deref_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        if !self.released {
            log::debug!("{} of '{}' dropped without release", self.id, self.key);
            if let Err(e) = self.release_in_place() {
                log::warn!("Dropped working copy could not be returned: {}", e);
            }
        }
    }
}

impl fmt::Debug for WorkingCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingCopy")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("nodes", &self.graph.node_count())
            .field("live_resources", &self.graph.live_resource_count())
            .finish()
    }
}
