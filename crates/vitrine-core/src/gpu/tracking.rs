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

//! An in-process [`GpuAllocator`] that keeps a ledger of live allocations.

use super::{AllocationId, GpuAllocator, ResourceKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time view of the allocator's ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Number of allocations currently live.
    pub live: usize,
    /// Bytes currently held by live allocations.
    pub live_bytes: u64,
    /// Live geometry allocations.
    pub live_geometries: usize,
    /// Live material allocations.
    pub live_materials: usize,
    /// Live texture allocations.
    pub live_textures: usize,
    /// Allocations handed out since creation.
    pub total_allocated: u64,
    /// Allocations returned since creation.
    pub total_released: u64,
    /// Releases of ids that were not live. Always zero in a correct program.
    pub invalid_releases: u64,
}

/// A [`GpuAllocator`] that records every allocation it hands out.
///
/// It does not talk to a device. It is the allocator used by tests, by the
/// sandbox, and by any host that uploads resources elsewhere and only needs
/// the asset manager to tell it when an allocation may be freed.
#[derive(Debug, Default)]
pub struct TrackingAllocator {
    next_id: AtomicU64,
    live: Mutex<HashMap<AllocationId, (ResourceKind, u64)>>,
    total_allocated: AtomicU64,
    total_released: AtomicU64,
    invalid_releases: AtomicU64,
}

impl TrackingAllocator {
    /// Creates an allocator with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` is currently allocated.
    pub fn is_live(&self, id: AllocationId) -> bool {
        self.live.lock().contains_key(&id)
    }

    /// Returns the number of live allocations.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Returns a snapshot of the ledger.
    pub fn stats(&self) -> AllocationStats {
        let live = self.live.lock();
        let mut stats = AllocationStats {
            live: live.len(),
            total_allocated: self.total_allocated.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            invalid_releases: self.invalid_releases.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (kind, bytes) in live.values() {
            stats.live_bytes += bytes;
            match kind {
                ResourceKind::Geometry => stats.live_geometries += 1,
                ResourceKind::Material => stats.live_materials += 1,
                ResourceKind::Texture => stats.live_textures += 1,
            }
        }
        stats
    }
}

impl GpuAllocator for TrackingAllocator {
    fn allocate(&self, kind: ResourceKind, byte_size: u64) -> AllocationId {
        let id = AllocationId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.live.lock().insert(id, (kind, byte_size));
        self.total_allocated.fetch_add(1, Ordering::Relaxed);
        log::trace!("Allocated {kind} {id:?} ({byte_size} bytes)");
        id
    }

    fn release(&self, id: AllocationId) {
        match self.live.lock().remove(&id) {
            Some((kind, _)) => {
                self.total_released.fetch_add(1, Ordering::Relaxed);
                log::trace!("Released {kind} {id:?}");
            }
            None => {
                self.invalid_releases.fetch_add(1, Ordering::Relaxed);
                log::error!("Release of {id:?} which is not a live allocation");
            }
        }
    }
}
