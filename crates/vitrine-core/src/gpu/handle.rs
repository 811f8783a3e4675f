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

use super::{AllocationId, GpuAllocator, ResourceKind};

/// The GPU side of a single scene resource.
///
/// The allocation is held in an `Option` that is taken on release, which makes
/// releasing idempotent: a second release is a no-op rather than a double free.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuHandle {
    kind: ResourceKind,
    byte_size: u64,
    allocation: Option<AllocationId>,
}

impl GpuHandle {
    /// Allocates a new handle of `byte_size` bytes.
    pub fn allocate(allocator: &dyn GpuAllocator, kind: ResourceKind, byte_size: u64) -> Self {
        Self {
            kind,
            byte_size,
            allocation: Some(allocator.allocate(kind, byte_size)),
        }
    }

    /// Allocates a fresh, independent handle of the same kind and size.
    ///
    /// Used when a scene graph is deep-cloned: the clone must never share an
    /// allocation with its source.
    pub fn duplicate(&self, allocator: &dyn GpuAllocator) -> Self {
        Self::allocate(allocator, self.kind, self.byte_size)
    }

    /// Releases the allocation. Returns `true` if something was released.
    pub fn release(&mut self, allocator: &dyn GpuAllocator) -> bool {
        match self.allocation.take() {
            Some(id) => {
                allocator.release(id);
                true
            }
            None => false,
        }
    }

    /// Returns the resource kind this handle backs.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Returns the size of the allocation in bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Returns the live allocation, if it has not been released yet.
    pub fn allocation(&self) -> Option<AllocationId> {
        self.allocation
    }

    /// Returns `true` while the allocation is held.
    pub fn is_live(&self) -> bool {
        self.allocation.is_some()
    }
}
