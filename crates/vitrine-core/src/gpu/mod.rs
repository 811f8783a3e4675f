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

//! The contract between scene graphs and the GPU memory that backs them.
//!
//! Scene graph resources never talk to a graphics API directly. They hold an
//! [`AllocationId`] handed out by a [`GpuAllocator`] and give it back exactly
//! once when they are disposed. The [`TrackingAllocator`] implementation keeps
//! a ledger of live allocations so leaks and double releases are observable.

mod handle;
mod tracking;

pub use handle::*;
pub use tracking::*;

use std::fmt;

/// Identifies one GPU-side allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(u64);

impl AllocationId {
    /// Wraps a raw allocation index.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw allocation index.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// The category of a GPU-resident resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Vertex and index buffers of a mesh primitive.
    Geometry,
    /// A material's uniform block and pipeline state.
    Material,
    /// An image uploaded for sampling.
    Texture,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Geometry => "geometry",
            ResourceKind::Material => "material",
            ResourceKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// Hands out and reclaims GPU allocations.
///
/// Implementations must be thread-safe: decoders allocate from background
/// tasks while consumers release working copies from their own threads.
pub trait GpuAllocator: Send + Sync + fmt::Debug {
    /// Reserves `byte_size` bytes for a resource of the given kind.
    fn allocate(&self, kind: ResourceKind, byte_size: u64) -> AllocationId;

    /// Returns an allocation to the device.
    fn release(&self, id: AllocationId);
}
