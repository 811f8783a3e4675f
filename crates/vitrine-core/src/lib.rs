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

//! # Vitrine Core
//!
//! Foundational crate containing the asset identifiers, the scene graph model,
//! and the interface contracts (decoders, GPU allocators) that the rest of the
//! asset resource manager is built on.

#![warn(missing_docs)]

pub mod asset;
pub mod config;
pub mod decoder;
pub mod event;
pub mod gpu;
pub mod scene;

pub use asset::AssetKey;
pub use config::{AssetCacheConfig, AssetManagerSettings, ConfigError};
pub use decoder::{DecodeError, ProgressSink, SceneDecoder};
pub use gpu::{AllocationId, GpuAllocator, ResourceKind, TrackingAllocator};
pub use scene::SceneGraph;
