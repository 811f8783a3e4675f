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


//! Acts as the agent for the asset subsystem.
//!
//! [`AssetManager`] is the public entry point. It owns the canonical
//! [`AssetCache`](vitrine_data::AssetCache) and a coordinator that keeps at
//! most one decode in flight per asset key, throttled by a priority-aware
//! scheduler. Consumers only ever receive working copies; the canonical graphs
//! never leave the cache.

mod coordinator;
mod error;
mod events;
mod manager;
mod metrics;
mod pending;
mod scheduler;

pub use error::LoadError;
pub use events::AssetEvent;
pub use manager::{AcquireOptions, AssetManager, AssetManagerStats};
pub use pending::{PendingAsset, ProgressSubscription};
