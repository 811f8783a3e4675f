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


use super::error::LoadError;
use vitrine_core::asset::AssetKey;
use vitrine_data::WorkingCopyId;

/// Lifecycle notifications published by the [`AssetManager`](super::AssetManager).
#[derive(Debug, Clone, PartialEq)]
pub enum AssetEvent {
    /// A decode reported progress.
    Progress {
        /// The asset being decoded.
        key: AssetKey,
        /// Fraction in `[0.0, 1.0]`. Informational only.
        fraction: f32,
    },
    /// A working copy was handed to a requester.
    Ready {
        /// The asset.
        key: AssetKey,
        /// The copy handed out.
        copy: WorkingCopyId,
    },
    /// A requester received an error.
    Failed {
        /// The asset.
        key: AssetKey,
        /// What went wrong.
        error: LoadError,
    },
    /// A canonical entry left the cache.
    Evicted {
        /// The asset.
        key: AssetKey,
    },
}

impl AssetEvent {
    /// The asset the event is about.
    pub fn key(&self) -> &AssetKey {
        match self {
            AssetEvent::Progress { key, .. }
            | AssetEvent::Ready { key, .. }
            | AssetEvent::Failed { key, .. }
            | AssetEvent::Evicted { key } => key,
        }
    }
}
