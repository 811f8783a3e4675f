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

//! The contract a scene decoder must fulfil.
//!
//! The asset manager never parses bytes itself. It hands a source location to
//! a [`SceneDecoder`] and receives either a [`SceneGraph`] whose resources were
//! allocated through the supplied [`GpuAllocator`], or a [`DecodeError`].

mod progress;

pub use progress::*;

use crate::asset::AssetKey;
use crate::gpu::GpuAllocator;
use crate::scene::SceneGraph;
use async_trait::async_trait;

/// Why a source could not be turned into a scene graph.
///
/// The same error value is delivered to every waiter of a failed load, so it
/// is cheap to clone and carries rendered messages rather than sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The source could not be fetched.
    #[error("source '{location}' is unreachable: {reason}")]
    Unreachable {
        /// The location that was requested.
        location: String,
        /// Transport or filesystem failure.
        reason: String,
    },
    /// The bytes were fetched but are not a valid asset.
    #[error("source '{location}' is malformed: {reason}")]
    Malformed {
        /// The location that was requested.
        location: String,
        /// Parser failure.
        reason: String,
    },
    /// The asset uses a format or feature this decoder cannot handle.
    #[error("source '{location}' is unsupported: {reason}")]
    Unsupported {
        /// The location that was requested.
        location: String,
        /// What is missing.
        reason: String,
    },
}

impl DecodeError {
    /// Builds an [`DecodeError::Unreachable`] for `key`.
    pub fn unreachable(key: &AssetKey, reason: impl ToString) -> Self {
        Self::Unreachable {
            location: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`DecodeError::Malformed`] for `key`.
    pub fn malformed(key: &AssetKey, reason: impl ToString) -> Self {
        Self::Malformed {
            location: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`DecodeError::Unsupported`] for `key`.
    pub fn unsupported(key: &AssetKey, reason: impl ToString) -> Self {
        Self::Unsupported {
            location: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Turns a source location into a scene graph.
///
/// Decoding is the only operation of the asset pipeline that suspends. It runs
/// on a background task, so implementations must be `Send + Sync`.
#[async_trait]
pub trait SceneDecoder: Send + Sync {
    /// Decodes the asset at `source`.
    ///
    /// Every resource of the returned graph must be allocated from
    /// `allocator`. Progress may be reported through `progress` at any rate;
    /// the values are informational only.
    async fn decode(
        &self,
        source: &AssetKey,
        allocator: &dyn GpuAllocator,
        progress: &ProgressSink,
    ) -> Result<SceneGraph, DecodeError>;

    /// A short name used in logs.
    fn name(&self) -> &'static str {
        "SceneDecoder"
    }
}
