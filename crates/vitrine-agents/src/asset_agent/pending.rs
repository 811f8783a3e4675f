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


//! Handles given to requesters while their asset is on its way.

use super::coordinator::{LoadCoordinator, Outcome};
use super::error::LoadError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use vitrine_core::asset::AssetKey;
use vitrine_data::{Reservation, WorkingCopy};

enum PendingState {
    Ready(Reservation),
    Loading(oneshot::Receiver<Outcome>),
}

/// A requested asset that may still be decoding.
///
/// [`PendingAsset::wait`] resolves to the requester's own working copy.
/// Dropping the handle withdraws the request: the decode keeps running and
/// still populates the cache, and any copy reserved for this requester is given
/// back.
pub struct PendingAsset {
    key: AssetKey,
    state: PendingState,
    progress: watch::Receiver<f32>,
    coordinator: Arc<LoadCoordinator>,
}

impl PendingAsset {
    pub(crate) fn ready(
        key: AssetKey,
        reservation: Reservation,
        coordinator: Arc<LoadCoordinator>,
    ) -> Self {
        let (_, progress) = watch::channel(1.0);
        Self {
            key,
            state: PendingState::Ready(reservation),
            progress,
            coordinator,
        }
    }

    pub(crate) fn loading(
        key: AssetKey,
        outcome: oneshot::Receiver<Outcome>,
        progress: watch::Receiver<f32>,
        coordinator: Arc<LoadCoordinator>,
    ) -> Self {
        Self {
            key,
            state: PendingState::Loading(outcome),
            progress,
            coordinator,
        }
    }

    /// The requested asset.
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    /// `true` if the asset was served from the cache without decoding.
    pub fn is_cached(&self) -> bool {
        matches!(self.state, PendingState::Ready(_))
    }

    /// Subscribes to the decode's progress.
    pub fn progress(&self) -> ProgressSubscription {
        ProgressSubscription {
            receiver: self.progress.clone(),
        }
    }

    /// Waits for the outcome and takes this requester's working copy.
    pub async fn wait(self) -> Result<WorkingCopy, LoadError> {
        let PendingAsset {
            key,
            state,
            coordinator,
            ..
        } = self;

        let outcome = match state {
            PendingState::Ready(reservation) => Ok(reservation),
            PendingState::Loading(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(LoadError::Abandoned(key.clone()))),
        };
        let result = outcome.map(Reservation::into_working_copy);
        coordinator.settle(&key, &result);
        result
    }
}

impl fmt::Debug for PendingAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAsset")
            .field("key", &self.key)
            .field("cached", &self.is_cached())
            .field("progress", &*self.progress.borrow())
            .finish()
    }
}

/// A live view of a decode's progress, in `[0.0, 1.0]`.
///
/// Values are informational: they may repeat or go backwards. Dropping the
/// subscription cancels it.
#[derive(Debug, Clone)]
pub struct ProgressSubscription {
    receiver: watch::Receiver<f32>,
}

impl ProgressSubscription {
    /// The last reported fraction.
    pub fn fraction(&self) -> f32 {
        *self.receiver.borrow()
    }

    /// Waits for the next report. Returns `None` once the load has resolved
    /// and every report has been seen.
    pub async fn changed(&mut self) -> Option<f32> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }
}
