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


//! The asset manager façade.

use super::coordinator::LoadCoordinator;
use super::error::LoadError;
use super::events::AssetEvent;
use super::metrics::AssetMetrics;
use super::pending::PendingAsset;
use super::scheduler::DecodeScheduler;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use vitrine_core::asset::AssetKey;
use vitrine_core::config::AssetManagerSettings;
use vitrine_core::decoder::SceneDecoder;
use vitrine_core::event::EventBus;
use vitrine_core::gpu::GpuAllocator;
use vitrine_data::{AssetCache, CacheStats, WorkingCopy};
use vitrine_telemetry::MetricsRegistry;

/// Per-call knobs for [`AssetManager::acquire`] and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Decodes queued behind the concurrency limit start highest priority
    /// first. Only the requester that starts a decode sets its priority.
    pub priority: i32,
    /// How long `acquire` waits before giving up. Falls back to the manager's
    /// default timeout; `None` in both places waits forever.
    pub timeout: Option<Duration>,
}

impl AcquireOptions {
    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A snapshot of the manager's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetManagerStats {
    /// Cache occupancy and counters.
    pub cache: CacheStats,
    /// Keys with a decode in flight.
    pub in_flight: usize,
    /// Decodes currently running.
    pub decoding: usize,
    /// Decodes waiting for a slot.
    pub queued: usize,
}

/// Hands out independent working copies of 3D assets.
///
/// Each asset is decoded at most once at a time no matter how many callers ask
/// for it; the decoded graph is kept as the canonical copy in a bounded cache
/// and every caller receives a deep clone it may freely mutate. Copies are
/// given back with [`AssetManager::release`].
pub struct AssetManager {
    settings: AssetManagerSettings,
    coordinator: Arc<LoadCoordinator>,
}

impl AssetManager {
    /// Creates a manager. Must be called from within a tokio runtime; decodes
    /// are spawned onto it.
    pub fn new(
        settings: AssetManagerSettings,
        decoder: Arc<dyn SceneDecoder>,
        allocator: Arc<dyn GpuAllocator>,
        metrics_registry: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        settings
            .validate()
            .context("Invalid asset manager settings")?;
        let runtime =
            Handle::try_current().context("AssetManager must be created inside a tokio runtime")?;
        let metrics =
            AssetMetrics::new(&metrics_registry).context("Failed to register asset metrics")?;

        let cache = AssetCache::new(settings.cache.clone(), allocator);
        let scheduler = DecodeScheduler::new(settings.max_concurrent_decodes);
        log::info!(
            "AssetManager ready: decoder={}, capacity={}, max_concurrent_decodes={}",
            decoder.name(),
            settings.cache.max_entries,
            settings.max_concurrent_decodes
        );

        let coordinator = LoadCoordinator::new(
            cache,
            decoder,
            scheduler,
            Arc::new(EventBus::new()),
            metrics,
            runtime,
        );
        Ok(Self {
            settings,
            coordinator: Arc::new(coordinator),
        })
    }

    /// The settings the manager was built with.
    pub fn settings(&self) -> &AssetManagerSettings {
        &self.settings
    }

    /// Requests a working copy without waiting for it.
    ///
    /// Use this to follow progress; otherwise prefer [`AssetManager::acquire`].
    pub fn request(&self, key: impl Into<AssetKey>, options: AcquireOptions) -> PendingAsset {
        self.coordinator.request(key.into(), options.priority)
    }

    /// Returns a new working copy of `key`, decoding it first if needed.
    ///
    /// On timeout only this caller gives up; the decode carries on and its
    /// result is cached.
    pub async fn acquire(
        &self,
        key: impl Into<AssetKey>,
        options: AcquireOptions,
    ) -> Result<WorkingCopy, LoadError> {
        let key = key.into();
        let pending = self.coordinator.request(key.clone(), options.priority);

        let Some(timeout) = options.timeout.or_else(|| self.settings.default_timeout()) else {
            return pending.wait().await;
        };
        match tokio::time::timeout(timeout, pending.wait()).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Gave up waiting for '{}' after {:?}", key, timeout);
                let error = LoadError::TimedOut(key.clone());
                self.coordinator.events().publish(AssetEvent::Failed {
                    key,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Gives a working copy back, disposing its resources.
    ///
    /// The canonical asset and other copies are unaffected.
    pub fn release(&self, copy: WorkingCopy) -> Result<(), LoadError> {
        let result = self.coordinator.cache().release(copy);
        self.coordinator.refresh_gauges();
        result.map_err(LoadError::from)
    }

    /// Starts loading `key` into the cache without taking a copy.
    ///
    /// Returns `true` if a decode is in flight for it afterwards, `false` if it
    /// was already cached.
    pub fn prefetch(&self, key: impl Into<AssetKey>, options: AcquireOptions) -> bool {
        self.coordinator.prefetch(key.into(), options.priority)
    }

    /// Removes an unreferenced asset from the cache.
    ///
    /// Returns `Ok(false)` if working copies of it are still out.
    pub fn evict(&self, key: &AssetKey) -> Result<bool, LoadError> {
        let evicted = self.coordinator.cache().evict(key)?;
        if evicted {
            self.coordinator.report_evictions(std::slice::from_ref(key));
            self.coordinator.refresh_gauges();
        }
        Ok(evicted)
    }

    /// Evicts every unreferenced asset. Returns the evicted keys.
    ///
    /// Decodes still in flight complete and are cached normally.
    pub fn shutdown(&self) -> Vec<AssetKey> {
        let evicted = self.coordinator.cache().clear();
        self.coordinator.report_evictions(&evicted);
        self.coordinator.refresh_gauges();

        let stats = self.stats();
        log::info!(
            "AssetManager shut down: {} evicted, {} still referenced, {} in flight",
            evicted.len(),
            stats.cache.entries,
            stats.in_flight
        );
        evicted
    }

    /// Subscribes to lifecycle events. Only later events are delivered.
    pub fn subscribe(&self) -> flume::Receiver<AssetEvent> {
        self.coordinator.events().subscribe()
    }

    /// A snapshot of the manager's state.
    pub fn stats(&self) -> AssetManagerStats {
        let scheduler = self.coordinator.scheduler();
        AssetManagerStats {
            cache: self.coordinator.cache().stats(),
            in_flight: self.coordinator.in_flight(),
            decoding: scheduler.running(),
            queued: scheduler.queued(),
        }
    }

    /// Working copies of `key` currently out, `None` if it is not cached.
    pub fn ref_count(&self, key: &AssetKey) -> Option<usize> {
        self.coordinator.cache().ref_count(key)
    }

    /// Whether `key` has a canonical entry.
    pub fn is_cached(&self, key: &AssetKey) -> bool {
        self.coordinator.cache().contains(key)
    }

    /// Whether a decode of `key` is in flight.
    pub fn is_loading(&self, key: &AssetKey) -> bool {
        self.coordinator.is_loading(key)
    }

    /// Cached keys, least recently used first.
    pub fn cached_keys(&self) -> Vec<AssetKey> {
        self.coordinator.cache().keys_by_recency()
    }
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests;
