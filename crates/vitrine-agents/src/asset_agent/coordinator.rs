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


//! One decode per asset key, shared by every concurrent requester.

use super::error::LoadError;
use super::events::AssetEvent;
use super::metrics::AssetMetrics;
use super::pending::PendingAsset;
use super::scheduler::DecodeScheduler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use vitrine_core::asset::AssetKey;
use vitrine_core::decoder::{DecodeError, ProgressSink, SceneDecoder};
use vitrine_core::event::EventBus;
use vitrine_data::{AssetCache, Insertion, PreparedGraph, Reservation, WorkingCopy};
use vitrine_telemetry::ScopedMetricTimer;

/// What a waiter receives when its load resolves.
pub(crate) type Outcome = Result<Reservation, LoadError>;

/// An in-flight load. Exists from the first miss until the decode resolves.
struct LoadRequest {
    waiters: Vec<oneshot::Sender<Outcome>>,
    progress: Arc<watch::Sender<f32>>,
}

/// Deduplicates loads and drives decodes into the cache.
///
/// Lock order is `requests` then the cache's own lock. Neither is ever held
/// across an `.await`.
pub(crate) struct LoadCoordinator {
    cache: AssetCache,
    decoder: Arc<dyn SceneDecoder>,
    scheduler: DecodeScheduler,
    requests: Mutex<HashMap<AssetKey, LoadRequest>>,
    events: Arc<EventBus<AssetEvent>>,
    metrics: AssetMetrics,
    runtime: Handle,
}

impl LoadCoordinator {
    pub(crate) fn new(
        cache: AssetCache,
        decoder: Arc<dyn SceneDecoder>,
        scheduler: DecodeScheduler,
        events: Arc<EventBus<AssetEvent>>,
        metrics: AssetMetrics,
        runtime: Handle,
    ) -> Self {
        Self {
            cache,
            decoder,
            scheduler,
            requests: Mutex::new(HashMap::new()),
            events,
            metrics,
            runtime,
        }
    }

    pub(crate) fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub(crate) fn events(&self) -> &EventBus<AssetEvent> {
        &self.events
    }

    pub(crate) fn scheduler(&self) -> &DecodeScheduler {
        &self.scheduler
    }

    /// Requests one working copy of `key`.
    ///
    /// Joins the in-flight load if there is one, resolves from the cache if
    /// the key is cached, and otherwise starts a decode.
    pub(crate) fn request(self: &Arc<Self>, key: AssetKey, priority: i32) -> PendingAsset {
        let mut requests = self.requests.lock();

        if let Some(request) = requests.get_mut(&key) {
            let (waiter, outcome) = oneshot::channel();
            request.waiters.push(waiter);
            let progress = request.progress.subscribe();
            let waiting = request.waiters.len();
            drop(requests);

            self.metrics.miss();
            log::debug!("Joined in-flight load of '{}' ({} waiting)", key, waiting);
            return PendingAsset::loading(key, outcome, progress, self.clone());
        }

        if let Ok(reservation) = self.cache.reserve(&key) {
            drop(requests);
            self.metrics.hit();
            return PendingAsset::ready(key, reservation, self.clone());
        }

        let (waiter, outcome) = oneshot::channel();
        let progress = self.start_load(&mut requests, key.clone(), priority, vec![waiter]);
        drop(requests);

        self.metrics.miss();
        PendingAsset::loading(key, outcome, progress, self.clone())
    }

    /// Makes sure `key` is cached or being loaded, without taking a copy.
    ///
    /// Returns `true` if a load is in flight after the call.
    pub(crate) fn prefetch(self: &Arc<Self>, key: AssetKey, priority: i32) -> bool {
        let mut requests = self.requests.lock();
        if requests.contains_key(&key) {
            return true;
        }
        if self.cache.lookup(&key).is_some() {
            return false;
        }
        self.start_load(&mut requests, key, priority, Vec::new());
        true
    }

    /// Whether a decode for `key` is in flight.
    pub(crate) fn is_loading(&self, key: &AssetKey) -> bool {
        self.requests.lock().contains_key(key)
    }

    /// Number of keys with a decode in flight.
    pub(crate) fn in_flight(&self) -> usize {
        self.requests.lock().len()
    }

    /// Publishes the outcome a requester observed and refreshes the gauges.
    pub(crate) fn settle(&self, key: &AssetKey, result: &Result<WorkingCopy, LoadError>) {
        let event = match result {
            Ok(copy) => AssetEvent::Ready {
                key: key.clone(),
                copy: copy.id(),
            },
            Err(error) => AssetEvent::Failed {
                key: key.clone(),
                error: error.clone(),
            },
        };
        self.events.publish(event);
        self.refresh_gauges();
    }

    /// Publishes eviction events and counts them.
    pub(crate) fn report_evictions(&self, evicted: &[AssetKey]) {
        self.metrics.evicted(evicted.len());
        for key in evicted {
            self.events.publish(AssetEvent::Evicted { key: key.clone() });
        }
    }

    pub(crate) fn refresh_gauges(&self) {
        self.metrics.refresh(&self.cache.stats());
    }

    fn start_load(
        self: &Arc<Self>,
        requests: &mut HashMap<AssetKey, LoadRequest>,
        key: AssetKey,
        priority: i32,
        waiters: Vec<oneshot::Sender<Outcome>>,
    ) -> watch::Receiver<f32> {
        let (progress, receiver) = watch::channel(0.0);
        let progress = Arc::new(progress);
        requests.insert(
            key.clone(),
            LoadRequest {
                waiters,
                progress: progress.clone(),
            },
        );
        log::debug!(
            "Scheduling decode of '{}' with {} at priority {}",
            key,
            self.decoder.name(),
            priority
        );

        let coordinator = self.clone();
        self.runtime.spawn(async move {
            coordinator.run_decode(key, priority, progress).await;
        });
        receiver
    }

    async fn run_decode(
        self: Arc<Self>,
        key: AssetKey,
        priority: i32,
        progress: Arc<watch::Sender<f32>>,
    ) {
        let mut guard = ResolveGuard {
            coordinator: self.clone(),
            key: key.clone(),
            armed: true,
        };

        let _permit = self.scheduler.acquire(priority).await;
        self.metrics.decode_started();
        log::debug!("Decoding '{}'", key);

        let result = {
            let _timer = ScopedMetricTimer::new(&self.metrics.decode_time_ms);
            let sink = self.progress_sink(&key, progress);
            self.decoder
                .decode(&key, &**self.cache.allocator(), &sink)
                .await
        };

        match result {
            Ok(graph) => {
                let prepared = self.cache.prepare(key.clone(), graph);
                guard.armed = false;
                self.complete(&key, prepared);
            }
            Err(error) => {
                guard.armed = false;
                self.fail(&key, error);
            }
        }
    }

    fn progress_sink(&self, key: &AssetKey, progress: Arc<watch::Sender<f32>>) -> ProgressSink {
        let key = key.clone();
        let events = self.events.clone();
        ProgressSink::new(move |fraction| {
            log::debug!("'{}' at {:.0}%", key, fraction * 100.0);
            progress.send_replace(fraction);
            events.publish(AssetEvent::Progress {
                key: key.clone(),
                fraction,
            });
        })
    }

    fn complete(&self, key: &AssetKey, prepared: PreparedGraph) {
        let (request, Insertion { result, disposal }) = {
            let mut requests = self.requests.lock();
            let request = requests.remove(key);
            let copies = request.as_ref().map_or(0, |request| request.waiters.len());
            // Inserted and reserved before the request disappears, so a new
            // requester either joins this load or hits the cache.
            let insertion = self.cache.insert_prepared(prepared, copies);
            (request, insertion)
        };

        match (request, result) {
            (None, _) => {
                log::error!("Decode of '{}' finished without a pending request", key);
            }
            (Some(request), Ok(reservations)) => {
                request.progress.send_replace(1.0);
                let mut withdrawn = 0;
                for (waiter, reservation) in request.waiters.into_iter().zip(reservations) {
                    // A refused reservation is dropped here, which unpins it.
                    if waiter.send(Ok(reservation)).is_err() {
                        withdrawn += 1;
                    }
                }
                if withdrawn > 0 {
                    log::warn!(
                        "{} requester(s) of '{}' withdrew before the copy was ready",
                        withdrawn,
                        key
                    );
                }
            }
            (Some(request), Err(error)) => {
                request.progress.send_replace(1.0);
                let error = LoadError::from(error);
                log::error!("Could not cache decoded '{}': {}", key, error);
                for waiter in request.waiters {
                    let _ = waiter.send(Err(error.clone()));
                }
            }
        }

        // Evicted graphs are disposed once no coordinator lock is held.
        let evicted = disposal.dispose();
        self.report_evictions(&evicted);
        self.refresh_gauges();
    }

    fn fail(&self, key: &AssetKey, error: DecodeError) {
        let request = self.requests.lock().remove(key);
        self.metrics.decode_failed();
        log::error!("Failed to decode '{}': {}", key, error);

        let error = LoadError::Decode {
            key: key.clone(),
            source: error,
        };
        for waiter in request.into_iter().flat_map(|request| request.waiters) {
            let _ = waiter.send(Err(error.clone()));
        }
    }

    fn abandon(&self, key: &AssetKey) {
        if let Some(request) = self.requests.lock().remove(key) {
            log::error!(
                "Decode task for '{}' ended without an outcome; {} waiter(s) abandoned",
                key,
                request.waiters.len()
            );
        }
    }
}

/// Removes the request if the decode task is dropped before it resolves, so
/// that waiters observe [`LoadError::Abandoned`] instead of hanging.
struct ResolveGuard {
    coordinator: Arc<LoadCoordinator>,
    key: AssetKey,
    armed: bool,
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.abandon(&self.key);
        }
    }
}
