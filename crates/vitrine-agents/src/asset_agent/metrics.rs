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


//! Metric handles owned by the asset manager.

use vitrine_data::CacheStats;
use vitrine_telemetry::metrics::registry::{CounterHandle, GaugeHandle, HistogramHandle};
use vitrine_telemetry::{MetricsRegistry, MetricsResult};

const NAMESPACE: &str = "assets";

/// Handles for every metric the manager reports, in the `assets` namespace.
#[derive(Debug, Clone)]
pub(crate) struct AssetMetrics {
    pub(crate) cache_hits: CounterHandle,
    pub(crate) cache_misses: CounterHandle,
    pub(crate) decodes_started: CounterHandle,
    pub(crate) decodes_failed: CounterHandle,
    pub(crate) evictions: CounterHandle,
    pub(crate) cached_entries: GaugeHandle,
    pub(crate) checked_out_copies: GaugeHandle,
    /// Decode durations in milliseconds.
    pub(crate) decode_time_ms: HistogramHandle,
}

impl AssetMetrics {
    pub(crate) fn new(registry: &MetricsRegistry) -> MetricsResult<Self> {
        Ok(Self {
            cache_hits: registry.register_counter(
                NAMESPACE,
                "cache_hits",
                "Requests served from a cached canonical asset",
            )?,
            cache_misses: registry.register_counter(
                NAMESPACE,
                "cache_misses",
                "Requests that had to wait for a decode",
            )?,
            decodes_started: registry.register_counter(
                NAMESPACE,
                "decodes_started",
                "Decoder invocations",
            )?,
            decodes_failed: registry.register_counter(
                NAMESPACE,
                "decodes_failed",
                "Decoder invocations that returned an error",
            )?,
            evictions: registry.register_counter(
                NAMESPACE,
                "evictions",
                "Canonical entries removed from the cache",
            )?,
            cached_entries: registry.register_gauge(
                NAMESPACE,
                "cached_entries",
                "Canonical entries currently cached",
                "entries",
            )?,
            checked_out_copies: registry.register_gauge(
                NAMESPACE,
                "checked_out_copies",
                "Working copies and reservations currently outstanding",
                "copies",
            )?,
            decode_time_ms: registry.register_histogram(
                NAMESPACE,
                "decode_time",
                "Asset decoding time",
                "ms",
                vec![1.0, 5.0, 16.0, 33.0, 100.0, 500.0, 2_000.0],
            )?,
        })
    }

    pub(crate) fn hit(&self) {
        report(self.cache_hits.increment());
    }

    pub(crate) fn miss(&self) {
        report(self.cache_misses.increment());
    }

    pub(crate) fn decode_started(&self) {
        report(self.decodes_started.increment());
    }

    pub(crate) fn decode_failed(&self) {
        report(self.decodes_failed.increment());
    }

    pub(crate) fn evicted(&self, count: usize) {
        if count > 0 {
            report(self.evictions.increment_by(count as u64));
        }
    }

    /// Mirrors the cache occupancy into the gauges.
    pub(crate) fn refresh(&self, stats: &CacheStats) {
        report(self.cached_entries.set(stats.entries as f64));
        report(self.checked_out_copies.set(stats.checked_out as f64));
    }
}

fn report<T>(result: MetricsResult<T>) {
    if let Err(e) = result {
        log::warn!("[AssetMetrics] Failed to record metric: {:?}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_in_assets_namespace() {
        let registry = MetricsRegistry::new();
        let _metrics = AssetMetrics::new(&registry).unwrap();

        let names: Vec<_> = registry
            .get_namespace_metrics("assets")
            .into_iter()
            .map(|metric| metric.id.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "cache_hits",
                "cache_misses",
                "cached_entries",
                "checked_out_copies",
                "decode_time",
                "decodes_failed",
                "decodes_started",
                "evictions",
            ]
        );
    }

    #[test]
    fn test_two_managers_share_one_registry() {
        let registry = MetricsRegistry::new();
        let first = AssetMetrics::new(&registry).unwrap();
        let second = AssetMetrics::new(&registry).unwrap();

        first.hit();
        second.hit();
        assert_eq!(first.cache_hits.get().unwrap(), 2);
    }

    #[test]
    fn test_refresh_mirrors_cache_stats() {
        let registry = MetricsRegistry::new();
        let metrics = AssetMetrics::new(&registry).unwrap();

        metrics.refresh(&CacheStats {
            entries: 3,
            checked_out: 5,
            ..CacheStats::default()
        });

        assert_eq!(metrics.cached_entries.get().unwrap(), 3.0);
        assert_eq!(metrics.checked_out_copies.get().unwrap(), 5.0);
    }
}
