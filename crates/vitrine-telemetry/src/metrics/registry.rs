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

//! Registry for managing metrics.

use super::{Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

type Storage = Arc<RwLock<BTreeMap<MetricId, Metric>>>;

/// Central, thread-safe registry of metrics.
///
/// Registration hands back a typed handle that updates the stored value
/// directly. Registering the same id twice with the same type returns a handle
/// to the existing metric, so several components may share one registry.
#[derive(Debug, Clone, Default)]
pub struct MetricsRegistry {
    storage: Storage,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or reuses) a counter.
    pub fn register_counter(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        let id = MetricId::new(namespace, name);
        self.register(&id, description.into(), "count".into(), MetricValue::Counter(0))?;
        Ok(CounterHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Registers (or reuses) a gauge.
    pub fn register_gauge(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(namespace, name);
        self.register(&id, description.into(), unit.into(), MetricValue::Gauge(0.0))?;
        Ok(GaugeHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Registers (or reuses) a histogram with strictly increasing bucket bounds.
    pub fn register_histogram(
        &self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        let id = MetricId::new(namespace, name);
        if bucket_bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MetricsError::InvalidBuckets(id));
        }
        let bucket_counts = vec![0; bucket_bounds.len()];
        let value = MetricValue::Histogram {
            bucket_bounds,
            bucket_counts,
            count: 0,
            sum: 0.0,
        };
        self.register(&id, description.into(), unit.into(), value)?;
        Ok(HistogramHandle {
            id,
            storage: self.storage.clone(),
        })
    }

    /// Returns a snapshot of one metric.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.storage
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    /// Returns snapshots of every metric in `namespace`, sorted by name.
    pub fn get_namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        self.storage
            .read()
            .values()
            .filter(|metric| metric.id.namespace == namespace)
            .cloned()
            .collect()
    }

    /// Number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.storage.read().len()
    }

    fn register(
        &self,
        id: &MetricId,
        description: String,
        unit: String,
        value: MetricValue,
    ) -> MetricsResult<()> {
        let mut storage = self.storage.write();
        if let Some(existing) = storage.get(id) {
            let found = existing.value.metric_type();
            let expected = value.metric_type();
            if found != expected {
                return Err(MetricsError::TypeMismatch {
                    id: id.clone(),
                    expected,
                    found,
                });
            }
            return Ok(());
        }
        storage.insert(
            id.clone(),
            Metric {
                id: id.clone(),
                description,
                unit,
                value,
            },
        );
        Ok(())
    }
}

fn update<R>(
    storage: &Storage,
    id: &MetricId,
    expected: MetricType,
    apply: impl FnOnce(&mut MetricValue) -> Option<R>,
) -> MetricsResult<R> {
    let mut storage = storage.write();
    let metric = storage
        .get_mut(id)
        .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
    let found = metric.value.metric_type();
    apply(&mut metric.value).ok_or_else(|| MetricsError::TypeMismatch {
        id: id.clone(),
        expected,
        found,
    })
}

/// Handle for counter operations.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    storage: Storage,
}

impl CounterHandle {
    /// Increments the counter by 1 and returns the new value.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.increment_by(1)
    }

    /// Increments the counter by `amount` and returns the new value.
    pub fn increment_by(&self, amount: u64) -> MetricsResult<u64> {
        update(&self.storage, &self.id, MetricType::Counter, |value| match value {
            MetricValue::Counter(v) => {
                *v = v.saturating_add(amount);
                Some(*v)
            }
            _ => None,
        })
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<u64> {
        update(&self.storage, &self.id, MetricType::Counter, |value| value.as_counter())
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for gauge operations.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    storage: Storage,
}

impl GaugeHandle {
    /// Sets the gauge.
    pub fn set(&self, new_value: f64) -> MetricsResult<()> {
        update(&self.storage, &self.id, MetricType::Gauge, |value| match value {
            MetricValue::Gauge(v) => {
                *v = new_value;
                Some(())
            }
            _ => None,
        })
    }

    /// Adds `delta` (may be negative) and returns the new value.
    pub fn add(&self, delta: f64) -> MetricsResult<f64> {
        update(&self.storage, &self.id, MetricType::Gauge, |value| match value {
            MetricValue::Gauge(v) => {
                *v += delta;
                Some(*v)
            }
            _ => None,
        })
    }

    /// Current value.
    pub fn get(&self) -> MetricsResult<f64> {
        update(&self.storage, &self.id, MetricType::Gauge, |value| value.as_gauge())
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for histogram operations.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    storage: Storage,
}

impl HistogramHandle {
    /// Records one observation.
    pub fn observe(&self, sample: f64) -> MetricsResult<()> {
        update(&self.storage, &self.id, MetricType::Histogram, |value| match value {
            MetricValue::Histogram {
                bucket_bounds,
                bucket_counts,
                count,
                sum,
            } => {
                for (bound, bucket) in bucket_bounds.iter().zip(bucket_counts.iter_mut()) {
                    if sample <= *bound {
                        *bucket += 1;
                    }
                }
                *count += 1;
                *sum += sample;
                Some(())
            }
            _ => None,
        })
    }

    /// Snapshot of the histogram.
    pub fn get_metric(&self) -> MetricsResult<Metric> {
        self.storage
            .read()
            .get(&self.id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(self.id.clone()))
    }

    /// The metric id.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}
