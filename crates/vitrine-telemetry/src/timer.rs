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

//! RAII timer that records a scope's duration into a histogram.

use crate::metrics::registry::HistogramHandle;
use std::time::Instant;

/// Times the scope it lives in and records the elapsed milliseconds into a
/// histogram when dropped, including on early return.
///
/// The timer owns a clone of the handle so it can be held across `.await`
/// points inside spawned tasks.
#[derive(Debug)]
pub struct ScopedMetricTimer {
    started: Instant,
    histogram: HistogramHandle,
}

impl ScopedMetricTimer {
    /// Starts a timer for `histogram`.
    pub fn new(histogram: &HistogramHandle) -> Self {
        Self {
            started: Instant::now(),
            histogram: histogram.clone(),
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for ScopedMetricTimer {
    fn drop(&mut self) {
        if let Err(e) = self.histogram.observe(self.elapsed_ms()) {
            log::warn!("[ScopedMetricTimer] Failed to record metric: {:?}", e);
        }
    }
}
