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

use std::fmt;
use std::sync::Arc;

/// Where a decoder reports how far along it is.
///
/// Fractions are clamped to `[0.0, 1.0]` and non-finite values are dropped.
/// Ordering is not enforced: a later, smaller value simply overwrites the
/// previous one downstream.
#[derive(Clone)]
pub struct ProgressSink {
    report: Arc<dyn Fn(f32) + Send + Sync>,
}

impl ProgressSink {
    /// Forwards every reported fraction to `report`.
    pub fn new(report: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    /// A sink that discards everything.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Reports a progress fraction.
    pub fn report(&self, fraction: f32) {
        if fraction.is_finite() {
            (self.report)(fraction.clamp(0.0, 1.0));
        }
    }

    /// Reports `done / total`, ignoring an empty total.
    pub fn report_ratio(&self, done: u64, total: u64) {
        if total > 0 {
            self.report(done as f32 / total as f32);
        }
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_fractions_are_clamped_and_filtered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ProgressSink::new(move |fraction| seen.lock().push(fraction))
        };

        sink.report(0.25);
        sink.report(1.5);
        sink.report(-2.0);
        sink.report(f32::NAN);
        sink.report_ratio(3, 4);
        sink.report_ratio(1, 0);

        assert_eq!(*seen.lock(), vec![0.25, 1.0, 0.0, 0.75]);
    }
}
