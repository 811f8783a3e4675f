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


//! Priority-aware throttling of concurrent decodes.

use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Limits how many decodes run at once.
///
/// When every slot is taken, callers queue up and are granted a slot in
/// descending priority order, first come first served among equal priorities.
#[derive(Debug, Clone)]
pub(crate) struct DecodeScheduler {
    inner: Arc<SchedulerInner>,
}

#[derive(Debug)]
struct SchedulerInner {
    max_running: usize,
    state: Mutex<SchedulerState>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: usize,
    queue: BinaryHeap<QueuedDecode>,
    next_seq: u64,
}

#[derive(Debug)]
struct QueuedDecode {
    priority: i32,
    seq: u64,
    grant: oneshot::Sender<DecodePermit>,
}

impl PartialEq for QueuedDecode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedDecode {}

impl PartialOrd for QueuedDecode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedDecode {
    // Max-heap: higher priority first, then the older request.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl DecodeScheduler {
    pub(crate) fn new(max_running: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                max_running: max_running.max(1),
                state: Mutex::new(SchedulerState::default()),
            }),
        }
    }

    /// Waits for a free slot. The slot is held until the permit is dropped.
    pub(crate) async fn acquire(&self, priority: i32) -> DecodePermit {
        loop {
            let receiver = {
                let mut state = self.inner.state.lock();
                if state.running < self.inner.max_running {
                    state.running += 1;
                    return DecodePermit::new(self.inner.clone());
                }
                let (grant, receiver) = oneshot::channel();
                let seq = state.next_seq;
                state.next_seq += 1;
                state.queue.push(QueuedDecode {
                    priority,
                    seq,
                    grant,
                });
                log::debug!(
                    "Decode queued at priority {} ({} waiting)",
                    priority,
                    state.queue.len()
                );
                receiver
            };

            match receiver.await {
                Ok(permit) => return permit,
                Err(_) => log::warn!("Decode slot grant was lost, queueing again"),
            }
        }
    }

    /// Decodes currently holding a slot.
    pub(crate) fn running(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Decodes waiting for a slot.
    pub(crate) fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }
}

impl SchedulerInner {
    /// Hands a freed slot to the best queued decode, or returns it to the pool.
    fn release_slot(self: &Arc<Self>) {
        loop {
            let next = {
                let mut state = self.state.lock();
                match state.queue.pop() {
                    Some(next) => next,
                    None => {
                        state.running = state.running.saturating_sub(1);
                        return;
                    }
                }
            };

            // The slot moves to `next` without going through `running`.
            match next.grant.send(DecodePermit::new(self.clone())) {
                Ok(()) => return,
                Err(mut orphan) => {
                    // The queued decode was dropped while waiting.
                    orphan.armed = false;
                }
            }
        }
    }
}

/// A held decode slot.
#[derive(Debug)]
pub(crate) struct DecodePermit {
    scheduler: Arc<SchedulerInner>,
    armed: bool,
}

impl DecodePermit {
    fn new(scheduler: Arc<SchedulerInner>) -> Self {
        Self {
            scheduler,
            armed: true,
        }
    }
}

impl Drop for DecodePermit {
    fn drop(&mut self) {
        if self.armed {
            self.scheduler.release_slot();
        }
    }
}
