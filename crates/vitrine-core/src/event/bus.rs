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

use parking_lot::Mutex;

/// A thread-safe, multi-subscriber event channel.
///
/// Each call to [`EventBus::subscribe`] opens an unbounded `flume` channel.
/// Publishing clones the event into every open channel; channels whose
/// receiver was dropped are pruned on the next publish. Unsubscribing is
/// therefore just dropping the receiver.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + 'static> {
    subscribers: Mutex<Vec<flume::Sender<T>>>,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Opens a new subscription. Only events published afterwards are seen.
    pub fn subscribe(&self) -> flume::Receiver<T> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Delivers `event` to every live subscriber.
    pub fn publish(&self, event: T) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        log::trace!("Publishing an event to {} subscriber(s).", subscribers.len());

        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Number of subscribers seen alive at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::{sync::Arc, thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Loaded { key: String },
        Failed,
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Failed);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_receives_every_event() {
        let bus = EventBus::<TestEvent>::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let event = TestEvent::Loaded {
            key: "a.glb".to_string(),
        };
        bus.publish(event.clone());
        bus.publish(TestEvent::Failed);

        for receiver in [&first, &second] {
            assert_eq!(receiver.try_recv(), Ok(event.clone()));
            assert_eq!(receiver.try_recv(), Ok(TestEvent::Failed));
            assert_eq!(receiver.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Failed);
        let late = bus.subscribe();
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::<TestEvent>::new();
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.publish(TestEvent::Failed);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(TestEvent::Failed));
    }

    #[test]
    fn publish_from_thread() {
        let bus = Arc::new(EventBus::<TestEvent>::new());
        let receiver = bus.subscribe();

        let publisher = {
            let bus = bus.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                bus.publish(TestEvent::Failed);
            })
        };

        match receiver.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => assert_eq!(event, TestEvent::Failed),
            Err(e) => panic!("Failed to receive event from thread: {e:?}"),
        }
        publisher.join().expect("Thread join failed");
    }
}
