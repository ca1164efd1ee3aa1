//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Progress`] | One coverage update per scan iteration |
//! | [`Topic::Feedback`] | Indicator placement for newly scanned directions |
//! | [`Topic::Lifecycle`] | Started / complete / failed / cancelled |

use roomscan_types::{Event, ScanError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Scan coverage after every iteration.
    Progress,
    /// Short-lived visual feedback cues.
    Feedback,
    /// Session state transitions.
    Lifecycle,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    progress: broadcast::Sender<Event>,
    feedback: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (progress, _) = broadcast::channel(capacity);
        let (feedback, _) = broadcast::channel(capacity);
        let (lifecycle, _) = broadcast::channel(capacity);
        Self {
            progress,
            feedback,
            lifecycle,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`ScanError::Channel`] when nobody is subscribed to the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, ScanError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| ScanError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Progress => &self.progress,
            Topic::Feedback => &self.feedback,
            Topic::Lifecycle => &self.lifecycle,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting.
    ///
    /// Lag is logged and skipped; `None` means nothing is buffered (or the
    /// bus has shut down).
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }

    /// Drain every buffered event.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomscan_types::EventPayload;

    fn make_event(coverage: f32) -> Event {
        Event::new("roomscan-middleware::test", EventPayload::ScanProgress { coverage })
    }

    #[test]
    fn publish_no_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Progress, make_event(0.1));
        assert!(matches!(result, Err(ScanError::Channel(_))));
    }

    #[tokio::test]
    async fn topic_multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut subscriber1 = bus.subscribe_to(Topic::Progress);
        let mut subscriber2 = bus.subscribe_to(Topic::Progress);

        let event = make_event(0.25);
        assert_eq!(bus.publish_to(Topic::Progress, event.clone())?, 2);

        assert_eq!(subscriber1.recv().await?.id, event.id);
        assert_eq!(subscriber2.recv().await?.id, event.id);
        Ok(())
    }

    /// A subscriber on `Lifecycle` must not receive events published to
    /// `Progress` because they are routed through separate channels.
    #[tokio::test]
    async fn topic_subscriber_does_not_receive_other_topic_events() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut lifecycle = bus.subscribe_to(Topic::Lifecycle);
        let _progress = bus.subscribe_to(Topic::Progress);

        bus.publish_to(Topic::Progress, make_event(0.5))?;

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), lifecycle.recv()).await;
        assert!(result.is_err(), "Lifecycle subscriber must not receive a Progress event");
        assert_eq!(lifecycle.topic(), Topic::Lifecycle);
        Ok(())
    }

    #[test]
    fn try_recv_drains_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Progress);
        for c in [0.1, 0.2, 0.3] {
            bus.publish_to(Topic::Progress, make_event(c)).unwrap();
        }
        let coverages: Vec<f32> = rx
            .drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::ScanProgress { coverage } => Some(coverage),
                _ => None,
            })
            .collect();
        assert_eq!(coverages, vec![0.1, 0.2, 0.3]);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn try_recv_skips_lag() {
        let bus = EventBus::new(4);
        let mut rx = bus.subscribe_to(Topic::Feedback);
        for i in 0..10 {
            bus.publish_to(Topic::Feedback, make_event(i as f32)).unwrap();
        }
        // Only the newest `capacity` events survive.
        assert_eq!(rx.drain().len(), 4);
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(Topic::Lifecycle), 0);
        let rx = bus.subscribe_to(Topic::Lifecycle);
        assert_eq!(bus.subscriber_count(Topic::Lifecycle), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(Topic::Lifecycle), 0);
    }
}
