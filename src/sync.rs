//! Sync relay: tells connected clients that something changed.
//!
//! Every mutation is appended to a bounded in-memory log with a monotonic
//! sequence number. Polling clients resume with `since=<last seq>`; live
//! clients subscribe to a broadcast channel (served as SSE). When NATS is
//! configured the event is also published there. Delivery is best effort:
//! the log forgets old events, slow subscribers lag, and publish failures
//! are only logged.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::domain::events::{Action, DomainEvent, Topic};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    pub seq: u64,
    pub topic: Topic,
    pub action: Action,
    pub entity_id: String,
    pub at: DateTime<Utc>,
}

/// Answer to a resumable poll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<SyncEvent>,
    /// Highest sequence number issued so far (0 when nothing happened yet).
    pub latest: u64,
    /// Events after `since` were already evicted; the client should refetch everything.
    pub reset: bool,
}

struct Log {
    next_seq: u64,
    events: VecDeque<SyncEvent>,
    capacity: usize,
}

#[derive(Clone)]
pub struct NatsSink {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsSink {
    pub fn new(client: async_nats::Client, subject_prefix: impl Into<String>) -> Self {
        Self { client, subject_prefix: subject_prefix.into() }
    }

    fn subject(&self, event: &SyncEvent) -> String {
        format!("{}.{}.{}", self.subject_prefix, event.topic.as_str(), event.action.as_str())
    }
}

pub struct SyncRelay {
    log: Mutex<Log>,
    tx: broadcast::Sender<SyncEvent>,
    nats: Option<NatsSink>,
}

impl SyncRelay {
    pub fn new(capacity: usize, nats: Option<NatsSink>) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel(capacity.min(4096));
        Arc::new(Self {
            log: Mutex::new(Log { next_seq: 1, events: VecDeque::with_capacity(capacity), capacity }),
            tx,
            nats,
        })
    }

    /// Append an event and fan it out. Never fails.
    pub fn publish(&self, event: DomainEvent) -> SyncEvent {
        let record = {
            let mut log = self.log.lock();
            let record = SyncEvent {
                seq: log.next_seq,
                topic: event.topic,
                action: event.action,
                entity_id: event.entity_id,
                at: Utc::now(),
            };
            log.next_seq += 1;
            if log.events.len() == log.capacity {
                log.events.pop_front();
            }
            log.events.push_back(record.clone());
            record
        };

        // No subscribers is the common case; not an error.
        let _ = self.tx.send(record.clone());

        if let Some(nats) = &self.nats {
            self.forward_to_nats(nats.clone(), record.clone());
        }

        tracing::debug!(seq = record.seq, topic = record.topic.as_str(), action = record.action.as_str(), entity_id = %record.entity_id, "Sync event published");
        record
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    fn forward_to_nats(&self, nats: NatsSink, record: SyncEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(seq = record.seq, "No runtime available, skipping NATS publish");
            return;
        };
        handle.spawn(async move {
            let payload = match serde_json::to_vec(&record) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, seq = record.seq, "Failed to encode sync event");
                    return;
                }
            };
            if let Err(e) = nats.client.publish(nats.subject(&record), payload.into()).await {
                tracing::warn!(error = %e, seq = record.seq, "NATS publish failed");
            }
        });
    }

    /// Events with `seq > since`, oldest first.
    pub fn since(&self, since: u64) -> EventPage {
        let log = self.log.lock();
        let latest = log.next_seq - 1;
        let oldest_retained = log.events.front().map_or(log.next_seq, |e| e.seq);
        EventPage {
            events: log.events.iter().filter(|e| e.seq > since).cloned().collect(),
            latest,
            reset: since < latest && since + 1 < oldest_retained,
        }
    }

    pub fn latest(&self) -> u64 {
        self.log.lock().next_seq - 1
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Live SSE feed. Lagged receivers silently skip what they missed.
    pub fn sse(&self) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
        let stream = BroadcastStream::new(self.subscribe()).filter_map(|msg| match msg {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                Some(Ok(SseEvent::default()
                    .id(event.seq.to_string())
                    .event(format!("{}.{}", event.topic.as_str(), event.action.as_str()))
                    .data(data)))
            }
            Err(_) => None,
        });
        Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_updated(id: &str) -> DomainEvent {
        DomainEvent::new(Topic::Product, Action::Updated, id)
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let relay = SyncRelay::new(8, None);
        let a = relay.publish(product_updated("a"));
        let b = relay.publish(product_updated("b"));
        assert_eq!((a.seq, b.seq), (1, 2));
        assert_eq!(relay.latest(), 2);
    }

    #[test]
    fn test_resume_from_sequence() {
        let relay = SyncRelay::new(8, None);
        for id in ["a", "b", "c"] {
            relay.publish(product_updated(id));
        }
        let page = relay.since(1);
        assert_eq!(page.events.iter().map(|e| e.entity_id.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(page.latest, 3);
        assert!(!page.reset);
        assert!(relay.since(3).events.is_empty());
    }

    #[test]
    fn test_evicted_history_requests_reset() {
        let relay = SyncRelay::new(2, None);
        for id in ["a", "b", "c", "d"] {
            relay.publish(product_updated(id));
        }
        let page = relay.since(0);
        assert!(page.reset);
        assert_eq!(page.events.len(), 2);
        assert!(!relay.since(2).reset);
        assert!(!relay.since(4).reset);
    }

    #[test]
    fn test_empty_relay() {
        let relay = SyncRelay::new(4, None);
        let page = relay.since(0);
        assert_eq!(page, EventPage { events: vec![], latest: 0, reset: false });
    }

    #[tokio::test]
    async fn test_live_subscribers_receive_events() {
        let relay = SyncRelay::new(4, None);
        let mut rx = relay.subscribe();
        relay.publish(DomainEvent::new(Topic::Order, Action::Created, "ORD-1-00000000"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, Topic::Order);
        assert_eq!(event.seq, 1);
    }
}
