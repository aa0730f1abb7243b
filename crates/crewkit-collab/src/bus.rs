//! Event fan-out bus for real-time client updates.
//!
//! A topic-keyed broadcast layer: every successful mutating write
//! publishes one event, and every connected client subscribed to the
//! topic receives it without polling. Delivery is at-most-once and
//! best-effort with no backlog — a subscriber that connects after an
//! event was published never sees it. Events from a single publisher
//! preserve publish order; nothing is guaranteed across topics.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Topic carrying project creations; payload is the full project.
pub const TOPIC_PROJECTS: &str = "projects";
/// Topic carrying document uploads; payload is the full document.
/// Published by the upload path, listed here because it shares the bus.
pub const TOPIC_DOCUMENTS: &str = "documents";

/// Per-project task topic (`tasks/{project_id}`).
pub fn task_topic(project_id: Uuid) -> String {
    format!("tasks/{project_id}")
}

pub const PROJECT_CREATED: &str = "project-created";
pub const DOCUMENT_UPLOADED: &str = "document-uploaded";
pub const TASK_CREATED: &str = "task-created";
pub const TASK_UPDATED: &str = "task-updated";
pub const TASK_DELETED: &str = "task-deleted";

/// One event as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub topic: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

/// Topic-keyed publish/subscribe bus backed by broadcast channels.
///
/// Channels are created lazily on first subscription; publishing to a
/// topic nobody listens on is a no-op (there is no replay buffer to
/// fill).
pub struct EventBus {
    capacity: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<BusEvent>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a topic, creating its channel if needed. Only
    /// events published after this call are delivered.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusEvent> {
        let mut topics = self.topics.write().expect("bus lock poisoned");
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to every current subscriber of `topic`.
    ///
    /// Returns the number of receivers the event reached. Callers
    /// invoke this only after their store write has committed, and
    /// never treat the result as an acknowledgement.
    pub fn publish(&self, topic: &str, name: &str, payload: serde_json::Value) -> usize {
        let event = BusEvent {
            topic: topic.to_string(),
            name: name.to_string(),
            payload,
            emitted_at: Utc::now(),
        };

        let topics = self.topics.read().expect("bus lock poisoned");
        let delivered = match topics.get(topic) {
            // send only fails when there are no receivers left.
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        };

        debug!(topic, name, delivered, "published event");
        delivered
    }
}

impl Default for EventBus {
    fn default() -> Self {
        // Lagging receivers past this depth drop events rather than
        // stall publishers.
        Self::new(256)
    }
}
