use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::state::session::Session;

/// Notifications about application state, fanned out to every view that subscribes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    SessionChanged { session: Session },
    UsersChanged { user_ids: Vec<String> },
    MoodComposer { open: bool },
}

pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Delivery is best effort: with no subscribers the event is dropped.
    pub fn publish(&self, event: StoreEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("store event dropped; no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
