//! Lifecycle notifications
//!
//! The lifecycle manager publishes a [`TicketEvent`] after every successful
//! operation. Subscribers (audit logging, the `serve` loop) receive them over
//! a broadcast channel; publishing with nobody listening is fine.

use crate::core::{ChannelId, RoleId, Status, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Event types published by the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TicketEvent {
    Created {
        channel_id: ChannelId,
        owner_id: UserId,
        at: DateTime<Utc>,
    },
    StatusChanged {
        channel_id: ChannelId,
        old_status: Status,
        new_status: Status,
        by: UserId,
        at: DateTime<Utc>,
    },
    Closed {
        channel_id: ChannelId,
        by: UserId,
        at: DateTime<Utc>,
    },
    AuthoritySummoned {
        channel_id: ChannelId,
        role: RoleId,
        by: UserId,
        at: DateTime<Utc>,
    },
}

impl TicketEvent {
    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        match self {
            Self::Created { channel_id, .. }
            | Self::StatusChanged { channel_id, .. }
            | Self::Closed { channel_id, .. }
            | Self::AuthoritySummoned { channel_id, .. } => *channel_id,
        }
    }
}

/// Broadcast bus for ticket events
pub struct EventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per slow receiver
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to current subscribers
    pub fn publish(&self, event: TicketEvent) {
        tracing::debug!(channel = %event.channel_id(), ?event, "Publishing ticket event");
        // No subscriber is not an error
        let _ = self.sender.send(event);
    }
}
