use super::{ChannelId, RoleId, Status, UserId};
use serde::{Deserialize, Serialize};

/// A tracked support request
///
/// Only identity, owner and status are persisted. Message content and
/// attachments live on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Dedicated channel of the ticket; primary key, never reused
    pub channel_id: ChannelId,

    /// User who opened the ticket
    pub owner_id: UserId,

    #[serde(default)]
    pub status: Status,

    /// Set once the close action has restricted and renamed the channel.
    /// An archived ticket no longer counts against its owner, whatever
    /// status is written to it afterwards.
    #[serde(default)]
    pub archived: bool,
}

impl Ticket {
    /// Create a freshly opened ticket
    #[must_use]
    pub fn new(channel_id: ChannelId, owner_id: UserId) -> Self {
        Self {
            channel_id,
            owner_id,
            status: Status::Open,
            archived: false,
        }
    }

    /// Whether the ticket is still active for its owner
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.archived && self.status.is_active()
    }
}

/// A user performing an action on a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,

    /// Display name used to derive the ticket channel name
    pub name: String,

    #[serde(default)]
    pub discriminator: Option<String>,

    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Actor {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            discriminator: None,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: RoleId) -> Self {
        self.roles.push(role);
        self
    }

    #[must_use]
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    /// `<@id>` mention
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}
