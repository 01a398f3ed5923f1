//! Channel provider interface
//!
//! The chat platform is an external capability: it creates, renames and
//! restricts channels, delivers messages and resolves roles. The lifecycle
//! only talks to it through [`ChannelProvider`].

mod memory;
mod message;

pub use memory::{MemoryChannel, MemoryProvider, ProviderCall, ProviderOp};
pub use message::{ButtonStyle, Component, MessageContent, SelectOption};

use crate::core::{CategoryId, ChannelId, GroupId, MessageId, RoleId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a channel provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("name already taken: {name}")]
    NameConflict { name: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("provider unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// A channel as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

impl ChannelRef {
    #[must_use]
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// `<#id>` mention
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

impl RoleRef {
    /// `<@&id>` mention
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewChannel,
    SendMessages,
    AttachFiles,
    EmbedLinks,
    ReadMessageHistory,
}

/// Who a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteTarget {
    /// The group's default role
    Everyone,
    User(UserId),
    Role(RoleId),
    /// The bot itself
    SystemActor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    pub allow: Vec<Permission>,
    pub deny: Vec<Permission>,
}

impl PermissionOverwrite {
    #[must_use]
    pub fn allow(target: OverwriteTarget, permissions: &[Permission]) -> Self {
        Self {
            target,
            allow: permissions.to_vec(),
            deny: Vec::new(),
        }
    }

    #[must_use]
    pub fn deny(target: OverwriteTarget, permissions: &[Permission]) -> Self {
        Self {
            target,
            allow: Vec::new(),
            deny: permissions.to_vec(),
        }
    }

    #[must_use]
    pub fn allows(&self, permission: Permission) -> bool {
        self.allow.contains(&permission)
    }

    #[must_use]
    pub fn denies(&self, permission: Permission) -> bool {
        self.deny.contains(&permission)
    }
}

/// Request to create a ticket channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub group: GroupId,
    pub parent: CategoryId,
    pub name: String,
    pub overwrites: Vec<PermissionOverwrite>,
    /// Audit log reason
    pub reason: String,
}

/// Capabilities the lifecycle needs from the chat platform
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    async fn provision_channel(&self, request: &ProvisionRequest) -> ProviderResult<ChannelRef>;

    /// Replace the permission overwrites of a channel
    async fn update_channel_visibility(
        &self,
        channel: ChannelId,
        overwrites: &[PermissionOverwrite],
    ) -> ProviderResult<()>;

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> ProviderResult<()>;

    async fn send_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> ProviderResult<MessageRef>;

    async fn update_message(
        &self,
        message: &MessageRef,
        content: &MessageContent,
    ) -> ProviderResult<()>;

    /// Resolve a role in the group; `None` when the group has no such role
    async fn lookup_role(&self, group: GroupId, role: RoleId) -> ProviderResult<Option<RoleRef>>;

    /// Find a visible channel by exact name
    async fn find_channel_by_name(
        &self,
        group: GroupId,
        name: &str,
    ) -> ProviderResult<Option<ChannelRef>>;
}
