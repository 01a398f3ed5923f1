//! Channel naming convention and the one-open-ticket-per-owner guard

use super::bounded;
use crate::core::{Actor, GroupId, UserId};
use crate::error::{Result, TicketDeskError};
use crate::provider::ChannelProvider;
use crate::storage::TicketRepository;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lowercase, collapse everything outside `[a-z0-9]` into single dashes
#[must_use]
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    NON_SLUG
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Ticket channel naming convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    ticket_prefix: String,
    closed_prefix: String,
}

impl Naming {
    #[must_use]
    pub fn new(ticket_prefix: impl Into<String>, closed_prefix: impl Into<String>) -> Self {
        Self {
            ticket_prefix: ticket_prefix.into(),
            closed_prefix: closed_prefix.into(),
        }
    }

    /// Canonical channel name for a ticket opened by `actor`
    ///
    /// `{prefix}-{name}` with the discriminator appended when the platform
    /// still uses one (`"0"` means it does not).
    #[must_use]
    pub fn ticket_channel_name(&self, actor: &Actor) -> String {
        let mut name = slugify(&actor.name);
        if name.is_empty() {
            name = actor.id.to_string();
        }
        let mut channel = format!("{}-{name}", self.ticket_prefix);
        if let Some(discriminator) = actor.discriminator.as_deref().map(slugify) {
            if !discriminator.is_empty() && discriminator != "0" {
                channel.push('-');
                channel.push_str(&discriminator);
            }
        }
        channel
    }

    /// Whether the name already carries the closed prefix
    #[must_use]
    pub fn is_closed_name(&self, name: &str) -> bool {
        name.strip_prefix(self.closed_prefix.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// Name a channel gets when its ticket is closed; never double-prefixed
    #[must_use]
    pub fn closed_name(&self, current: &str) -> String {
        if self.is_closed_name(current) {
            current.to_string()
        } else {
            format!("{}-{current}", self.closed_prefix)
        }
    }
}

/// Enforces at most one open ticket per owner before a channel is created
pub struct DuplicateGuard {
    store: Arc<dyn TicketRepository>,
    provider: Arc<dyn ChannelProvider>,
    group: GroupId,
    timeout: Duration,
}

impl DuplicateGuard {
    pub fn new(
        store: Arc<dyn TicketRepository>,
        provider: Arc<dyn ChannelProvider>,
        group: GroupId,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            group,
            timeout,
        }
    }

    /// Fail with `AlreadyExists` when the owner has a live ticket
    ///
    /// The store's owner index answers first; a lookup by canonical name
    /// catches channels whose ticket row was never written.
    pub async fn check(&self, owner: UserId, canonical_name: &str) -> Result<()> {
        if let Some(channel) = self.store.active_for_owner(owner).await? {
            debug!(owner = %owner, channel = %channel, "Owner already has an active ticket");
            return Err(TicketDeskError::AlreadyExists { channel });
        }

        let existing = bounded(
            self.timeout,
            "look up existing ticket channel",
            self.provider.find_channel_by_name(self.group, canonical_name),
        )
        .await?;
        if let Some(channel) = existing {
            debug!(owner = %owner, channel = %channel.id, name = canonical_name, "Found ticket channel by name");
            return Err(TicketDeskError::AlreadyExists {
                channel: channel.id,
            });
        }
        Ok(())
    }
}
