//! Ticket lifecycle
//!
//! [`LifecycleManager`] drives a ticket from creation to closure. It re-reads
//! the store before every decision, serializes work per channel (and per
//! owner while creating), and bounds every provider call with the configured
//! timeout.
//!
//! Side effects are ordered so that the store is written only after the
//! provider has done its part. A store write that fails after a channel was
//! provisioned is queued and retried by [`LifecycleManager::reconcile`].

mod guard;
mod locks;
mod overwrites;
pub mod render;

pub use guard::{DuplicateGuard, Naming, slugify};
pub use locks::KeyedLocks;

use crate::config::Config;
use crate::core::{Actor, CategoryId, ChannelId, GroupId, RoleId, Status, UserId};
use crate::error::{Result, TicketDeskError};
use crate::events::{EventBus, TicketEvent};
use crate::policy::{self, Action};
use crate::provider::{ChannelProvider, ChannelRef, MessageRef, ProviderResult, ProvisionRequest};
use crate::storage::TicketRepository;
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tenant layout the manager works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskSettings {
    pub group: GroupId,
    pub category: CategoryId,
    pub support_role: RoleId,
    pub authority_role: RoleId,
    pub ticket_prefix: String,
    pub closed_prefix: String,
    pub provider_timeout: Duration,
}

impl From<&Config> for DeskSettings {
    fn from(config: &Config) -> Self {
        Self {
            group: config.desk.group_id,
            category: config.desk.category_id,
            support_role: config.desk.support_role_id,
            authority_role: config.desk.authority_role_id,
            ticket_prefix: config.desk.ticket_prefix.clone(),
            closed_prefix: config.desk.closed_prefix.clone(),
            provider_timeout: config.provider.timeout(),
        }
    }
}

/// Await a provider call for at most `timeout`
///
/// Provider errors are mapped onto the crate taxonomy; an elapsed timeout
/// becomes `ProviderUnavailable`.
pub(crate) async fn bounded<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(operation, error = %e, "Channel provider call failed");
            Err(TicketDeskError::from_provider(e, operation))
        },
        Err(_) => {
            warn!(operation, ?timeout, "Channel provider call timed out");
            Err(TicketDeskError::ProviderUnavailable {
                operation: operation.to_string(),
            })
        },
    }
}

/// Result of a successful ticket creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTicket {
    pub channel: ChannelRef,
    /// The ticket card carrying the controls
    pub card: MessageRef,
    /// False when the ticket row is waiting for reconciliation
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub channel_id: ChannelId,
    pub old: Status,
    pub new: Status,
    /// False when the channel has no ticket row
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseOutcome {
    Closed { renamed_to: String },
    /// The channel was already restricted and renamed
    AlreadyClosed,
}

/// A ticket row that could not be written after its channel was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingWrite {
    pub channel_id: ChannelId,
    pub owner_id: UserId,
    pub attempts: u32,
}

/// Orchestrates ticket operations against the store and the provider
pub struct LifecycleManager {
    store: Arc<dyn TicketRepository>,
    provider: Arc<dyn ChannelProvider>,
    settings: DeskSettings,
    naming: Naming,
    guard: DuplicateGuard,
    events: Arc<EventBus>,
    channel_locks: KeyedLocks<ChannelId>,
    owner_locks: KeyedLocks<UserId>,
    pending: Mutex<Vec<PendingWrite>>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn TicketRepository>,
        provider: Arc<dyn ChannelProvider>,
        settings: DeskSettings,
    ) -> Self {
        Self::with_events(store, provider, settings, Arc::new(EventBus::default()))
    }

    pub fn with_events(
        store: Arc<dyn TicketRepository>,
        provider: Arc<dyn ChannelProvider>,
        settings: DeskSettings,
        events: Arc<EventBus>,
    ) -> Self {
        let naming = Naming::new(
            settings.ticket_prefix.clone(),
            settings.closed_prefix.clone(),
        );
        let guard = DuplicateGuard::new(
            store.clone(),
            provider.clone(),
            settings.group,
            settings.provider_timeout,
        );
        Self {
            store,
            provider,
            settings,
            naming,
            guard,
            events,
            channel_locks: KeyedLocks::new(),
            owner_locks: KeyedLocks::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &DeskSettings {
        &self.settings
    }

    #[must_use]
    pub const fn naming(&self) -> &Naming {
        &self.naming
    }

    #[must_use]
    pub const fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TicketRepository> {
        &self.store
    }

    async fn call<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        bounded(self.settings.provider_timeout, operation, call).await
    }

    fn pending_writes(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Post the entry message with the "open a ticket" button
    pub async fn start_support_flow(&self, channel: ChannelId, actor: &Actor) -> Result<MessageRef> {
        debug!(channel = %channel, actor = %actor.id, "Posting support launcher");
        let launcher = render::launcher();
        self.call(
            "post support launcher",
            self.provider.send_message(channel, &launcher),
        )
        .await
    }

    /// Open a ticket channel for `owner`
    ///
    /// Fails with `AlreadyExists` while the owner has a ticket that is not
    /// closed. No channel is provisioned in that case.
    pub async fn create_ticket(&self, owner: &Actor) -> Result<CreatedTicket> {
        let _owner_guard = self.owner_locks.lock(owner.id).await;

        let name = self.naming.ticket_channel_name(owner);
        self.guard.check(owner.id, &name).await?;

        let request = ProvisionRequest {
            group: self.settings.group,
            parent: self.settings.category,
            name,
            overwrites: overwrites::open_ticket(owner.id, self.settings.support_role),
            reason: format!("Support ticket opened by {}", owner.name),
        };
        let channel = self
            .call(
                "create ticket channel",
                self.provider.provision_channel(&request),
            )
            .await?;
        info!(owner = %owner.id, channel = %channel.id, name = %channel.name, "Provisioned ticket channel");

        let persisted = match self.store.put(channel.id, owner.id).await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    channel = %channel.id,
                    owner = %owner.id,
                    error = %e,
                    "Failed to record ticket; queued for reconciliation"
                );
                self.pending_writes().push(PendingWrite {
                    channel_id: channel.id,
                    owner_id: owner.id,
                    attempts: 1,
                });
                false
            },
        };

        let card = render::ticket_card(channel.id, owner);
        let card = self
            .call(
                "post ticket card",
                self.provider.send_message(channel.id, &card),
            )
            .await?;

        self.events.publish(TicketEvent::Created {
            channel_id: channel.id,
            owner_id: owner.id,
            at: Utc::now(),
        });
        Ok(CreatedTicket {
            channel,
            card,
            persisted,
        })
    }

    /// Set the status of a ticket from the status selector
    ///
    /// Any participant may change the status. Choosing `Closed` here only
    /// writes the value; the channel stays visible until the close action.
    pub async fn change_status(
        &self,
        channel: ChannelId,
        actor: &Actor,
        card: Option<&MessageRef>,
        value: &str,
    ) -> Result<StatusChange> {
        let new: Status = value.parse()?;
        let _channel_guard = self.channel_locks.lock(channel).await;

        let ticket = self.store.get(channel).await?;
        let old = ticket.as_ref().map_or(Status::default(), |t| t.status);
        if old == Status::Closed {
            info!(channel = %channel, new = %new, "Status write on a closed ticket");
        }

        let persisted = self.store.set_status(channel, new).await?;

        if let Some(card) = card {
            let content = render::status_card(channel, ticket.map(|t| t.owner_id), new);
            self.call(
                "update ticket card",
                self.provider.update_message(card, &content),
            )
            .await?;
        }

        info!(channel = %channel, actor = %actor.id, %old, %new, "Ticket status changed");
        self.events.publish(TicketEvent::StatusChanged {
            channel_id: channel,
            old_status: old,
            new_status: new,
            by: actor.id,
            at: Utc::now(),
        });
        Ok(StatusChange {
            channel_id: channel,
            old,
            new,
            persisted,
        })
    }

    /// Close a ticket: mark the card, restrict the channel, rename it and
    /// archive the ticket as `Closed`
    ///
    /// A ticket that was already closed gets no further side effects.
    pub async fn close_ticket(
        &self,
        channel: &ChannelRef,
        actor: &Actor,
        card: Option<&MessageRef>,
    ) -> Result<CloseOutcome> {
        let owner = self.store.get(channel.id).await?.map(|t| t.owner_id);
        if !policy::can_close(actor, owner, self.settings.support_role) {
            warn!(channel = %channel.id, actor = %actor.id, "Unauthorized close attempt");
            return Err(TicketDeskError::Unauthorized {
                action: Action::Close.as_str().to_string(),
            });
        }

        let _channel_guard = self.channel_locks.lock(channel.id).await;

        if self.already_closed(channel).await? {
            self.store.archive(channel.id).await?;
            debug!(channel = %channel.id, name = %channel.name, "Ticket already closed");
            return Ok(CloseOutcome::AlreadyClosed);
        }

        if let Some(card) = card {
            let content = render::closed_card(channel.id, actor);
            self.call(
                "mark ticket card closed",
                self.provider.update_message(card, &content),
            )
            .await?;
        }

        let restricted = overwrites::closed_ticket(self.settings.support_role);
        self.call(
            "restrict ticket channel",
            self.provider
                .update_channel_visibility(channel.id, &restricted),
        )
        .await?;

        let renamed_to = self.naming.closed_name(&channel.name);
        self.call(
            "rename ticket channel",
            self.provider.rename_channel(channel.id, &renamed_to),
        )
        .await?;

        self.store.archive(channel.id).await?;

        info!(channel = %channel.id, actor = %actor.id, name = %renamed_to, "Ticket closed");
        self.events.publish(TicketEvent::Closed {
            channel_id: channel.id,
            by: actor.id,
            at: Utc::now(),
        });
        Ok(CloseOutcome::Closed { renamed_to })
    }

    /// Whether the close side effects were already applied to `channel`
    ///
    /// The name the caller saw may be stale, so an archived row or a channel
    /// of that id already carrying the closed name also count.
    async fn already_closed(&self, channel: &ChannelRef) -> Result<bool> {
        if self.naming.is_closed_name(&channel.name) {
            return Ok(true);
        }
        if let Some(ticket) = self.store.get(channel.id).await? {
            return Ok(ticket.archived);
        }

        let closed_name = self.naming.closed_name(&channel.name);
        let renamed = self
            .call(
                "look up closed ticket channel",
                self.provider
                    .find_channel_by_name(self.settings.group, &closed_name),
            )
            .await?;
        Ok(renamed.is_some_and(|found| found.id == channel.id))
    }

    /// Post a message mentioning the authority role
    ///
    /// `role` overrides the configured authority role.
    pub async fn summon_authority(
        &self,
        channel: ChannelId,
        actor: &Actor,
        role: Option<RoleId>,
    ) -> Result<MessageRef> {
        if !policy::can_escalate(actor) {
            return Err(TicketDeskError::Unauthorized {
                action: Action::Escalate.as_str().to_string(),
            });
        }

        let role_id = role.unwrap_or(self.settings.authority_role);
        let role = self
            .call(
                "look up staff role",
                self.provider.lookup_role(self.settings.group, role_id),
            )
            .await?
            .ok_or(TicketDeskError::RoleNotFound { role: role_id })?;

        let content = render::summon(&role);
        let message = self
            .call("summon staff", self.provider.send_message(channel, &content))
            .await?;

        info!(channel = %channel, actor = %actor.id, role = %role.id, "Staff summoned");
        self.events.publish(TicketEvent::AuthoritySummoned {
            channel_id: channel,
            role: role.id,
            by: actor.id,
            at: Utc::now(),
        });
        Ok(message)
    }

    /// Retry queued ticket writes, returning how many were resolved
    ///
    /// A row that already exists counts as resolved.
    pub async fn reconcile(&self) -> usize {
        let queued = std::mem::take(&mut *self.pending_writes());
        if queued.is_empty() {
            return 0;
        }

        let mut resolved = 0;
        let mut retry = Vec::new();
        for mut write in queued {
            match self.store.put(write.channel_id, write.owner_id).await {
                Ok(_) | Err(TicketDeskError::DuplicateKey { .. }) => {
                    info!(channel = %write.channel_id, attempts = write.attempts, "Reconciled ticket record");
                    resolved += 1;
                },
                Err(e) => {
                    write.attempts += 1;
                    warn!(channel = %write.channel_id, attempts = write.attempts, error = %e, "Ticket record still not written");
                    retry.push(write);
                },
            }
        }

        self.pending_writes().extend(retry);
        resolved
    }

    /// Ticket writes waiting for reconciliation
    #[must_use]
    pub fn pending_reconciliation(&self) -> Vec<PendingWrite> {
        self.pending_writes().clone()
    }
}
