//! Inbound user actions
//!
//! Button presses, selector choices and slash commands arrive as
//! [`InboundEvent`]s, are parsed into an [`Interaction`] and handed to
//! [`dispatch`], which always answers with an [`Acknowledgement`].

use crate::core::Actor;
use crate::error::TicketDeskError;
use crate::lifecycle::{CloseOutcome, LifecycleManager};
use crate::provider::{ChannelRef, MessageRef};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Component identifiers carried by the posted messages
pub mod custom_id {
    pub const CREATE: &str = "ticket:create";
    pub const CLOSE: &str = "ticket:close";
    pub const SUMMON: &str = "ticket:summon";
    pub const STATUS: &str = "ticket:status";
}

/// Slash command that posts the support launcher
pub const SUPPORT_COMMAND: &str = "support";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    StartSupportFlow,
    Create,
    Close,
    Summon,
    /// Raw selector value; validated by the lifecycle
    StatusChange(String),
}

impl Interaction {
    /// Parse a component press; `values` are the selector choices
    #[must_use]
    pub fn from_component(id: &str, values: &[String]) -> Option<Self> {
        match id {
            custom_id::CREATE => Some(Self::Create),
            custom_id::CLOSE => Some(Self::Close),
            custom_id::SUMMON => Some(Self::Summon),
            custom_id::STATUS => Some(Self::StatusChange(
                values.first().cloned().unwrap_or_default(),
            )),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_command(name: &str) -> Option<Self> {
        (name == SUPPORT_COMMAND).then_some(Self::StartSupportFlow)
    }

    #[must_use]
    pub fn from_trigger(trigger: &Trigger) -> Option<Self> {
        match trigger {
            Trigger::Component { custom_id, values } => Self::from_component(custom_id, values),
            Trigger::Command { name } => Self::from_command(name),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StartSupportFlow => "start_support_flow",
            Self::Create => "create",
            Self::Close => "close",
            Self::Summon => "summon",
            Self::StatusChange(_) => "status_change",
        }
    }
}

/// What the user did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Component {
        custom_id: String,
        #[serde(default)]
        values: Vec<String>,
    },
    Command {
        name: String,
    },
}

/// One inbound action as read by `serve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(flatten)]
    pub trigger: Trigger,
    pub actor: Actor,
    pub channel: ChannelRef,
    /// Message the component was attached to
    #[serde(default)]
    pub message: Option<MessageRef>,
}

impl InboundEvent {
    #[must_use]
    pub fn context(&self) -> InteractionContext {
        InteractionContext {
            actor: self.actor.clone(),
            channel: self.channel.clone(),
            message: self.message,
        }
    }
}

/// Where and by whom an interaction was triggered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    pub actor: Actor,
    pub channel: ChannelRef,
    pub message: Option<MessageRef>,
}

/// Reply to the actor who triggered an interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub ok: bool,
    /// Only visible to the actor
    pub ephemeral: bool,
    pub content: String,
}

impl Acknowledgement {
    pub fn private(content: impl Into<String>) -> Self {
        Self {
            ok: true,
            ephemeral: true,
            content: content.into(),
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            ok: true,
            ephemeral: false,
            content: content.into(),
        }
    }

    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            ok: false,
            ephemeral: true,
            content: content.into(),
        }
    }

    /// Reply for an action nobody recognises
    #[must_use]
    pub fn unknown() -> Self {
        Self::failure("This action is not supported.")
    }

    fn from_error(err: &TicketDeskError) -> Self {
        if err.is_provider_error() || err.is_recoverable() {
            error!(error = %err, "Interaction failed");
        } else {
            warn!(error = %err, "Interaction rejected");
        }
        Self::failure(err.user_message())
    }
}

/// Run one interaction against the manager
///
/// Every outcome, success or failure, becomes an acknowledgement.
pub async fn dispatch(
    manager: &LifecycleManager,
    interaction: Interaction,
    ctx: &InteractionContext,
) -> Acknowledgement {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "interaction",
        %request_id,
        kind = interaction.kind(),
        actor = %ctx.actor.id,
        channel = %ctx.channel.id,
    );

    async move {
        let result = match interaction {
            Interaction::StartSupportFlow => manager
                .start_support_flow(ctx.channel.id, &ctx.actor)
                .await
                .map(|_| Acknowledgement::private("Support launcher posted.")),
            Interaction::Create => manager.create_ticket(&ctx.actor).await.map(|created| {
                Acknowledgement::private(format!(
                    "Your support ticket has been created: {}",
                    created.channel.mention()
                ))
            }),
            Interaction::Close => manager
                .close_ticket(&ctx.channel, &ctx.actor, ctx.message.as_ref())
                .await
                .map(|outcome| match outcome {
                    CloseOutcome::Closed { .. } => Acknowledgement::public(format!(
                        "This ticket was closed by {}.",
                        ctx.actor.mention()
                    )),
                    CloseOutcome::AlreadyClosed => {
                        Acknowledgement::private("This ticket is already closed.")
                    },
                }),
            Interaction::Summon => manager
                .summon_authority(ctx.channel.id, &ctx.actor, None)
                .await
                .map(|_| Acknowledgement::private("Staff has been notified.")),
            Interaction::StatusChange(value) => manager
                .change_status(ctx.channel.id, &ctx.actor, ctx.message.as_ref(), &value)
                .await
                .map(|change| {
                    Acknowledgement::public(format!("Ticket status set to {}.", change.new))
                }),
        };

        match result {
            Ok(ack) => {
                info!("Interaction handled");
                ack
            },
            Err(e) => Acknowledgement::from_error(&e),
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Status;
    use crate::storage::TicketRepository;
    use crate::provider::{ProviderError, ProviderOp};
    use crate::test_utils::{GROUP, TestDesk, member, support_agent};

    fn ctx(actor: Actor, channel: ChannelRef, message: Option<MessageRef>) -> InteractionContext {
        InteractionContext {
            actor,
            channel,
            message,
        }
    }

    #[test]
    fn test_parse_components() {
        assert_eq!(
            Interaction::from_component(custom_id::CREATE, &[]),
            Some(Interaction::Create)
        );
        assert_eq!(
            Interaction::from_component(custom_id::STATUS, &["Resolved".to_string()]),
            Some(Interaction::StatusChange("Resolved".to_string()))
        );
        assert_eq!(
            Interaction::from_component(custom_id::STATUS, &[]),
            Some(Interaction::StatusChange(String::new()))
        );
        assert_eq!(Interaction::from_component("ticket:explode", &[]), None);
        assert_eq!(
            Interaction::from_command("support"),
            Some(Interaction::StartSupportFlow)
        );
        assert_eq!(Interaction::from_command("ban"), None);
    }

    #[test]
    fn test_inbound_event_from_json() {
        let line = r#"{"kind":"component","custom_id":"ticket:status","values":["Pending"],
            "actor":{"id":7,"name":"ayse"},"channel":{"id":1001,"name":"support-ayse"},
            "message":{"channel_id":1001,"message_id":1002}}"#;
        let event: InboundEvent = serde_json::from_str(line).unwrap();

        assert_eq!(
            Interaction::from_trigger(&event.trigger),
            Some(Interaction::StatusChange("Pending".to_string()))
        );
        assert_eq!(event.actor.name, "ayse");
        assert!(event.actor.roles.is_empty());
        assert!(event.message.is_some());

        let line = r#"{"kind":"command","name":"support","actor":{"id":7,"name":"a"},"channel":{"id":5,"name":"help"}}"#;
        let event: InboundEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.trigger, Trigger::Command {
            name: "support".to_string()
        });
        assert_eq!(event.message, None);
    }

    #[tokio::test]
    async fn test_dispatch_create_twice() {
        let desk = TestDesk::new();
        let lobby = desk.provider.add_channel(GROUP, "help");
        let ctx = ctx(member(10, "Ayse"), lobby, None);

        let first = dispatch(&desk.manager, Interaction::Create, &ctx).await;
        assert!(first.ok);
        assert!(first.ephemeral);
        assert!(first.content.starts_with("Your support ticket has been created: <#"));

        let second = dispatch(&desk.manager, Interaction::Create, &ctx).await;
        assert!(!second.ok);
        assert!(second.content.contains("already have an open support ticket"));
    }

    #[tokio::test]
    async fn test_dispatch_reports_validation_and_authorization() {
        let desk = TestDesk::new();
        let created = desk
            .manager
            .create_ticket(&member(10, "Ayse"))
            .await
            .unwrap();

        let stranger = ctx(member(11, "Mallory"), created.channel.clone(), Some(created.card));
        let ack = dispatch(&desk.manager, Interaction::Close, &stranger).await;
        assert!(!ack.ok);
        assert_eq!(ack.content, "You are not allowed to close this ticket.");

        let ack = dispatch(
            &desk.manager,
            Interaction::StatusChange("Bogus".to_string()),
            &stranger,
        )
        .await;
        assert!(!ack.ok);
        assert!(ack.content.contains("'Bogus'"));
    }

    #[tokio::test]
    async fn test_dispatch_status_then_close() {
        let desk = TestDesk::new();
        let owner = member(10, "Ayse");
        let created = desk.manager.create_ticket(&owner).await.unwrap();
        let in_ticket = ctx(owner, created.channel.clone(), Some(created.card));

        let ack = dispatch(
            &desk.manager,
            Interaction::StatusChange("pending".to_string()),
            &in_ticket,
        )
        .await;
        assert!(ack.ok);
        assert_eq!(ack.content, "Ticket status set to Pending.");

        let staff = ctx(support_agent(20), created.channel.clone(), Some(created.card));
        let ack = dispatch(&desk.manager, Interaction::Close, &staff).await;
        assert!(ack.ok);
        assert!(!ack.ephemeral);
        assert_eq!(
            desk.store.get_status(created.channel.id).await.unwrap(),
            Status::Closed
        );
    }

    #[tokio::test]
    async fn test_dispatch_hides_provider_details() {
        let desk = TestDesk::new();
        let created = desk
            .manager
            .create_ticket(&member(10, "Ayse"))
            .await
            .unwrap();
        desk.provider.fail_next(
            ProviderOp::LookupRole,
            ProviderError::Unavailable {
                reason: "socket reset by peer".to_string(),
            },
        );

        let ack = dispatch(
            &desk.manager,
            Interaction::Summon,
            &ctx(member(10, "Ayse"), created.channel, None),
        )
        .await;

        assert!(!ack.ok);
        assert!(!ack.content.contains("socket"));
    }

    #[tokio::test]
    async fn test_dispatch_start_support_flow() {
        let desk = TestDesk::new();
        let lobby = desk.provider.add_channel(GROUP, "help");

        let ack = dispatch(
            &desk.manager,
            Interaction::StartSupportFlow,
            &ctx(support_agent(20), lobby.clone(), None),
        )
        .await;

        assert!(ack.ok);
        assert_eq!(desk.provider.messages(lobby.id).len(), 1);
    }
}
