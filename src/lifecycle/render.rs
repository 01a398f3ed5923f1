//! Message payloads posted by the lifecycle

use crate::core::{Actor, ChannelId, Status, UserId};
use crate::interaction::custom_id;
use crate::provider::{ButtonStyle, Component, MessageContent, RoleRef, SelectOption};
use chrono::Utc;

/// Entry message carrying the "open a ticket" button
#[must_use]
pub fn launcher() -> MessageContent {
    MessageContent {
        title: Some("Need support?".to_string()),
        body: "Press the button below to open a support ticket.".to_string(),
        components: vec![Component::Button {
            custom_id: custom_id::CREATE.to_string(),
            label: "Open a support ticket".to_string(),
            style: ButtonStyle::Primary,
        }],
        ..MessageContent::default()
    }
}

fn status_selector() -> Component {
    Component::Select {
        custom_id: custom_id::STATUS.to_string(),
        placeholder: "Choose the ticket status...".to_string(),
        options: Status::all()
            .iter()
            .map(|s| SelectOption {
                label: s.to_string(),
                value: s.to_string(),
                description: s.description().to_string(),
            })
            .collect(),
    }
}

fn footer(channel: ChannelId, opened_by: Option<&str>) -> String {
    match opened_by {
        Some(name) => format!("Ticket ID: {channel} | Opened by: {name}"),
        None => format!("Ticket ID: {channel}"),
    }
}

/// Ticket card posted into a new ticket channel
#[must_use]
pub fn ticket_card(channel: ChannelId, owner: &Actor) -> MessageContent {
    MessageContent {
        title: Some("Support Ticket".to_string()),
        body: format!("Hello {}, you opened a support ticket!", owner.mention()),
        status: Some(Status::Open),
        footer: Some(footer(channel, Some(&owner.name))),
        timestamp: Some(Utc::now()),
        components: ticket_controls(),
    }
}

/// Ticket card re-rendered after a status change
#[must_use]
pub fn status_card(channel: ChannelId, owner: Option<UserId>, status: Status) -> MessageContent {
    MessageContent {
        title: Some("Support Ticket".to_string()),
        body: owner.map_or_else(
            || "Support ticket".to_string(),
            |id| format!("Support ticket opened by <@{id}>"),
        ),
        status: Some(status),
        footer: Some(footer(channel, None)),
        timestamp: Some(Utc::now()),
        components: ticket_controls(),
    }
}

fn ticket_controls() -> Vec<Component> {
    vec![
        Component::Button {
            custom_id: custom_id::CLOSE.to_string(),
            label: "Close ticket".to_string(),
            style: ButtonStyle::Danger,
        },
        Component::Button {
            custom_id: custom_id::SUMMON.to_string(),
            label: "Call staff".to_string(),
            style: ButtonStyle::Primary,
        },
        status_selector(),
    ]
}

/// Ticket card once closed; no controls remain
#[must_use]
pub fn closed_card(channel: ChannelId, closed_by: &Actor) -> MessageContent {
    MessageContent {
        title: Some("Support Ticket".to_string()),
        body: format!("This ticket was closed by {}.", closed_by.mention()),
        status: Some(Status::Closed),
        footer: Some(footer(channel, None)),
        timestamp: Some(Utc::now()),
        components: Vec::new(),
    }
}

/// Broadcast asking staff to look at a ticket
#[must_use]
pub fn summon(role: &RoleRef) -> MessageContent {
    MessageContent::text(format!(
        "{}, could you take a look at this ticket?",
        role.mention()
    ))
}
