//! ticket-desk - support-ticket lifecycle manager for group-chat platforms
//!
//! A member presses a button and gets a private channel shared with the
//! support staff. Participants move the ticket between statuses, summon
//! staff, and finally close it, which hides the channel from its owner and
//! renames it.
//!
//! The crate is split along its seams:
//! - [`storage`] persists `(channel, owner, status)` rows behind
//!   [`storage::TicketRepository`]
//! - [`provider`] abstracts the chat platform behind
//!   [`provider::ChannelProvider`]
//! - [`policy`] decides who may close a ticket
//! - [`lifecycle`] orchestrates the operations
//! - [`interaction`] turns inbound actions into lifecycle calls and
//!   acknowledgements
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticket_desk::config::Config;
//! use ticket_desk::lifecycle::{DeskSettings, LifecycleManager};
//! use ticket_desk::storage;
//!
//! let config = Config::load_or_default()?;
//! let store = storage::open(&config.storage).await?;
//! let manager = LifecycleManager::new(store, provider, DeskSettings::from(&config));
//!
//! let created = manager.create_ticket(&actor).await?;
//! manager.change_status(created.channel.id, &actor, Some(&created.card), "Pending").await?;
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod interaction;
pub mod lifecycle;
pub mod policy;
pub mod provider;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{Result, TicketDeskError};
