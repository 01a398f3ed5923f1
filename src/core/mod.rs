//! Core domain types: identifiers, ticket status, tickets and actors

mod builders;
mod id;
mod status;
mod ticket;

pub use builders::ActorBuilder;
pub use id::{CategoryId, ChannelId, GroupId, MessageId, RoleId, UserId};
pub use status::Status;
pub use ticket::{Actor, Ticket};
