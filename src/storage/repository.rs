use crate::core::{ChannelId, Status, Ticket, UserId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository trait for ticket storage operations
///
/// Every mutation is durably committed before the call returns, and single
/// record operations are atomic with respect to each other. Rows are never
/// deleted; closing a ticket is a status change.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Inserts a new ticket with status `Open`
    ///
    /// Fails with `DuplicateKey` if the channel already has a record.
    async fn put(&self, channel_id: ChannelId, owner_id: UserId) -> Result<Ticket>;

    /// Loads a ticket by channel
    async fn get(&self, channel_id: ChannelId) -> Result<Option<Ticket>>;

    /// Updates the status of an existing ticket
    ///
    /// Returns `false` without creating a row when the channel is unknown.
    async fn set_status(&self, channel_id: ChannelId, status: Status) -> Result<bool>;

    /// Marks a ticket as closed by the close action
    ///
    /// Sets the status to `Closed` and archives the row so later status
    /// writes cannot make it active again. Returns `false` when the channel
    /// is unknown.
    async fn archive(&self, channel_id: ChannelId) -> Result<bool>;

    /// Channel of the owner's ticket that is neither closed nor archived
    async fn active_for_owner(&self, owner_id: UserId) -> Result<Option<ChannelId>>;

    /// Loads all tickets ordered by channel
    async fn load_all(&self) -> Result<Vec<Ticket>>;

    /// Current status, `Open` when no record exists
    async fn get_status(&self, channel_id: ChannelId) -> Result<Status> {
        Ok(self
            .get(channel_id)
            .await?
            .map_or(Status::Open, |ticket| ticket.status))
    }

    /// Loads tickets with the given status
    async fn find_by_status(&self, status: Status) -> Result<Vec<Ticket>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|t| t.status == status)
            .collect())
    }
}
