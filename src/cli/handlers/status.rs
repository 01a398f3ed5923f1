//! Handler for the `status` command

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::core::{ChannelId, Status};
use crate::error::Result;
use crate::storage;

/// Show the stored status of one ticket channel
///
/// A channel without a ticket row reads as `Open`.
pub async fn handle_status(config: &Config, channel: u64, output: &OutputFormatter) -> Result<()> {
    let store = storage::open(&config.storage).await?;
    let channel = ChannelId::new(channel);
    let ticket = store.get(channel).await?;
    let status = ticket.as_ref().map_or(Status::default(), |t| t.status);

    if output.is_json() {
        return output.print_json(&serde_json::json!({
            "channel_id": channel,
            "recorded": ticket.is_some(),
            "owner_id": ticket.as_ref().map(|t| t.owner_id),
            "status": status,
            "archived": ticket.as_ref().is_some_and(|t| t.archived),
        }));
    }

    match ticket {
        Some(ticket) => {
            output.info(&format!("Ticket {channel}"));
            output.info(&format!("  Owner: {}", ticket.owner_id));
            output.info(&format!("  Status: {status}"));
            if ticket.archived {
                output.info("  Channel closed and archived");
            }
        },
        None => {
            output.warning(&format!("No ticket recorded for channel {channel}"));
            output.info(&format!("  Status: {status}"));
        },
    }
    Ok(())
}
