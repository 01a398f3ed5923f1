//! Handler for the `list` command

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::core::{Status, Ticket};
use crate::error::Result;
use crate::storage;
use colored::{ColoredString, Colorize};

/// List stored tickets, optionally filtered by status
///
/// # Errors
///
/// Returns `InvalidStatus` for an unknown status filter, or a storage error.
pub async fn handle_list(config: &Config, status: Option<&str>, output: &OutputFormatter) -> Result<()> {
    let filter = status.map(str::parse::<Status>).transpose()?;
    let store = storage::open(&config.storage).await?;

    let mut tickets = match filter {
        Some(status) => store.find_by_status(status).await?,
        None => store.load_all().await?,
    };
    tickets.sort_by_key(|t| t.channel_id);

    if output.is_json() {
        return output.print_json(&tickets);
    }

    if tickets.is_empty() {
        output.info("No tickets found");
        return Ok(());
    }

    for ticket in &tickets {
        display_ticket(ticket, output);
    }
    output.info("");
    output.info(&format!("{} ticket(s)", tickets.len()));
    Ok(())
}

fn display_ticket(ticket: &Ticket, output: &OutputFormatter) {
    output.info(&format!(
        "{:<20} {:<10} owner {}",
        ticket.channel_id,
        colored_status(ticket.status),
        ticket.owner_id
    ));
}

fn colored_status(status: Status) -> ColoredString {
    match status {
        Status::Open => status.as_str().green(),
        Status::Pending => status.as_str().yellow(),
        Status::Resolved => status.as_str().blue(),
        Status::Closed => status.as_str().dimmed(),
    }
}
