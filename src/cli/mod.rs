//! Command-line interface
//!
//! Argument definitions (clap derive), output formatting and one handler per
//! subcommand.

pub mod handlers;
mod output;

pub use output::OutputFormatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ticket-desk", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ticket-desk.yaml in the config directory)
    #[arg(short, long, global = true, env = "TICKET_DESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Handle inbound interactions read as JSON lines from stdin
    ///
    /// Each line is one event; one acknowledgement line is written to stdout
    /// per event.
    Serve,

    /// Show the stored status of a ticket channel
    Status {
        /// Channel id of the ticket
        channel: u64,
    },

    /// List stored tickets
    List {
        /// Only tickets with this status
        #[arg(short, long)]
        status: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["ticket-desk", "--json", "status", "42"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Status { channel: 42 }));

        let cli = Cli::parse_from(["ticket-desk", "list", "--status", "pending"]);
        assert!(matches!(cli.command, Commands::List { status: Some(ref s) } if s == "pending"));

        let cli = Cli::parse_from(["ticket-desk", "serve", "-c", "desk.yaml", "-v"]);
        assert_eq!(cli.config, Some(PathBuf::from("desk.yaml")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_status_requires_numeric_channel() {
        assert!(Cli::try_parse_from(["ticket-desk", "status", "abc"]).is_err());
    }
}
