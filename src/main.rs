//! ticket-desk - support-ticket lifecycle manager
//!
//! This is the main entry point for the ticket-desk CLI application.
//! It parses arguments, sets up logging and dispatches to the command
//! handlers.

use clap::Parser;
use std::process;
use ticket_desk::cli::handlers::{handle_init, handle_list, handle_serve, handle_status};
use ticket_desk::cli::{Cli, Commands, OutputFormatter};
use ticket_desk::config::Config;
use ticket_desk::error::{Result, TicketDeskError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    init_logging(cli.verbose);

    if let Err(e) = run(cli, &formatter).await {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// Set up the tracing subscriber
///
/// Logs always go to stderr; stdout carries command output and, for
/// `serve`, the acknowledgement stream.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI application with the parsed arguments
///
/// # Errors
///
/// Returns any error that occurs during command execution
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => handle_init(config_path, force, formatter),
        Commands::Serve => handle_serve(&Config::load(config_path)?, formatter).await,
        Commands::Status { channel } => {
            handle_status(&Config::load(config_path)?, channel, formatter).await
        },
        Commands::List { status } => {
            handle_list(&Config::load(config_path)?, status.as_deref(), formatter).await
        },
    }
}

/// Handle errors and display them to the user
///
/// Prints the user-facing message, any suggestions, and in JSON mode a
/// structured error document.
fn handle_error(error: &TicketDeskError, formatter: &OutputFormatter) {
    formatter.error(&error.user_message());

    let suggestions = error.suggestions();
    if !suggestions.is_empty() {
        formatter.info("\nSuggestions:");
        for suggestion in &suggestions {
            formatter.info(&format!("  • {suggestion}"));
        }
    }

    if formatter.is_json() {
        let _ = formatter.json(&serde_json::json!({
            "status": "error",
            "error": error.to_string(),
            "error_type": format!("{error:?}"),
            "suggestions": suggestions,
            "recoverable": error.is_recoverable(),
            "is_config_error": error.is_config_error(),
        }));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let _cli = Cli::parse_from(["ticket-desk", "init"]);
        let _cli = Cli::parse_from(["ticket-desk", "serve"]);
        let _cli = Cli::parse_from(["ticket-desk", "list"]);
    }
}
