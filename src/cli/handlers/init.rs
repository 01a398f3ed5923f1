//! Handler for the `init` command

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::error::{Result, TicketDeskError};
use std::path::{Path, PathBuf};

/// Write a default configuration file
///
/// # Arguments
///
/// * `config_path` - Target file; the platform config directory when `None`
/// * `force` - Overwrite an existing file
/// * `output` - Output formatter for displaying results
///
/// # Errors
///
/// Returns an error if the file exists and `force` is not set, or if it
/// cannot be written.
pub fn handle_init(config_path: Option<&Path>, force: bool, output: &OutputFormatter) -> Result<()> {
    let path: PathBuf = match config_path {
        Some(p) => p.to_path_buf(),
        None => Config::default_path().ok_or_else(|| {
            TicketDeskError::Config("could not determine the configuration directory".to_string())
        })?,
    };

    if path.exists() && !force {
        return Err(TicketDeskError::Config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }

    let config = Config::default();
    config.save(&path)?;

    output.success(&format!("Wrote configuration to {}", path.display()));
    output.info(&format!("Tickets will be stored in {}", config.storage.path.display()));
    output.info("Set the group, category and role ids before running 'ticket-desk serve'.");
    output.print_json(&serde_json::json!({
        "status": "initialized",
        "config_path": path,
        "storage_path": config.storage.path,
    }))
}
