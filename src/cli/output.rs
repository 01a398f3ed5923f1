//! Terminal output for CLI commands
//!
//! Human-readable lines go to stdout (errors to stderr) with optional color;
//! in JSON mode only the structured payloads are printed.

use crate::error::Result;
use colored::Colorize;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    json: bool,
    no_color: bool,
}

impl OutputFormatter {
    #[must_use]
    pub fn new(json: bool, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { json, no_color }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    #[must_use]
    pub const fn is_color(&self) -> bool {
        !self.no_color
    }

    pub fn success(&self, message: &str) {
        if !self.json {
            println!("{} {message}", "✓".green().bold());
        }
    }

    pub fn info(&self, message: &str) {
        if !self.json {
            println!("{message}");
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.json {
            eprintln!("{} {message}", "warning:".yellow().bold());
        }
    }

    pub fn error(&self, message: &str) {
        if !self.json {
            eprintln!("{} {message}", "error:".red().bold());
        }
    }

    /// Print a value as pretty JSON regardless of mode
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a value as JSON in JSON mode
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.json {
            self.json(value)?;
        }
        Ok(())
    }

    /// Print one compact JSON document per line
    pub fn json_line<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string(value)?);
        Ok(())
    }
}
