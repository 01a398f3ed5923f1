//! Error types for ticket-desk
//!
//! All fallible operations in the crate return [`Result`], which carries a
//! [`TicketDeskError`]. The variants mirror the failure taxonomy of the
//! ticket lifecycle: validation and authorization failures are terminal for
//! the triggering action, provider failures are reported and logged.

use crate::core::{ChannelId, RoleId};
use crate::provider::ProviderError;
use thiserror::Error;

/// Result type alias for ticket-desk operations
pub type Result<T> = std::result::Result<T, TicketDeskError>;

/// Main error type for ticket-desk
#[derive(Error, Debug)]
pub enum TicketDeskError {
    /// The owner already has a ticket channel that is not closed
    #[error("A ticket is already open: channel {channel}")]
    AlreadyExists { channel: ChannelId },

    /// The actor lacks the rights for a privileged action
    #[error("Not authorized to {action}")]
    Unauthorized { action: String },

    /// Status value outside the enumeration
    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    /// The designated role does not exist in the tenant
    #[error("Role not found: {role}")]
    RoleNotFound { role: RoleId },

    /// The provider refused an operation for lack of system privilege
    #[error("Permission denied by channel provider while trying to {operation}")]
    PermissionDenied { operation: String },

    /// Transient provider failure or timeout
    #[error("Channel provider unavailable while trying to {operation}")]
    ProviderUnavailable { operation: String },

    /// The provider rejected a channel name
    #[error("Channel name already taken: {name}")]
    NameConflict { name: String },

    /// Operation targets something with no backing record
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A ticket row already exists for this channel
    #[error("Ticket record already exists for channel {channel}")]
    DuplicateKey { channel: ChannelId },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database errors
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl TicketDeskError {
    /// Create a storage error from any displayable value
    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Map a provider failure onto the crate taxonomy, naming the operation
    /// that was attempted
    pub fn from_provider(err: ProviderError, operation: &str) -> Self {
        match err {
            ProviderError::PermissionDenied => Self::PermissionDenied {
                operation: operation.to_string(),
            },
            ProviderError::NameConflict { name } => Self::NameConflict { name },
            ProviderError::NotFound { what } => Self::NotFound { what },
            ProviderError::Unavailable { .. } => Self::ProviderUnavailable {
                operation: operation.to_string(),
            },
        }
    }

    /// Message suitable for showing to the actor who triggered the action
    ///
    /// Provider and storage failures collapse into a generic notice; the
    /// details go to the log instead.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyExists { channel } => {
                format!("You already have an open support ticket: <#{channel}>")
            },
            Self::Unauthorized { .. } => "You are not allowed to close this ticket.".to_string(),
            Self::InvalidStatus { value } => format!(
                "'{value}' is not a valid status. Choose one of: Open, Pending, Resolved, Closed."
            ),
            Self::RoleNotFound { .. } => {
                "The staff role could not be found. Please contact the bot administrator."
                    .to_string()
            },
            Self::PermissionDenied { .. } => {
                "The request could not be completed: the bot lacks permission.".to_string()
            },
            Self::ProviderUnavailable { .. } => {
                "The chat platform did not respond in time. Please try again.".to_string()
            },
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            _ => "Something went wrong while handling your request.".to_string(),
        }
    }

    /// Suggestions for resolving the error, shown by the CLI
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::AlreadyExists { .. } => {
                vec!["Close the existing ticket before opening a new one".to_string()]
            },
            Self::InvalidStatus { .. } => {
                vec!["Valid statuses are: Open, Pending, Resolved, Closed".to_string()]
            },
            Self::RoleNotFound { .. } => vec![
                "Check the role ids in the configuration file".to_string(),
                "Run 'ticket-desk init' to write a fresh configuration".to_string(),
            ],
            Self::ProviderUnavailable { .. } => {
                vec!["Retry the action once the platform is reachable".to_string()]
            },
            Self::Config(_) => vec![
                "Check the configuration file and TICKET_DESK_* environment variables"
                    .to_string(),
            ],
            Self::Storage(_) | Self::Io(_) => {
                vec!["Check that the storage path is writable".to_string()]
            },
            _ => vec![],
        }
    }

    /// Whether retrying the same action may succeed
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::Storage(_) | Self::Io(_)
        )
    }

    /// Whether the error comes from configuration
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the error is a provider-side failure
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::ProviderUnavailable { .. }
                | Self::NameConflict { .. }
        )
    }
}

impl From<config::ConfigError> for TicketDeskError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
