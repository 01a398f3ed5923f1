use crate::error::TicketDeskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticket status
///
/// Any status may follow any other; `Closed` is usually reached through the
/// dedicated close action, which also restricts the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Open,
    Pending,
    Resolved,
    Closed,
}

impl Status {
    /// All statuses, in the order the status selector offers them
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Open, Self::Pending, Self::Resolved, Self::Closed]
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Pending => "Pending",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }

    /// Selector option text
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Open => "The ticket is still open and waiting to be resolved.",
            Self::Pending => "The ticket is waiting for a reply from the user or a third party.",
            Self::Resolved => "The ticket is resolved and awaiting confirmation.",
            Self::Closed => "The ticket is fully resolved and closed.",
        }
    }

    /// Whether the ticket still counts against its owner's one-open-ticket limit
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TicketDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(TicketDeskError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}
