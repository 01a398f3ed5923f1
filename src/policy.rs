//! Authorization policy for privileged ticket actions
//!
//! Pure decisions with no I/O; the lifecycle manager supplies the facts.

use crate::core::{Actor, RoleId, UserId};

/// Privileged actions the policy decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Close,
    Escalate,
}

impl Action {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close this ticket",
            Self::Escalate => "summon staff",
        }
    }
}

/// Whether `actor` may close a ticket owned by `ticket_owner`
///
/// The owner and holders of the support role may close. When the ticket has
/// no backing record its owner is unknown and only the support role may.
#[must_use]
pub fn can_close(actor: &Actor, ticket_owner: Option<UserId>, support_role: RoleId) -> bool {
    ticket_owner == Some(actor.id) || actor.has_role(support_role)
}

/// Anyone who can see the ticket channel may summon staff
#[must_use]
pub const fn can_escalate(_actor: &Actor) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUPPORT: RoleId = RoleId::new(3);

    fn actor(id: u64) -> Actor {
        Actor::new(UserId::new(id), format!("user{id}"))
    }

    #[test]
    fn test_owner_can_close() {
        assert!(can_close(&actor(1), Some(UserId::new(1)), SUPPORT));
    }

    #[test]
    fn test_support_role_can_close_any_ticket() {
        let staff = actor(2).with_role(SUPPORT);
        assert!(can_close(&staff, Some(UserId::new(1)), SUPPORT));
        assert!(can_close(&staff, None, SUPPORT));
    }

    #[test]
    fn test_stranger_cannot_close() {
        let stranger = actor(3).with_role(RoleId::new(99));
        assert!(!can_close(&stranger, Some(UserId::new(1)), SUPPORT));
        assert!(!can_close(&stranger, None, SUPPORT));
    }

    #[test]
    fn test_anyone_can_escalate() {
        assert!(can_escalate(&actor(42)));
    }
}
