use crate::core::{RoleId, UserId};
use crate::provider::{OverwriteTarget, Permission, PermissionOverwrite};

const PARTICIPANT: &[Permission] = &[
    Permission::ViewChannel,
    Permission::SendMessages,
    Permission::AttachFiles,
    Permission::EmbedLinks,
    Permission::ReadMessageHistory,
];

const STAFF: &[Permission] = &[
    Permission::ViewChannel,
    Permission::SendMessages,
    Permission::ReadMessageHistory,
];

/// Visibility of a freshly provisioned ticket channel
#[must_use]
pub fn open_ticket(owner: UserId, support_role: RoleId) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite::deny(OverwriteTarget::Everyone, &[Permission::ViewChannel]),
        PermissionOverwrite::allow(OverwriteTarget::User(owner), PARTICIPANT),
        PermissionOverwrite::allow(OverwriteTarget::SystemActor, STAFF),
        PermissionOverwrite::allow(OverwriteTarget::Role(support_role), STAFF),
    ]
}

/// Visibility once a ticket is closed
///
/// The owner loses access; staff keep read access for audit.
#[must_use]
pub fn closed_ticket(support_role: RoleId) -> Vec<PermissionOverwrite> {
    vec![
        PermissionOverwrite::deny(OverwriteTarget::Everyone, &[Permission::ViewChannel]),
        PermissionOverwrite::allow(OverwriteTarget::SystemActor, STAFF),
        PermissionOverwrite {
            target: OverwriteTarget::Role(support_role),
            allow: vec![Permission::ViewChannel, Permission::ReadMessageHistory],
            deny: vec![Permission::SendMessages],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(overwrites: &[PermissionOverwrite], target: OverwriteTarget) -> &PermissionOverwrite {
        overwrites.iter().find(|o| o.target == target).unwrap()
    }

    #[test]
    fn test_open_ticket_hides_channel_from_everyone_else() {
        let overwrites = open_ticket(UserId::new(7), RoleId::new(3));

        assert!(find(&overwrites, OverwriteTarget::Everyone).denies(Permission::ViewChannel));
        let owner = find(&overwrites, OverwriteTarget::User(UserId::new(7)));
        assert!(owner.allows(Permission::SendMessages));
        assert!(owner.allows(Permission::AttachFiles));
        assert!(find(&overwrites, OverwriteTarget::SystemActor).allows(Permission::ViewChannel));
    }

    #[test]
    fn test_closed_ticket_drops_owner() {
        let overwrites = closed_ticket(RoleId::new(3));

        assert!(
            !overwrites
                .iter()
                .any(|o| matches!(o.target, OverwriteTarget::User(_)))
        );
        let staff = find(&overwrites, OverwriteTarget::Role(RoleId::new(3)));
        assert!(staff.allows(Permission::ReadMessageHistory));
        assert!(staff.denies(Permission::SendMessages));
    }
}
