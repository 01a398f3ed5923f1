use super::{Actor, RoleId, UserId};

/// Builder for creating Actor instances
///
/// The user id is required up front; everything else is optional.
pub struct ActorBuilder {
    id: UserId,
    name: Option<String>,
    discriminator: Option<String>,
    roles: Vec<RoleId>,
}

impl ActorBuilder {
    /// Create a builder for the user `id`
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self {
            id,
            name: None,
            discriminator: None,
            roles: Vec::new(),
        }
    }

    /// Set the display name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the discriminator
    #[must_use]
    pub fn discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    /// Add a single role
    #[must_use]
    pub fn role(mut self, role: RoleId) -> Self {
        self.roles.push(role);
        self
    }

    /// Build the actor
    pub fn build(self) -> Actor {
        Actor {
            id: self.id,
            name: self.name.unwrap_or_default(),
            discriminator: self.discriminator,
            roles: self.roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_builder() {
        let actor = ActorBuilder::new(UserId::new(5))
            .name("Ayse")
            .discriminator("0042")
            .role(RoleId::new(9))
            .build();

        assert_eq!(actor.name, "Ayse");
        assert_eq!(actor.discriminator.as_deref(), Some("0042"));
        assert!(actor.has_role(RoleId::new(9)));
        assert_eq!(actor.mention(), "<@5>");
    }
}
