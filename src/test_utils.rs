//! Test utilities for ticket-desk
//!
//! Shared fixtures: a temporary file store, an in-memory provider seeded
//! with the desk's category and roles, and a lifecycle manager wired to both.

#![cfg(test)]

use crate::core::{Actor, ActorBuilder, CategoryId, GroupId, RoleId, UserId};
use crate::lifecycle::{DeskSettings, LifecycleManager};
use crate::provider::MemoryProvider;
use crate::storage::FileStorage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const GROUP: GroupId = GroupId::new(1);
pub const CATEGORY: CategoryId = CategoryId::new(2);
pub const SUPPORT_ROLE: RoleId = RoleId::new(3);
pub const AUTHORITY_ROLE: RoleId = RoleId::new(4);

/// Settings matching the seeded provider
pub fn settings() -> DeskSettings {
    DeskSettings {
        group: GROUP,
        category: CATEGORY,
        support_role: SUPPORT_ROLE,
        authority_role: AUTHORITY_ROLE,
        ticket_prefix: "support".to_string(),
        closed_prefix: "closed".to_string(),
        provider_timeout: Duration::from_secs(2),
    }
}

/// Provider knowing the desk category and both roles
pub fn seeded_provider() -> MemoryProvider {
    MemoryProvider::new()
        .recording()
        .with_category(GROUP, CATEGORY)
        .with_role(GROUP, SUPPORT_ROLE, "Support")
        .with_role(GROUP, AUTHORITY_ROLE, "Staff")
}

/// Test fixture for a desk backed by a temporary store
pub struct TestDesk {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub store: Arc<FileStorage>,
    pub provider: Arc<MemoryProvider>,
    pub manager: LifecycleManager,
}

impl TestDesk {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_settings(settings: DeskSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let store = Arc::new(
            FileStorage::open(data_dir.join("tickets.yaml")).expect("Failed to open store"),
        );
        let provider = Arc::new(seeded_provider());
        let manager = LifecycleManager::new(store.clone(), provider.clone(), settings);

        Self {
            temp_dir,
            data_dir,
            store,
            provider,
            manager,
        }
    }

    /// Make every store write fail until [`Self::repair_storage`]
    pub fn break_storage(&self) {
        std::fs::remove_dir_all(&self.data_dir).expect("Failed to remove data dir");
    }

    pub fn repair_storage(&self) {
        std::fs::create_dir_all(&self.data_dir).expect("Failed to recreate data dir");
    }
}

/// A user with no roles
pub fn member(id: u64, name: &str) -> Actor {
    ActorBuilder::new(UserId::new(id)).name(name).build()
}

/// A holder of the support role
pub fn support_agent(id: u64) -> Actor {
    ActorBuilder::new(UserId::new(id))
        .name(format!("agent{id}"))
        .role(SUPPORT_ROLE)
        .build()
}
