//! Configuration loading
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `TICKET_DESK_*` environment variables (nested keys separated by `__`,
//! e.g. `TICKET_DESK_DESK__SUPPORT_ROLE_ID`).

use crate::core::{CategoryId, GroupId, RoleId};
use crate::error::{Result, TicketDeskError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TICKET_DESK";

/// Config file name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "ticket-desk.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub desk: DeskConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
}

/// Tenant layout and naming conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Group (guild) the desk operates in
    pub group_id: GroupId,
    /// Category new ticket channels are created under
    pub category_id: CategoryId,
    /// Role whose members may close any ticket
    pub support_role_id: RoleId,
    /// Role mentioned when someone summons staff
    pub authority_role_id: RoleId,
    /// Prefix of ticket channel names
    pub ticket_prefix: String,
    /// Prefix prepended to a channel name when the ticket is closed
    pub closed_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Upper bound for every channel provider call
    pub timeout_ms: u64,
    /// How often failed ticket writes are retried
    pub reconcile_interval_secs: u64,
}

impl ProviderConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub const fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "ticket-desk")
}

fn default_storage_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("tickets.yaml"),
        |dirs| dirs.data_dir().join("tickets.yaml"),
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desk: DeskConfig {
                group_id: GroupId::new(1),
                category_id: CategoryId::new(2),
                support_role_id: RoleId::new(3),
                authority_role_id: RoleId::new(4),
                ticket_prefix: "support".to_string(),
                closed_prefix: "closed".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::File,
                path: default_storage_path(),
            },
            provider: ProviderConfig {
                timeout_ms: 10_000,
                reconcile_interval_secs: 60,
            },
        }
    }
}

impl Config {
    /// Default config file location in the platform config directory
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from `path` if given, else from the default location when that
    /// file exists, else built-in defaults; environment variables apply last
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        Self::load_from(file.as_deref(), None)
    }

    /// Load from the default location, falling back to built-in defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load(None)
    }

    /// Load from an explicit file and environment map
    ///
    /// `env` replaces the process environment when given.
    pub fn load_from(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(TicketDeskError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the lifecycle cannot work with
    pub fn validate(&self) -> Result<()> {
        let desk = &self.desk;
        if desk.ticket_prefix.trim().is_empty() || desk.closed_prefix.trim().is_empty() {
            return Err(TicketDeskError::Config(
                "channel name prefixes cannot be empty".to_string(),
            ));
        }
        if desk.ticket_prefix == desk.closed_prefix {
            return Err(TicketDeskError::Config(
                "ticket_prefix and closed_prefix must differ".to_string(),
            ));
        }
        if self.provider.timeout_ms == 0 {
            return Err(TicketDeskError::Config(
                "provider.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.provider.reconcile_interval_secs == 0 {
            return Err(TicketDeskError::Config(
                "provider.reconcile_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the configuration as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}
