//! YAML file backend for the ticket store
//!
//! The whole `tickets` collection lives in one YAML document. Every mutation
//! is applied in memory under the store mutex and then written out through a
//! temp file that is fsynced and renamed over the original, so a crash leaves
//! either the old or the new document on disk, never a torn one. The file
//! work runs on the blocking pool; the async store mutex stays held until it
//! finishes, which keeps writes ordered.

use super::repository::TicketRepository;
use crate::core::{ChannelId, Status, Ticket, UserId};
use crate::error::{Result, TicketDeskError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct TicketsDocument {
    #[serde(default)]
    tickets: Vec<Ticket>,
}

#[derive(Debug, Default)]
struct StoreState {
    tickets: BTreeMap<ChannelId, Ticket>,
    /// Derived index: owner -> channel of their ticket that is not closed
    active_by_owner: HashMap<UserId, ChannelId>,
}

impl StoreState {
    fn from_document(doc: TicketsDocument) -> Result<Self> {
        let mut state = Self::default();
        for ticket in doc.tickets {
            let channel = ticket.channel_id;
            if state.tickets.insert(channel, ticket).is_some() {
                return Err(TicketDeskError::DuplicateKey { channel });
            }
        }
        state.rebuild_index();
        Ok(state)
    }

    fn to_document(&self) -> TicketsDocument {
        TicketsDocument {
            tickets: self.tickets.values().cloned().collect(),
        }
    }

    fn rebuild_index(&mut self) {
        self.active_by_owner.clear();
        // BTreeMap order: the most recently assigned channel wins
        for ticket in self.tickets.values().filter(|t| t.is_active()) {
            self.active_by_owner.insert(ticket.owner_id, ticket.channel_id);
        }
    }

    fn reindex_owner(&mut self, owner: UserId) {
        let latest = self
            .tickets
            .values()
            .filter(|t| t.owner_id == owner && t.is_active())
            .map(|t| t.channel_id)
            .next_back();
        match latest {
            Some(channel) => self.active_by_owner.insert(owner, channel),
            None => self.active_by_owner.remove(&owner),
        };
    }
}

/// File-backed ticket store
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStorage {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// A missing file is an empty store; it is written on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let doc = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                TicketsDocument::default()
            } else {
                serde_yaml::from_str(&content)?
            }
        } else {
            TicketsDocument::default()
        };

        let state = StoreState::from_document(doc)?;
        debug!(
            path = %path.display(),
            tickets = state.tickets.len(),
            "Opened ticket store"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing YAML file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().await
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let content = serde_yaml::to_string(&state.to_document())?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| TicketDeskError::storage(format!("ticket store write aborted: {e}")))?
    }
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let tmp_path = path.with_extension("yaml.tmp");

    let mut file = File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl TicketRepository for FileStorage {
    async fn put(&self, channel_id: ChannelId, owner_id: UserId) -> Result<Ticket> {
        let mut state = self.lock().await;
        if state.tickets.contains_key(&channel_id) {
            return Err(TicketDeskError::DuplicateKey {
                channel: channel_id,
            });
        }

        let ticket = Ticket::new(channel_id, owner_id);
        state.tickets.insert(channel_id, ticket.clone());
        if let Err(e) = self.persist(&state).await {
            state.tickets.remove(&channel_id);
            return Err(e);
        }
        state.reindex_owner(owner_id);

        debug!(channel = %channel_id, owner = %owner_id, "Inserted ticket");
        Ok(ticket)
    }

    async fn get(&self, channel_id: ChannelId) -> Result<Option<Ticket>> {
        Ok(self.lock().await.tickets.get(&channel_id).cloned())
    }

    async fn set_status(&self, channel_id: ChannelId, status: Status) -> Result<bool> {
        let mut state = self.lock().await;
        let Some(ticket) = state.tickets.get_mut(&channel_id) else {
            warn!(channel = %channel_id, %status, "Status update for unknown ticket ignored");
            return Ok(false);
        };

        let previous = ticket.status;
        let owner = ticket.owner_id;
        ticket.status = status;

        if let Err(e) = self.persist(&state).await {
            if let Some(ticket) = state.tickets.get_mut(&channel_id) {
                ticket.status = previous;
            }
            return Err(e);
        }
        state.reindex_owner(owner);

        debug!(channel = %channel_id, from = %previous, to = %status, "Updated ticket status");
        Ok(true)
    }

    async fn archive(&self, channel_id: ChannelId) -> Result<bool> {
        let mut state = self.lock().await;
        let Some(ticket) = state.tickets.get_mut(&channel_id) else {
            warn!(channel = %channel_id, "Archive of unknown ticket ignored");
            return Ok(false);
        };

        let previous = (ticket.status, ticket.archived);
        let owner = ticket.owner_id;
        ticket.status = Status::Closed;
        ticket.archived = true;

        if let Err(e) = self.persist(&state).await {
            if let Some(ticket) = state.tickets.get_mut(&channel_id) {
                (ticket.status, ticket.archived) = previous;
            }
            return Err(e);
        }
        state.reindex_owner(owner);

        debug!(channel = %channel_id, "Archived ticket");
        Ok(true)
    }

    async fn active_for_owner(&self, owner_id: UserId) -> Result<Option<ChannelId>> {
        Ok(self.lock().await.active_by_owner.get(&owner_id).copied())
    }

    async fn load_all(&self) -> Result<Vec<Ticket>> {
        Ok(self.lock().await.tickets.values().cloned().collect())
    }
}
