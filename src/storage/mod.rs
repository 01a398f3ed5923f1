//! Ticket store
//!
//! The store is the only shared mutable resource of the lifecycle. It is
//! opened at process start and handed to the lifecycle manager as an
//! `Arc<dyn TicketRepository>`.

mod file;
mod repository;
#[cfg(feature = "database")]
mod sqlite;

pub use file::FileStorage;
pub use repository::TicketRepository;
#[cfg(feature = "database")]
pub use sqlite::SqliteStorage;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use std::sync::Arc;

/// Open the store selected by the configuration
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn TicketRepository>> {
    match config.backend {
        StorageBackend::File => Ok(Arc::new(FileStorage::open(&config.path)?)),
        #[cfg(feature = "database")]
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStorage::open(&config.path).await?)),
        #[cfg(not(feature = "database"))]
        StorageBackend::Sqlite => Err(crate::error::TicketDeskError::Config(
            "the sqlite backend requires building with the 'database' feature".to_string(),
        )),
    }
}
