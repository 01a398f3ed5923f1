//! SQLite backend for the ticket store (`database` feature)

use super::repository::TicketRepository;
use crate::core::{ChannelId, Status, Ticket, UserId};
use crate::error::{Result, TicketDeskError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tickets (
    channel_id INTEGER PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'Open',
    owner_id INTEGER NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_tickets_owner ON tickets(owner_id);
";

/// SQLite-backed ticket store
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (and create if missing) the database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Open an in-memory database, mainly for tests
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        // Databases created before tickets could be archived
        let (has_archived,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pragma_table_info('tickets') WHERE name = 'archived'",
        )
        .fetch_one(&pool)
        .await?;
        if has_archived == 0 {
            sqlx::query("ALTER TABLE tickets ADD COLUMN archived INTEGER NOT NULL DEFAULT 0")
                .execute(&pool)
                .await?;
            debug!("Added archived column to ticket store");
        }
        debug!("Opened SQLite ticket store");
        Ok(Self { pool })
    }

    /// Close the pool, waiting for connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_sql(raw: u64) -> Result<i64> {
    i64::try_from(raw).map_err(|_| TicketDeskError::storage(format!("identifier {raw} out of range")))
}

fn from_sql(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| TicketDeskError::storage(format!("negative identifier {raw} in database")))
}

type TicketRow = (i64, String, i64, bool);

const TICKET_COLUMNS: &str = "channel_id, status, owner_id, archived";

fn row_to_ticket((channel_id, status, owner_id, archived): TicketRow) -> Result<Ticket> {
    let status = status
        .parse::<Status>()
        .map_err(|_| TicketDeskError::storage(format!("unknown status '{status}' in database")))?;
    Ok(Ticket {
        channel_id: ChannelId::new(from_sql(channel_id)?),
        owner_id: UserId::new(from_sql(owner_id)?),
        status,
        archived,
    })
}

#[async_trait]
impl TicketRepository for SqliteStorage {
    async fn put(&self, channel_id: ChannelId, owner_id: UserId) -> Result<Ticket> {
        let result = sqlx::query("INSERT INTO tickets (channel_id, owner_id) VALUES (?, ?)")
            .bind(to_sql(channel_id.get())?)
            .bind(to_sql(owner_id.get())?)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!(channel = %channel_id, owner = %owner_id, "Inserted ticket");
                Ok(Ticket::new(channel_id, owner_id))
            },
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(TicketDeskError::DuplicateKey {
                    channel: channel_id,
                })
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, channel_id: ChannelId) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE channel_id = ?"
        ))
        .bind(to_sql(channel_id.get())?)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_ticket).transpose()
    }

    async fn set_status(&self, channel_id: ChannelId, status: Status) -> Result<bool> {
        let result = sqlx::query("UPDATE tickets SET status = ? WHERE channel_id = ?")
            .bind(status.as_str())
            .bind(to_sql(channel_id.get())?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(channel = %channel_id, %status, "Status update for unknown ticket ignored");
            return Ok(false);
        }
        debug!(channel = %channel_id, %status, "Updated ticket status");
        Ok(true)
    }

    async fn archive(&self, channel_id: ChannelId) -> Result<bool> {
        let result = sqlx::query("UPDATE tickets SET status = ?, archived = 1 WHERE channel_id = ?")
            .bind(Status::Closed.as_str())
            .bind(to_sql(channel_id.get())?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(channel = %channel_id, "Archive of unknown ticket ignored");
            return Ok(false);
        }
        debug!(channel = %channel_id, "Archived ticket");
        Ok(true)
    }

    async fn active_for_owner(&self, owner_id: UserId) -> Result<Option<ChannelId>> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT channel_id FROM tickets \
             WHERE owner_id = ? AND status != 'Closed' AND archived = 0 \
             ORDER BY channel_id DESC LIMIT 1",
        )
        .bind(to_sql(owner_id.get())?)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(raw,)| from_sql(raw).map(ChannelId::new))
            .transpose()
    }

    async fn load_all(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY channel_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_ticket).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_put_get_and_duplicate() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let channel = ChannelId::new(11);

        storage.put(channel, UserId::new(1)).await.unwrap();
        assert_eq!(storage.get_status(channel).await.unwrap(), Status::Open);

        let err = storage.put(channel, UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, TicketDeskError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_sqlite_set_status_missing_row() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        assert!(!storage
            .set_status(ChannelId::new(1), Status::Pending)
            .await
            .unwrap());
        assert!(storage.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_owner_index() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let owner = UserId::new(3);

        storage.put(ChannelId::new(30), owner).await.unwrap();
        assert_eq!(
            storage.active_for_owner(owner).await.unwrap(),
            Some(ChannelId::new(30))
        );
        storage
            .set_status(ChannelId::new(30), Status::Closed)
            .await
            .unwrap();
        assert!(storage.active_for_owner(owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_archive_outlasts_status_writes() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let owner = UserId::new(4);
        let channel = ChannelId::new(40);
        storage.put(channel, owner).await.unwrap();

        assert!(storage.archive(channel).await.unwrap());
        storage.set_status(channel, Status::Open).await.unwrap();

        assert!(storage.active_for_owner(owner).await.unwrap().is_none());
        assert!(storage.get(channel).await.unwrap().unwrap().archived);
        assert!(!storage.archive(ChannelId::new(41)).await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tickets.db");

        let storage = SqliteStorage::open(&path).await.unwrap();
        storage.put(ChannelId::new(1), UserId::new(2)).await.unwrap();
        storage
            .set_status(ChannelId::new(1), Status::Resolved)
            .await
            .unwrap();
        storage.close().await;

        let reopened = SqliteStorage::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_status(ChannelId::new(1)).await.unwrap(),
            Status::Resolved
        );
    }
}
