//! Token Blacklist
//! Mission: Remember revoked tokens until they would have expired anyway

use crate::db::open_connection;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::params;
use tracing::{debug, info};

/// A token revoked before its natural expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistEntry {
    pub token: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Entries stop mattering once the token itself would be rejected as expired
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Revoked-token storage.
///
/// `is_blacklisted` must ignore entries whose expiry has passed whether or
/// not `cleanup` has run.
pub trait TokenBlacklist: Send + Sync {
    fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()>;
    fn is_blacklisted(&self, token: &str) -> Result<bool>;
    /// Purge dead entries, returning how many were removed
    fn cleanup(&self) -> Result<usize>;
}

/// Blacklist persisted in the shared SQLite database
pub struct SqliteTokenBlacklist {
    db_path: String,
}

impl SqliteTokenBlacklist {
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS token_blacklist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_token_blacklist_token ON token_blacklist(token);
            CREATE INDEX IF NOT EXISTS idx_token_blacklist_user_id ON token_blacklist(user_id);
            CREATE INDEX IF NOT EXISTS idx_token_blacklist_expires_at ON token_blacklist(expires_at);",
        )
        .context("Failed to create token_blacklist table")?;
        Ok(())
    }

    /// Number of rows physically present, dead or alive
    pub fn row_count(&self) -> Result<usize> {
        let conn = open_connection(&self.db_path)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM token_blacklist", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl TokenBlacklist for SqliteTokenBlacklist {
    fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = open_connection(&self.db_path)?;
        conn.execute(
            "INSERT INTO token_blacklist (token, user_id, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![token, user_id, expires_at.timestamp(), Utc::now()],
        )
        .context("Failed to blacklist token")?;

        debug!("Blacklisted token for user {} until {}", user_id, expires_at);
        Ok(())
    }

    fn is_blacklisted(&self, token: &str) -> Result<bool> {
        let conn = open_connection(&self.db_path)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM token_blacklist WHERE token = ?1 AND expires_at > ?2",
                params![token, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .context("Failed to check token blacklist")?;
        Ok(count > 0)
    }

    fn cleanup(&self) -> Result<usize> {
        let conn = open_connection(&self.db_path)?;
        let removed = conn
            .execute(
                "DELETE FROM token_blacklist WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
            .context("Failed to clean up token blacklist")?;

        if removed > 0 {
            info!("Purged {} expired blacklist entries", removed);
        }
        Ok(removed)
    }
}

/// Process-local blacklist, used where no database is wanted (tests, tooling)
#[derive(Default)]
pub struct MemoryTokenBlacklist {
    entries: Mutex<Vec<BlacklistEntry>>,
}

impl MemoryTokenBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl TokenBlacklist for MemoryTokenBlacklist {
    fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries.lock().push(BlacklistEntry {
            token: token.to_string(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn is_blacklisted(&self, token: &str) -> Result<bool> {
        let now = Utc::now();
        Ok(self
            .entries
            .lock()
            .iter()
            .any(|entry| entry.token == token && entry.is_live_at(now)))
    }

    fn cleanup(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| entry.is_live_at(now));
        Ok(before - entries.len())
    }
}
