//! Session persistence for the web binaries.
//!
//! With `SESSION_DATABASE_URL` set, sessions live in `PostgreSQL` through
//! `tower-sessions-sqlx-store`; otherwise they are kept in process memory and
//! lost on restart.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use tower_sessions::MemoryStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

/// Session store selected at startup.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    Memory(MemoryStore),
    Postgres(PostgresStore),
}

impl Default for SessionBackend {
    fn default() -> Self {
        Self::Memory(MemoryStore::default())
    }
}

impl SessionBackend {
    /// Connect to the configured store.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the session database cannot be reached.
    pub async fn connect(database_url: Option<&SecretString>) -> Result<Self, sqlx::Error> {
        match database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .min_connections(1)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect(url.expose_secret())
                    .await?;
                info!("Using PostgreSQL session store");
                Ok(Self::Postgres(PostgresStore::new(pool)))
            }
            None => {
                info!("Using in-memory session store");
                Ok(Self::default())
            }
        }
    }

    /// Create the session table. A no-op for the memory store.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the migration fails.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(store) => store.migrate().await,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.create(record).await,
            Self::Postgres(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.save(record).await,
            Self::Postgres(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            Self::Memory(store) => store.load(session_id).await,
            Self::Postgres(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.delete(session_id).await,
            Self::Postgres(store) => store.delete(session_id).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_url_uses_memory_store() {
        let backend = SessionBackend::connect(None).await.unwrap();
        assert_eq!(backend.kind(), "memory");
        backend.migrate().await.unwrap();
    }
}
