//! Message store backed by sqlx.
//!
//! The store owns a single `messages` table. The schema is embedded from
//! `./migrations` at compile time and applied by [`MessageStore::connect`]
//! before any other store operation runs.
//!
//! Handlers never touch the pool directly: each request acquires a
//! [`Session`] which holds one pooled connection and returns it to the pool
//! when dropped, whether the request succeeded or not.

pub mod seed;
pub mod types;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use tracing::debug;

use crate::error::StoreError;

pub use seed::SEED_MESSAGES;
pub use types::{Message, NewMessage, DEFAULT_AUTHOR};

/// Handle to the message table. Cheap to clone.
#[derive(Clone, Debug)]
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Open a pool for `url` and apply pending migrations.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://observability.db?mode=rwc"`
    /// or `"sqlite::memory:"`. In-memory databases are private to a single
    /// connection, so callers using one should pass `max_connections = 1`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(StoreError::Connect)?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, applying pending migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("message schema ready");
        Ok(Self { pool })
    }

    /// Insert `messages` in order, in one transaction, iff the table is empty.
    ///
    /// Returns the number of rows inserted (zero when the table already had
    /// rows).
    pub async fn seed_if_empty(&self, messages: &[NewMessage]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM messages LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Ok(0);
        }

        for message in messages {
            if message.text.is_empty() {
                return Err(StoreError::EmptyText);
            }
            sqlx::query("INSERT INTO messages (text, author, created_at) VALUES (?1, ?2, ?3)")
                .bind(&message.text)
                .bind(message.author_or_default())
                .bind(chrono::Utc::now())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(messages.len())
    }

    /// Acquire a per-request session.
    pub async fn session(&self) -> Result<Session, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        Ok(Session { conn })
    }

    /// Look up a message without holding a session.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Message>, sqlx::Error> {
        self.session().await?.get_by_id(id).await
    }

    /// Number of stored messages.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
    }

    /// Close the underlying pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// One pooled connection, scoped to a single request.
pub struct Session {
    conn: PoolConnection<Sqlite>,
}

impl Session {
    /// Point lookup by primary key. A missing id is `Ok(None)`.
    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            "SELECT id, text, author, created_at FROM messages WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn memory_store() -> MessageStore {
        MessageStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn seed_inserts_fixed_messages_in_order() {
        let store = memory_store().await;

        let inserted = store.seed_if_empty(&seed::default_messages()).await.unwrap();
        assert_eq!(inserted, 10);
        assert_eq!(store.count().await.unwrap(), 10);

        for (idx, (text, author)) in SEED_MESSAGES.iter().enumerate() {
            let id = idx as i64 + 1;
            let msg = store.get_by_id(id).await.unwrap().unwrap();
            assert_eq!(msg.id, id);
            assert_eq!(msg.text, *text);
            assert_eq!(msg.author, *author);
        }
    }

    #[tokio::test]
    async fn seed_is_noop_when_table_has_rows() {
        let store = memory_store().await;
        store.seed_if_empty(&seed::default_messages()).await.unwrap();

        let inserted = store.seed_if_empty(&seed::default_messages()).await.unwrap();
        assert_eq!(inserted, 0);
        assert_eq!(store.count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn seed_defaults_author_to_system() {
        let store = memory_store().await;
        store
            .seed_if_empty(&[NewMessage::anonymous("no author here")])
            .await
            .unwrap();

        let msg = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(msg.author, DEFAULT_AUTHOR);
    }

    #[tokio::test]
    async fn seed_with_empty_text_rolls_back() {
        let store = memory_store().await;
        let batch = vec![NewMessage::new("first", "alice"), NewMessage::anonymous("")];

        let err = store.seed_if_empty(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyText));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_id_is_none() {
        let store = memory_store().await;
        store.seed_if_empty(&seed::default_messages()).await.unwrap();

        let mut session = store.session().await.unwrap();
        assert!(session.get_by_id(9999).await.unwrap().is_none());
        assert!(session.get_by_id(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_releases_connection_on_drop() {
        let store = memory_store().await;
        {
            let _session = store.session().await.unwrap();
        }
        // With a single-connection pool this would hang if the first
        // session had not been returned.
        let mut again = store.session().await.unwrap();
        assert!(again.get_by_id(1).await.unwrap().is_none());
    }
}
