//! libSQL-backed credential store.
//!
//! Tokens live in a small `credentials` key/value table. Schema changes are
//! version-tracked in `_migrations` and applied in order on open.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::credentials::{ACCESS_TOKEN_KEY, CredentialPair, CredentialStore, REFRESH_TOKEN_KEY};
use crate::error::StoreError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "credentials",
    sql: r#"
        CREATE TABLE IF NOT EXISTS credentials (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
}];

/// Durable credential store on a local libSQL file.
pub struct LibSqlCredentialStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlCredentialStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create credentials directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;
        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Credential store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;
        run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<SecretString>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT value FROM credentials WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("get {key}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("row parse: {e}")))?;
                Ok(Some(SecretString::from(value)))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get {key}: {e}"))),
        }
    }
}

const UPSERT: &str = "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3";

#[async_trait]
impl CredentialStore for LibSqlCredentialStore {
    async fn access_token(&self) -> Result<Option<SecretString>, StoreError> {
        self.get(ACCESS_TOKEN_KEY).await
    }

    async fn refresh_token(&self) -> Result<Option<SecretString>, StoreError> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    async fn save_tokens(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StoreError::Query(format!("save_tokens begin: {e}")))?;

        tx.execute(
            UPSERT,
            params![ACCESS_TOKEN_KEY, pair.access_token.expose_secret(), now.as_str()],
        )
        .await
        .map_err(|e| StoreError::Query(format!("save_tokens access: {e}")))?;
        tx.execute(
            UPSERT,
            params![REFRESH_TOKEN_KEY, pair.refresh_token.expose_secret(), now.as_str()],
        )
        .await
        .map_err(|e| StoreError::Query(format!("save_tokens refresh: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("save_tokens commit: {e}")))?;
        Ok(())
    }

    async fn save_access_token(&self, token: &SecretString) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                UPSERT,
                params![ACCESS_TOKEN_KEY, token.expose_secret(), now.as_str()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_access_token: {e}")))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "DELETE FROM credentials WHERE key IN (?1, ?2)",
                params![ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY],
            )
            .await
            .map_err(|e| StoreError::Query(format!("clear: {e}")))?;
        Ok(())
    }
}

/// Run all pending migrations against the given connection.
async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| StoreError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                StoreError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            conn.execute(
                "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )
            .await
            .map_err(|e| {
                StoreError::Migration(format!("Failed to record migration V{}: {e}", migration.version))
            })?;
        }
    }

    Ok(())
}

/// Highest applied migration version, or 0 if none.
async fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StoreError::Migration(format!("Failed to query migration version: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| StoreError::Migration(format!("Failed to parse migration version: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(StoreError::Migration(format!(
            "Failed to read migration version: {e}"
        ))),
    }
}
