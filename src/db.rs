use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::program_store::ProgramStore;
use crate::routine_store::RoutineStore;

pub type DbPool = SqlitePool;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Failed to serialize {key}: {source}")]
  Serialize {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to deserialize {key}: {source}")]
  Deserialize {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Store lock poisoned")]
  Poisoned,
}

/// ---------------------------------------------------------------------------
/// Key-Value Store
/// ---------------------------------------------------------------------------

/// Opaque persisted key-value store the program and routine stores sit on
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read a JSON array stored under `key`; a missing key is an empty list
pub async fn load_json_list<T>(kv: &dyn KeyValueStore, key: &str) -> Result<Vec<T>, StorageError>
where
  T: serde::de::DeserializeOwned,
{
  match kv.get(key).await? {
    Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Deserialize {
      key: key.to_string(),
      source,
    }),
    None => Ok(Vec::new()),
  }
}

/// Write a full JSON array under `key`
pub async fn save_json_list<T>(
  kv: &dyn KeyValueStore,
  key: &str,
  items: &[T],
) -> Result<(), StorageError>
where
  T: serde::Serialize,
{
  let raw = serde_json::to_string(items).map_err(|source| StorageError::Serialize {
    key: key.to_string(),
    source,
  })?;
  kv.set(key, &raw).await
}

/// SQLite-backed store: one row per key in `kv_store`
#[derive(Clone)]
pub struct SqliteKvStore {
  pool: DbPool,
}

impl SqliteKvStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?1")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    sqlx::query(
      r#"
      INSERT INTO kv_store (key, value, updated_at)
      VALUES (?1, ?2, CURRENT_TIMESTAMP)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(key)
    .bind(value)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

/// In-process store, used as the test double
#[derive(Default)]
pub struct MemoryKvStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
  async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// ---------------------------------------------------------------------------
/// Application State
/// ---------------------------------------------------------------------------

/// Application state holding the database pool and the stores built on it
pub struct AppState {
  pub db: DbPool,
  pub programs: ProgramStore,
  pub routines: RoutineStore,
}

impl AppState {
  pub fn new(db: DbPool) -> Self {
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(db.clone()));
    Self {
      db,
      programs: ProgramStore::new(kv.clone()),
      routines: RoutineStore::new(kv),
    }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(db_path: &Path) -> Result<DbPool, StorageError> {
  // Create directory if it doesn't exist
  if let Some(dir) = db_path.parent() {
    fs::create_dir_all(dir)?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
  tracing::info!(path = %db_path.display(), "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::debug!("Database migrations applied");

  Ok(pool)
}
