//! File metadata types and repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

/// Metadata for one stored file.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FileRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// File name (unique).
    pub name: String,
    /// Location assigned by the blob store.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Candidate record for an upload, before the blob has a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    /// File name.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
}

impl NewFile {
    /// Create a new NewFile.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Metadata store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the name.
    #[error("no file record named {0}")]
    NotFound(String),

    /// The unique-name constraint rejected an insert.
    #[error("a file record named {0} already exists")]
    Conflict(String),

    /// Any other database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// CRUD over file records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// All records in insertion order. Every call runs a fresh query.
    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError>;

    /// Look up a record by name; zero rows is [`StoreError::NotFound`].
    async fn find_by_name(&self, name: &str) -> Result<FileRecord, StoreError>;

    /// Insert a record with the blob location and return it with its id
    /// and timestamps. A duplicate name is [`StoreError::Conflict`].
    async fn create(&self, file: &NewFile, path: &str) -> Result<FileRecord, StoreError>;

    /// Remove a record by name; true when a row was deleted.
    async fn delete_by_name(&self, name: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed repository for file records.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new FileRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for FileRepository {
    async fn list_all(&self) -> Result<Vec<FileRecord>, StoreError> {
        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT id, name, path, size, created_at, updated_at FROM files ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn find_by_name(&self, name: &str) -> Result<FileRecord, StoreError> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, name, path, size, created_at, updated_at FROM files WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn create(&self, file: &NewFile, path: &str) -> Result<FileRecord, StoreError> {
        let size = i64::try_from(file.size)
            .map_err(|e| StoreError::Database(sqlx::Error::Encode(e.into())))?;
        let now = Utc::now();

        // Insert and read back in one statement: an Err means no row was written.
        sqlx::query_as::<_, FileRecord>(
            "INSERT INTO files (name, path, size, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, name, path, size, created_at, updated_at",
        )
        .bind(&file.name)
        .bind(path)
        .bind(size)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(file.name.clone())
            }
            other => StoreError::Database(other),
        })
    }

    async fn delete_by_name(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM files WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
