//! External reference repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{ExternalReference, ResourceType};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// Mapping between pointer file paths and remote resource ids.
///
/// `local_path` is unique; uniqueness is enforced by the database, never by a
/// read-before-write check.
#[async_trait]
pub trait ExternalFileRepository: Send + Sync {
    /// Record a new mapping.
    ///
    /// # Errors
    /// [`LibraryError::DuplicatePath`] if `local_path` is already mapped.
    async fn add(
        &self,
        resource_type: ResourceType,
        local_path: &str,
        remote_id: &str,
    ) -> Result<ExternalReference>;

    async fn get_by_path(&self, local_path: &str) -> Result<Option<ExternalReference>>;

    /// First mapping for `remote_id`; a remote id may be linked from several paths.
    async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<ExternalReference>>;

    /// All mappings of one type, newest first.
    async fn list_by_type(&self, resource_type: ResourceType) -> Result<Vec<ExternalReference>>;

    async fn count_by_type(&self, resource_type: ResourceType) -> Result<i64>;

    /// Move a mapping to `new_path`.
    ///
    /// Succeeds without effect when `old_path` is not mapped.
    ///
    /// # Errors
    /// [`LibraryError::DuplicatePath`] if `new_path` is already mapped.
    async fn update_path(&self, old_path: &str, new_path: &str) -> Result<()>;

    /// Remove the mapping for `local_path`, if any.
    async fn remove(&self, local_path: &str) -> Result<()>;

    async fn is_external(&self, local_path: &str) -> Result<bool>;
}

/// SQLite implementation of [`ExternalFileRepository`]
#[derive(Clone)]
pub struct SqliteExternalFileRepository {
    pool: SqlitePool,
}

impl SqliteExternalFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(LibraryError::InvalidInput {
                field: field.to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "SELECT id, type, path, file_id, created_at FROM external_files";

fn row_to_reference(row: &SqliteRow) -> Result<ExternalReference> {
    let type_value: String = row.try_get("type")?;
    let resource_type = type_value
        .parse::<ResourceType>()
        .map_err(|message| LibraryError::InvalidInput {
            field: "type".to_string(),
            message,
        })?;

    Ok(ExternalReference {
        id: row.try_get("id")?,
        resource_type,
        local_path: row.try_get("path")?,
        remote_id: row.try_get("file_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ExternalFileRepository for SqliteExternalFileRepository {
    async fn add(
        &self,
        resource_type: ResourceType,
        local_path: &str,
        remote_id: &str,
    ) -> Result<ExternalReference> {
        Self::validate("path", local_path)?;
        Self::validate("file_id", remote_id)?;

        let created_at = Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO external_files (type, path, file_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(resource_type.as_str())
        .bind(local_path)
        .bind(remote_id)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LibraryError::from_write(e, local_path))?;

        info!(
            resource_type = %resource_type,
            remote_id = remote_id,
            "External reference added"
        );

        Ok(ExternalReference {
            id: result.last_insert_rowid(),
            resource_type,
            local_path: local_path.to_string(),
            remote_id: remote_id.to_string(),
            created_at,
        })
    }

    async fn get_by_path(&self, local_path: &str) -> Result<Option<ExternalReference>> {
        let row = sqlx::query(&format!("{} WHERE path = ?", SELECT_COLUMNS))
            .bind(local_path)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_reference).transpose()
    }

    async fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<ExternalReference>> {
        let row = sqlx::query(&format!(
            "{} WHERE file_id = ? ORDER BY id LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(remote_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_reference).transpose()
    }

    async fn list_by_type(&self, resource_type: ResourceType) -> Result<Vec<ExternalReference>> {
        let rows = sqlx::query(&format!(
            "{} WHERE type = ? ORDER BY created_at DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(resource_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(resource_type = %resource_type, count = rows.len(), "Listed external references");
        rows.iter().map(row_to_reference).collect()
    }

    async fn count_by_type(&self, resource_type: ResourceType) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM external_files WHERE type = ?")
            .bind(resource_type.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_path(&self, old_path: &str, new_path: &str) -> Result<()> {
        Self::validate("path", new_path)?;

        let result = sqlx::query("UPDATE external_files SET path = ? WHERE path = ?")
            .bind(new_path)
            .bind(old_path)
            .execute(&self.pool)
            .await
            .map_err(|e| LibraryError::from_write(e, new_path))?;

        debug!(moved = result.rows_affected(), "External reference path updated");
        Ok(())
    }

    async fn remove(&self, local_path: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM external_files WHERE path = ?")
            .bind(local_path)
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "External reference removed");
        Ok(())
    }

    async fn is_external(&self, local_path: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM external_files WHERE path = ?")
            .bind(local_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
