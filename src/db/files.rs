//! Uploaded-file metadata
//!
//! One row per uploaded PDF. The row id doubles as the storage key in the
//! artifact store.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// Metadata for an uploaded PDF
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub file_size: i64,
    pub num_pages: i64,
    pub created_at: String,
}

/// File metadata repository
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: &str,
        user_id: &str,
        file_name: &str,
        file_size: i64,
        num_pages: i64,
        created_at: &str,
    ) -> Result<FileRecord> {
        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, file_name, file_size, num_pages, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(file_name)
        .bind(file_size)
        .bind(num_pages)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(FileRecord {
            id: id.to_string(),
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            file_size,
            num_pages,
            created_at: created_at.to_string(),
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, file_name, file_size, num_pages, created_at
            FROM files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, file_name, file_size, num_pages, created_at
            FROM files
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    /// Files uploaded before the cutoff, due for reclamation.
    pub async fn expired_before(&self, cutoff_rfc3339: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, user_id, file_name, file_size, num_pages, created_at
            FROM files
            WHERE created_at < ?
            "#,
        )
        .bind(cutoff_rfc3339)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn create_get_list() {
        let pool = test_pool().await;
        let repo = FileRepository::new(&pool);

        let now = Utc::now().to_rfc3339();
        repo.create("f1", "u1", "report.pdf", 1024, 3, &now).await.unwrap();
        repo.create("f2", "u1", "notes.pdf", 2048, 7, &now).await.unwrap();
        repo.create("f3", "u2", "other.pdf", 512, 1, &now).await.unwrap();

        let record = repo.get("f1").await.unwrap().unwrap();
        assert_eq!(record.file_name, "report.pdf");
        assert_eq!(record.num_pages, 3);

        let mine = repo.list_for_user("u1").await.unwrap();
        assert_eq!(mine.len(), 2);

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_before_selects_only_old_rows() {
        let pool = test_pool().await;
        let repo = FileRepository::new(&pool);

        let now = Utc::now();
        let old = (now - Duration::hours(30)).to_rfc3339();
        let fresh = (now - Duration::hours(2)).to_rfc3339();
        repo.create("old", "u1", "old.pdf", 10, 1, &old).await.unwrap();
        repo.create("fresh", "u1", "fresh.pdf", 10, 1, &fresh).await.unwrap();

        let cutoff = (now - Duration::hours(24)).to_rfc3339();
        let expired = repo.expired_before(&cutoff).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "old");
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_missing_rows() {
        let pool = test_pool().await;
        let repo = FileRepository::new(&pool);

        let now = Utc::now().to_rfc3339();
        repo.create("f1", "u1", "a.pdf", 10, 1, &now).await.unwrap();

        assert!(repo.delete("f1").await.unwrap());
        assert!(!repo.delete("f1").await.unwrap());
    }
}
