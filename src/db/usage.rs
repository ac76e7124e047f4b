//! Usage event log
//!
//! Append-only record of quota-relevant actions. The quota engine reads it
//! through the `UsageLedger` trait so engine tests can run without a pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::quota::{Capability, LedgerError, UsageLedger};

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::new(err)
    }
}

/// `UsageLedger` backed by the `usage_events` table.
#[derive(Debug, Clone)]
pub struct SqliteUsageLedger {
    pool: SqlitePool,
}

impl SqliteUsageLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remove the usage rows tied to an expired file so lifetime counters
    /// free up alongside the artifact.
    pub async fn delete_for_file(&self, file_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM usage_events WHERE file_id = ?")
            .bind(file_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UsageLedger for SqliteUsageLedger {
    async fn count(
        &self,
        user_id: &str,
        capability: Capability,
        since: Option<DateTime<Utc>>,
    ) -> Result<u32, LedgerError> {
        // RFC 3339 timestamps sort lexicographically, so the window cutoff
        // is a plain string comparison.
        let count: i64 = match since {
            Some(cutoff) => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM usage_events
                    WHERE user_id = ? AND kind = ? AND created_at >= ?
                    "#,
                )
                .bind(user_id)
                .bind(capability.as_str())
                .bind(cutoff.to_rfc3339())
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM usage_events
                    WHERE user_id = ? AND kind = ?
                    "#,
                )
                .bind(user_id)
                .bind(capability.as_str())
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(count as u32)
    }

    async fn record(
        &self,
        user_id: &str,
        capability: Capability,
        file_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO usage_events (id, user_id, kind, file_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(capability.as_str())
        .bind(file_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::test_pool;

    async fn insert_at(pool: &SqlitePool, user_id: &str, kind: &str, created_at: &str) {
        sqlx::query(
            "INSERT INTO usage_events (id, user_id, kind, file_id, created_at) VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(kind)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn record_and_count_by_capability() {
        let pool = test_pool().await;
        let ledger = SqliteUsageLedger::new(pool);

        ledger.record("u1", Capability::Summary, Some("f1")).await.unwrap();
        ledger.record("u1", Capability::Chat, Some("f1")).await.unwrap();
        ledger.record("u2", Capability::Summary, None).await.unwrap();

        assert_eq!(ledger.count("u1", Capability::Summary, None).await.unwrap(), 1);
        assert_eq!(ledger.count("u1", Capability::Chat, None).await.unwrap(), 1);
        assert_eq!(ledger.count("u2", Capability::Chat, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn window_cutoff_excludes_older_events() {
        let pool = test_pool().await;
        let ledger = SqliteUsageLedger::new(pool.clone());

        let now = Utc::now();
        let old = (now - Duration::days(40)).to_rfc3339();
        let recent = (now - Duration::hours(1)).to_rfc3339();
        insert_at(&pool, "u1", "summary", &old).await;
        insert_at(&pool, "u1", "summary", &recent).await;

        let cutoff = now - Duration::days(30);
        assert_eq!(
            ledger.count("u1", Capability::Summary, Some(cutoff)).await.unwrap(),
            1
        );
        assert_eq!(ledger.count("u1", Capability::Summary, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_for_file_removes_only_that_files_rows() {
        let pool = test_pool().await;
        let ledger = SqliteUsageLedger::new(pool);

        ledger.record("u1", Capability::Summary, Some("f1")).await.unwrap();
        ledger.record("u1", Capability::Chat, Some("f1")).await.unwrap();
        ledger.record("u1", Capability::Chat, Some("f2")).await.unwrap();

        assert_eq!(ledger.delete_for_file("f1").await.unwrap(), 2);
        assert_eq!(ledger.count("u1", Capability::Chat, None).await.unwrap(), 1);
    }
}
