//! Expired-file reclamation
//!
//! Uploaded documents live for 24 hours. An hourly background task deletes
//! expired PDFs and their summaries, removes the metadata rows, and cascades
//! into the usage log so lifetime counters free up with the file. Orphaned
//! blobs with no database row are swept by modification time.

use std::path::Path;

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{FileRepository, SqliteUsageLedger};
use crate::storage::FileStore;

/// How long an uploaded document is retained.
pub const FILE_EXPIRY_HOURS: i64 = 24;

/// Outcome of one reclamation sweep.
#[derive(Debug, Default, Serialize)]
pub struct CleanupReport {
    pub deleted_files: u32,
    pub deleted_summaries: u32,
    pub errors: Vec<String>,
}

/// Run one reclamation sweep. Failures on individual files are collected
/// rather than aborting the sweep.
pub async fn run_once(db: &SqlitePool, store: &FileStore) -> CleanupReport {
    let mut report = CleanupReport::default();
    let cutoff = Utc::now() - Duration::hours(FILE_EXPIRY_HOURS);
    let cutoff_str = cutoff.to_rfc3339();

    let repo = FileRepository::new(db);
    let ledger = SqliteUsageLedger::new(db.clone());

    let expired = match repo.expired_before(&cutoff_str).await {
        Ok(records) => records,
        Err(e) => {
            report.errors.push(format!("listing expired files: {e}"));
            return report;
        }
    };

    for record in expired {
        if let Err(e) = store.delete_pdf(&record.id).await {
            report.errors.push(format!("deleting pdf {}: {e}", record.id));
            continue;
        }
        report.deleted_files += 1;

        match store.delete_summary(&record.id).await {
            Ok(()) => report.deleted_summaries += 1,
            Err(e) => report
                .errors
                .push(format!("deleting summary {}: {e}", record.id)),
        }

        if let Err(e) = ledger.delete_for_file(&record.id).await {
            report
                .errors
                .push(format!("deleting usage rows for {}: {e}", record.id));
        }

        if let Err(e) = repo.delete(&record.id).await {
            report
                .errors
                .push(format!("deleting file row {}: {e}", record.id));
        }
    }

    // Blobs written but never registered (crash between save and insert)
    // are swept once they age out.
    sweep_orphans(store.uploads_dir(), &mut report).await;
    sweep_orphans(store.summaries_dir(), &mut report).await;

    if report.deleted_files > 0 || !report.errors.is_empty() {
        tracing::info!(
            deleted_files = report.deleted_files,
            deleted_summaries = report.deleted_summaries,
            errors = report.errors.len(),
            "cleanup sweep finished"
        );
    }

    report
}

async fn sweep_orphans(dir: &Path, report: &mut CleanupReport) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            report.errors.push(format!("reading {}: {e}", dir.display()));
            return;
        }
    };

    let max_age = std::time::Duration::from_secs(FILE_EXPIRY_HOURS as u64 * 3600);

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                report.errors.push(format!("scanning {}: {e}", dir.display()));
                break;
            }
        };

        let expired = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified
                .elapsed()
                .map(|age| age > max_age)
                .unwrap_or(false),
            Err(_) => false,
        };

        if expired {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                report
                    .errors
                    .push(format!("removing orphan {}: {e}", entry.path().display()));
            }
        }
    }
}

/// Spawn the hourly reclamation task.
pub fn start_cleanup_task(db: SqlitePool, store: FileStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            run_once(&db, &store).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::db::test_pool;
    use crate::quota::{Capability, UsageLedger};

    async fn test_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            summaries_dir: dir.path().join("summaries"),
        };
        let store = FileStore::new(&config).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn expired_file_is_fully_reclaimed() {
        let pool = test_pool().await;
        let (_dir, store) = test_store().await;

        let old = (Utc::now() - Duration::hours(30)).to_rfc3339();
        FileRepository::new(&pool)
            .create("f1", "u1", "old.pdf", 10, 1, &old)
            .await
            .unwrap();
        store.save_pdf("f1", b"%PDF-1.4").await.unwrap();

        let ledger = SqliteUsageLedger::new(pool.clone());
        ledger.record("u1", Capability::Summary, Some("f1")).await.unwrap();

        let report = run_once(&pool, &store).await;
        assert_eq!(report.deleted_files, 1);
        assert!(report.errors.is_empty());

        assert!(store.read_pdf("f1").await.is_err());
        assert!(FileRepository::new(&pool).get("f1").await.unwrap().is_none());
        assert_eq!(ledger.count("u1", Capability::Summary, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fresh_file_survives_a_sweep() {
        let pool = test_pool().await;
        let (_dir, store) = test_store().await;

        let recent = (Utc::now() - Duration::hours(1)).to_rfc3339();
        FileRepository::new(&pool)
            .create("f1", "u1", "fresh.pdf", 10, 1, &recent)
            .await
            .unwrap();
        store.save_pdf("f1", b"%PDF-1.4").await.unwrap();

        let report = run_once(&pool, &store).await;
        assert_eq!(report.deleted_files, 0);
        assert!(store.read_pdf("f1").await.is_ok());
    }

    #[tokio::test]
    async fn missing_blob_does_not_abort_the_sweep() {
        let pool = test_pool().await;
        let (_dir, store) = test_store().await;

        // Row exists but the blob was never written. delete_pdf treats a
        // missing file as success, so the row is still removed.
        let old = (Utc::now() - Duration::hours(48)).to_rfc3339();
        FileRepository::new(&pool)
            .create("ghost", "u1", "ghost.pdf", 10, 1, &old)
            .await
            .unwrap();

        let report = run_once(&pool, &store).await;
        assert_eq!(report.deleted_files, 1);
        assert!(FileRepository::new(&pool).get("ghost").await.unwrap().is_none());
    }
}
