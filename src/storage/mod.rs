//! Artifact store
//!
//! Filesystem-keyed storage for uploaded PDFs and their derived summary
//! blobs. The store itself has no notion of expiry; the 24-hour lifetime is
//! enforced by the reclamation job in `cleanup`. Concurrent readers are safe;
//! a read racing a concurrent delete fails with `NotFound`, which callers
//! treat as an expired artifact.

mod types;

pub use types::{StorageError, SummaryDocument};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::StorageConfig;

/// Local filesystem store for uploaded PDFs and summary blobs.
#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
    summaries_dir: PathBuf,
}

impl FileStore {
    /// Create the store, ensuring both directories exist.
    pub async fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&config.uploads_dir).await?;
        tokio::fs::create_dir_all(&config.summaries_dir).await?;

        Ok(Self {
            uploads_dir: config.uploads_dir.clone(),
            summaries_dir: config.summaries_dir.clone(),
        })
    }

    /// Generate an opaque artifact id, used as the storage key.
    pub fn new_file_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn summaries_dir(&self) -> &Path {
        &self.summaries_dir
    }

    fn pdf_path(&self, file_id: &str) -> PathBuf {
        self.uploads_dir.join(format!("{file_id}.pdf"))
    }

    fn summary_path(&self, file_id: &str) -> PathBuf {
        self.summaries_dir.join(format!("{file_id}.json"))
    }

    pub async fn save_pdf(&self, file_id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        tokio::fs::write(self.pdf_path(file_id), bytes).await?;
        Ok(())
    }

    pub async fn read_pdf(&self, file_id: &str) -> Result<Vec<u8>, StorageError> {
        read_or_not_found(&self.pdf_path(file_id), file_id).await
    }

    pub async fn delete_pdf(&self, file_id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.pdf_path(file_id)).await
    }

    pub async fn save_summary(
        &self,
        file_id: &str,
        summary: &SummaryDocument,
    ) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(summary)?;
        tokio::fs::write(self.summary_path(file_id), content).await?;
        Ok(())
    }

    pub async fn read_summary(&self, file_id: &str) -> Result<SummaryDocument, StorageError> {
        let bytes = read_or_not_found(&self.summary_path(file_id), file_id).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn delete_summary(&self, file_id: &str) -> Result<(), StorageError> {
        remove_if_present(&self.summary_path(file_id)).await
    }
}

async fn read_or_not_found(path: &Path, key: &str) -> Result<Vec<u8>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(StorageError::NotFound(key.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a file, treating "already gone" as success.
async fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
