//! Staging uploader: one parquet object per (cycle, lead hour) batch.
//!
//! Every pipeline run writes under its own prefix
//! `<base>/run_<YYYYMMDDTHHMMSS>_<id>/`, so two runs never share staged
//! objects and the warehouse external reference can point at exactly one run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use gfs_common::{ForecastCycle, WindRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::object_store::{ObjectStorage, StoragePath};
use crate::parquet::encode_records;

/// A batch that has been fully uploaded to the staging store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedObject {
    /// Store key, relative to the bucket or store root.
    pub key: String,
    /// Absolute URL of the object.
    pub url: String,
    pub rows: usize,
    pub bytes: u64,
}

/// Removes a local scratch file when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "Failed to remove scratch file"),
        }
    }
}

pub struct StagingUploader {
    storage: Arc<ObjectStorage>,
    prefix: StoragePath,
    work_dir: PathBuf,
}

impl StagingUploader {
    /// Create an uploader writing under a fresh run prefix below `base_prefix`.
    pub fn new(
        storage: Arc<ObjectStorage>,
        base_prefix: &str,
        work_dir: impl Into<PathBuf>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let run_prefix = Self::run_prefix(base_prefix, started_at);
        Self::with_prefix(storage, &run_prefix, work_dir)
    }

    /// Create an uploader writing under an explicit prefix.
    pub fn with_prefix(
        storage: Arc<ObjectStorage>,
        prefix: &str,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        let prefix = storage.prefix_url(prefix);
        Self {
            storage,
            prefix,
            work_dir: work_dir.into(),
        }
    }

    /// `<base>/run_<YYYYMMDDTHHMMSS>_<8 hex chars>`
    pub fn run_prefix(base_prefix: &str, started_at: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let run = format!("run_{}_{}", started_at.format("%Y%m%dT%H%M%S"), &id[..8]);

        let base = base_prefix.trim_matches('/');
        if base.is_empty() {
            run
        } else {
            format!("{}/{}", base, run)
        }
    }

    /// `<YYYYMMDD>_<RR>_<LLL>.parquet`
    pub fn object_name(cycle: &ForecastCycle, lead_hour: u16) -> String {
        format!("{}_{}_{:03}.parquet", cycle.date_key(), cycle.run, lead_hour)
    }

    /// The run prefix this uploader writes to.
    pub fn prefix(&self) -> &StoragePath {
        &self.prefix
    }

    pub fn storage(&self) -> &Arc<ObjectStorage> {
        &self.storage
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Encode `records` to a local parquet file, upload it as `<prefix>/<name>`
    /// and remove the local file.
    ///
    /// The local file is removed whether or not the upload succeeds. Object
    /// writes are all-or-nothing, so a failed upload leaves no partial object.
    #[instrument(skip(self, records), fields(prefix = %self.prefix.key, rows = records.len()))]
    pub async fn stage(&self, records: &[WindRecord], name: &str) -> StorageResult<StagedObject> {
        let encoded = encode_records(records)?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = ScratchFile(self.work_dir.join(name));
        tokio::fs::write(&scratch.0, &encoded).await?;

        let data = Bytes::from(tokio::fs::read(&scratch.0).await?);
        let size = data.len() as u64;

        let key = if self.prefix.key.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix.key, name)
        };
        let uploaded = self.storage.put(&key, data).await;
        drop(scratch);
        uploaded?;

        let staged = StagedObject {
            url: self.storage.object_url(&key),
            key,
            rows: records.len(),
            bytes: size,
        };
        info!(key = %staged.key, rows = staged.rows, bytes = staged.bytes, "Staged batch");
        Ok(staged)
    }

    /// Delete the given staged objects. Returns the number deleted.
    #[instrument(skip(self, objects), fields(count = objects.len()))]
    pub async fn purge(&self, objects: &[StagedObject]) -> StorageResult<usize> {
        for object in objects {
            self.storage.delete(&object.key).await?;
        }
        info!(removed = objects.len(), "Purged staged objects");
        Ok(objects.len())
    }

    /// Delete everything under this uploader's run prefix.
    pub async fn purge_run(&self) -> StorageResult<usize> {
        self.storage.purge_prefix(&self.prefix.key).await
    }
}
