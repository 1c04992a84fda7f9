//! Object storage interface for staged batches (S3/MinIO compatible, or a local directory).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};

/// Configuration for the staging object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectStorageConfig {
    /// S3 or an S3-compatible endpoint.
    S3 {
        bucket: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
        #[serde(default)]
        session_token: Option<String>,
        /// Custom endpoint URL (MinIO). `None` uses AWS.
        #[serde(default)]
        endpoint: Option<String>,
        /// Allow HTTP (for local MinIO)
        #[serde(default)]
        allow_http: bool,
    },
    /// A directory on the local filesystem.
    Local { root: PathBuf },
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self::S3 {
            bucket: "gfs-staging".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
            endpoint: None,
            allow_http: false,
        }
    }
}

/// Where a store lives, used to render externally visible URLs.
#[derive(Debug, Clone)]
enum StoreLocation {
    Bucket(String),
    Directory(PathBuf),
}

/// A key prefix rendered both as a store path and as an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub key: String,
    pub url: String,
}

/// Object storage client for staged batches.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    location: StoreLocation,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        match config {
            ObjectStorageConfig::S3 {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                session_token,
                endpoint,
                allow_http,
            } => {
                if bucket.trim().is_empty() {
                    return Err(StorageError::Config("bucket name is empty".to_string()));
                }

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(bucket)
                    .with_access_key_id(access_key_id)
                    .with_secret_access_key(secret_access_key)
                    .with_region(region);

                if let Some(token) = session_token {
                    builder = builder.with_token(token);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if *allow_http {
                    builder = builder.with_allow_http(true);
                }

                let store = builder.build().map_err(|e| {
                    StorageError::Config(format!("Failed to create S3 client: {}", e))
                })?;

                Ok(Self {
                    store: Arc::new(store),
                    location: StoreLocation::Bucket(bucket.clone()),
                })
            }
            ObjectStorageConfig::Local { root } => {
                std::fs::create_dir_all(root)?;
                let root = std::fs::canonicalize(root)?;
                let store = LocalFileSystem::new_with_prefix(&root).map_err(|e| {
                    StorageError::Config(format!(
                        "Failed to open local store at {}: {}",
                        root.display(),
                        e
                    ))
                })?;

                Ok(Self {
                    store: Arc::new(store),
                    location: StoreLocation::Directory(root),
                })
            }
        }
    }

    /// Short label for logs: bucket name or root directory.
    pub fn label(&self) -> String {
        match &self.location {
            StoreLocation::Bucket(bucket) => bucket.clone(),
            StoreLocation::Directory(root) => root.display().to_string(),
        }
    }

    /// Absolute URL of a key prefix, always ending in `/`.
    ///
    /// `s3://bucket/prefix/` for S3 and `/abs/root/prefix/` for a local store.
    pub fn prefix_url(&self, prefix: &str) -> StoragePath {
        let key = prefix.trim_matches('/').to_string();
        let url = match &self.location {
            StoreLocation::Bucket(bucket) if key.is_empty() => format!("s3://{}/", bucket),
            StoreLocation::Bucket(bucket) => format!("s3://{}/{}/", bucket, key),
            StoreLocation::Directory(root) => {
                let mut dir = root.join(&key).display().to_string();
                if !dir.ends_with('/') {
                    dir.push('/');
                }
                dir
            }
        };
        StoragePath { key, url }
    }

    /// Absolute URL of a single object.
    pub fn object_url(&self, path: &str) -> String {
        let key = path.trim_start_matches('/');
        match &self.location {
            StoreLocation::Bucket(bucket) => format!("s3://{}/{}", bucket, key),
            StoreLocation::Directory(root) => root.join(key).display().to_string(),
        }
    }

    /// Write bytes to a path. The object becomes visible only once fully written.
    #[instrument(skip(self, data), fields(store = %self.label(), path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data)
            .await
            .map_err(|e| StorageError::Upload {
                key: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(store = %self.label(), path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| StorageError::Object(format!("Failed to read {}: {}", path, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::Object(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Object(format!(
                "Failed to check {}: {}",
                path, e
            ))),
        }
    }

    /// List objects with a given prefix.
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        loop {
            match stream.try_next().await {
                Ok(Some(meta)) => paths.push(meta.location.to_string()),
                Ok(None) => break,
                // A prefix that was never written lists as empty
                Err(object_store::Error::NotFound { .. }) => break,
                Err(e) => return Err(StorageError::Object(format!("List failed: {}", e))),
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Delete an object. Deleting a missing object is not an error.
    #[instrument(skip(self), fields(store = %self.label(), path = %path))]
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = Path::from(path);

        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::Object(format!(
                "Failed to delete {}: {}",
                path, e
            ))),
        }
    }

    /// Delete every object under a prefix. Returns the number removed.
    #[instrument(skip(self), fields(store = %self.label()))]
    pub async fn purge_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let keys = self.list(prefix).await?;
        for key in &keys {
            self.delete(key).await?;
        }
        debug!(removed = keys.len(), "Purged prefix");
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3(bucket: &str) -> ObjectStorage {
        ObjectStorage::new(&ObjectStorageConfig::S3 {
            bucket: bucket.to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            endpoint: None,
            allow_http: false,
        })
        .unwrap()
    }

    #[test]
    fn test_s3_prefix_url_has_trailing_slash() {
        let storage = s3("wx-bucket");
        let path = storage.prefix_url("gfs/run_20240101T000000_abcd1234");
        assert_eq!(path.key, "gfs/run_20240101T000000_abcd1234");
        assert_eq!(path.url, "s3://wx-bucket/gfs/run_20240101T000000_abcd1234/");

        assert_eq!(storage.prefix_url("/gfs/").url, "s3://wx-bucket/gfs/");
        assert_eq!(storage.prefix_url("").url, "s3://wx-bucket/");
        assert_eq!(
            storage.object_url("gfs/a.parquet"),
            "s3://wx-bucket/gfs/a.parquet"
        );
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let result = ObjectStorage::new(&ObjectStorageConfig::S3 {
            bucket: " ".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
            endpoint: None,
            allow_http: false,
        });
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[test]
    fn test_local_prefix_url_is_absolute_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::new(&ObjectStorageConfig::Local {
            root: dir.path().join("stage"),
        })
        .unwrap();

        let path = storage.prefix_url("gfs/run_x");
        assert!(path.url.starts_with('/'));
        assert!(path.url.ends_with("/stage/gfs/run_x/"));
    }

    #[tokio::test]
    async fn test_local_put_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::new(&ObjectStorageConfig::Local {
            root: dir.path().to_path_buf(),
        })
        .unwrap();

        storage.put("run/b.parquet", Bytes::from_static(b"b")).await.unwrap();
        storage.put("run/a.parquet", Bytes::from_static(b"a")).await.unwrap();
        storage.put("other/c.parquet", Bytes::from_static(b"c")).await.unwrap();

        assert_eq!(
            storage.list("run").await.unwrap(),
            vec!["run/a.parquet".to_string(), "run/b.parquet".to_string()]
        );
        assert_eq!(storage.get("run/a.parquet").await.unwrap(), Bytes::from_static(b"a"));

        assert_eq!(storage.purge_prefix("run").await.unwrap(), 2);
        assert!(!storage.exists("run/a.parquet").await.unwrap());
        assert!(storage.exists("other/c.parquet").await.unwrap());

        // Idempotent
        storage.delete("run/a.parquet").await.unwrap();
        assert!(storage.list("never-written").await.unwrap().is_empty());
    }
}
