//! Storage for staged wind record batches.
//!
//! Provides:
//! - Object storage (S3/MinIO or a local directory) for staged parquet objects
//! - Parquet encoding of [`WindRecord`](gfs_common::WindRecord) batches
//! - The staging uploader that writes, uploads and purges batches

pub mod error;
pub mod object_store;
pub mod parquet;
pub mod staging;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath};
pub use error::{StorageError, StorageResult};
pub use staging::{StagedObject, StagingUploader};
