//! GFS 10 m wind ingestion.
//!
//! This crate wires the pipeline together:
//! - Resolve the latest published forecast cycle
//! - Download each (cycle, lead hour) grid file
//! - Extract wind records and stage them as parquet
//! - Bulk load the staged run into the warehouse
//!
//! Local raw files are removed on every exit path by [`LocalArtifactGuard`].

pub mod cleanup;
pub mod cycle_resolver;
pub mod download;
pub mod error;
pub mod pipeline;

pub use cleanup::LocalArtifactGuard;
pub use cycle_resolver::{
    AvailabilityProbe, CycleResolution, CycleResolver, HttpProbe, ResolverConfig,
};
pub use download::{DownloadConfig, GridFetcher, HttpDownloader};
pub use error::{IngestionError, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutcome, PipelineReport, Stage};
