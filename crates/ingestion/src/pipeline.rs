//! Pipeline driver.
//!
//! One run walks these stages:
//!
//! ```text
//! Idle → ResolvingCycle → (Extracting → Staging)* → TableEnsure
//!      → ExternalBind → Loading → Cleanup → Done
//! ```
//!
//! A failed external bind ends in `Failed` with [`PipelineOutcome::BindFailed`];
//! any download, decode, upload or load error ends in `Failed` and is returned
//! as an error. Local raw files are swept on every path.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use gfs_common::{ForecastCycle, GfsSource};
use grib_extract::{GridDecoder, GridExtractor};
use serde::{Deserialize, Serialize};
use storage::{StagedObject, StagingUploader};
use tracing::{error, info, instrument, warn};
use warehouse::WarehouseLoader;

use crate::cleanup::LocalArtifactGuard;
use crate::cycle_resolver::{CycleResolution, CycleResolver};
use crate::download::GridFetcher;
use crate::error::{IngestionError, Result};

/// Pipeline run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: GfsSource,
    /// Directory for raw downloads and parquet scratch files
    pub work_dir: PathBuf,
    /// Last lead hour processed per cycle, inclusive
    pub max_lead_hour: u16,
    /// Inclusive issue-date range. `None` processes only the latest published cycle.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: GfsSource::default(),
            work_dir: PathBuf::from("."),
            max_lead_hour: 5,
            date_range: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some((start, end)) = self.date_range {
            if end < start {
                return Err(IngestionError::InvalidConfig(format!(
                    "end date {} is before start date {}",
                    end, start
                )));
            }
        }
        if self.source.resolution.trim().is_empty() {
            return Err(IngestionError::InvalidConfig(
                "resolution must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    ResolvingCycle,
    Extracting,
    Staging,
    TableEnsure,
    ExternalBind,
    Loading,
    Cleanup,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    /// Every staged row was inserted into the forecast table.
    Loaded,
    /// The external reference could not be created; nothing was inserted.
    BindFailed,
}

impl PipelineOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            PipelineOutcome::Loaded => 0,
            PipelineOutcome::BindFailed => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Stages in the order they were entered, without consecutive repeats.
    pub stages: Vec<Stage>,
    pub resolution: Option<CycleResolution>,
    pub cycles: Vec<ForecastCycle>,
    pub staged: Vec<StagedObject>,
    pub rows: usize,
    pub outcome: Option<PipelineOutcome>,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Idle],
            resolution: None,
            cycles: Vec::new(),
            staged: Vec::new(),
            rows: 0,
            outcome: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        if self.stages.last() != Some(&stage) {
            info!(stage = ?stage, "Entering stage");
            self.stages.push(stage);
        }
    }

    pub fn current(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    resolver: CycleResolver,
    fetcher: Arc<dyn GridFetcher>,
    extractor: Arc<GridExtractor<Arc<dyn GridDecoder>>>,
    uploader: StagingUploader,
    loader: WarehouseLoader,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        resolver: CycleResolver,
        fetcher: Arc<dyn GridFetcher>,
        decoder: Arc<dyn GridDecoder>,
        uploader: StagingUploader,
        loader: WarehouseLoader,
    ) -> Self {
        Self {
            config,
            resolver,
            fetcher,
            extractor: Arc::new(GridExtractor::new(decoder)),
            uploader,
            loader,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once. `now` anchors latest-cycle resolution.
    #[instrument(skip(self), fields(work_dir = %self.config.work_dir.display()))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<PipelineReport> {
        self.config.validate()?;

        let mut report = PipelineReport::new();
        let guard = LocalArtifactGuard::new(&self.config.work_dir);

        let result = self.execute(now, &mut report).await;

        report.enter(Stage::Cleanup);
        drop(guard);

        match result {
            Ok(outcome) => {
                report.outcome = Some(outcome);
                match outcome {
                    PipelineOutcome::Loaded => report.enter(Stage::Done),
                    PipelineOutcome::BindFailed => report.enter(Stage::Failed),
                }
                info!(
                    outcome = ?outcome,
                    staged = report.staged.len(),
                    rows = report.rows,
                    "Pipeline finished"
                );
                Ok(report)
            }
            Err(e) => {
                report.enter(Stage::Failed);
                error!(error = %e, staged = report.staged.len(), "Pipeline failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        report: &mut PipelineReport,
    ) -> Result<PipelineOutcome> {
        report.enter(Stage::ResolvingCycle);
        report.cycles = match self.config.date_range {
            Some((start, end)) => {
                info!(start = %start, end = %end, "Processing every cycle in date range");
                ForecastCycle::all_between(start, end)
            }
            None => {
                let resolution = self.resolver.resolve(now).await;
                if !resolution.confirmed {
                    warn!(
                        cycle = %resolution.cycle,
                        attempts = resolution.attempts,
                        "Proceeding with unconfirmed cycle"
                    );
                }
                let cycle = resolution.cycle;
                report.resolution = Some(resolution);
                vec![cycle]
            }
        };

        for cycle in report.cycles.clone() {
            for lead_hour in 0..=self.config.max_lead_hour {
                report.enter(Stage::Extracting);
                let records = self.extract_unit(&cycle, lead_hour).await?;

                report.enter(Stage::Staging);
                let name = StagingUploader::object_name(&cycle, lead_hour);
                let staged = self.uploader.stage(&records, &name).await?;
                report.rows += staged.rows;
                report.staged.push(staged);
            }
        }

        report.enter(Stage::TableEnsure);
        self.loader.ensure_table().await?;

        report.enter(Stage::ExternalBind);
        let prefix = self.uploader.prefix().clone();
        if !self.loader.bind_external_stage(&prefix.url).await {
            error!(prefix = %prefix.url, "External reference could not be bound; nothing loaded");
            return Ok(PipelineOutcome::BindFailed);
        }

        report.enter(Stage::Loading);
        self.loader.load_from_stage().await?;
        self.loader.release_external_stage().await;

        if let Err(e) = self.uploader.purge(&report.staged).await {
            warn!(error = %e, prefix = %prefix.key, "Failed to purge staged objects");
        }

        Ok(PipelineOutcome::Loaded)
    }

    /// Download and extract one (cycle, lead) unit. The raw file is removed
    /// as soon as it has been read.
    async fn extract_unit(
        &self,
        cycle: &ForecastCycle,
        lead_hour: u16,
    ) -> Result<Vec<gfs_common::WindRecord>> {
        let url = self.config.source.url(cycle, lead_hour);
        let dest = self
            .config
            .work_dir
            .join(self.config.source.local_grib_name(cycle, lead_hour));

        info!(cycle = %cycle, lead_hour, url = %url, "Downloading grid");
        let path = self.fetcher.fetch(&url, &dest).await?;

        let extractor = Arc::clone(&self.extractor);
        let run = cycle.run;
        let decode_path = path.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract(&decode_path, run, lead_hour))
                .await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove raw grid file");
        }

        Ok(extracted??)
    }
}
