//! GFS wind loader.
//!
//! Downloads the 10 m wind components of the latest (or a range of) GFS
//! cycles, stages them as parquet and bulk loads them into a warehouse table:
//! - Latest-cycle resolution with bounded probing
//! - Per-run staging prefixes in S3 or a local directory
//! - Firebolt or embedded DuckDB as the warehouse
//! - Local raw files removed on every exit path

mod cli;
mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gfs_common::GfsSource;
use grib_extract::GribDecoder;
use ingestion::{
    CycleResolver, DownloadConfig, HttpDownloader, HttpProbe, Pipeline, ResolverConfig,
};
use storage::{ObjectStorage, StagingUploader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use warehouse::{DuckDbWarehouse, FireboltClient, Warehouse, WarehouseLoader};

use cli::{Args, Command, LogFormat};
use config::{storage_config, LoaderEnv, LoaderSettings, WarehouseSettings};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match dispatch(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "gfs-loader failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(log_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

/// Filter for `--log-level`; anything unparseable falls back to `info`.
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
}

async fn dispatch(args: Args) -> Result<ExitCode> {
    let env = LoaderEnv::from_env();

    if args.latest_only {
        return latest_only(&args).await;
    }

    match args.command.clone() {
        Some(Command::PurgeStaged { prefix }) => purge_staged(&args, &env, &prefix).await,
        Some(Command::Run) | None => run(&args, &env).await,
    }
}

/// Resolve the latest cycle and print it in `key=value` form.
async fn latest_only(args: &Args) -> Result<ExitCode> {
    let resolver = CycleResolver::new(
        Arc::new(HttpProbe::new(HttpProbe::DEFAULT_TIMEOUT)?),
        GfsSource::new(args.base_url.clone(), args.resolution.clone()),
        ResolverConfig::default(),
    );

    let resolution = resolver.resolve(Utc::now()).await;
    println!(
        "latest_date={} cycle={} url={}",
        resolution.cycle.date_key(),
        resolution.cycle.run,
        resolution.probe_url
    );
    Ok(ExitCode::SUCCESS)
}

async fn purge_staged(args: &Args, env: &LoaderEnv, prefix: &str) -> Result<ExitCode> {
    let storage = ObjectStorage::new(&storage_config(args, env)?)
        .context("Failed to open staging store")?;

    let removed = storage.purge_prefix(prefix).await?;
    info!(prefix = %prefix, removed, "Purged staged objects");
    Ok(ExitCode::SUCCESS)
}

async fn run(args: &Args, env: &LoaderEnv) -> Result<ExitCode> {
    // Every setting is checked before the first network call
    let settings = LoaderSettings::resolve(args, env)?;
    info!(
        table = %settings.table,
        external = %settings.external_table,
        work_dir = %settings.pipeline.work_dir.display(),
        "Starting GFS wind load"
    );

    let warehouse: Arc<dyn Warehouse> = match &settings.warehouse {
        WarehouseSettings::Firebolt(config) => Arc::new(
            FireboltClient::new(config.clone()).context("Failed to create Firebolt client")?,
        ),
        WarehouseSettings::DuckDb { path: Some(path) } => Arc::new(
            DuckDbWarehouse::open(path)
                .with_context(|| format!("Failed to open DuckDB at {}", path.display()))?,
        ),
        WarehouseSettings::DuckDb { path: None } => Arc::new(DuckDbWarehouse::open_in_memory()?),
    };
    let loader = WarehouseLoader::new(
        warehouse,
        &settings.table,
        &settings.external_table,
        settings.stage_credentials.clone(),
    )?;

    let storage = Arc::new(
        ObjectStorage::new(&settings.storage).context("Failed to open staging store")?,
    );
    let started_at = Utc::now();
    let uploader = StagingUploader::new(
        storage,
        &settings.stage_base,
        settings.pipeline.work_dir.clone(),
        started_at,
    );
    info!(prefix = %uploader.prefix().url, "Staging prefix for this run");

    let resolver = CycleResolver::new(
        Arc::new(HttpProbe::new(HttpProbe::DEFAULT_TIMEOUT)?),
        settings.pipeline.source.clone(),
        ResolverConfig::default(),
    );

    let pipeline = Pipeline::new(
        settings.pipeline.clone(),
        resolver,
        Arc::new(HttpDownloader::new(DownloadConfig::default())?),
        Arc::new(GribDecoder::new()),
        uploader,
        loader,
    );

    let report = pipeline.run(started_at).await?;
    let code = report.outcome.map(|o| o.exit_code()).unwrap_or(1);

    info!(
        outcome = ?report.outcome,
        cycles = report.cycles.len(),
        staged = report.staged.len(),
        rows = report.rows,
        "GFS wind load finished"
    );

    Ok(if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_level_filter_from_log_level() {
        assert_eq!(level_filter("WARN").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(level_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(
            level_filter("ingestion=trace,info").max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }
}
