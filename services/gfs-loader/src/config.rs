//! Startup configuration.
//!
//! Secrets come from the environment (optionally via `.env`), everything else
//! from the command line. All of it is checked here, before any network call.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use gfs_common::GfsSource;
use ingestion::PipelineConfig;
use storage::ObjectStorageConfig;
use thiserror::Error;
use warehouse::{FireboltConfig, StageCredentials, WarehouseLoader};

use crate::cli::{Args, WarehouseKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Credentials read from the environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoaderEnv {
    pub firebolt_account: Option<String>,
    pub firebolt_client_id: Option<String>,
    pub firebolt_client_secret: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    pub aws_external_access_key_id: Option<String>,
    pub aws_external_secret_access_key: Option<String>,
    pub aws_external_session_token: Option<String>,
    pub aws_region: Option<String>,
}

impl std::fmt::Debug for LoaderEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = |v: &Option<String>| v.as_ref().map(|_| "<set>");
        f.debug_struct("LoaderEnv")
            .field("firebolt_account", &self.firebolt_account)
            .field("firebolt_client_id", &self.firebolt_client_id)
            .field("firebolt_client_secret", &shown(&self.firebolt_client_secret))
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &shown(&self.aws_secret_access_key))
            .field("aws_session_token", &shown(&self.aws_session_token))
            .field("aws_external_access_key_id", &self.aws_external_access_key_id)
            .field(
                "aws_external_secret_access_key",
                &shown(&self.aws_external_secret_access_key),
            )
            .field(
                "aws_external_session_token",
                &shown(&self.aws_external_session_token),
            )
            .field("aws_region", &self.aws_region)
            .finish()
    }
}

impl LoaderEnv {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            firebolt_account: get("FIREBOLT_ACCOUNT"),
            firebolt_client_id: get("FIREBOLT_CLIENT_ID"),
            firebolt_client_secret: get("FIREBOLT_CLIENT_SECRET"),
            aws_access_key_id: get("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: get("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: get("AWS_SESSION_TOKEN"),
            aws_external_access_key_id: get("AWS_EXTERNAL_ACCESS_KEY_ID"),
            aws_external_secret_access_key: get("AWS_EXTERNAL_SECRET_ACCESS_KEY"),
            aws_external_session_token: get("AWS_EXTERNAL_SESSION_TOKEN"),
            aws_region: get("AWS_REGION"),
        }
    }

    /// Identity the staging uploader writes with: the plain `AWS_*` names.
    fn upload_credentials(&self) -> Result<StageCredentials, ConfigError> {
        Ok(StageCredentials {
            access_key_id: self
                .aws_access_key_id
                .clone()
                .ok_or(ConfigError::Missing("AWS_ACCESS_KEY_ID"))?,
            secret_access_key: self
                .aws_secret_access_key
                .clone()
                .ok_or(ConfigError::Missing("AWS_SECRET_ACCESS_KEY"))?,
            session_token: self.aws_session_token.clone(),
        })
    }

    /// Identity the warehouse reads the stage with, embedded in the external
    /// reference DDL. Each `AWS_EXTERNAL_*` value falls back to its `AWS_*` name.
    fn stage_credentials(&self) -> Result<StageCredentials, ConfigError> {
        let either = |external: &Option<String>, plain: &Option<String>| {
            external.clone().or_else(|| plain.clone())
        };

        Ok(StageCredentials {
            access_key_id: either(&self.aws_external_access_key_id, &self.aws_access_key_id)
                .ok_or(ConfigError::Missing("AWS_EXTERNAL_ACCESS_KEY_ID / AWS_ACCESS_KEY_ID"))?,
            secret_access_key: either(
                &self.aws_external_secret_access_key,
                &self.aws_secret_access_key,
            )
            .ok_or(ConfigError::Missing(
                "AWS_EXTERNAL_SECRET_ACCESS_KEY / AWS_SECRET_ACCESS_KEY",
            ))?,
            // A plain session token only belongs with the plain key pair
            session_token: if self.aws_external_access_key_id.is_some() {
                self.aws_external_session_token.clone()
            } else {
                either(&self.aws_external_session_token, &self.aws_session_token)
            },
        })
    }
}

#[derive(Debug, Clone)]
pub enum WarehouseSettings {
    Firebolt(FireboltConfig),
    DuckDb { path: Option<PathBuf> },
}

/// Everything a pipeline run needs, validated.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub pipeline: PipelineConfig,
    pub storage: ObjectStorageConfig,
    pub stage_base: String,
    pub stage_credentials: Option<StageCredentials>,
    pub warehouse: WarehouseSettings,
    pub table: String,
    pub external_table: String,
}

const DEFAULT_REGION: &str = "us-east-1";

/// Staging store configuration; shared by `run` and `purge-staged`.
pub fn storage_config(args: &Args, env: &LoaderEnv) -> Result<ObjectStorageConfig, ConfigError> {
    if let Some(root) = &args.local_stage_dir {
        return Ok(ObjectStorageConfig::Local { root: root.clone() });
    }

    let bucket = args.s3_bucket.clone().ok_or(ConfigError::Missing("--s3-bucket"))?;
    let creds = env.upload_credentials()?;
    let endpoint = args.s3_endpoint.clone();
    let allow_http = endpoint
        .as_deref()
        .is_some_and(|url| url.starts_with("http://"));

    Ok(ObjectStorageConfig::S3 {
        bucket,
        region: args
            .aws_region
            .clone()
            .or_else(|| env.aws_region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        access_key_id: creds.access_key_id,
        secret_access_key: creds.secret_access_key,
        session_token: creds.session_token,
        endpoint,
        allow_http,
    })
}

fn date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Option<(NaiveDate, NaiveDate)>, ConfigError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) if end < start => Err(ConfigError::Invalid(format!(
            "--end-date {} is before --start-date {}",
            end, start
        ))),
        (Some(start), Some(end)) => Ok(Some((start, end))),
        _ => Err(ConfigError::Invalid(
            "--start-date and --end-date must be given together".to_string(),
        )),
    }
}

impl LoaderSettings {
    pub fn resolve(args: &Args, env: &LoaderEnv) -> Result<Self, ConfigError> {
        let storage = storage_config(args, env)?;
        let staging_on_s3 = matches!(storage, ObjectStorageConfig::S3 { .. });

        let warehouse = match args.warehouse {
            WarehouseKind::Firebolt => {
                if !staging_on_s3 {
                    return Err(ConfigError::Invalid(
                        "the Firebolt warehouse reads the stage from S3; drop --local-stage-dir"
                            .to_string(),
                    ));
                }
                let mut config = FireboltConfig::new(
                    env.firebolt_account
                        .clone()
                        .ok_or(ConfigError::Missing("FIREBOLT_ACCOUNT"))?,
                    env.firebolt_client_id
                        .clone()
                        .ok_or(ConfigError::Missing("FIREBOLT_CLIENT_ID"))?,
                    env.firebolt_client_secret
                        .clone()
                        .ok_or(ConfigError::Missing("FIREBOLT_CLIENT_SECRET"))?,
                    args.db.clone().ok_or(ConfigError::Missing("--db / FIREBOLT_DATABASE"))?,
                    args.engine
                        .clone()
                        .ok_or(ConfigError::Missing("--engine / FIREBOLT_ENGINE"))?,
                );
                config.timeout = Duration::from_secs(300);
                WarehouseSettings::Firebolt(config)
            }
            WarehouseKind::Duckdb => {
                if staging_on_s3 {
                    return Err(ConfigError::Invalid(
                        "the DuckDB warehouse reads the stage from disk; set --local-stage-dir"
                            .to_string(),
                    ));
                }
                WarehouseSettings::DuckDb {
                    path: args.duckdb_path.clone(),
                }
            }
        };

        let stage_credentials = if staging_on_s3 {
            Some(env.stage_credentials()?)
        } else {
            None
        };

        let external_table = args
            .ext_table_name
            .clone()
            .unwrap_or_else(|| WarehouseLoader::default_external_name(&args.table));

        let pipeline = PipelineConfig {
            source: GfsSource::new(args.base_url.clone(), args.resolution.clone()),
            work_dir: args.work_dir.clone(),
            max_lead_hour: args.max_lead_hour,
            date_range: date_range(args.start_date, args.end_date)?,
        };
        pipeline
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            pipeline,
            storage,
            stage_base: args.s3_key.clone(),
            stage_credentials,
            warehouse,
            table: args.table.clone(),
            external_table,
        })
    }
}
