//! Command-line arguments.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use gfs_common::source::{DEFAULT_RESOLUTION, NOMADS_BASE_URL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WarehouseKind {
    Firebolt,
    Duckdb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download, stage and load (the default)
    Run,
    /// Delete every staged object under a prefix
    PurgeStaged {
        /// Key prefix to purge, e.g. gfs/run_20240101T000000_ab12cd34
        #[arg(long)]
        prefix: String,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    gfs_common::parse_issue_date(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug, Clone)]
#[command(name = "gfs-loader")]
#[command(about = "Download GFS 10 m wind and load it into a warehouse via staged parquet")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Destination table name
    #[arg(long, env = "GFS_TABLE", default_value = "gfs_points")]
    pub table: String,

    /// Firebolt database
    #[arg(long, env = "FIREBOLT_DATABASE")]
    pub db: Option<String>,

    /// Firebolt engine
    #[arg(long, env = "FIREBOLT_ENGINE")]
    pub engine: Option<String>,

    /// Warehouse backend
    #[arg(long, value_enum, default_value = "firebolt")]
    pub warehouse: WarehouseKind,

    /// DuckDB database file (in-memory when omitted)
    #[arg(long)]
    pub duckdb_path: Option<PathBuf>,

    /// S3 bucket for staged parquet
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    /// Key prefix under which each run gets its own directory
    #[arg(long, env = "S3_KEY", default_value = "gfs")]
    pub s3_key: String,

    /// AWS region of the staging bucket
    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// Custom S3 endpoint (MinIO)
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Stage to a local directory instead of S3
    #[arg(long)]
    pub local_stage_dir: Option<PathBuf>,

    /// External table name (default: ext_<table>_staged)
    #[arg(long)]
    pub ext_table_name: Option<String>,

    /// First issue date, YYYY-MM-DD (inclusive)
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Last issue date, YYYY-MM-DD (inclusive)
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// GFS resolution token
    #[arg(long, default_value = DEFAULT_RESOLUTION)]
    pub resolution: String,

    /// Upstream root URL
    #[arg(long, env = "GFS_BASE_URL", default_value = NOMADS_BASE_URL)]
    pub base_url: String,

    /// Last forecast lead hour per cycle (inclusive)
    #[arg(long, default_value = "5")]
    pub max_lead_hour: u16,

    /// Directory for raw downloads and parquet scratch files
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "json")]
    pub log_format: LogFormat,

    /// Only resolve and print the latest published cycle, then exit
    #[arg(long)]
    pub latest_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["gfs-loader"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.warehouse, WarehouseKind::Firebolt);
        assert_eq!(args.resolution, "0p25");
        assert_eq!(args.max_lead_hour, 5);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(!args.latest_only);
    }

    #[test]
    fn test_dates_accept_both_formats() {
        let args = Args::try_parse_from([
            "gfs-loader",
            "--start-date",
            "2024-01-01",
            "--end-date",
            "20240103",
        ])
        .unwrap();
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(args.end_date, NaiveDate::from_ymd_opt(2024, 1, 3));

        assert!(Args::try_parse_from(["gfs-loader", "--start-date", "01/02/2024"]).is_err());
    }

    #[test]
    fn test_purge_subcommand() {
        let args = Args::try_parse_from([
            "gfs-loader",
            "--local-stage-dir",
            "/tmp/stage",
            "purge-staged",
            "--prefix",
            "gfs/run_x",
        ])
        .unwrap();
        match args.command {
            Some(Command::PurgeStaged { prefix }) => assert_eq!(prefix, "gfs/run_x"),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
