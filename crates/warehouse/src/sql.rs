//! SQL rendering for the load protocol.
//!
//! Table and external names are spliced into statements, so they are only
//! accepted as validated [`Identifier`]s. Every string literal goes through
//! [`quote_literal`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarehouseError};

/// A validated SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Self(name.to_string()))
        } else {
            Err(WarehouseError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Object storage credentials handed to the warehouse so it can read the stage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for StageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// SQL flavour of a warehouse backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Firebolt,
    DuckDb,
}

const STAGE_COLUMNS: &str = "latitude, longitude, obs_date, obs_hour, forecast_hour, wind_u, wind_v";

impl Dialect {
    /// Forecast table DDL. Firebolt partitions by forecast day.
    pub fn create_table(&self, table: &Identifier) -> String {
        match self {
            Dialect::Firebolt => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n\
                 \x20 forecast_ts TIMESTAMP,\n\
                 \x20 wind_u DOUBLE,\n\
                 \x20 wind_v DOUBLE,\n\
                 \x20 wind_speed DOUBLE,\n\
                 \x20 wind_heading_rad DOUBLE,\n\
                 \x20 location GEOGRAPHY\n\
                 )\n\
                 PARTITION BY TO_YYYYMMDD(forecast_ts)"
            ),
            // No GEOGRAPHY type without the spatial extension; keep the EWKT text
            Dialect::DuckDb => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n\
                 \x20 forecast_ts TIMESTAMP,\n\
                 \x20 wind_u DOUBLE,\n\
                 \x20 wind_v DOUBLE,\n\
                 \x20 wind_speed DOUBLE,\n\
                 \x20 wind_heading_rad DOUBLE,\n\
                 \x20 location VARCHAR\n\
                 )"
            ),
        }
    }

    pub fn drop_external(&self, name: &Identifier) -> String {
        match self {
            Dialect::Firebolt => format!("DROP EXTERNAL TABLE IF EXISTS {name}"),
            Dialect::DuckDb => format!("DROP VIEW IF EXISTS {name}"),
        }
    }

    /// External reference over every `*.parquet` object directly under `prefix_url`.
    ///
    /// Fails when `name` already exists, so a binding that survived a failed
    /// drop is never silently reused.
    pub fn create_external(
        &self,
        name: &Identifier,
        prefix_url: &str,
        credentials: Option<&StageCredentials>,
    ) -> String {
        match self {
            Dialect::Firebolt => {
                let mut ddl = format!(
                    "CREATE EXTERNAL TABLE {name} (\n\
                     \x20 latitude DOUBLE,\n\
                     \x20 longitude DOUBLE,\n\
                     \x20 obs_date TIMESTAMP,\n\
                     \x20 obs_hour INT,\n\
                     \x20 forecast_hour INT,\n\
                     \x20 wind_u DOUBLE,\n\
                     \x20 wind_v DOUBLE\n\
                     )\n\
                     URL = {}\n",
                    quote_literal(prefix_url)
                );
                if let Some(creds) = credentials {
                    let mut parts = vec![
                        format!("AWS_ACCESS_KEY_ID = {}", quote_literal(&creds.access_key_id)),
                        format!(
                            "AWS_SECRET_ACCESS_KEY = {}",
                            quote_literal(&creds.secret_access_key)
                        ),
                    ];
                    if let Some(token) = &creds.session_token {
                        parts.push(format!("AWS_SESSION_TOKEN = {}", quote_literal(token)));
                    }
                    ddl.push_str(&format!("CREDENTIALS = ({})\n", parts.join(", ")));
                }
                ddl.push_str("TYPE = PARQUET\nOBJECT_PATTERN = '*.parquet'");
                ddl
            }
            Dialect::DuckDb => {
                let mut pattern = prefix_url.to_string();
                if !pattern.ends_with('/') {
                    pattern.push('/');
                }
                pattern.push_str("*.parquet");
                format!(
                    "CREATE VIEW {name} AS SELECT {STAGE_COLUMNS} FROM read_parquet({})",
                    quote_literal(&pattern)
                )
            }
        }
    }

    /// The one statement that computes the derived columns and appends them.
    ///
    /// `forecast_ts = obs_date + (obs_hour + forecast_hour) hours`,
    /// `wind_speed = sqrt(u² + v²)`, `wind_heading_rad = atan2(v, u)` and
    /// `location = POINT(longitude latitude)` in SRID 4326.
    pub fn insert_from_external(&self, table: &Identifier, external: &Identifier) -> String {
        match self {
            Dialect::Firebolt => format!(
                "INSERT INTO {table} (forecast_ts, wind_u, wind_v, wind_speed, wind_heading_rad, location)\n\
                 SELECT\n\
                 \x20 DATE_ADD('hour', COALESCE(obs_hour, 0) + COALESCE(forecast_hour, 0), TRY_CAST(obs_date AS TIMESTAMP)) AS forecast_ts,\n\
                 \x20 wind_u,\n\
                 \x20 wind_v,\n\
                 \x20 SQRT(wind_u * wind_u + wind_v * wind_v) AS wind_speed,\n\
                 \x20 ATAN2(wind_v, wind_u) AS wind_heading_rad,\n\
                 \x20 CAST(CONCAT('SRID=4326;POINT(', CAST(longitude AS TEXT), ' ', CAST(latitude AS TEXT), ')') AS GEOGRAPHY) AS location\n\
                 FROM {external}"
            ),
            Dialect::DuckDb => format!(
                "INSERT INTO {table} (forecast_ts, wind_u, wind_v, wind_speed, wind_heading_rad, location)\n\
                 SELECT\n\
                 \x20 CAST(obs_date AS TIMESTAMP) + to_hours(CAST(COALESCE(obs_hour, 0) + COALESCE(forecast_hour, 0) AS BIGINT)) AS forecast_ts,\n\
                 \x20 wind_u,\n\
                 \x20 wind_v,\n\
                 \x20 sqrt(wind_u * wind_u + wind_v * wind_v) AS wind_speed,\n\
                 \x20 atan2(wind_v, wind_u) AS wind_heading_rad,\n\
                 \x20 concat('SRID=4326;POINT(', CAST(longitude AS VARCHAR), ' ', CAST(latitude AS VARCHAR), ')') AS location\n\
                 FROM {external}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier::parse(name).unwrap()
    }

    #[test]
    fn test_identifier_validation() {
        assert!(Identifier::parse("gfs_wind").is_ok());
        assert!(Identifier::parse("_t1").is_ok());
        assert!(Identifier::parse("").is_err());
        assert!(Identifier::parse("1table").is_err());
        assert!(Identifier::parse("wind; DROP TABLE x").is_err());
        assert!(Identifier::parse("db.table").is_err());
        assert!(Identifier::parse("naïve").is_err());
    }

    #[test]
    fn test_quote_literal_escapes_quotes() {
        assert_eq!(quote_literal("s3://b/p/"), "'s3://b/p/'");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_firebolt_table_is_partitioned_by_day() {
        let sql = Dialect::Firebolt.create_table(&ident("gfs_wind"));
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS gfs_wind ("));
        assert!(sql.contains("location GEOGRAPHY"));
        assert!(sql.ends_with("PARTITION BY TO_YYYYMMDD(forecast_ts)"));

        let duck = Dialect::DuckDb.create_table(&ident("gfs_wind"));
        assert!(!duck.contains("PARTITION"));
        assert!(duck.contains("location VARCHAR"));
    }

    #[test]
    fn test_firebolt_external_carries_credentials() {
        let creds = StageCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "se'cret".to_string(),
            session_token: Some("tok".to_string()),
        };
        let sql = Dialect::Firebolt.create_external(
            &ident("ext_gfs_wind_staged"),
            "s3://bucket/gfs/run_1/",
            Some(&creds),
        );

        assert!(sql.starts_with("CREATE EXTERNAL TABLE ext_gfs_wind_staged ("));
        assert!(!sql.contains("IF NOT EXISTS"));
        assert!(sql.contains("URL = 's3://bucket/gfs/run_1/'"));
        assert!(sql.contains(
            "CREDENTIALS = (AWS_ACCESS_KEY_ID = 'AKIA', AWS_SECRET_ACCESS_KEY = 'se''cret', AWS_SESSION_TOKEN = 'tok')"
        ));
        assert!(sql.contains("TYPE = PARQUET"));
        assert!(sql.ends_with("OBJECT_PATTERN = '*.parquet'"));

        let no_token = StageCredentials {
            session_token: None,
            ..creds
        };
        let sql = Dialect::Firebolt.create_external(&ident("e"), "s3://b/p/", Some(&no_token));
        assert!(!sql.contains("AWS_SESSION_TOKEN"));
    }

    #[test]
    fn test_duckdb_external_globs_prefix() {
        let sql = Dialect::DuckDb.create_external(&ident("ext"), "/tmp/stage/run_1", None);
        assert!(sql.ends_with("FROM read_parquet('/tmp/stage/run_1/*.parquet')"));
        assert_eq!(
            Dialect::DuckDb.drop_external(&ident("ext")),
            "DROP VIEW IF EXISTS ext"
        );
        assert_eq!(
            Dialect::Firebolt.drop_external(&ident("ext")),
            "DROP EXTERNAL TABLE IF EXISTS ext"
        );
    }

    #[test]
    fn test_insert_computes_derived_columns_in_one_statement() {
        for dialect in [Dialect::Firebolt, Dialect::DuckDb] {
            let sql = dialect.insert_from_external(&ident("t"), &ident("ext"));
            assert_eq!(sql.matches("INSERT INTO").count(), 1);
            assert!(sql.to_lowercase().contains("atan2(wind_v, wind_u)"));
            assert!(sql.contains("SRID=4326;POINT("));
            assert!(sql.ends_with("FROM ext"));
        }
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = StageCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "hunter2".to_string(),
            session_token: Some("tok".to_string()),
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("AKIA"));
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("tok\""));
    }
}
