//! The load protocol executed for real against an in-memory DuckDB.

use std::path::Path;
use std::sync::Arc;

use gfs_common::WindRecord;
use storage::parquet::encode_records;
use test_utils::assert_approx_eq;
use test_utils::fixtures::philadelphia_record;
use warehouse::{DuckDbWarehouse, WarehouseLoader};

fn write_stage(dir: &Path, name: &str, records: &[WindRecord]) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), encode_records(records).unwrap()).unwrap();
}

fn prefix_url(dir: &Path) -> String {
    format!("{}/", dir.display())
}

fn loader(warehouse: &DuckDbWarehouse) -> WarehouseLoader {
    WarehouseLoader::new(Arc::new(warehouse.clone()), "gfs_wind", "ext_gfs_wind_staged", None)
        .unwrap()
}

fn record(u: Option<f64>, v: Option<f64>) -> WindRecord {
    WindRecord {
        wind_u: u,
        wind_v: v,
        ..philadelphia_record()
    }
}

#[tokio::test]
async fn test_staged_row_loads_with_derived_columns() {
    let stage = tempfile::tempdir().unwrap();
    write_stage(stage.path(), "20240101_00_003.parquet", &[philadelphia_record()]);

    let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
    let loader = loader(&warehouse);

    loader.ensure_table().await.unwrap();
    assert!(loader.bind_external_stage(&prefix_url(stage.path())).await);
    loader.load_from_stage().await.unwrap();
    loader.release_external_stage().await;

    let (ts, u, v, speed, heading, location): (String, f64, f64, f64, f64, String) = warehouse
        .with_connection(|conn| {
            conn.query_row(
                "SELECT CAST(forecast_ts AS VARCHAR), wind_u, wind_v, wind_speed, wind_heading_rad, location FROM gfs_wind",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
        })
        .unwrap();

    assert_eq!(ts, "2024-01-01 03:00:00");
    assert_eq!((u, v), (3.0, 4.0));
    assert_approx_eq!(speed, 5.0, 1e-12);
    assert_approx_eq!(heading, 4.0_f64.atan2(3.0), 1e-12);
    assert_eq!(location, "SRID=4326;POINT(-75.0 40.0)");
}

#[tokio::test]
async fn test_speed_and_heading_edge_directions() {
    let stage = tempfile::tempdir().unwrap();
    write_stage(
        stage.path(),
        "batch.parquet",
        &[
            record(Some(1.0), Some(0.0)),
            record(Some(0.0), Some(1.0)),
            record(None, Some(2.0)),
        ],
    );

    let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
    let loader = loader(&warehouse);
    loader.ensure_table().await.unwrap();
    assert!(loader.bind_external_stage(&prefix_url(stage.path())).await);
    loader.load_from_stage().await.unwrap();

    let rows: Vec<(Option<f64>, Option<f64>, Option<f64>, Option<f64>)> = warehouse
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT wind_u, wind_v, wind_speed, wind_heading_rad FROM gfs_wind \
                 ORDER BY wind_u NULLS LAST",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
                .collect::<duckdb::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .unwrap();

    assert_eq!(rows.len(), 3);

    // u=0, v=1: due north in the math convention
    assert_eq!(rows[0].2, Some(1.0));
    assert_approx_eq!(rows[0].3.unwrap(), std::f64::consts::FRAC_PI_2, 1e-12);

    // u=1, v=0
    assert_eq!(rows[1].2, Some(1.0));
    assert_eq!(rows[1].3, Some(0.0));

    // A missing component stays missing and the derived values follow
    assert_eq!(rows[2].0, None);
    assert_eq!(rows[2].2, None);
    assert_eq!(rows[2].3, None);
}

#[tokio::test]
async fn test_rebinding_points_at_latest_prefix_only() {
    let stage = tempfile::tempdir().unwrap();
    let first = stage.path().join("run_1");
    let second = stage.path().join("run_2");
    write_stage(&first, "a.parquet", &[record(Some(1.0), Some(1.0))]);
    write_stage(
        &second,
        "b.parquet",
        &[record(Some(2.0), Some(2.0)), record(Some(3.0), Some(3.0))],
    );

    let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
    let loader = loader(&warehouse);
    loader.ensure_table().await.unwrap();

    assert!(loader.bind_external_stage(&prefix_url(&first)).await);
    assert!(loader.bind_external_stage(&prefix_url(&second)).await);

    let visible: Vec<f64> = warehouse
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT wind_u FROM ext_gfs_wind_staged ORDER BY wind_u")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<duckdb::Result<Vec<f64>>>()?;
            Ok(rows)
        })
        .unwrap();
    assert_eq!(visible, vec![2.0, 3.0]);

    loader.load_from_stage().await.unwrap();
    let loaded: i64 = warehouse
        .with_connection(|conn| conn.query_row("SELECT COUNT(*) FROM gfs_wind", [], |row| row.get(0)))
        .unwrap();
    assert_eq!(loaded, 2);
}

#[tokio::test]
async fn test_bind_to_empty_prefix_fails_without_error() {
    let stage = tempfile::tempdir().unwrap();
    let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
    let loader = loader(&warehouse);

    assert!(!loader.bind_external_stage(&prefix_url(stage.path())).await);
}

#[tokio::test]
async fn test_ensure_table_is_idempotent() {
    let warehouse = DuckDbWarehouse::open_in_memory().unwrap();
    let loader = loader(&warehouse);
    loader.ensure_table().await.unwrap();
    loader.ensure_table().await.unwrap();
}
