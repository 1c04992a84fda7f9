//! Parquet encoding of wind record batches.
//!
//! Staged files carry the raw record columns only. Derived columns (forecast
//! timestamp, speed, heading, geography) are computed by the warehouse load.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::DateTime;
use gfs_common::{RunHour, WindRecord};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{StorageError, StorageResult};

/// Column names of a staged batch, in file order.
pub mod columns {
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const OBS_DATE: &str = "obs_date";
    pub const OBS_HOUR: &str = "obs_hour";
    pub const FORECAST_HOUR: &str = "forecast_hour";
    pub const WIND_U: &str = "wind_u";
    pub const WIND_V: &str = "wind_v";
}

/// Arrow schema of a staged batch.
pub fn wind_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(columns::LATITUDE, DataType::Float64, false),
        Field::new(columns::LONGITUDE, DataType::Float64, false),
        Field::new(
            columns::OBS_DATE,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        Field::new(columns::OBS_HOUR, DataType::Int32, false),
        Field::new(columns::FORECAST_HOUR, DataType::Int32, false),
        Field::new(columns::WIND_U, DataType::Float64, true),
        Field::new(columns::WIND_V, DataType::Float64, true),
    ]))
}

fn to_batch(records: &[WindRecord]) -> StorageResult<RecordBatch> {
    let latitude: Float64Array = records.iter().map(|r| Some(r.latitude)).collect();
    let longitude: Float64Array = records.iter().map(|r| Some(r.longitude)).collect();
    let obs_date = TimestampMicrosecondArray::from(
        records
            .iter()
            .map(|r| {
                r.observed_date
                    .and_hms_opt(0, 0, 0)
                    .map(|midnight| midnight.and_utc().timestamp_micros())
                    .unwrap_or_default()
            })
            .collect::<Vec<i64>>(),
    );
    let obs_hour = Int32Array::from(
        records
            .iter()
            .map(|r| r.observed_hour.hour() as i32)
            .collect::<Vec<i32>>(),
    );
    let forecast_hour = Int32Array::from(
        records
            .iter()
            .map(|r| r.lead_hour as i32)
            .collect::<Vec<i32>>(),
    );
    let wind_u: Float64Array = records.iter().map(|r| r.wind_u).collect();
    let wind_v: Float64Array = records.iter().map(|r| r.wind_v).collect();

    RecordBatch::try_new(
        wind_schema(),
        vec![
            Arc::new(latitude) as ArrayRef,
            Arc::new(longitude),
            Arc::new(obs_date),
            Arc::new(obs_hour),
            Arc::new(forecast_hour),
            Arc::new(wind_u),
            Arc::new(wind_v),
        ],
    )
    .map_err(|e| StorageError::Encode(e.to_string()))
}

/// Encode a batch of records as a single Snappy-compressed parquet file.
pub fn encode_records(records: &[WindRecord]) -> StorageResult<Bytes> {
    let batch = to_batch(records)?;

    let mut cursor = Cursor::new(Vec::new());
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(&mut cursor, batch.schema(), Some(props))
        .map_err(|e| StorageError::Encode(e.to_string()))?;
    writer
        .write(&batch)
        .map_err(|e| StorageError::Encode(e.to_string()))?;
    writer
        .close()
        .map_err(|e| StorageError::Encode(e.to_string()))?;

    Ok(Bytes::from(cursor.into_inner()))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> StorageResult<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| StorageError::Decode(format!("missing or mistyped column {}", name)))
}

/// Decode a staged parquet file back into records.
pub fn decode_records(data: Bytes) -> StorageResult<Vec<WindRecord>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)
        .and_then(|builder| builder.build())
        .map_err(|e| StorageError::Decode(e.to_string()))?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| StorageError::Decode(e.to_string()))?;

        let latitude = column::<Float64Array>(&batch, columns::LATITUDE)?;
        let longitude = column::<Float64Array>(&batch, columns::LONGITUDE)?;
        let obs_date = column::<TimestampMicrosecondArray>(&batch, columns::OBS_DATE)?;
        let obs_hour = column::<Int32Array>(&batch, columns::OBS_HOUR)?;
        let forecast_hour = column::<Int32Array>(&batch, columns::FORECAST_HOUR)?;
        let wind_u = column::<Float64Array>(&batch, columns::WIND_U)?;
        let wind_v = column::<Float64Array>(&batch, columns::WIND_V)?;

        for i in 0..batch.num_rows() {
            let observed_date = DateTime::from_timestamp_micros(obs_date.value(i))
                .map(|ts| ts.date_naive())
                .ok_or_else(|| StorageError::Decode(format!("bad obs_date at row {}", i)))?;
            let observed_hour = RunHour::try_from(obs_hour.value(i) as u32)
                .map_err(|e| StorageError::Decode(e.to_string()))?;
            let lead_hour = u16::try_from(forecast_hour.value(i))
                .map_err(|e| StorageError::Decode(format!("bad forecast_hour: {}", e)))?;

            records.push(WindRecord {
                latitude: latitude.value(i),
                longitude: longitude.value(i),
                observed_date,
                observed_hour,
                lead_hour,
                wind_u: (!wind_u.is_null(i)).then(|| wind_u.value(i)),
                wind_v: (!wind_v.is_null(i)).then(|| wind_v.value(i)),
            });
        }
    }

    Ok(records)
}
