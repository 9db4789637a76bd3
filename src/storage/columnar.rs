// src/storage/columnar.rs

//! Arrow layout of result sets and their Parquet encoding.
//!
//! Column order is fixed per record type and never changes after a file is
//! written. Author ids are stored as text for compatibility with existing
//! downstream readers.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;

use crate::error::{AppError, Result};
use crate::models::{MessageRecord, ParticipantRecord};

/// A record type with a fixed columnar layout.
pub trait Columnar: Sized {
    fn schema() -> SchemaRef;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
}

impl Columnar for MessageRecord {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("message", DataType::Utf8, false),
            Field::new("user_id", DataType::Utf8, false),
            Field::new(
                "date_message",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new("group", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.text.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.author_id.to_string()),
            )),
            Arc::new(
                TimestampMillisecondArray::from_iter_values(
                    rows.iter().map(|r| r.timestamp.timestamp_millis()),
                )
                .with_timezone("UTC"),
            ),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.group.as_str()),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

impl Columnar for ParticipantRecord {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("first_name", DataType::Utf8, true),
            Field::new("last_name", DataType::Utf8, true),
            Field::new("username", DataType::Utf8, true),
            Field::new("phone", DataType::Utf8, true),
            Field::new("group", DataType::Utf8, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let optional = |field: fn(&ParticipantRecord) -> Option<&str>| -> ArrayRef {
            Arc::new(StringArray::from(
                rows.iter().map(field).collect::<Vec<Option<&str>>>(),
            ))
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.id))),
            optional(|r| r.first_name.as_deref()),
            optional(|r| r.last_name.as_deref()),
            optional(|r| r.username.as_deref()),
            optional(|r| r.phone.as_deref()),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| r.group.as_str()),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

/// Encode a batch as a GZIP-compressed Parquet file.
pub fn encode_parquet(batch: &RecordBatch) -> Result<Vec<u8>> {
    let props = WriterProperties::builder()
        .set_compression(Compression::GZIP(GzipLevel::default()))
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buffer)
}

/// Read every value of an int64 column from a Parquet file.
pub fn decode_ids(bytes: Vec<u8>, column: &str) -> Result<Vec<i64>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))?.build()?;

    let mut ids = Vec::new();
    for batch in reader {
        let batch = batch?;
        let array = batch
            .column_by_name(column)
            .ok_or_else(|| AppError::validation(format!("Snapshot has no '{}' column", column)))?;
        let values = array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Snapshot column '{}' is {:?}, expected Int64",
                    column,
                    array.data_type()
                ))
            })?;
        ids.extend(values.iter().flatten());
    }
    Ok(ids)
}
