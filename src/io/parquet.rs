use crate::domain::model::{DataType, Field, Row, Schema, Value};
use crate::frame::{value, DataFrame};
use crate::io::{mark_success, next_part_path, part_files, prepare_output, SaveMode};
use crate::utils::error::{EtlError, Result};
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::arrow::ArrowWriter;
use ::parquet::basic::Compression;
use ::parquet::file::properties::WriterProperties;
use arrow_array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, Int64Array,
    RecordBatch, StringArray,
};
use arrow_schema::{DataType as ArrowType, Field as ArrowField, Schema as ArrowSchema};
use chrono::{Duration, NaiveDate};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// 1970-01-01, the Date32 origin.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn to_arrow_type(field: &Field) -> Result<ArrowType> {
    match &field.data_type {
        DataType::String | DataType::Null => Ok(ArrowType::Utf8),
        DataType::Integer => Ok(ArrowType::Int32),
        DataType::Long => Ok(ArrowType::Int64),
        DataType::Double => Ok(ArrowType::Float64),
        DataType::Boolean => Ok(ArrowType::Boolean),
        DataType::Date => Ok(ArrowType::Date32),
        nested => Err(EtlError::schema(format!(
            "Parquet output doesn't support column '{}' of type {}",
            field.name, nested
        ))),
    }
}

fn from_arrow_type(field: &ArrowField) -> Result<DataType> {
    match field.data_type() {
        ArrowType::Utf8 => Ok(DataType::String),
        ArrowType::Int32 => Ok(DataType::Integer),
        ArrowType::Int64 => Ok(DataType::Long),
        ArrowType::Float64 => Ok(DataType::Double),
        ArrowType::Boolean => Ok(DataType::Boolean),
        ArrowType::Date32 => Ok(DataType::Date),
        other => Err(EtlError::schema(format!(
            "Unsupported Parquet column '{}' of type {}",
            field.name(),
            other
        ))),
    }
}

fn build_column(rows: &[Row], index: usize, arrow_type: &ArrowType) -> ArrayRef {
    let cells = rows.iter().map(|r| &r[index]);
    match arrow_type {
        ArrowType::Int32 => Arc::new(Int32Array::from(
            cells
                .map(|v| value::as_i64(v).and_then(|i| i32::try_from(i).ok()))
                .collect::<Vec<_>>(),
        )),
        ArrowType::Int64 => Arc::new(Int64Array::from(
            cells.map(value::as_i64).collect::<Vec<_>>(),
        )),
        ArrowType::Float64 => Arc::new(Float64Array::from(
            cells.map(value::as_f64).collect::<Vec<_>>(),
        )),
        ArrowType::Boolean => Arc::new(BooleanArray::from(
            cells.map(|v| v.as_bool()).collect::<Vec<_>>(),
        )),
        ArrowType::Date32 => Arc::new(Date32Array::from(
            cells
                .map(|v| {
                    v.as_str()
                        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                        .and_then(|d| i32::try_from((d - epoch()).num_days()).ok())
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells
                .map(|v| match v {
                    Value::Null => None,
                    other => Some(value::display(other)),
                })
                .collect::<Vec<_>>(),
        )),
    }
}

/// Writes `dir/part-NNNNN.parquet` (snappy) plus `_SUCCESS`.
pub fn write_parquet(df: &DataFrame, dir: &Path, mode: SaveMode) -> Result<()> {
    let fields = df
        .schema()
        .fields
        .iter()
        .map(|f| Ok(ArrowField::new(f.name.clone(), to_arrow_type(f)?, true)))
        .collect::<Result<Vec<_>>>()?;
    if !prepare_output(dir, mode)? {
        return Ok(());
    }
    let arrow_schema = Arc::new(ArrowSchema::new(fields));

    let columns: Vec<ArrayRef> = arrow_schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| build_column(df.rows(), i, f.data_type()))
        .collect();
    let batch = RecordBatch::try_new(arrow_schema.clone(), columns)?;

    let path = next_part_path(dir, "parquet")?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(&path)?, arrow_schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    debug!("Wrote {} rows to {}", df.count(), path.display());
    mark_success(dir)
}

fn read_cell(column: &ArrayRef, row: usize) -> Value {
    if column.is_null(row) {
        return Value::Null;
    }
    let any = column.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        Value::String(a.value(row).to_string())
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        value::int(i64::from(a.value(row)))
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        value::int(a.value(row))
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        value::double(a.value(row))
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        Value::Bool(a.value(row))
    } else if let Some(a) = any.downcast_ref::<Date32Array>() {
        epoch()
            .checked_add_signed(Duration::days(i64::from(a.value(row))))
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    }
}

/// Reads a Parquet file, or every `.parquet` part of a directory in name order.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let files = part_files(path, "parquet")?;
    if files.is_empty() {
        return Err(EtlError::storage(format!(
            "No parquet files found in {}",
            path.display()
        )));
    }

    let mut schema: Option<Schema> = None;
    let mut rows: Vec<Row> = Vec::new();
    for file in &files {
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(file)?)?;
        let file_schema = Schema::new(
            builder
                .schema()
                .fields()
                .iter()
                .map(|f| Ok(Field::new(f.name().clone(), from_arrow_type(f)?)))
                .collect::<Result<Vec<_>>>()?,
        );
        if let Some(existing) = schema.as_ref() {
            if existing.names() != file_schema.names() {
                return Err(EtlError::schema(format!(
                    "Parquet part {} has columns {:?}, expected {:?}",
                    file.display(),
                    file_schema.names(),
                    existing.names()
                )));
            }
        }
        if schema.is_none() {
            schema = Some(file_schema);
        }

        for batch in builder.build()? {
            let batch = batch?;
            for r in 0..batch.num_rows() {
                rows.push(batch.columns().iter().map(|c| read_cell(c, r)).collect());
            }
        }
    }

    debug!("Read {} parquet rows from {}", rows.len(), path.display());
    DataFrame::new(schema.unwrap_or_default(), rows)
}
