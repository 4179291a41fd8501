//! On-disk store of the local server backend: YAML run metadata and params,
//! Parquet metrics.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Local, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde_json::Value;

use crate::error::{Result, TrackingError};
use crate::models::{MetricRow, MetricValue, RunMetadata};
use crate::params::Params;

pub const RUN_FILE: &str = "run.yaml";
pub const PARAMS_FILE: &str = "params.yaml";
pub const METRICS_FILE: &str = "metrics.parquet";

const STEP_COLUMN: &str = "step";
const TIMESTAMP_COLUMN: &str = "timestamp";

// ─── Run directories ─────────────────────────────────────────────────────────

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Create a fresh run directory under `experiment_dir`, named after the
/// current local time. Runs started within the same second get `_1`, `_2`, ...
/// suffixes, so an earlier run's files are never reused.
pub fn create_run_dir(experiment_dir: &Path) -> Result<(String, PathBuf)> {
    ensure_dir(experiment_dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            stamp.clone()
        } else {
            format!("{}_{}", stamp, attempt)
        };
        let dir = experiment_dir.join(&name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok((name, dir)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Names of the runs recorded under an experiment, newest first.
pub fn list_runs(experiment_dir: &Path) -> Result<Vec<String>> {
    if !experiment_dir.exists() {
        return Ok(vec![]);
    }
    let mut names = vec![];
    for entry in fs::read_dir(experiment_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.path().join(RUN_FILE).exists() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort_by(|a, b| run_order(b).cmp(&run_order(a)));
    Ok(names)
}

/// Directory of the newest run under an experiment, if any.
pub fn latest_run(experiment_dir: &Path) -> Result<Option<PathBuf>> {
    Ok(list_runs(experiment_dir)?
        .into_iter()
        .next()
        .map(|name| experiment_dir.join(name)))
}

// "20260301_142530_10" sorts after "20260301_142530_9"
fn run_order(name: &str) -> (&str, u32) {
    match name.rsplit_once('_') {
        Some((stamp, n)) if stamp.contains('_') => (stamp, n.parse().unwrap_or(0)),
        _ => (name, 0),
    }
}

// ─── YAML files ──────────────────────────────────────────────────────────────

pub fn save_yaml<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    fs::write(path, serde_yaml::to_string(data)?)?;
    Ok(())
}

pub fn load_yaml<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn save_run_metadata(run_dir: &Path, meta: &RunMetadata) -> Result<()> {
    save_yaml(&run_dir.join(RUN_FILE), meta)
}

pub fn load_run_metadata(run_dir: &Path) -> Result<RunMetadata> {
    let path = run_dir.join(RUN_FILE);
    if !path.exists() {
        return Err(TrackingError::Other(format!(
            "No {} in {}",
            RUN_FILE,
            run_dir.display()
        )));
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn save_params(run_dir: &Path, params: &Params) -> Result<()> {
    save_yaml(&run_dir.join(PARAMS_FILE), params)
}

/// Flat params of a run, empty when none were logged.
pub fn load_params(run_dir: &Path) -> Result<Params> {
    load_yaml(&run_dir.join(PARAMS_FILE))
}

// ─── Parquet metrics ─────────────────────────────────────────────────────────

/// Append metric rows to a Parquet file, rewriting it in place.
///
/// Metric keys that appear in only some rows become nullable columns; the
/// file's schema is the union of every row's keys.
pub fn append_metrics(path: &Path, rows: &[MetricRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let incoming = rows_to_batch(rows)?;
    let combined = if path.exists() {
        let existing = read_batch(path)?;
        union_batches(&existing, &incoming)?
    } else {
        incoming
    };

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(fs::File::create(path)?, combined.schema(), Some(props))?;
    writer.write(&combined)?;
    writer.close()?;
    Ok(())
}

/// Read every stored row as a column-name → JSON value map.
pub fn read_metrics(path: &Path) -> Result<Vec<HashMap<String, Value>>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let batch = read_batch(path)?;
    let mut rows = vec![HashMap::new(); batch.num_rows()];

    for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
        for (i, row) in rows.iter_mut().enumerate() {
            row.insert(field.name().clone(), cell_to_json(column, i));
        }
    }
    Ok(rows)
}

fn base_fields() -> Vec<Field> {
    vec![
        Field::new(STEP_COLUMN, DataType::Int64, true),
        Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ]
}

fn read_batch(path: &Path) -> Result<RecordBatch> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(path)?)?.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    match batches.first() {
        None => Ok(RecordBatch::new_empty(Arc::new(Schema::new(base_fields())))),
        Some(first) => {
            let schema = first.schema();
            Ok(arrow::compute::concat_batches(&schema, &batches)?)
        }
    }
}

fn union_batches(existing: &RecordBatch, incoming: &RecordBatch) -> Result<RecordBatch> {
    let mut fields: Vec<Field> = existing
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    for field in incoming.schema().fields() {
        if !fields.iter().any(|f| f.name() == field.name()) {
            fields.push(field.as_ref().clone());
        }
    }
    let schema: SchemaRef = Arc::new(Schema::new(fields));

    let aligned = [
        pad_to_schema(existing, &schema)?,
        pad_to_schema(incoming, &schema)?,
    ];
    Ok(arrow::compute::concat_batches(&schema, &aligned)?)
}

/// Reorder a batch's columns to `schema`, filling absent ones with nulls.
fn pad_to_schema(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let n = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|field| match batch.column_by_name(field.name()) {
            Some(column) => column.clone(),
            None => null_column(field.data_type(), n),
        })
        .collect();
    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}

fn null_column(data_type: &DataType, n: usize) -> ArrayRef {
    match data_type {
        DataType::Float64 => Arc::new(Float64Array::from(vec![None::<f64>; n])),
        DataType::Int64 => Arc::new(Int64Array::from(vec![None::<i64>; n])),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Arc::new(
            TimestampMicrosecondArray::from(vec![None::<i64>; n]).with_timezone("UTC"),
        ),
        _ => Arc::new(StringArray::from(vec![None::<&str>; n])),
    }
}

fn rows_to_batch(rows: &[MetricRow]) -> Result<RecordBatch> {
    // Metric columns in first-seen order, sorted within a row for stability
    let mut keys: Vec<&String> = vec![];
    for row in rows {
        let mut row_keys: Vec<&String> = row.values.keys().collect();
        row_keys.sort();
        for key in row_keys {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut fields = base_fields();
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.step as i64))),
        Arc::new(
            TimestampMicrosecondArray::from_iter_values(
                rows.iter().map(|r| r.timestamp.timestamp_micros()),
            )
            .with_timezone("UTC"),
        ),
    ];

    for key in keys {
        let numeric = rows
            .iter()
            .find_map(|r| r.values.get(key))
            .is_some_and(|v| v.as_f64().is_some());

        if numeric {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|r| r.values.get(key).and_then(MetricValue::as_f64))
                .collect();
            fields.push(Field::new(key.as_str(), DataType::Float64, true));
            columns.push(Arc::new(Float64Array::from(values)));
        } else {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|r| r.values.get(key).map(metric_text))
                .collect();
            fields.push(Field::new(key.as_str(), DataType::Utf8, true));
            columns.push(Arc::new(StringArray::from(values)));
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn metric_text(value: &MetricValue) -> String {
    match value {
        MetricValue::Text(s) => s.clone(),
        MetricValue::Bool(b) => b.to_string(),
        MetricValue::Float(f) => f.to_string(),
        MetricValue::Int(i) => i.to_string(),
    }
}

fn cell_to_json(column: &ArrayRef, i: usize) -> Value {
    if column.is_null(i) {
        return Value::Null;
    }
    let any = column.as_any();
    match column.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .and_then(|a| serde_json::Number::from_f64(a.value(i)))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Value::from(a.value(i)))
            .unwrap_or(Value::Null),
        DataType::Timestamp(TimeUnit::Microsecond, _) => any
            .downcast_ref::<TimestampMicrosecondArray>()
            .and_then(|a| DateTime::<Utc>::from_timestamp_micros(a.value(i)))
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null),
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Value::String(a.value(i).to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
