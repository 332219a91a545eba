use crate::domain::model::{DataType, Field, Row, Schema, Value};
use crate::frame::{value, DataFrame};
use crate::io::{mark_success, next_part_path, part_files, prepare_output, SaveMode};
use crate::utils::error::Result;
use serde_json::Map;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub const CORRUPT_RECORD: &str = "_corrupt_record";

enum Record {
    Object(Map<String, Value>),
    Corrupt(String),
}

fn records_from_document(text: &str) -> Result<Vec<Record>> {
    let doc: Value = serde_json::from_str(text)?;
    Ok(match doc {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Record::Object(map),
                other => Record::Corrupt(other.to_string()),
            })
            .collect(),
        Value::Object(map) => vec![Record::Object(map)],
        other => vec![Record::Corrupt(other.to_string())],
    })
}

fn records_from_lines(text: &str) -> Vec<Record> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Record::Object(map),
            _ => Record::Corrupt(line.to_string()),
        })
        .collect()
}

/// Reads a JSON file, or every `.json` part of a directory.
///
/// `multiline` treats each file as one document (an array of objects or a
/// single object); otherwise every line is its own record and lines that
/// don't parse land in `_corrupt_record`.
pub fn read_json(path: &Path, multiline: bool) -> Result<DataFrame> {
    let mut records = Vec::new();
    for file in part_files(path, "json")? {
        let text = fs::read_to_string(&file)?;
        if multiline {
            records.extend(records_from_document(&text)?);
        } else {
            records.extend(records_from_lines(&text));
        }
    }

    // 欄位依名稱排序，型別取所有紀錄的聯集
    let mut types: BTreeMap<String, DataType> = BTreeMap::new();
    let mut corrupt = 0;
    for record in &records {
        match record {
            Record::Object(map) => {
                for (key, v) in map {
                    let entry = types.entry(key.clone()).or_insert(DataType::Null);
                    *entry = entry.widen(&value::infer_type(v));
                }
            }
            Record::Corrupt(_) => corrupt += 1,
        }
    }
    if corrupt > 0 {
        warn!("⚠️ {} malformed JSON records in {}", corrupt, path.display());
        types.insert(CORRUPT_RECORD.to_string(), DataType::String);
    }

    let fields: Vec<Field> = types
        .into_iter()
        .map(|(name, dt)| {
            let dt = if dt == DataType::Null {
                DataType::String
            } else {
                dt
            };
            Field::new(name, dt)
        })
        .collect();
    let schema = Schema::new(fields);

    let rows = records
        .into_iter()
        .map(|record| match record {
            Record::Object(mut map) => schema
                .fields
                .iter()
                .map(|f| conform(map.remove(&f.name).unwrap_or(Value::Null), &f.data_type))
                .collect::<Row>(),
            Record::Corrupt(text) => schema
                .fields
                .iter()
                .map(|f| {
                    if f.name == CORRUPT_RECORD {
                        Value::String(text.clone())
                    } else {
                        Value::Null
                    }
                })
                .collect(),
        })
        .collect();

    debug!("Read JSON from {} ({} columns)", path.display(), schema.len());
    DataFrame::new(schema, rows)
}

/// Brings a value in line with its widened type, recursing into structs
/// and arrays (long and double mixed become double, scalars under a
/// string type become strings).
fn conform(v: Value, dt: &DataType) -> Value {
    match (v, dt) {
        (Value::Null, _) => Value::Null,
        (Value::Object(map), DataType::Struct(fields)) => Value::Object(
            map.into_iter()
                .map(|(key, v)| {
                    let v = match fields.iter().find(|f| f.name == key) {
                        Some(field) => conform(v, &field.data_type),
                        None => v,
                    };
                    (key, v)
                })
                .collect(),
        ),
        (Value::Array(items), DataType::Array(inner)) => {
            Value::Array(items.into_iter().map(|item| conform(item, inner)).collect())
        }
        (v @ (Value::Array(_) | Value::Object(_)), _) => v,
        (v, DataType::Double) => value::cast(&v, &DataType::Double),
        (v @ Value::String(_), DataType::String) => v,
        (v, DataType::String) => Value::String(value::display(&v)),
        (v, _) => v,
    }
}

/// Writes JSON Lines to `dir/part-NNNNN.json`; null fields are omitted.
pub fn write_json(df: &DataFrame, dir: &Path, mode: SaveMode) -> Result<()> {
    if !prepare_output(dir, mode)? {
        return Ok(());
    }
    let path = next_part_path(dir, "json")?;
    let mut out = fs::File::create(&path)?;
    for row in df.rows() {
        let object: Map<String, Value> = df
            .schema()
            .fields
            .iter()
            .zip(row)
            .filter(|(_, v)| !v.is_null())
            .map(|(f, v)| (f.name.clone(), v.clone()))
            .collect();
        serde_json::to_writer(&mut out, &Value::Object(object))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    mark_success(dir)
}
