use crate::domain::model::{DataType, Field, Row, Schema, Value};
use crate::frame::{value, DataFrame};
use crate::io::{mark_success, next_part_path, prepare_output, SaveMode};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// How rows that don't fit an explicit schema are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Unparseable cells become null, short rows are padded.
    #[default]
    Permissive,
    DropMalformed,
    FailFast,
}

impl FromStr for ReadMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(ReadMode::Permissive),
            "dropmalformed" => Ok(ReadMode::DropMalformed),
            "failfast" => Ok(ReadMode::FailFast),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "mode".to_string(),
                value: s.to_string(),
                reason: "expected PERMISSIVE, DROPMALFORMED or FAILFAST".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub header: bool,
    pub infer_schema: bool,
    pub delimiter: u8,
    pub mode: ReadMode,
    pub schema: Option<Schema>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            header: false,
            infer_schema: false,
            delimiter: b',',
            mode: ReadMode::Permissive,
            schema: None,
        }
    }
}

/// Narrowest type a single CSV cell parses as.
fn infer_cell(cell: &str) -> DataType {
    if cell.parse::<i32>().is_ok() {
        DataType::Integer
    } else if cell.parse::<i64>().is_ok() {
        DataType::Long
    } else if cell.parse::<f64>().is_ok() {
        DataType::Double
    } else if cell.eq_ignore_ascii_case("true") || cell.eq_ignore_ascii_case("false") {
        DataType::Boolean
    } else {
        DataType::String
    }
}

fn infer_schema(names: &[String], records: &[(usize, Vec<String>)], infer: bool) -> Schema {
    let mut types = vec![DataType::Null; names.len()];
    if infer {
        for (_, cells) in records {
            for (t, cell) in types.iter_mut().zip(cells) {
                if !cell.is_empty() {
                    *t = t.widen(&infer_cell(cell));
                }
            }
        }
    }
    let fields = names
        .iter()
        .zip(types)
        .map(|(name, dt)| {
            let dt = if dt == DataType::Null {
                DataType::String
            } else {
                dt
            };
            Field::new(name.clone(), dt)
        })
        .collect();
    Schema::new(fields)
}

/// Converts one record to `schema`. Returns the row and whether it was malformed.
fn convert_record(cells: &[String], schema: &Schema) -> (Row, bool) {
    let mut malformed = cells.len() != schema.len();
    let row = schema
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| match cells.get(i) {
            None => Value::Null,
            Some(cell) if cell.is_empty() => Value::Null,
            Some(cell) => {
                let v = value::cast(&Value::String(cell.clone()), &field.data_type);
                if v.is_null() {
                    malformed = true;
                }
                v
            }
        })
        .collect();
    (row, malformed)
}

/// Reads a CSV file, or every `.csv` part of a directory in name order.
pub fn read_csv(path: &Path, options: &CsvReadOptions) -> Result<DataFrame> {
    let files = super::part_files(path, "csv")?;
    debug!("Reading CSV from {} ({} files)", path.display(), files.len());

    let mut names: Option<Vec<String>> = None;
    let mut records: Vec<(usize, Vec<String>)> = Vec::new();
    for file in &files {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .from_path(file)?;
        let mut first = true;
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            // 每個 part 檔都有自己的標題列
            if first && options.header {
                first = false;
                if names.is_none() {
                    names = Some(cells);
                }
                continue;
            }
            first = false;
            records.push((line, cells));
        }
    }

    let schema = match &options.schema {
        Some(schema) => schema.clone(),
        None => {
            let names = names.unwrap_or_else(|| {
                let width = records.first().map(|(_, c)| c.len()).unwrap_or(0);
                (0..width).map(|i| format!("_c{}", i)).collect()
            });
            infer_schema(&names, &records, options.infer_schema)
        }
    };

    let mut rows = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for (line, cells) in &records {
        let (row, malformed) = convert_record(cells, &schema);
        if malformed {
            match options.mode {
                ReadMode::Permissive => {}
                ReadMode::DropMalformed => {
                    dropped += 1;
                    continue;
                }
                ReadMode::FailFast => {
                    return Err(EtlError::MalformedRecord {
                        line: *line,
                        message: format!(
                            "record [{}] does not match schema ({} columns)",
                            cells.join(","),
                            schema.len()
                        ),
                    })
                }
            }
        }
        rows.push(row);
    }
    if dropped > 0 {
        warn!("⚠️ Dropped {} malformed CSV records", dropped);
    }
    DataFrame::new(schema, rows)
}

fn render_cell(v: &Value, column: &str) -> Result<String> {
    match v {
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(EtlError::schema(format!(
            "CSV output doesn't support nested column '{}'",
            column
        ))),
        other => Ok(value::display(other)),
    }
}

fn write_part(df_schema: &Schema, rows: &[&Row], dir: &Path, header: bool) -> Result<PathBuf> {
    let path = next_part_path(dir, "csv")?;
    let mut writer = ::csv::WriterBuilder::new().from_path(&path)?;
    if header {
        writer.write_record(df_schema.fields.iter().map(|f| f.name.as_str()))?;
    }
    for row in rows {
        let cells = row
            .iter()
            .zip(&df_schema.fields)
            .map(|(v, f)| render_cell(v, &f.name))
            .collect::<Result<Vec<_>>>()?;
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Writes `dir/part-NNNNN.csv` plus `_SUCCESS`.
pub fn write_csv(df: &DataFrame, dir: &Path, mode: SaveMode, header: bool) -> Result<()> {
    if !prepare_output(dir, mode)? {
        return Ok(());
    }
    let rows: Vec<&Row> = df.rows().iter().collect();
    let path = write_part(df.schema(), &rows, dir, header)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    mark_success(dir)
}

const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Percent-encodes the bytes Hive treats as special in partition paths.
pub fn escape_path_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let special = matches!(
            c,
            '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '\x7F' | '{' | '[' | ']'
                | '^'
        ) || (c as u32) < 0x20;
        if special {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

fn partition_dir_name(column: &str, v: &Value) -> String {
    let rendered = match v {
        Value::Null => HIVE_DEFAULT_PARTITION.to_string(),
        Value::String(s) if s.is_empty() => HIVE_DEFAULT_PARTITION.to_string(),
        other => escape_path_name(&value::display(other)),
    };
    format!("{}={}", escape_path_name(column), rendered)
}

/// Writes one CSV part per distinct combination of `partition_cols`
/// under `dir/COL=value/...`; partition columns are left out of the files.
pub fn write_partitioned_csv(
    df: &DataFrame,
    dir: &Path,
    mode: SaveMode,
    header: bool,
    partition_cols: &[&str],
) -> Result<()> {
    let indices = partition_cols
        .iter()
        .map(|c| df.schema().require(c))
        .collect::<Result<Vec<_>>>()?;
    if indices.len() == df.schema().len() {
        return Err(EtlError::schema(
            "Cannot partition by every column; nothing would be left to write",
        ));
    }
    if !prepare_output(dir, mode)? {
        return Ok(());
    }

    let data_fields: Vec<Field> = df
        .schema()
        .fields
        .iter()
        .enumerate()
        .filter(|(i, _)| !indices.contains(i))
        .map(|(_, f)| f.clone())
        .collect();
    let data_schema = Schema::new(data_fields);

    let mut order: Vec<PathBuf> = Vec::new();
    let mut groups: HashMap<PathBuf, Vec<Row>> = HashMap::new();
    for row in df.rows() {
        let mut sub = dir.to_path_buf();
        for (&i, column) in indices.iter().zip(partition_cols) {
            sub.push(partition_dir_name(column, &row[i]));
        }
        let data: Row = row
            .iter()
            .enumerate()
            .filter(|(i, _)| !indices.contains(i))
            .map(|(_, v)| v.clone())
            .collect();
        groups
            .entry(sub.clone())
            .or_insert_with(|| {
                order.push(sub);
                Vec::new()
            })
            .push(data);
    }

    for sub in &order {
        let rows: Vec<&Row> = groups[sub].iter().collect();
        fs::create_dir_all(sub)?;
        write_part(&data_schema, &rows, sub, header)?;
    }
    debug!("Wrote {} partitions under {}", order.len(), dir.display());
    mark_success(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    const FLIGHTS: &str = "DEST_COUNTRY_NAME,ORIGIN_COUNTRY_NAME,count\n\
        United States,Romania,15\n\
        United States,Croatia,1\n\
        Egypt,United States,15\n";

    fn flights_file(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("flights.csv");
        fs::write(&path, FLIGHTS).unwrap();
        path
    }

    #[test]
    fn test_header_and_infer_schema() {
        let tmp = TempDir::new().unwrap();
        let options = CsvReadOptions {
            header: true,
            infer_schema: true,
            ..Default::default()
        };
        let df = read_csv(&flights_file(&tmp), &options).unwrap();
        assert_eq!(df.count(), 3);
        assert_eq!(
            df.columns(),
            vec!["DEST_COUNTRY_NAME", "ORIGIN_COUNTRY_NAME", "count"]
        );
        assert_eq!(df.schema().fields[2].data_type, DataType::Integer);
        assert_eq!(df.rows()[0][2], json!(15));
    }

    #[test]
    fn test_without_inference_everything_is_string() {
        let tmp = TempDir::new().unwrap();
        let df = read_csv(&flights_file(&tmp), &CsvReadOptions::default()).unwrap();
        assert_eq!(df.columns(), vec!["_c0", "_c1", "_c2"]);
        assert_eq!(df.count(), 4);
        assert!(df
            .schema()
            .fields
            .iter()
            .all(|f| f.data_type == DataType::String));
    }

    fn explicit_schema() -> Schema {
        Schema::new(vec![
            Field::new("COUNTRY_1", DataType::String),
            Field::new("COUNTRY_2", DataType::String),
            Field::new("TOTAL_COUNT", DataType::Integer),
        ])
    }

    #[test]
    fn test_permissive_keeps_header_as_bad_record() {
        let tmp = TempDir::new().unwrap();
        let options = CsvReadOptions {
            schema: Some(explicit_schema()),
            ..Default::default()
        };
        let df = read_csv(&flights_file(&tmp), &options).unwrap();
        assert_eq!(df.count(), 4);
        assert_eq!(df.rows()[0][2], Value::Null);
        assert_eq!(df.rows()[0][0], json!("DEST_COUNTRY_NAME"));
    }

    #[test]
    fn test_drop_malformed_and_fail_fast() {
        let tmp = TempDir::new().unwrap();
        let path = flights_file(&tmp);
        let dropping = CsvReadOptions {
            schema: Some(explicit_schema()),
            mode: ReadMode::DropMalformed,
            ..Default::default()
        };
        assert_eq!(read_csv(&path, &dropping).unwrap().count(), 3);

        let failing = CsvReadOptions {
            schema: Some(explicit_schema()),
            mode: ReadMode::FailFast,
            ..Default::default()
        };
        match read_csv(&path, &failing) {
            Err(EtlError::MalformedRecord { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_are_padded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("short.csv");
        fs::write(&path, "a,b,1\nc\n").unwrap();
        let options = CsvReadOptions {
            schema: Some(explicit_schema()),
            ..Default::default()
        };
        let df = read_csv(&path, &options).unwrap();
        assert_eq!(df.rows()[1], vec![json!("c"), Value::Null, Value::Null]);
    }

    #[test]
    fn test_write_then_read_directory() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("csv_output");
        let df = DataFrame::from_rows(
            &["name", "score"],
            vec![vec![json!("a, b"), json!(1.5)], vec![Value::Null, json!(2.0)]],
        )
        .unwrap();
        write_csv(&df, &out, SaveMode::Overwrite, true).unwrap();
        assert!(out.join("part-00000.csv").exists());
        assert!(out.join("_SUCCESS").exists());

        let text = fs::read_to_string(out.join("part-00000.csv")).unwrap();
        assert_eq!(text, "name,score\n\"a, b\",1.5\n,2.0\n");

        let options = CsvReadOptions {
            header: true,
            infer_schema: true,
            ..Default::default()
        };
        let back = read_csv(&out, &options).unwrap();
        assert_eq!(back.count(), 2);
        assert_eq!(back.schema().fields[1].data_type, DataType::Double);
    }

    #[test]
    fn test_partitioned_layout() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("partitioned_csv");
        let df = DataFrame::from_rows(
            &["country", "count"],
            vec![
                vec![json!("United States"), json!(15)],
                vec![json!("Bonaire, Sint Eustatius/Saba"), json!(1)],
                vec![Value::Null, json!(3)],
                vec![json!("United States"), json!(2)],
            ],
        )
        .unwrap();
        write_partitioned_csv(&df, &out, SaveMode::Overwrite, true, &["country"]).unwrap();

        let us = fs::read_to_string(out.join("country=United States/part-00000.csv")).unwrap();
        assert_eq!(us, "count\n15\n2\n");
        assert!(out
            .join("country=Bonaire, Sint Eustatius%2FSaba/part-00000.csv")
            .exists());
        assert!(out
            .join("country=__HIVE_DEFAULT_PARTITION__/part-00000.csv")
            .exists());
        assert!(out.join("_SUCCESS").exists());
    }

    #[test]
    fn test_escape_path_name() {
        assert_eq!(escape_path_name("a/b=c"), "a%2Fb%3Dc");
        assert_eq!(escape_path_name("plain text"), "plain text");
    }
}
