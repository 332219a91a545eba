//! Readers and writers for CSV, JSON and Parquet in Spark's directory
//! layout (`part-00000.<ext>` files plus a `_SUCCESS` marker).

pub mod csv;
pub mod json;
pub mod parquet;

pub use self::csv::{CsvReadOptions, ReadMode};

use crate::domain::model::Schema;
use crate::frame::DataFrame;
use crate::utils::error::{EtlError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    Overwrite,
    Append,
    #[default]
    ErrorIfExists,
    Ignore,
}

impl FromStr for SaveMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(SaveMode::Overwrite),
            "append" => Ok(SaveMode::Append),
            "error" | "errorifexists" | "error_if_exists" => Ok(SaveMode::ErrorIfExists),
            "ignore" => Ok(SaveMode::Ignore),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "save_mode".to_string(),
                value: s.to_string(),
                reason: "expected overwrite, append, error or ignore".to_string(),
            }),
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveMode::Overwrite => "overwrite",
            SaveMode::Append => "append",
            SaveMode::ErrorIfExists => "errorifexists",
            SaveMode::Ignore => "ignore",
        };
        write!(f, "{}", name)
    }
}

/// Applies `mode` to an output directory. Returns `false` when the write
/// should be skipped (`Ignore` on an existing path).
pub(crate) fn prepare_output(dir: &Path, mode: SaveMode) -> Result<bool> {
    if dir.exists() {
        match mode {
            SaveMode::ErrorIfExists => {
                return Err(EtlError::PathExists {
                    path: dir.display().to_string(),
                })
            }
            SaveMode::Ignore => {
                info!("⏭️ {} exists, skipping write", dir.display());
                return Ok(false);
            }
            SaveMode::Overwrite => {
                debug!("Removing existing output {}", dir.display());
                if dir.is_dir() {
                    fs::remove_dir_all(dir)?;
                } else {
                    fs::remove_file(dir)?;
                }
            }
            SaveMode::Append => {}
        }
    }
    fs::create_dir_all(dir)?;
    Ok(true)
}

/// Path of the next `part-NNNNN.<ext>` file in `dir`.
pub(crate) fn next_part_path(dir: &Path, ext: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let mut existing = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        if name.to_string_lossy().starts_with("part-") {
            existing += 1;
        }
    }
    Ok(dir.join(format!("part-{:05}.{}", existing, ext)))
}

pub(crate) fn mark_success(dir: &Path) -> Result<()> {
    fs::write(dir.join(SUCCESS_MARKER), b"")?;
    Ok(())
}

/// Part files with the given extension, in name order. A plain file path
/// is returned as is.
pub(crate) fn part_files(path: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(EtlError::storage(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }
    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
    Parquet,
}

impl FromStr for Format {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "parquet" => Ok(Format::Parquet),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "format".to_string(),
                value: s.to_string(),
                reason: "expected csv, json or parquet".to_string(),
            }),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(EtlError::InvalidConfigValueError {
            field: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

/// `spark.read` builder.
#[derive(Debug, Clone, Default)]
pub struct DataFrameReader {
    format: Option<Format>,
    csv: CsvReadOptions,
    multiline: bool,
}

impl DataFrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: &str) -> Result<Self> {
        self.format = Some(format.parse()?);
        Ok(self)
    }

    /// Recognises `header`, `inferSchema`, `delimiter`/`sep`, `mode` and
    /// `multiline`; option keys are case-insensitive.
    pub fn option(mut self, key: &str, value: &str) -> Result<Self> {
        match key.to_ascii_lowercase().as_str() {
            "header" => self.csv.header = parse_flag(key, value)?,
            "inferschema" => self.csv.infer_schema = parse_flag(key, value)?,
            "delimiter" | "sep" => {
                let mut bytes = value.bytes();
                match (bytes.next(), bytes.next()) {
                    (Some(b), None) => self.csv.delimiter = b,
                    _ => {
                        return Err(EtlError::InvalidConfigValueError {
                            field: key.to_string(),
                            value: value.to_string(),
                            reason: "delimiter must be a single byte".to_string(),
                        })
                    }
                }
            }
            "mode" => self.csv.mode = value.parse()?,
            "multiline" => self.multiline = parse_flag(key, value)?,
            other => debug!("Ignoring unknown read option {}", other),
        }
        Ok(self)
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.csv.schema = Some(schema);
        self
    }

    pub fn csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self::csv::read_csv(path.as_ref(), &self.csv)
    }

    pub fn json(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self::json::read_json(path.as_ref(), self.multiline)
    }

    pub fn parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        self::parquet::read_parquet(path.as_ref())
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        match self.format.unwrap_or(Format::Parquet) {
            Format::Csv => self.csv(path),
            Format::Json => self.json(path),
            Format::Parquet => self.parquet(path),
        }
    }
}

/// `df.write` builder.
pub struct DataFrameWriter<'a> {
    df: &'a DataFrame,
    mode: SaveMode,
    header: bool,
    partition_by: Vec<String>,
}

impl<'a> DataFrameWriter<'a> {
    pub fn new(df: &'a DataFrame) -> Self {
        Self {
            df,
            mode: SaveMode::default(),
            header: false,
            partition_by: Vec::new(),
        }
    }

    pub fn mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn option(mut self, key: &str, value: &str) -> Result<Self> {
        match key.to_ascii_lowercase().as_str() {
            "header" => self.header = parse_flag(key, value)?,
            other => debug!("Ignoring unknown write option {}", other),
        }
        Ok(self)
    }

    pub fn partition_by(mut self, columns: &[&str]) -> Self {
        self.partition_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn csv(&self, dir: impl AsRef<Path>) -> Result<()> {
        if self.partition_by.is_empty() {
            self::csv::write_csv(self.df, dir.as_ref(), self.mode, self.header)
        } else {
            let cols: Vec<&str> = self.partition_by.iter().map(String::as_str).collect();
            self::csv::write_partitioned_csv(self.df, dir.as_ref(), self.mode, self.header, &cols)
        }
    }

    pub fn json(&self, dir: impl AsRef<Path>) -> Result<()> {
        self::json::write_json(self.df, dir.as_ref(), self.mode)
    }

    pub fn parquet(&self, dir: impl AsRef<Path>) -> Result<()> {
        if !self.partition_by.is_empty() {
            return Err(EtlError::schema(
                "partitionBy is only supported for CSV output",
            ));
        }
        self::parquet::write_parquet(self.df, dir.as_ref(), self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_mode_parsing() {
        assert_eq!("OVERWRITE".parse::<SaveMode>().unwrap(), SaveMode::Overwrite);
        assert_eq!("error".parse::<SaveMode>().unwrap(), SaveMode::ErrorIfExists);
        assert!("replace".parse::<SaveMode>().is_err());
        assert_eq!(SaveMode::default(), SaveMode::ErrorIfExists);
    }

    #[test]
    fn test_prepare_output_modes() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out");

        assert!(prepare_output(&dir, SaveMode::ErrorIfExists).unwrap());
        fs::write(dir.join("part-00000.csv"), "a").unwrap();

        assert!(matches!(
            prepare_output(&dir, SaveMode::ErrorIfExists),
            Err(EtlError::PathExists { .. })
        ));
        assert!(!prepare_output(&dir, SaveMode::Ignore).unwrap());

        prepare_output(&dir, SaveMode::Append).unwrap();
        assert_eq!(
            next_part_path(&dir, "csv").unwrap(),
            dir.join("part-00001.csv")
        );

        prepare_output(&dir, SaveMode::Overwrite).unwrap();
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_reader_options() {
        let reader = DataFrameReader::new()
            .option("header", "true")
            .unwrap()
            .option("inferSchema", "TRUE")
            .unwrap()
            .option("mode", "DROPMALFORMED")
            .unwrap();
        assert!(reader.csv.header);
        assert!(reader.csv.infer_schema);
        assert_eq!(reader.csv.mode, ReadMode::DropMalformed);
        assert!(DataFrameReader::new().option("header", "yes").is_err());
        assert!(DataFrameReader::new().option("sep", "::").is_err());
    }
}
