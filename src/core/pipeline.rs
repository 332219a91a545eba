use crate::core::volume::VolumeLayout;
use crate::core::{ConfigProvider, Extracted, Pipeline, Storage, TransformResult};
use crate::domain::model::{DataType, Field, Schema};
use crate::frame::functions::{col, dense_rank, sum};
use crate::frame::window::Window;
use crate::frame::DataFrame;
use crate::io::DataFrameReader;
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::{FileOptions, ZipWriter};

pub const DEST_COLUMN: &str = "DEST_COUNTRY_NAME";
pub const COUNT_COLUMN: &str = "count";
pub const MANIFEST_FILE: &str = "run_manifest.json";
pub const ARCHIVE_FILE: &str = "etl_output.zip";
pub const TOP_DESTINATIONS: &str = "top_destinations";
pub const RANKED_FLIGHTS: &str = "ranked_flights";

/// Explicit schema for the flight CSV. The header line doesn't fit it and
/// ends up as a bad record.
pub fn raw_flight_schema() -> Schema {
    Schema::new(vec![
        Field::new("COUNTRY_1", DataType::String),
        Field::new("COUNTRY_2", DataType::String),
        Field::new("TOTAL_COUNT", DataType::Integer),
    ])
}

/// 讀取航班 CSV、轉換後寫入 volume 的 output/ 與 other/
pub struct HandsOnPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    layout: VolumeLayout,
}

impl<S: Storage, C: ConfigProvider> HandsOnPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let layout = config.volume();
        Self {
            storage,
            config,
            layout,
        }
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    fn top_destinations(&self, flights: &DataFrame) -> Result<DataFrame> {
        flights
            .group_by(&[DEST_COLUMN])
            .agg(vec![sum(col(COUNT_COLUMN)).alias("total_flights")])?
            .sort(vec![col("total_flights").desc(), col(DEST_COLUMN).asc()])
            .map(|df| df.limit(self.config.top_n()))
    }

    fn ranked_flights(&self, flights: &DataFrame) -> Result<DataFrame> {
        let spec = Window::partition_by(&[DEST_COLUMN]).order_by(vec![col(COUNT_COLUMN).desc()]);
        flights.with_column("rank", dense_rank().over(spec))
    }

    async fn upload_summary(&self, target: &str, dir: &Path) -> Result<()> {
        #[cfg(feature = "s3")]
        {
            use crate::config::s3::{S3Storage, S3Target};

            let target = S3Target::parse(target)?;
            let part = crate::io::part_files(dir, "csv")?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    EtlError::storage(format!("No CSV part to upload in {}", dir.display()))
                })?;
            let storage = S3Storage::connect(&target.bucket, crate::config::s3::DEFAULT_REGION).await;
            storage.write_file(&target.key, &fs::read(&part)?).await?;
            info!("☁️ Uploaded {} to {}", part.display(), target);
            Ok(())
        }
        #[cfg(not(feature = "s3"))]
        {
            warn!(
                "⚠️ s3_target {} is set but this build has no S3 support, skipping upload of {}",
                target,
                dir.display()
            );
            Ok(())
        }
    }
}

fn collect_files(dir: &Path, base: &Path, files: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_files(&path, base, files)?;
        } else {
            let name = path
                .strip_prefix(base)
                .map_err(|e| EtlError::storage(e.to_string()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((name, path));
        }
    }
    Ok(())
}

/// Zips everything under `dir` (except an earlier archive or manifest)
/// and adds the manifest as `run_manifest.json`.
fn archive_directory(dir: &Path, manifest: &[u8]) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, path) in files {
        if name == ARCHIVE_FILE || name == MANIFEST_FILE {
            continue;
        }
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(&fs::read(&path)?)?;
    }
    zip.start_file::<_, ()>(MANIFEST_FILE, FileOptions::default())?;
    zip.write_all(manifest)?;

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for HandsOnPipeline<S, C> {
    async fn extract(&self) -> Result<Extracted> {
        self.layout.ensure()?;
        let csv_path = self.layout.stage_input(Path::new(self.config.source_file()))?;

        let flights = DataFrameReader::new()
            .option("header", "true")?
            .option("inferSchema", "true")?
            .csv(&csv_path)?;
        debug!("Flight schema:\n{}", flights.schema().tree_string());

        let flights_raw = DataFrameReader::new()
            .schema(raw_flight_schema())
            .option("mode", "PERMISSIVE")?
            .csv(&csv_path)?;

        let people = match self.config.people_file() {
            Some(file) if Path::new(file).is_file() => {
                let staged = self.layout.stage_input(Path::new(file))?;
                Some(
                    DataFrameReader::new()
                        .option("multiline", "true")?
                        .json(&staged)?,
                )
            }
            Some(file) => {
                warn!("⚠️ People file {} not found, skipping JSON input", file);
                None
            }
            None => None,
        };

        info!(
            "📥 Extracted {} flight rows ({} raw), {} people rows",
            flights.count(),
            flights_raw.count(),
            people.as_ref().map_or(0, DataFrame::count)
        );
        Ok(Extracted {
            flights,
            flights_raw,
            people,
        })
    }

    async fn transform(&self, data: Extracted) -> Result<TransformResult> {
        for column in [DEST_COLUMN, COUNT_COLUMN] {
            data.flights.schema().require(column)?;
        }

        let bad_records = data.flights_raw.filter(col("TOTAL_COUNT").is_null())?;
        if bad_records.count() > 0 {
            warn!("⚠️ {} bad records in the flight file", bad_records.count());
        }

        let summaries = vec![
            (TOP_DESTINATIONS.to_string(), self.top_destinations(&data.flights)?),
            (RANKED_FLIGHTS.to_string(), self.ranked_flights(&data.flights)?),
        ];
        for (name, df) in &summaries {
            debug!("Summary {} has {} rows", name, df.count());
        }

        Ok(TransformResult {
            flights: data.flights,
            bad_records,
            people: data.people,
            summaries,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let mode = self.config.save_mode();
        let output = self.layout.output_dir();
        let other = self.layout.other_dir();

        let parquet_dir = output.join("parquet_data");
        result.flights.write().mode(mode).parquet(&parquet_dir)?;
        let parquet_df = DataFrameReader::new().parquet(&parquet_dir)?;

        parquet_df
            .write()
            .mode(mode)
            .option("header", "true")?
            .csv(output.join("csv_output"))?;

        let partition_column = parquet_df
            .columns()
            .into_iter()
            .next()
            .ok_or_else(|| EtlError::schema("Flight data has no columns to partition by"))?;
        parquet_df
            .write()
            .mode(mode)
            .option("header", "true")?
            .partition_by(&[partition_column.as_str()])
            .csv(output.join("partitioned_csv"))?;
        info!("✅ Partitioned output ready ({})", partition_column);

        result
            .bad_records
            .write()
            .mode(mode)
            .option("header", "true")?
            .csv(other.join("bad_records"))?;

        if let Some(people) = &result.people {
            people.write().mode(mode).json(output.join("people_json"))?;
        }

        let mut rows = Map::new();
        rows.insert("flights".to_string(), json!(result.flights.count()));
        rows.insert("bad_records".to_string(), json!(result.bad_records.count()));
        if let Some(people) = &result.people {
            rows.insert("people".to_string(), json!(people.count()));
        }
        for (name, df) in &result.summaries {
            df.write()
                .mode(mode)
                .option("header", "true")?
                .csv(output.join(name))?;
            rows.insert(name.clone(), json!(df.count()));
        }

        let manifest = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "run_mode": self.config.run_mode().to_string(),
            "volume": self.layout.qualified_name(),
            "save_mode": mode.to_string(),
            "rows": Value::Object(rows),
        });
        let manifest = serde_json::to_vec_pretty(&manifest)?;
        self.storage.write_file(MANIFEST_FILE, &manifest).await?;

        let mut output_path = output.display().to_string();
        if self.config.archive_output() {
            let zip_data = archive_directory(&output, &manifest)?;
            debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(ARCHIVE_FILE, &zip_data).await?;
            output_path = output.join(ARCHIVE_FILE).display().to_string();
        }

        if let Some(target) = self.config.s3_target() {
            self.upload_summary(target, &output.join(TOP_DESTINATIONS))
                .await?;
        }

        let workspace = self.config.workspace_dir();
        if workspace.is_empty() {
            debug!("No workspace dir configured, skipping sync back");
        } else {
            let workspace = Path::new(workspace);
            VolumeLayout::sync_back(&output, &workspace.join("output"))?;
            VolumeLayout::sync_back(&other, &workspace.join("other"))?;
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::volume::RunMode;
    use crate::io::SaveMode;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    const FLIGHTS: &str = "DEST_COUNTRY_NAME,ORIGIN_COUNTRY_NAME,count\n\
United States,Romania,15\n\
United States,Croatia,1\n\
United States,Ireland,344\n\
Egypt,United States,15\n\
India,United States,62\n";

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        source_file: String,
        people_file: Option<String>,
        root: PathBuf,
        workspace_dir: String,
        save_mode: SaveMode,
        archive: bool,
    }

    impl MockConfig {
        fn new(tmp: &TempDir) -> Self {
            let source = tmp.path().join("2015-summary.csv");
            fs::write(&source, FLIGHTS).unwrap();
            Self {
                source_file: source.display().to_string(),
                people_file: None,
                root: tmp.path().join("volumes"),
                workspace_dir: tmp.path().join("datasets").display().to_string(),
                save_mode: SaveMode::Overwrite,
                archive: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn source_file(&self) -> &str {
            &self.source_file
        }

        fn people_file(&self) -> Option<&str> {
            self.people_file.as_deref()
        }

        fn run_mode(&self) -> RunMode {
            RunMode::Local
        }

        fn volume(&self) -> VolumeLayout {
            VolumeLayout::new(&self.root)
        }

        fn workspace_dir(&self) -> &str {
            &self.workspace_dir
        }

        fn save_mode(&self) -> SaveMode {
            self.save_mode
        }

        fn top_n(&self) -> usize {
            2
        }

        fn archive_output(&self) -> bool {
            self.archive
        }

        fn s3_target(&self) -> Option<&str> {
            None
        }
    }

    #[tokio::test]
    async fn test_extract_stages_and_reads_both_ways() {
        let tmp = TempDir::new().unwrap();
        let pipeline = HandsOnPipeline::new(MockStorage::new(), MockConfig::new(&tmp));

        let extracted = pipeline.extract().await.unwrap();

        assert!(pipeline.layout().input_dir().join("2015-summary.csv").exists());
        assert_eq!(extracted.flights.count(), 5);
        assert_eq!(extracted.flights.schema().fields[2].data_type, DataType::Integer);
        // 表頭被當成一筆資料
        assert_eq!(extracted.flights_raw.count(), 6);
        assert!(extracted.people.is_none());
    }

    #[tokio::test]
    async fn test_extract_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let mut config = MockConfig::new(&tmp);
        config.source_file = tmp.path().join("missing.csv").display().to_string();
        let pipeline = HandsOnPipeline::new(MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::StorageError { .. }));
    }

    #[tokio::test]
    async fn test_transform_builds_summaries() {
        let tmp = TempDir::new().unwrap();
        let pipeline = HandsOnPipeline::new(MockStorage::new(), MockConfig::new(&tmp));
        let extracted = pipeline.extract().await.unwrap();

        let result = pipeline.transform(extracted).await.unwrap();

        assert_eq!(result.bad_records.count(), 1);
        let (name, top) = &result.summaries[0];
        assert_eq!(name, TOP_DESTINATIONS);
        assert_eq!(top.count(), 2);
        assert_eq!(
            top.column_values(DEST_COLUMN).unwrap(),
            vec![json!("United States"), json!("India")]
        );
        assert_eq!(top.column_values("total_flights").unwrap()[0], json!(360));

        let (_, ranked) = &result.summaries[1];
        assert_eq!(
            ranked.column_values("rank").unwrap(),
            vec![json!(2), json!(3), json!(1), json!(1), json!(1)]
        );
    }

    #[tokio::test]
    async fn test_load_writes_outputs_manifest_and_archive() {
        let tmp = TempDir::new().unwrap();
        let storage = MockStorage::new();
        let pipeline = HandsOnPipeline::new(storage.clone(), MockConfig::new(&tmp));
        let extracted = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extracted).await.unwrap();

        let output_path = pipeline.load(result).await.unwrap();

        let output = pipeline.layout().output_dir();
        assert_eq!(output_path, output.join(ARCHIVE_FILE).display().to_string());
        assert!(output.join("parquet_data/_SUCCESS").exists());
        assert!(output.join("csv_output/part-00000.csv").exists());
        assert!(output
            .join("partitioned_csv/DEST_COUNTRY_NAME=Egypt/part-00000.csv")
            .exists());
        assert!(pipeline.layout().other_dir().join("bad_records/_SUCCESS").exists());

        let manifest: Value =
            serde_json::from_slice(&storage.get_file(MANIFEST_FILE).await.unwrap()).unwrap();
        assert_eq!(manifest["rows"]["flights"], json!(5));
        assert_eq!(manifest["rows"]["bad_records"], json!(1));
        assert_eq!(manifest["run_mode"], json!("local"));

        let zip_bytes = storage.get_file(ARCHIVE_FILE).await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"csv_output/part-00000.csv".to_string()));
        assert!(names.contains(&MANIFEST_FILE.to_string()));

        let synced = tmp.path().join("datasets/output/csv_output/part-00000.csv");
        assert!(synced.exists());
        assert!(tmp.path().join("datasets/other/bad_records").is_dir());
    }

    #[tokio::test]
    async fn test_load_without_archive_returns_output_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = MockStorage::new();
        let mut config = MockConfig::new(&tmp);
        config.archive = false;
        config.workspace_dir = String::new();
        let pipeline = HandsOnPipeline::new(storage.clone(), config);
        let extracted = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extracted).await.unwrap();

        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(
            output_path,
            pipeline.layout().output_dir().display().to_string()
        );
        assert!(storage.get_file(ARCHIVE_FILE).await.is_none());
        assert!(!tmp.path().join("datasets").exists());
    }

    #[tokio::test]
    async fn test_second_load_with_error_mode_fails() {
        let tmp = TempDir::new().unwrap();
        let mut config = MockConfig::new(&tmp);
        config.save_mode = SaveMode::ErrorIfExists;
        config.archive = false;
        let pipeline = HandsOnPipeline::new(MockStorage::new(), config);

        let extracted = pipeline.extract().await.unwrap();
        let result = pipeline.transform(extracted).await.unwrap();
        pipeline.load(result.clone()).await.unwrap();

        let err = pipeline.load(result).await.unwrap_err();
        assert!(matches!(err, EtlError::PathExists { .. }));
    }
}
