pub mod cli;
#[cfg(feature = "s3")]
pub mod s3;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::volume::{RunMode, VolumeLayout};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::io::SaveMode;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "handson-etl")]
#[command(about = "Flight data ETL over local or Databricks volumes")]
pub struct CliConfig {
    #[arg(long, default_value = "datasets/input/2015-summary.csv")]
    pub source_file: String,

    #[arg(long, default_value = "datasets/input/multiline.json")]
    pub people_file: Option<String>,

    #[arg(long, help = "local or databricks (defaults to $RUN_MODE)")]
    pub run_mode: Option<String>,

    #[arg(long, help = "Override the volume root (./volumes or /Volumes)")]
    pub volume_root: Option<String>,

    #[arg(long, default_value = "datasets")]
    pub workspace_dir: String,

    #[arg(long, default_value = "overwrite")]
    pub save_mode: String,

    #[arg(long, default_value = "10")]
    pub top_n: usize,

    #[arg(long, help = "Zip the output folder into etl_output.zip")]
    pub archive: bool,

    #[arg(long, help = "Upload the top destinations CSV to s3://bucket/key")]
    pub s3_target: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn people_file(&self) -> Option<&str> {
        self.people_file.as_deref()
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_else(RunMode::from_env)
    }

    fn volume(&self) -> VolumeLayout {
        match &self.volume_root {
            Some(root) => VolumeLayout::new(root),
            None => VolumeLayout::for_mode(self.run_mode()),
        }
    }

    fn workspace_dir(&self) -> &str {
        &self.workspace_dir
    }

    fn save_mode(&self) -> SaveMode {
        self.save_mode.parse().unwrap_or_default()
    }

    fn top_n(&self) -> usize {
        self.top_n
    }

    fn archive_output(&self) -> bool {
        self.archive
    }

    fn s3_target(&self) -> Option<&str> {
        self.s3_target.as_deref()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("source_file", &self.source_file)?;
        validation::validate_file_extensions(
            "source_file",
            std::slice::from_ref(&self.source_file),
            &["csv"],
        )?;
        if let Some(people) = &self.people_file {
            validation::validate_file_extensions(
                "people_file",
                std::slice::from_ref(people),
                &["json"],
            )?;
        }
        if let Some(mode) = &self.run_mode {
            mode.parse::<RunMode>()?;
        }
        if let Some(root) = &self.volume_root {
            validation::validate_path("volume_root", root)?;
        }
        self.save_mode.parse::<SaveMode>()?;
        validation::validate_positive_number("top_n", self.top_n, 1)?;
        if let Some(target) = &self.s3_target {
            validation::parse_s3_uri("s3_target", target)?;
        }

        tracing::info!("✅ CLI configuration validation passed");
        Ok(())
    }
}
