//! Volume layout (`<root>/<catalog>/<schema>/<volume>/{input,output,other}`)
//! and the file bridges between the workspace and the volume.

use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const DEFAULT_CATALOG: &str = "workspace";
pub const DEFAULT_SCHEMA: &str = "default";
pub const DEFAULT_VOLUME: &str = "my_elt_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Local,
    Databricks,
}

impl RunMode {
    /// Reads `RUN_MODE`; unset or unknown values mean local.
    pub fn from_env() -> Self {
        match std::env::var("RUN_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("⚠️ Unknown RUN_MODE '{}', falling back to local", raw);
                RunMode::Local
            }),
            Err(_) => RunMode::Local,
        }
    }

    pub fn volume_root(&self) -> &'static str {
        match self {
            RunMode::Local => "./volumes",
            RunMode::Databricks => "/Volumes",
        }
    }
}

impl FromStr for RunMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RunMode::Local),
            "databricks" => Ok(RunMode::Databricks),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "run_mode".to_string(),
                value: s.to_string(),
                reason: "expected local or databricks".to_string(),
            }),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Local => write!(f, "local"),
            RunMode::Databricks => write!(f, "databricks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLayout {
    pub root: PathBuf,
    pub catalog: String,
    pub schema: String,
    pub volume: String,
}

/// Result of [`VolumeLayout::sync_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Copied { files: usize },
    SourceMissing,
}

impl VolumeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            catalog: DEFAULT_CATALOG.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            volume: DEFAULT_VOLUME.to_string(),
        }
    }

    pub fn for_mode(mode: RunMode) -> Self {
        Self::new(mode.volume_root())
    }

    pub fn base(&self) -> PathBuf {
        self.root
            .join(&self.catalog)
            .join(&self.schema)
            .join(&self.volume)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.base().join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base().join("output")
    }

    pub fn other_dir(&self) -> PathBuf {
        self.base().join("other")
    }

    /// `catalog.schema.volume`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, self.volume)
    }

    /// Creates the volume and its `input/`, `output/` and `other/` folders.
    pub fn ensure(&self) -> Result<PathBuf> {
        for dir in [self.input_dir(), self.output_dir(), self.other_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                EtlError::storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        info!(
            "✅ Volume {} ready at {}",
            self.qualified_name(),
            self.base().display()
        );
        Ok(self.base())
    }

    /// Copies a workspace file into `input/`, keeping its file name.
    pub fn stage_input(&self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(EtlError::storage(format!(
                "Source file not found: {}",
                source.display()
            )));
        }
        let file_name = source.file_name().ok_or_else(|| {
            EtlError::storage(format!("Source has no file name: {}", source.display()))
        })?;
        let target = self.input_dir().join(file_name);
        fs::create_dir_all(self.input_dir())?;
        fs::copy(source, &target)?;
        info!("📦 Staged {} -> {}", source.display(), target.display());
        Ok(target)
    }

    /// Replaces `dest` with a recursive copy of `src`.
    pub fn sync_back(src: &Path, dest: &Path) -> Result<SyncOutcome> {
        if !src.exists() {
            warn!("⚠️ Nothing to sync, {} does not exist", src.display());
            return Ok(SyncOutcome::SourceMissing);
        }
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let files = copy_tree(src, dest)?;
        info!(
            "🔄 Synced {} files from {} to {}",
            files,
            src.display(),
            dest.display()
        );
        Ok(SyncOutcome::Copied { files })
    }
}

impl Default for VolumeLayout {
    fn default() -> Self {
        Self::for_mode(RunMode::Local)
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else {
            debug!("Copying {}", entry.path().display());
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
