use crate::core::volume::{RunMode, VolumeLayout};
use crate::core::ConfigProvider;
use crate::io::SaveMode;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    pub people_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub run_mode: Option<RunMode>,
    pub root: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub workspace_dir: String,
    pub save_mode: Option<String>,
    pub top_n: Option<usize>,
    pub archive: Option<bool>,
    pub s3_target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AWS_ACCOUNT_ID})；未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validation::validate_path("source.file", &self.source.file)?;
        validation::validate_file_extensions(
            "source.file",
            std::slice::from_ref(&self.source.file),
            &["csv"],
        )?;
        if let Some(people) = &self.source.people_file {
            validation::validate_file_extensions(
                "source.people_file",
                std::slice::from_ref(people),
                &["json"],
            )?;
        }

        if let Some(root) = &self.volume.root {
            validation::validate_path("volume.root", root)?;
        }
        for (field, value) in [
            ("volume.catalog", &self.volume.catalog),
            ("volume.schema", &self.volume.schema),
            ("volume.name", &self.volume.name),
        ] {
            if let Some(value) = value {
                validation::validate_identifier(field, value)?;
            }
        }

        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str()) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "monitoring.log_level".to_string(),
                    value: level.to_string(),
                    reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
                });
            }
        }

        if let Some(mode) = &self.load.save_mode {
            mode.parse::<SaveMode>()?;
        }
        if let Some(top_n) = self.load.top_n {
            validation::validate_range("load.top_n", top_n, 1, 1000)?;
        }
        if let Some(target) = &self.load.s3_target {
            // 環境變數未設定時 ${VAR} 會原樣留下
            if target.contains("${") {
                return Err(EtlError::MissingConfigError {
                    field: "load.s3_target".to_string(),
                });
            }
            validation::parse_s3_uri("load.s3_target", target)?;
        }

        Ok(())
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// `monitoring.log_level`, validated in `validate_config`.
    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn source_file(&self) -> &str {
        &self.source.file
    }

    fn people_file(&self) -> Option<&str> {
        self.source.people_file.as_deref()
    }

    fn run_mode(&self) -> RunMode {
        self.volume.run_mode.unwrap_or_else(RunMode::from_env)
    }

    fn volume(&self) -> VolumeLayout {
        let mut layout = match &self.volume.root {
            Some(root) => VolumeLayout::new(root),
            None => VolumeLayout::for_mode(self.run_mode()),
        };
        if let Some(catalog) = &self.volume.catalog {
            layout.catalog = catalog.clone();
        }
        if let Some(schema) = &self.volume.schema {
            layout.schema = schema.clone();
        }
        if let Some(name) = &self.volume.name {
            layout.volume = name.clone();
        }
        layout
    }

    fn workspace_dir(&self) -> &str {
        &self.load.workspace_dir
    }

    fn save_mode(&self) -> SaveMode {
        self.load
            .save_mode
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or(SaveMode::Overwrite)
    }

    fn top_n(&self) -> usize {
        self.load.top_n.unwrap_or(10)
    }

    fn archive_output(&self) -> bool {
        self.load.archive.unwrap_or(false)
    }

    fn s3_target(&self) -> Option<&str> {
        self.load.s3_target.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[pipeline]
name = "flights"
description = "Flight summary"
version = "1.0.0"

[source]
file = "datasets/input/2015-summary.csv"
people_file = "datasets/input/multiline.json"

[volume]
run_mode = "databricks"
catalog = "main"

[load]
workspace_dir = "datasets"
save_mode = "append"
top_n = 5
archive = true
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = TomlConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.pipeline.name, "flights");
        assert_eq!(config.run_mode(), RunMode::Databricks);
        assert_eq!(config.volume().qualified_name(), "main.default.my_elt_data");
        assert!(config.volume().base().starts_with("/Volumes"));
        assert_eq!(config.save_mode(), SaveMode::Append);
        assert_eq!(config.top_n(), 5);
        assert!(config.archive_output());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HANDSON_TEST_BUCKET", "sos-databricks-bucket");

        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
file = "flights.csv"

[load]
workspace_dir = "datasets"
s3_target = "s3://${HANDSON_TEST_BUCKET}/etl/result.csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.s3_target(),
            Some("s3://sos-databricks-bucket/etl/result.csv")
        );
        assert!(config.validate().is_ok());

        std::env::remove_var("HANDSON_TEST_BUCKET");
    }

    #[test]
    fn test_unset_env_var_is_reported_as_missing() {
        let content = BASIC.replace(
            "archive = true",
            "archive = true\ns3_target = \"s3://${HANDSON_UNSET_BUCKET}/etl/result.csv\"",
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[pipeline]
name = "test"
description = "test"
version = "1.0"

[source]
file = "flights.parquet"

[load]
workspace_dir = "datasets"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let bad_volume = BASIC.replace("catalog = \"main\"", "catalog = \"main db\"");
        let config = TomlConfig::from_toml_str(&bad_volume).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_run_mode_is_a_parse_error() {
        let content = BASIC.replace("\"databricks\"", "\"cloud\"");
        assert!(TomlConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_monitoring_log_level() {
        let content = format!(
            "{}\n[monitoring]\nenabled = true\nlog_level = \"debug\"\n",
            BASIC
        );
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert!(config.monitoring_enabled());
        assert_eq!(config.log_level(), Some("debug"));
        assert!(config.validate().is_ok());

        let noisy = content.replace("\"debug\"", "\"chatty\"");
        let config = TomlConfig::from_toml_str(&noisy).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "flights");
    }
}
