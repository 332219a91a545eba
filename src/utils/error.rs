use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Parse error at position {position}: {message}")]
    ParseError { position: usize, message: String },

    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Path already exists: {path}")]
    PathExists { path: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn schema(message: impl Into<String>) -> Self {
        EtlError::SchemaError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        EtlError::StorageError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Io,
            EtlError::StorageError { .. } | EtlError::PathExists { .. } => ErrorCategory::Storage,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ParquetError(_)
            | EtlError::ArrowError(_)
            | EtlError::SchemaError { .. }
            | EtlError::ParseError { .. }
            | EtlError::MalformedRecord { .. }
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 已存在的輸出目錄：使用者換個 save mode 即可
            EtlError::PathExists { .. } => ErrorSeverity::Low,
            EtlError::StorageError { .. } | EtlError::IoError(_) => ErrorSeverity::Medium,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::MissingConfigError { field } => {
                format!("Set '{}' in the config file or on the command line", field)
            }
            EtlError::InvalidConfigValueError { field, .. }
            | EtlError::ConfigValidationError { field, .. } => {
                format!("Check the value of '{}'", field)
            }
            EtlError::ConfigError { .. } => "Review the configuration file".to_string(),
            EtlError::PathExists { .. } => {
                "Use save mode 'overwrite' or 'append', or remove the existing output".to_string()
            }
            EtlError::MalformedRecord { .. } => {
                "Fix the input file or read it with mode 'permissive'".to_string()
            }
            EtlError::SchemaError { .. } => {
                "Check column names and types against the input schema".to_string()
            }
            EtlError::ParseError { .. } => "Check the SQL expression syntax".to_string(),
            EtlError::StorageError { .. } | EtlError::IoError(_) => {
                "Verify the path exists and is writable, then retry".to_string()
            }
            _ => "Inspect the input data and rerun with --verbose".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Storage => format!("Storage problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::MissingConfigError {
            field: "source_file".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.recovery_suggestion().contains("source_file"));
    }

    #[test]
    fn test_path_exists_is_low_severity() {
        let err = EtlError::PathExists {
            path: "/tmp/out".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[test]
    fn test_user_friendly_message_mentions_category() {
        let err = EtlError::schema("Column 'x' not found");
        assert!(err.user_friendly_message().starts_with("Data problem"));
    }
}
