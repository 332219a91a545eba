use crate::utils::error::{EtlError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_file_extensions(
    field_name: &str,
    files: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for file in files {
        match std::path::Path::new(file)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(extension) if allowed_set.contains(extension) => {}
            Some(extension) => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: format!(
                        "Unsupported file extension: {}. Allowed extensions: {}",
                        extension,
                        allowed_extensions.join(", ")
                    ),
                });
            }
            None => {
                return Err(EtlError::InvalidConfigValueError {
                    field: field_name.to_string(),
                    value: file.clone(),
                    reason: "File has no extension or invalid filename".to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Catalog, schema and volume names end up in paths and SQL identifiers.
pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Only letters, digits, '_' and '-' are allowed".to_string(),
        });
    }
    Ok(())
}

pub fn validate_s3_bucket_name(field_name: &str, bucket_name: &str) -> Result<()> {
    if bucket_name.len() < 3 || bucket_name.len() > 63 {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name must be between 3 and 63 characters".to_string(),
        });
    }

    if !bucket_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name can only contain lowercase letters, numbers, hyphens, and dots"
                .to_string(),
        });
    }

    if bucket_name.starts_with('-') || bucket_name.ends_with('-') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: bucket_name.to_string(),
            reason: "S3 bucket name cannot start or end with a hyphen".to_string(),
        });
    }

    Ok(())
}

/// 解析 `s3://bucket/key`，回傳 (bucket, key)
pub fn parse_s3_uri(field_name: &str, uri: &str) -> Result<(String, String)> {
    let invalid = |reason: String| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: uri.to_string(),
        reason,
    };

    let url = Url::parse(uri).map_err(|e| invalid(format!("Invalid URL format: {}", e)))?;
    if url.scheme() != "s3" {
        return Err(invalid(format!("Unsupported URL scheme: {}", url.scheme())));
    }

    let bucket = url
        .host_str()
        .ok_or_else(|| invalid("Missing bucket name".to_string()))?
        .to_string();
    validate_s3_bucket_name(field_name, &bucket)?;

    let key = url.path().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(invalid("Missing object key".to_string()));
    }

    Ok((bucket, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("top_n", 5, 1).is_ok());
        assert!(validate_positive_number("top_n", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let files = vec!["2015-summary.csv".to_string(), "multiline.json".to_string()];
        assert!(validate_file_extensions("inputs", &files, &["csv", "json"]).is_ok());

        let invalid_files = vec!["data.txt".to_string()];
        assert!(validate_file_extensions("inputs", &invalid_files, &["csv", "json"]).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("volume", "my_elt_data").is_ok());
        assert!(validate_identifier("volume", "my elt").is_err());
        assert!(validate_identifier("volume", "  ").is_err());
    }

    #[test]
    fn test_parse_s3_uri() {
        let (bucket, key) = parse_s3_uri("s3_target", "s3://sos-databricks-bucket/etl/result.csv")
            .unwrap();
        assert_eq!(bucket, "sos-databricks-bucket");
        assert_eq!(key, "etl/result.csv");

        assert!(parse_s3_uri("s3_target", "https://example.com/a.csv").is_err());
        assert!(parse_s3_uri("s3_target", "s3://Bad_Bucket/a.csv").is_err());
        assert!(parse_s3_uri("s3_target", "s3://good-bucket").is_err());
    }
}
