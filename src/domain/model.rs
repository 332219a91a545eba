use crate::frame::DataFrame;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 單一儲存格的值；日期以 `yyyy-MM-dd` 字串保存
pub type Value = serde_json::Value;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Date,
    Array(Box<DataType>),
    Struct(Vec<Field>),
    Null,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Long | DataType::Double)
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Long)
    }

    /// Spark-style type name, e.g. `string` or `array<long>`.
    pub fn simple_string(&self) -> String {
        match self {
            DataType::String => "string".to_string(),
            DataType::Integer => "integer".to_string(),
            DataType::Long => "long".to_string(),
            DataType::Double => "double".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Null => "void".to_string(),
            DataType::Array(inner) => format!("array<{}>", inner.simple_string()),
            DataType::Struct(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}:{}", f.name, f.data_type.simple_string()))
                    .collect();
                format!("struct<{}>", inner.join(","))
            }
        }
    }

    /// 型別名稱解析，用於 cast 與設定檔中的 schema
    pub fn parse(name: &str) -> Result<DataType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "varchar" | "text" => Ok(DataType::String),
            "int" | "integer" => Ok(DataType::Integer),
            "long" | "bigint" => Ok(DataType::Long),
            "double" | "float" | "decimal" => Ok(DataType::Double),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            other => Err(EtlError::schema(format!("Unsupported data type: {}", other))),
        }
    }

    /// Smallest type both sides fit into; used by schema inference and unions.
    pub fn widen(&self, other: &DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (DataType::Null, b) => b.clone(),
            (a, DataType::Null) => a.clone(),
            (DataType::Integer, DataType::Long) | (DataType::Long, DataType::Integer) => {
                DataType::Long
            }
            (a, b) if a.is_numeric() && b.is_numeric() => DataType::Double,
            (DataType::Array(a), DataType::Array(b)) => DataType::Array(Box::new(a.widen(b))),
            (DataType::Struct(a), DataType::Struct(b)) => DataType::Struct(merge_fields(a, b)),
            _ => DataType::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_string())
    }
}

fn merge_fields(a: &[Field], b: &[Field]) -> Vec<Field> {
    let mut merged: Vec<Field> = a.to_vec();
    for field in b {
        match merged.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => existing.data_type = existing.data_type.widen(&field.data_type),
            None => merged.push(field.clone()),
        }
    }
    merged.sort_by(|x, y| x.name.cmp(&y.name));
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Column lookup is case-insensitive, as in Spark's default analyzer.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|f| f.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name).ok_or_else(|| {
            EtlError::schema(format!(
                "Column '{}' not found. Available columns: [{}]",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// `printSchema` output.
    pub fn tree_string(&self) -> String {
        let mut out = String::from("root\n");
        for field in &self.fields {
            write_field(&mut out, field, 1);
        }
        out
    }
}

fn write_field(out: &mut String, field: &Field, depth: usize) {
    let prefix = " |   ".repeat(depth - 1);
    let type_name = match &field.data_type {
        DataType::Array(_) => "array".to_string(),
        DataType::Struct(_) => "struct".to_string(),
        other => other.simple_string(),
    };
    out.push_str(&format!(
        "{} |-- {}: {} (nullable = {})\n",
        prefix, field.name, type_name, field.nullable
    ));
    write_nested(out, &field.data_type, depth);
}

fn write_nested(out: &mut String, data_type: &DataType, depth: usize) {
    match data_type {
        DataType::Struct(fields) => {
            for child in fields {
                write_field(out, child, depth + 1);
            }
        }
        DataType::Array(inner) => {
            let prefix = " |   ".repeat(depth);
            let type_name = match inner.as_ref() {
                DataType::Array(_) => "array".to_string(),
                DataType::Struct(_) => "struct".to_string(),
                other => other.simple_string(),
            };
            out.push_str(&format!(
                "{} |-- element: {} (containsNull = true)\n",
                prefix, type_name
            ));
            write_nested(out, inner, depth + 1);
        }
        _ => {}
    }
}

/// extract 階段讀入的資料
#[derive(Debug, Clone)]
pub struct Extracted {
    /// header + inferred schema
    pub flights: DataFrame,
    /// explicit schema, permissive, header line kept as data
    pub flights_raw: DataFrame,
    pub people: Option<DataFrame>,
}

/// transform 階段的產出
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub flights: DataFrame,
    pub bad_records: DataFrame,
    pub people: Option<DataFrame>,
    pub summaries: Vec<(String, DataFrame)>,
}
