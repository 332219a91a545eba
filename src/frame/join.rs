use crate::domain::model::{Field, Row, Schema, Value};
use crate::frame::{value, DataFrame};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    LeftSemi,
    LeftAnti,
}

impl FromStr for JoinType {
    type Err = EtlError;

    /// Accepts the same spellings as Spark's `how` argument.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "").as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" | "leftouter" => Ok(JoinType::Left),
            "right" | "rightouter" => Ok(JoinType::Right),
            "full" | "outer" | "fullouter" => Ok(JoinType::Full),
            "leftsemi" | "semi" => Ok(JoinType::LeftSemi),
            "leftanti" | "anti" => Ok(JoinType::LeftAnti),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "join type".to_string(),
                value: s.to_string(),
                reason: "expected inner, left, right, full, left_semi or left_anti".to_string(),
            }),
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
            JoinType::LeftSemi => "left_semi",
            JoinType::LeftAnti => "left_anti",
        };
        write!(f, "{}", name)
    }
}

fn nulls(n: usize) -> Row {
    vec![Value::Null; n]
}

fn concat_rows(left: &Row, right: &Row) -> Row {
    let mut out = Vec::with_capacity(left.len() + right.len());
    out.extend(left.iter().cloned());
    out.extend(right.iter().cloned());
    out
}

impl DataFrame {
    /// Equi-join on `left_on = right_on`. Null keys never match.
    ///
    /// The output holds every left column followed by every right column
    /// (left columns only for semi/anti joins). Left rows come out in
    /// input order, each followed by its matches in right order; a right
    /// or full join appends unmatched right rows at the end.
    pub fn join(
        &self,
        other: &DataFrame,
        left_on: &str,
        right_on: &str,
        how: JoinType,
    ) -> Result<DataFrame> {
        let li = self.schema().require(left_on)?;
        let ri = other.schema().require(right_on)?;

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows().iter().enumerate() {
            if !row[ri].is_null() {
                index.entry(value::key_of(&[&row[ri]])).or_default().push(i);
            }
        }

        let left_width = self.schema().len();
        let right_width = other.schema().len();
        let mut right_matched = vec![false; other.count()];
        let mut rows = Vec::new();

        for left in self.rows() {
            let matches: &[usize] = if left[li].is_null() {
                &[]
            } else {
                index
                    .get(&value::key_of(&[&left[li]]))
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
            };
            match how {
                JoinType::LeftSemi => {
                    if !matches.is_empty() {
                        rows.push(left.clone());
                    }
                }
                JoinType::LeftAnti => {
                    if matches.is_empty() {
                        rows.push(left.clone());
                    }
                }
                _ => {
                    for &m in matches {
                        right_matched[m] = true;
                        rows.push(concat_rows(left, &other.rows()[m]));
                    }
                    if matches.is_empty() && matches!(how, JoinType::Left | JoinType::Full) {
                        rows.push(concat_rows(left, &nulls(right_width)));
                    }
                }
            }
        }

        if matches!(how, JoinType::Right | JoinType::Full) {
            for (i, right) in other.rows().iter().enumerate() {
                if !right_matched[i] {
                    rows.push(concat_rows(&nulls(left_width), right));
                }
            }
        }

        let schema = match how {
            JoinType::LeftSemi | JoinType::LeftAnti => self.schema().clone(),
            _ => {
                let mut fields = self.schema().fields.clone();
                fields.extend(other.schema().fields.iter().cloned());
                Schema::new(fields)
            }
        };
        DataFrame::new(schema, rows)
    }

    /// Join on a column present on both sides; the key appears once.
    pub fn join_using(&self, other: &DataFrame, column: &str, how: JoinType) -> Result<DataFrame> {
        let joined = self.join(other, column, column, how)?;
        if matches!(how, JoinType::LeftSemi | JoinType::LeftAnti) {
            return Ok(joined);
        }
        let li = self.schema().require(column)?;
        let ri = self.schema().len() + other.schema().require(column)?;

        let mut fields: Vec<Field> = Vec::with_capacity(joined.schema().len() - 1);
        for (i, f) in joined.schema().fields.iter().enumerate() {
            if i != ri {
                fields.push(f.clone());
            }
        }
        let rows = joined
            .rows()
            .iter()
            .map(|row| {
                let mut out: Row = row
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != ri)
                    .map(|(_, v)| v.clone())
                    .collect();
                // 右側獨有的列，key 取自右表
                if out[li].is_null() {
                    out[li] = row[ri].clone();
                }
                out
            })
            .collect();
        DataFrame::new(Schema::new(fields), rows)
    }

    /// Cartesian product, left-major.
    pub fn cross_join(&self, other: &DataFrame) -> Result<DataFrame> {
        let mut fields = self.schema().fields.clone();
        fields.extend(other.schema().fields.iter().cloned());
        let rows = self
            .rows()
            .iter()
            .flat_map(|l| other.rows().iter().map(move |r| concat_rows(l, r)))
            .collect();
        DataFrame::new(Schema::new(fields), rows)
    }
}
