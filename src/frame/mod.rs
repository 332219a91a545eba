//! In-memory DataFrame engine modelled on the PySpark DataFrame API.
//!
//! A [`DataFrame`] is an immutable schema plus row-major data. Every
//! transformation returns a new frame; row order is deterministic (input
//! order unless the operation sorts, first-seen order for groups).

pub mod aggregate;
pub mod display;
pub mod expr;
pub mod functions;
pub mod join;
pub mod session;
pub mod sql;
pub mod value;
pub mod window;

use crate::domain::model::{DataType, Field, Row, Schema, Value};
use crate::utils::error::{EtlError, Result};
use aggregate::GroupedData;
use expr::{Expr, SortExpr};
use std::cmp::Ordering;
use std::collections::HashSet;

pub use join::JoinType;
pub use session::Session;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    schema: Schema,
    rows: Vec<Row>,
}

/// Compares two rows' sort keys under `orders` (Spark defaults: nulls
/// first when ascending, last when descending).
pub(crate) fn compare_sort_keys(a: &[Value], b: &[Value], orders: &[SortExpr]) -> Ordering {
    for ((x, y), order) in a.iter().zip(b.iter()).zip(orders) {
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if order.nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, true) => {
                if order.nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, false) => {
                let ord = value::compare(x, y);
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl DataFrame {
    /// Builds a frame from an explicit schema; every row must match its width.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != schema.len())
        {
            return Err(EtlError::schema(format!(
                "Row {} has {} values but the schema has {} columns",
                i,
                row.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// `createDataFrame(data, columns)`: column types are inferred from the values.
    pub fn from_rows(columns: &[&str], rows: Vec<Row>) -> Result<Self> {
        let mut types = vec![DataType::Null; columns.len()];
        for row in &rows {
            for (t, v) in types.iter_mut().zip(row.iter()) {
                *t = t.widen(&value::infer_type(v));
            }
        }
        let fields = columns
            .iter()
            .zip(types)
            .map(|(name, dt)| {
                // 全部為 null 的欄位視為字串
                let dt = if dt == DataType::Null {
                    DataType::String
                } else {
                    dt
                };
                Field::new(*name, dt)
            })
            .collect();
        Self::new(Schema::new(fields), rows)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn collect(&self) -> Vec<Row> {
        self.rows.clone()
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> Vec<String> {
        self.schema.names()
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>> {
        let idx = self.schema.require(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Replaces window sub-expressions with temporary columns so the
    /// remaining expressions can be evaluated row by row.
    fn materialize_windows(&self, exprs: Vec<Expr>) -> Result<(DataFrame, Vec<Expr>)> {
        if !exprs.iter().any(|e| e.contains_window()) {
            return Ok((self.clone(), exprs));
        }
        let mut staged = self.clone();
        let mut failure = None;
        let mut counter = 0usize;
        let mut rewritten = Vec::with_capacity(exprs.len());
        for e in exprs {
            let original_name = e.name();
            let replaced = e.transform(&mut |node| {
                let Expr::Window(w) = &node else {
                    return node;
                };
                match w.compute(&staged) {
                    Ok(values) => {
                        let name = format!("__window_{}", counter);
                        counter += 1;
                        let dt = w
                            .data_type(staged.schema())
                            .unwrap_or(DataType::Null);
                        staged.schema.fields.push(Field::new(name.clone(), dt));
                        for (row, v) in staged.rows.iter_mut().zip(values) {
                            row.push(v);
                        }
                        Expr::Column(name)
                    }
                    Err(err) => {
                        failure.get_or_insert(err);
                        Expr::Literal(Value::Null)
                    }
                }
            });
            // 保留原本的欄位名稱，不要露出暫存欄位名
            let replaced = match replaced {
                aliased @ Expr::Alias(..) => aliased,
                other => other.alias(original_name),
            };
            rewritten.push(replaced);
        }
        if let Some(err) = failure {
            return Err(err);
        }
        Ok((staged, rewritten))
    }

    /// `select(...)`; `col("*")` expands to every column.
    pub fn select(&self, exprs: Vec<Expr>) -> Result<DataFrame> {
        if exprs.iter().any(|e| e.contains_aggregate()) {
            return aggregate::aggregate_frame(self, &[], &exprs);
        }

        let mut expanded = Vec::new();
        for e in exprs {
            match e {
                Expr::Wildcard => expanded.extend(
                    self.schema
                        .fields
                        .iter()
                        .map(|f| Expr::Column(f.name.clone())),
                ),
                other => expanded.push(other),
            }
        }

        let (source, exprs) = self.materialize_windows(expanded)?;
        let fields = exprs
            .iter()
            .map(|e| Ok(Field::new(e.name(), e.data_type(&source.schema)?)))
            .collect::<Result<Vec<_>>>()?;
        let rows = source
            .rows
            .iter()
            .map(|row| {
                exprs
                    .iter()
                    .map(|e| e.eval(&source.schema, row))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DataFrame {
            schema: Schema::new(fields),
            rows,
        })
    }

    /// `select("id", "name")`
    pub fn select_columns(&self, names: &[&str]) -> Result<DataFrame> {
        self.select(names.iter().map(|n| functions::col(n)).collect())
    }

    /// `selectExpr("id + 5 as id_plus_5", ...)`
    pub fn select_expr(&self, texts: &[&str]) -> Result<DataFrame> {
        let exprs = texts
            .iter()
            .map(|t| sql::parse_select_item(t))
            .collect::<Result<Vec<_>>>()?;
        self.select(exprs)
    }

    /// Keeps rows where `condition` is exactly true; null counts as false.
    pub fn filter(&self, condition: Expr) -> Result<DataFrame> {
        if condition.contains_aggregate() || condition.contains_window() {
            return Err(EtlError::schema(format!(
                "Filter condition '{}' may not contain aggregate or window functions",
                condition.name()
            )));
        }
        let dt = condition.data_type(&self.schema)?;
        if dt != DataType::Boolean && dt != DataType::Null {
            return Err(EtlError::schema(format!(
                "Filter condition '{}' is of type {}, expected boolean",
                condition.name(),
                dt
            )));
        }
        let mut rows = Vec::new();
        for row in &self.rows {
            if condition.eval(&self.schema, row)? == Value::Bool(true) {
                rows.push(row.clone());
            }
        }
        Ok(DataFrame {
            schema: self.schema.clone(),
            rows,
        })
    }

    /// `where("address = 'JAPAN' and salary > 70000")`
    pub fn where_expr(&self, condition: &str) -> Result<DataFrame> {
        self.filter(sql::parse_expression(condition)?)
    }

    /// Replaces the column if it exists, otherwise appends it.
    pub fn with_column(&self, name: &str, e: impl Into<Expr>) -> Result<DataFrame> {
        let e = e.into().alias(name);
        let mut exprs: Vec<Expr> = Vec::with_capacity(self.schema.len() + 1);
        let mut replaced = false;
        for field in &self.schema.fields {
            if field.name == name {
                exprs.push(e.clone());
                replaced = true;
            } else {
                exprs.push(Expr::Column(field.name.clone()));
            }
        }
        if !replaced {
            exprs.push(e);
        }
        self.select(exprs)
    }

    /// Appends (or replaces) `name` with `function` evaluated over `spec`.
    pub fn with_window_column(
        &self,
        name: &str,
        function: window::WindowFunction,
        spec: window::WindowSpec,
    ) -> Result<DataFrame> {
        self.with_column(name, function.over(spec))
    }

    /// Renaming a column that doesn't exist is a no-op, as in Spark.
    pub fn with_column_renamed(&self, existing: &str, new_name: &str) -> DataFrame {
        let mut schema = self.schema.clone();
        for field in schema.fields.iter_mut() {
            if field.name == existing {
                field.name = new_name.to_string();
            }
        }
        DataFrame {
            schema,
            rows: self.rows.clone(),
        }
    }

    /// Unknown column names are ignored.
    pub fn drop(&self, names: &[&str]) -> DataFrame {
        let keep: Vec<usize> = self
            .schema
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !names.contains(&f.name.as_str()))
            .map(|(i, _)| i)
            .collect();
        self.project(&keep)
    }

    fn project(&self, indices: &[usize]) -> DataFrame {
        let fields = indices
            .iter()
            .map(|&i| self.schema.fields[i].clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
            .collect();
        DataFrame {
            schema: Schema::new(fields),
            rows,
        }
    }

    pub fn limit(&self, n: usize) -> DataFrame {
        DataFrame {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Positional union that keeps duplicates (`union` and `unionAll` are the same).
    pub fn union(&self, other: &DataFrame) -> Result<DataFrame> {
        if self.schema.len() != other.schema.len() {
            return Err(EtlError::schema(format!(
                "Union can only be performed on frames with the same number of columns ({} vs {})",
                self.schema.len(),
                other.schema.len()
            )));
        }
        let fields = self
            .schema
            .fields
            .iter()
            .zip(&other.schema.fields)
            .map(|(l, r)| Field::new(l.name.clone(), l.data_type.widen(&r.data_type)))
            .collect();
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Ok(DataFrame {
            schema: Schema::new(fields),
            rows,
        })
    }

    pub fn union_all(&self, other: &DataFrame) -> Result<DataFrame> {
        self.union(other)
    }

    /// Union matching columns by name instead of position.
    pub fn union_by_name(&self, other: &DataFrame) -> Result<DataFrame> {
        let mut order = Vec::with_capacity(self.schema.len());
        for field in &self.schema.fields {
            let idx = other.schema.index_of(&field.name).ok_or_else(|| {
                EtlError::schema(format!(
                    "Column '{}' is missing from the right side of unionByName",
                    field.name
                ))
            })?;
            order.push(idx);
        }
        if other.schema.len() != self.schema.len() {
            return Err(EtlError::schema(
                "unionByName requires both sides to have the same columns",
            ));
        }
        self.union(&other.project(&order))
    }

    pub fn distinct(&self) -> DataFrame {
        let all: Vec<usize> = (0..self.schema.len()).collect();
        self.dedup_on(&all)
    }

    /// Keeps the first row for each combination of `subset` (all columns when empty).
    pub fn drop_duplicates(&self, subset: &[&str]) -> Result<DataFrame> {
        if subset.is_empty() {
            return Ok(self.distinct());
        }
        let indices = subset
            .iter()
            .map(|c| self.schema.require(c))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.dedup_on(&indices))
    }

    fn dedup_on(&self, indices: &[usize]) -> DataFrame {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                let key: Vec<&Value> = indices.iter().map(|&i| &row[i]).collect();
                seen.insert(value::key_of(&key))
            })
            .cloned()
            .collect();
        DataFrame {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Stable multi-key sort.
    pub fn sort<T: Into<SortExpr>>(&self, orders: impl IntoIterator<Item = T>) -> Result<DataFrame> {
        let orders: Vec<SortExpr> = orders.into_iter().map(Into::into).collect();
        for order in &orders {
            order.expr.data_type(&self.schema)?;
        }
        let mut keyed = self
            .rows
            .iter()
            .map(|row| {
                let keys = orders
                    .iter()
                    .map(|o| o.expr.eval(&self.schema, row))
                    .collect::<Result<Vec<_>>>()?;
                Ok((keys, row.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b, &orders));
        Ok(DataFrame {
            schema: self.schema.clone(),
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        })
    }

    pub fn order_by<T: Into<SortExpr>>(
        &self,
        orders: impl IntoIterator<Item = T>,
    ) -> Result<DataFrame> {
        self.sort(orders)
    }

    pub fn group_by(&self, columns: &[&str]) -> GroupedData<'_> {
        GroupedData::new(self, columns.iter().map(|c| functions::col(c)).collect())
    }

    /// Aggregates over the whole frame (`df.agg(...)`).
    pub fn agg(&self, aggs: Vec<Expr>) -> Result<DataFrame> {
        aggregate::aggregate_frame(self, &[], &aggs)
    }

    /// `select("*", explode(column).alias(alias))`: one output row per array
    /// element, appended under `alias`. Rows with a null or empty array are dropped.
    pub fn explode(&self, column: &str, alias: &str) -> Result<DataFrame> {
        let idx = self.schema.require(column)?;
        let element_type = match &self.schema.fields[idx].data_type {
            DataType::Array(inner) => inner.as_ref().clone(),
            other => {
                return Err(EtlError::schema(format!(
                    "Can't explode '{}' of type {}, expected an array",
                    column, other
                )))
            }
        };

        let mut fields = self.schema.fields.clone();
        fields.push(Field::new(alias, element_type));
        let mut rows = Vec::new();
        for row in &self.rows {
            if let Value::Array(items) = &row[idx] {
                for item in items {
                    let mut out = row.clone();
                    out.push(item.clone());
                    rows.push(out);
                }
            }
        }
        Ok(DataFrame {
            schema: Schema::new(fields),
            rows,
        })
    }

    /// Registers this frame as a temporary view in `session`.
    pub fn create_or_replace_temp_view(&self, session: &Session, name: &str) -> Result<()> {
        session.register_view(name, self.clone())
    }

    pub fn write(&self) -> crate::io::DataFrameWriter<'_> {
        crate::io::DataFrameWriter::new(self)
    }
}
