use crate::domain::model::{DataType, Schema, Value};
use crate::frame::aggregate::AggFunc;
use crate::frame::expr::{Expr, SortExpr};
use crate::frame::{compare_sort_keys, value, DataFrame};
use crate::utils::error::{EtlError, Result};
use std::cmp::Ordering;
use std::collections::HashMap;

/// `Window.partitionBy(...).orderBy(...)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<SortExpr>,
}

pub struct Window;

impl Window {
    pub fn partition_by(columns: &[&str]) -> WindowSpec {
        WindowSpec::default().partition_by(columns)
    }

    pub fn order_by<T: Into<SortExpr>>(orders: impl IntoIterator<Item = T>) -> WindowSpec {
        WindowSpec::default().order_by(orders)
    }
}

impl WindowSpec {
    pub fn partition_by(mut self, columns: &[&str]) -> Self {
        self.partition_by = columns
            .iter()
            .map(|c| Expr::Column(c.to_string()))
            .collect();
        self
    }

    pub fn order_by<T: Into<SortExpr>>(mut self, orders: impl IntoIterator<Item = T>) -> Self {
        self.order_by = orders.into_iter().map(Into::into).collect();
        self
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            let cols: Vec<String> = self.partition_by.iter().map(|e| e.name()).collect();
            parts.push(format!("PARTITION BY {}", cols.join(", ")));
        }
        if !self.order_by.is_empty() {
            let cols: Vec<String> = self
                .order_by
                .iter()
                .map(|s| {
                    format!(
                        "{} {}",
                        s.expr.name(),
                        if s.ascending { "ASC" } else { "DESC" }
                    )
                })
                .collect();
            parts.push(format!("ORDER BY {}", cols.join(", ")));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowFunction {
    RowNumber,
    Rank,
    DenseRank,
    Ntile(usize),
    Lag {
        input: Expr,
        offset: usize,
        default: Value,
    },
    Lead {
        input: Expr,
        offset: usize,
        default: Value,
    },
    Aggregate {
        func: AggFunc,
        input: Option<Expr>,
    },
    /// A non-window expression passed to `over`; rejected at evaluation.
    Unsupported(String),
}

impl WindowFunction {
    pub fn over(self, spec: WindowSpec) -> Expr {
        Expr::Window(Box::new(WindowExpr {
            function: self,
            spec,
        }))
    }

    fn name(&self) -> String {
        match self {
            WindowFunction::RowNumber => "row_number()".to_string(),
            WindowFunction::Rank => "rank()".to_string(),
            WindowFunction::DenseRank => "dense_rank()".to_string(),
            WindowFunction::Ntile(n) => format!("ntile({})", n),
            WindowFunction::Lag { input, offset, .. } => {
                format!("lag({}, {}, NULL)", input.name(), offset)
            }
            WindowFunction::Lead { input, offset, .. } => {
                format!("lead({}, {}, NULL)", input.name(), offset)
            }
            WindowFunction::Aggregate { func, input } => func.column_name(input.as_ref()),
            WindowFunction::Unsupported(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowExpr {
    pub function: WindowFunction,
    pub spec: WindowSpec,
}

impl WindowExpr {
    pub fn name(&self) -> String {
        format!("{} OVER ({})", self.function.name(), self.spec.describe())
    }

    pub fn data_type(&self, schema: &Schema) -> Result<DataType> {
        match &self.function {
            WindowFunction::RowNumber | WindowFunction::Rank | WindowFunction::DenseRank => {
                Ok(DataType::Integer)
            }
            WindowFunction::Ntile(_) => Ok(DataType::Integer),
            WindowFunction::Lag { input, .. } | WindowFunction::Lead { input, .. } => {
                input.data_type(schema)
            }
            WindowFunction::Aggregate { func, input } => {
                let input_type = match input {
                    Some(e) => e.data_type(schema)?,
                    None => DataType::Long,
                };
                Ok(func.result_type(&input_type))
            }
            WindowFunction::Unsupported(name) => Err(EtlError::schema(format!(
                "Expression '{}' is not supported as a window function",
                name
            ))),
        }
    }

    /// One value per input row, in the frame's original row order.
    pub fn compute(&self, df: &DataFrame) -> Result<Vec<Value>> {
        let schema = df.schema();
        self.data_type(schema)?;

        let mut partitions: Vec<Vec<usize>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, row) in df.rows().iter().enumerate() {
            let key_values = self
                .spec
                .partition_by
                .iter()
                .map(|e| e.eval(schema, row))
                .collect::<Result<Vec<_>>>()?;
            let key = value::key_of(&key_values.iter().collect::<Vec<_>>());
            let slot = *index.entry(key).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[slot].push(i);
        }

        let sort_keys = df
            .rows()
            .iter()
            .map(|row| {
                self.spec
                    .order_by
                    .iter()
                    .map(|s| s.expr.eval(schema, row))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = vec![Value::Null; df.count()];
        for mut members in partitions {
            members.sort_by(|&a, &b| {
                compare_sort_keys(&sort_keys[a], &sort_keys[b], &self.spec.order_by)
            });
            let peers = |a: usize, b: usize| {
                compare_sort_keys(&sort_keys[a], &sort_keys[b], &self.spec.order_by)
                    == Ordering::Equal
            };
            self.fill_partition(df, &members, &peers, &mut out)?;
        }
        Ok(out)
    }

    fn fill_partition(
        &self,
        df: &DataFrame,
        members: &[usize],
        peers: &dyn Fn(usize, usize) -> bool,
        out: &mut [Value],
    ) -> Result<()> {
        let schema = df.schema();
        let rows = df.rows();
        let n = members.len();
        match &self.function {
            WindowFunction::RowNumber => {
                for (pos, &idx) in members.iter().enumerate() {
                    out[idx] = value::int(pos as i64 + 1);
                }
            }
            WindowFunction::Rank | WindowFunction::DenseRank => {
                let dense = matches!(self.function, WindowFunction::DenseRank);
                let mut current = 0i64;
                for (pos, &idx) in members.iter().enumerate() {
                    if pos == 0 || !peers(members[pos - 1], idx) {
                        current = if dense { current + 1 } else { pos as i64 + 1 };
                    }
                    out[idx] = value::int(current);
                }
            }
            WindowFunction::Ntile(buckets) => {
                if *buckets == 0 {
                    return Err(EtlError::processing("ntile() needs at least one bucket"));
                }
                // 前 remainder 個 bucket 各多分配一列
                let size = n / buckets;
                let remainder = n % buckets;
                let mut pos = 0;
                for bucket in 0..*buckets {
                    let len = size + usize::from(bucket < remainder);
                    for &idx in &members[pos..pos + len] {
                        out[idx] = value::int(bucket as i64 + 1);
                    }
                    pos += len;
                }
            }
            WindowFunction::Lag {
                input,
                offset,
                default,
            } => {
                for (pos, &idx) in members.iter().enumerate() {
                    out[idx] = match pos.checked_sub(*offset) {
                        Some(src) => input.eval(schema, &rows[members[src]])?,
                        None => default.clone(),
                    };
                }
            }
            WindowFunction::Lead {
                input,
                offset,
                default,
            } => {
                for (pos, &idx) in members.iter().enumerate() {
                    out[idx] = match members.get(pos + offset) {
                        Some(&src) => input.eval(schema, &rows[src])?,
                        None => default.clone(),
                    };
                }
            }
            WindowFunction::Aggregate { func, input } => {
                let values = match input {
                    Some(e) => Some(
                        members
                            .iter()
                            .map(|&i| e.eval(schema, &rows[i]))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    None => None,
                };
                // first/last 永遠看整個 partition
                let whole_partition = self.spec.order_by.is_empty()
                    || matches!(func, AggFunc::First | AggFunc::Last);
                if whole_partition {
                    let whole = func.compute(values.as_deref(), n);
                    for &idx in members {
                        out[idx] = whole.clone();
                    }
                } else {
                    // running frame: unbounded preceding .. current row, peers included
                    let mut pos = 0;
                    while pos < n {
                        let mut end = pos;
                        while end + 1 < n && peers(members[pos], members[end + 1]) {
                            end += 1;
                        }
                        let frame = values.as_ref().map(|v| &v[..=end]);
                        let result = func.compute(frame, end + 1);
                        for &idx in &members[pos..=end] {
                            out[idx] = result.clone();
                        }
                        pos = end + 1;
                    }
                }
            }
            WindowFunction::Unsupported(name) => {
                return Err(EtlError::schema(format!(
                    "Expression '{}' is not supported as a window function",
                    name
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::functions::{
        col, dense_rank, first, lag, last, lead, ntile, rank, row_number, sum,
    };
    use serde_json::json;

    fn salaries() -> DataFrame {
        DataFrame::from_rows(
            &["name", "salary", "department"],
            vec![
                vec![json!("a"), json!(100), json!("IT")],
                vec![json!("b"), json!(90), json!("IT")],
                vec![json!("c"), json!(90), json!("IT")],
                vec![json!("d"), json!(70), json!("IT")],
                vec![json!("e"), json!(60), json!("sales")],
            ],
        )
        .unwrap()
    }

    fn spec() -> WindowSpec {
        Window::partition_by(&["department"]).order_by([col("salary").desc()])
    }

    fn computed(function: WindowFunction) -> Vec<Value> {
        match function.over(spec()) {
            Expr::Window(w) => w.compute(&salaries()).unwrap(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_rank_has_gaps_dense_rank_does_not() {
        assert_eq!(computed(rank()), vec![json!(1), json!(2), json!(2), json!(4), json!(1)]);
        assert_eq!(
            computed(dense_rank()),
            vec![json!(1), json!(2), json!(2), json!(3), json!(1)]
        );
        assert_eq!(
            computed(row_number()),
            vec![json!(1), json!(2), json!(3), json!(4), json!(1)]
        );
    }

    #[test]
    fn test_ntile_spreads_remainder_to_first_buckets() {
        assert_eq!(computed(ntile(3)), vec![json!(1), json!(1), json!(2), json!(3), json!(1)]);
    }

    #[test]
    fn test_lag_uses_window_order() {
        assert_eq!(
            computed(lag(col("salary"), 1)),
            vec![Value::Null, json!(100), json!(90), json!(90), Value::Null]
        );
    }

    #[test]
    fn test_running_sum_includes_peers() {
        let e = sum(col("salary")).over(spec());
        let Expr::Window(w) = e else { unreachable!() };
        assert_eq!(
            w.compute(&salaries()).unwrap(),
            vec![json!(100), json!(280), json!(280), json!(350), json!(60)]
        );
    }

    #[test]
    fn test_lead_is_null_at_partition_end() {
        assert_eq!(
            computed(lead(col("name"), 1)),
            vec![json!("b"), json!("c"), json!("d"), Value::Null, Value::Null]
        );
    }

    #[test]
    fn test_first_and_last_cover_the_whole_ordered_partition() {
        let sales = DataFrame::from_rows(
            &["product", "sales_date", "sales"],
            vec![
                vec![json!("p1"), json!("2023-01-01"), json!(100)],
                vec![json!("p1"), json!("2023-02-01"), json!(200)],
                vec![json!("p1"), json!("2023-03-01"), json!(300)],
            ],
        )
        .unwrap();
        let by_date = Window::partition_by(&["product"]).order_by([col("sales_date").asc()]);

        let Expr::Window(w) = last(col("sales")).over(by_date.clone()) else {
            unreachable!()
        };
        assert_eq!(
            w.compute(&sales).unwrap(),
            vec![json!(300), json!(300), json!(300)]
        );

        let Expr::Window(w) = first(col("sales")).over(by_date.clone()) else {
            unreachable!()
        };
        assert_eq!(
            w.compute(&sales).unwrap(),
            vec![json!(100), json!(100), json!(100)]
        );

        // sum 仍是累計
        let Expr::Window(w) = sum(col("sales")).over(by_date) else {
            unreachable!()
        };
        assert_eq!(
            w.compute(&sales).unwrap(),
            vec![json!(100), json!(300), json!(600)]
        );
    }

    #[test]
    fn test_non_window_expression_is_rejected() {
        let e = col("salary").over(spec());
        let Expr::Window(w) = e else { unreachable!() };
        assert!(w.compute(&salaries()).is_err());
    }
}
