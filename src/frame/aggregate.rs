use crate::domain::model::{DataType, Field, Row, Schema, Value};
use crate::frame::expr::Expr;
use crate::frame::value;
use crate::frame::DataFrame;
use crate::utils::error::{EtlError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
}

impl AggFunc {
    pub fn from_name(name: &str) -> Option<AggFunc> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggFunc::Count),
            "sum" => Some(AggFunc::Sum),
            "avg" | "mean" => Some(AggFunc::Avg),
            "min" => Some(AggFunc::Min),
            "max" => Some(AggFunc::Max),
            "first" => Some(AggFunc::First),
            "last" => Some(AggFunc::Last),
            _ => None,
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            AggFunc::Count | AggFunc::CountDistinct => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::First => "first",
            AggFunc::Last => "last",
        }
    }

    /// Spark's default column name: `count(1)`, `avg(salary)`, `count(DISTINCT address)`.
    pub fn column_name(&self, input: Option<&Expr>) -> String {
        match (self, input) {
            (AggFunc::CountDistinct, Some(e)) => format!("count(DISTINCT {})", e.name()),
            (_, Some(e)) => format!("{}({})", self.sql_name(), e.name()),
            (_, None) => format!("{}(1)", self.sql_name()),
        }
    }

    pub fn result_type(&self, input: &DataType) -> DataType {
        match self {
            AggFunc::Count | AggFunc::CountDistinct => DataType::Long,
            AggFunc::Avg => DataType::Double,
            AggFunc::Sum if input.is_integral() => DataType::Long,
            AggFunc::Sum => DataType::Double,
            AggFunc::Min | AggFunc::Max | AggFunc::First | AggFunc::Last => input.clone(),
        }
    }

    /// Folds the input values of one group. `None` input means `count(*)`.
    pub fn compute(&self, values: Option<&[Value]>, row_count: usize) -> Value {
        let Some(values) = values else {
            return value::int(row_count as i64);
        };
        let non_null = || values.iter().filter(|v| !v.is_null());
        match self {
            AggFunc::Count => value::int(non_null().count() as i64),
            AggFunc::CountDistinct => {
                let distinct: HashSet<String> = non_null().map(|v| value::key_of(&[v])).collect();
                value::int(distinct.len() as i64)
            }
            AggFunc::Sum => {
                let mut saw_any = false;
                let mut int_sum: Option<i64> = Some(0);
                let mut float_sum = 0.0;
                for v in non_null() {
                    saw_any = true;
                    float_sum += value::as_f64(v).unwrap_or(0.0);
                    int_sum = match (int_sum, value::as_i64(v)) {
                        (Some(acc), Some(i)) => acc.checked_add(i),
                        _ => None,
                    };
                }
                match (saw_any, int_sum) {
                    (false, _) => Value::Null,
                    (true, Some(i)) => value::int(i),
                    (true, None) => value::double(float_sum),
                }
            }
            AggFunc::Avg => {
                let nums: Vec<f64> = non_null().filter_map(value::as_f64).collect();
                if nums.is_empty() {
                    Value::Null
                } else {
                    value::double(nums.iter().sum::<f64>() / nums.len() as f64)
                }
            }
            AggFunc::Min => non_null()
                .min_by(|a, b| value::compare(a, b))
                .cloned()
                .unwrap_or(Value::Null),
            AggFunc::Max => non_null()
                .max_by(|a, b| value::compare(a, b))
                .cloned()
                .unwrap_or(Value::Null),
            AggFunc::First => values.first().cloned().unwrap_or(Value::Null),
            AggFunc::Last => values.last().cloned().unwrap_or(Value::Null),
        }
    }
}

/// Evaluates `e` once per group: aggregate nodes fold over the group's rows,
/// plain columns read the group's first row.
pub(crate) fn eval_grouped(e: &Expr, schema: &Schema, rows: &[&Row]) -> Result<Value> {
    match e {
        Expr::Aggregate { func, input } => match input {
            None => Ok(func.compute(None, rows.len())),
            Some(inner) => {
                if inner.contains_aggregate() {
                    return Err(EtlError::schema(format!(
                        "Nested aggregate in '{}' is not supported",
                        e.name()
                    )));
                }
                let values = rows
                    .iter()
                    .map(|r| inner.eval(schema, r))
                    .collect::<Result<Vec<_>>>()?;
                Ok(func.compute(Some(&values), rows.len()))
            }
        },
        other if !other.contains_aggregate() => match rows.first() {
            Some(row) => other.eval(schema, row),
            None => Ok(Value::Null),
        },
        other => {
            // 把 aggregate 子節點換成常數後再逐列求值
            let mut failure = None;
            let folded = other.clone().transform(&mut |node| {
                if !matches!(node, Expr::Aggregate { .. }) {
                    return node;
                }
                match eval_grouped(&node, schema, rows) {
                    Ok(v) => Expr::Literal(v),
                    Err(err) => {
                        failure.get_or_insert(err);
                        Expr::Literal(Value::Null)
                    }
                }
            });
            if let Some(err) = failure {
                return Err(err);
            }
            match rows.first() {
                Some(row) => folded.eval(schema, row),
                None => folded.eval(schema, &vec![Value::Null; schema.len()]),
            }
        }
    }
}

/// Result of `DataFrame::group_by`.
pub struct GroupedData<'a> {
    df: &'a DataFrame,
    keys: Vec<Expr>,
}

impl<'a> GroupedData<'a> {
    pub(crate) fn new(df: &'a DataFrame, keys: Vec<Expr>) -> Self {
        Self { df, keys }
    }

    /// Output columns are the grouping keys followed by `aggs`.
    pub fn agg(&self, aggs: Vec<Expr>) -> Result<DataFrame> {
        let mut exprs = self.keys.clone();
        exprs.extend(aggs);
        aggregate_frame(self.df, &self.keys, &exprs)
    }

    pub fn count(&self) -> Result<DataFrame> {
        self.agg(vec![Expr::Aggregate {
            func: AggFunc::Count,
            input: None,
        }
        .alias("count")])
    }
}

/// Groups `df` by `keys` (first-seen order) and evaluates `exprs` per group.
/// With no keys the whole frame is one group, even when empty.
pub(crate) fn aggregate_frame(df: &DataFrame, keys: &[Expr], exprs: &[Expr]) -> Result<DataFrame> {
    let schema = df.schema();
    for e in exprs {
        if e.contains_window() {
            return Err(EtlError::schema(format!(
                "Window expression '{}' is not allowed in an aggregation",
                e.name()
            )));
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Row>> = HashMap::new();
    for row in df.rows() {
        let key_values = keys
            .iter()
            .map(|k| k.eval(schema, row))
            .collect::<Result<Vec<_>>>()?;
        let key = value::key_of(&key_values.iter().collect::<Vec<_>>());
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(row);
    }
    if keys.is_empty() && order.is_empty() {
        order.push(String::new());
        groups.insert(String::new(), Vec::new());
    }

    let fields = exprs
        .iter()
        .map(|e| Ok(Field::new(e.name(), e.data_type(schema)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(order.len());
    for key in &order {
        let members = &groups[key];
        let row = exprs
            .iter()
            .map(|e| eval_grouped(e, schema, members))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    DataFrame::new(Schema::new(fields), rows)
}
