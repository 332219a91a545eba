//! Column constructors in the style of `pyspark.sql.functions`.

use crate::domain::model::Value;
use crate::frame::aggregate::AggFunc;
use crate::frame::expr::{Expr, ScalarFn};
use crate::frame::sql;
use crate::frame::window::WindowFunction;
use crate::utils::error::Result;

/// `col("*")` is the wildcard; anything else names a (possibly nested) column.
pub fn col(name: &str) -> Expr {
    if name == "*" {
        Expr::Wildcard
    } else {
        Expr::Column(name.to_string())
    }
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn null() -> Expr {
    Expr::Literal(Value::Null)
}

/// Parses a SQL expression, e.g. `expr("salary * 2")`.
pub fn expr(text: &str) -> Result<Expr> {
    sql::parse_expression(text)
}

pub struct CaseBuilder {
    branches: Vec<(Expr, Expr)>,
}

pub fn when(condition: impl Into<Expr>, value: impl Into<Expr>) -> CaseBuilder {
    CaseBuilder {
        branches: vec![(condition.into(), value.into())],
    }
}

impl CaseBuilder {
    pub fn when(mut self, condition: impl Into<Expr>, value: impl Into<Expr>) -> Self {
        self.branches.push((condition.into(), value.into()));
        self
    }

    pub fn otherwise(self, value: impl Into<Expr>) -> Expr {
        Expr::Case {
            branches: self.branches,
            otherwise: Some(Box::new(value.into())),
        }
    }

    pub fn alias(self, name: &str) -> Expr {
        Expr::from(self).alias(name)
    }
}

impl From<CaseBuilder> for Expr {
    fn from(builder: CaseBuilder) -> Self {
        Expr::Case {
            branches: builder.branches,
            otherwise: None,
        }
    }
}

pub fn concat(parts: Vec<Expr>) -> Expr {
    Expr::Function(ScalarFn::Concat, parts)
}

pub fn upper(e: Expr) -> Expr {
    Expr::Function(ScalarFn::Upper, vec![e])
}

pub fn lower(e: Expr) -> Expr {
    Expr::Function(ScalarFn::Lower, vec![e])
}

pub fn coalesce(parts: Vec<Expr>) -> Expr {
    Expr::Function(ScalarFn::Coalesce, parts)
}

pub fn round(e: Expr, scale: i32) -> Expr {
    Expr::Function(ScalarFn::Round, vec![e, Expr::from(scale)])
}

/// `to_date(col("date_of_joining"), "dd-MM-yyyy")`
pub fn to_date(e: Expr, pattern: &str) -> Expr {
    Expr::Function(ScalarFn::ToDate, vec![e, Expr::from(pattern)])
}

fn aggregate(func: AggFunc, e: Expr) -> Expr {
    let input = match e {
        Expr::Wildcard => None,
        other => Some(Box::new(other)),
    };
    Expr::Aggregate { func, input }
}

/// `count(col("*"))` counts rows, `count(col("name"))` counts non-null values.
pub fn count(e: Expr) -> Expr {
    aggregate(AggFunc::Count, e)
}

pub fn count_distinct(e: Expr) -> Expr {
    aggregate(AggFunc::CountDistinct, e)
}

pub fn sum(e: Expr) -> Expr {
    aggregate(AggFunc::Sum, e)
}

pub fn avg(e: Expr) -> Expr {
    aggregate(AggFunc::Avg, e)
}

pub fn min(e: Expr) -> Expr {
    aggregate(AggFunc::Min, e)
}

pub fn max(e: Expr) -> Expr {
    aggregate(AggFunc::Max, e)
}

pub fn first(e: Expr) -> Expr {
    aggregate(AggFunc::First, e)
}

pub fn last(e: Expr) -> Expr {
    aggregate(AggFunc::Last, e)
}

pub fn row_number() -> WindowFunction {
    WindowFunction::RowNumber
}

pub fn rank() -> WindowFunction {
    WindowFunction::Rank
}

pub fn dense_rank() -> WindowFunction {
    WindowFunction::DenseRank
}

pub fn ntile(buckets: usize) -> WindowFunction {
    WindowFunction::Ntile(buckets)
}

pub fn lag(e: Expr, offset: usize) -> WindowFunction {
    WindowFunction::Lag {
        input: e,
        offset,
        default: Value::Null,
    }
}

pub fn lead(e: Expr, offset: usize) -> WindowFunction {
    WindowFunction::Lead {
        input: e,
        offset,
        default: Value::Null,
    }
}
