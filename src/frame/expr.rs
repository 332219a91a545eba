use crate::domain::model::{DataType, Row, Schema, Value};
use crate::frame::aggregate::AggFunc;
use crate::frame::value;
use crate::frame::window::{WindowExpr, WindowFunction, WindowSpec};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFn {
    Concat,
    Upper,
    Lower,
    Coalesce,
    Round,
    ToDate,
}

impl ScalarFn {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFn::Concat => "concat",
            ScalarFn::Upper => "upper",
            ScalarFn::Lower => "lower",
            ScalarFn::Coalesce => "coalesce",
            ScalarFn::Round => "round",
            ScalarFn::ToDate => "to_date",
        }
    }

    pub fn from_name(name: &str) -> Option<ScalarFn> {
        match name.to_ascii_lowercase().as_str() {
            "concat" => Some(ScalarFn::Concat),
            "upper" => Some(ScalarFn::Upper),
            "lower" => Some(ScalarFn::Lower),
            "coalesce" => Some(ScalarFn::Coalesce),
            "round" => Some(ScalarFn::Round),
            "to_date" => Some(ScalarFn::ToDate),
            _ => None,
        }
    }
}

/// A column expression, evaluated row by row against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column name; a dotted path reaches into struct fields.
    Column(String),
    Wildcard,
    Literal(Value),
    Alias(Box<Expr>, String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    Cast(Box<Expr>, DataType),
    Case {
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Function(ScalarFn, Vec<Expr>),
    /// `input` is `None` for `count(*)`.
    Aggregate {
        func: AggFunc,
        input: Option<Box<Expr>>,
    },
    Window(Box<WindowExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl SortExpr {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
            nulls_first: true,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
            nulls_first: false,
        }
    }
}

impl From<&str> for SortExpr {
    fn from(name: &str) -> Self {
        SortExpr::asc(Expr::Column(name.to_string()))
    }
}

impl From<Expr> for SortExpr {
    fn from(expr: Expr) -> Self {
        SortExpr::asc(expr)
    }
}

impl Expr {
    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias(Box::new(self.unaliased()), name.into())
    }

    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast(Box::new(self), data_type)
    }

    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn neq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEq, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn gt_eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GtEq, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn lt_eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LtEq, other)
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn asc(self) -> SortExpr {
        SortExpr::asc(self)
    }

    pub fn desc(self) -> SortExpr {
        SortExpr::desc(self)
    }

    /// Turns an aggregate such as `sum(col("sales"))` into a window aggregate.
    pub fn over(self, spec: WindowSpec) -> Expr {
        let function = match self.unaliased() {
            Expr::Aggregate { func, input } => WindowFunction::Aggregate {
                func,
                input: input.map(|e| *e),
            },
            other => WindowFunction::Unsupported(other.name()),
        };
        Expr::Window(Box::new(WindowExpr { function, spec }))
    }

    fn unaliased(self) -> Expr {
        match self {
            Expr::Alias(inner, _) => *inner,
            other => other,
        }
    }

    /// Output column name, following Spark's naming of unaliased expressions.
    pub fn name(&self) -> String {
        match self {
            Expr::Column(path) => path.rsplit('.').next().unwrap_or(path).to_string(),
            Expr::Wildcard => "*".to_string(),
            Expr::Literal(v) => value::display(v),
            Expr::Alias(_, name) => name.clone(),
            Expr::Binary { op, left, right } => {
                format!("({} {} {})", left.name(), op.symbol(), right.name())
            }
            Expr::Negate(inner) => format!("(- {})", inner.name()),
            Expr::Not(inner) => format!("(NOT {})", inner.name()),
            Expr::IsNull(inner) => format!("({} IS NULL)", inner.name()),
            Expr::IsNotNull(inner) => format!("({} IS NOT NULL)", inner.name()),
            Expr::Cast(inner, dt) => format!(
                "CAST({} AS {})",
                inner.name(),
                dt.simple_string().to_uppercase()
            ),
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut s = String::from("CASE");
                for (cond, val) in branches {
                    s.push_str(&format!(" WHEN {} THEN {}", cond.name(), val.name()));
                }
                if let Some(o) = otherwise {
                    s.push_str(&format!(" ELSE {}", o.name()));
                }
                s.push_str(" END");
                s
            }
            Expr::Function(f, args) => {
                let args: Vec<String> = args.iter().map(|a| a.name()).collect();
                format!("{}({})", f.name(), args.join(", "))
            }
            Expr::Aggregate { func, input } => func.column_name(input.as_deref()),
            Expr::Window(w) => w.name(),
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        self.any(&|e| matches!(e, Expr::Aggregate { .. }))
    }

    pub fn contains_window(&self) -> bool {
        self.any(&|e| matches!(e, Expr::Window(_)))
    }

    fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        self.children().iter().any(|c| c.any(pred))
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Wildcard | Expr::Literal(_) | Expr::Window(_) => vec![],
            Expr::Alias(inner, _)
            | Expr::Negate(inner)
            | Expr::Not(inner)
            | Expr::IsNull(inner)
            | Expr::IsNotNull(inner)
            | Expr::Cast(inner, _) => vec![inner.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut out: Vec<&Expr> = branches.iter().flat_map(|(c, v)| [c, v]).collect();
                if let Some(o) = otherwise {
                    out.push(o.as_ref());
                }
                out
            }
            Expr::Function(_, args) => args.iter().collect(),
            Expr::Aggregate { input, .. } => input.iter().map(|e| e.as_ref()).collect(),
        }
    }

    /// Rebuilds the tree bottom-up, letting `f` replace any node.
    pub fn transform(self, f: &mut dyn FnMut(Expr) -> Expr) -> Expr {
        let rebuilt = match self {
            Expr::Alias(inner, name) => Expr::Alias(Box::new(inner.transform(f)), name),
            Expr::Negate(inner) => Expr::Negate(Box::new(inner.transform(f))),
            Expr::Not(inner) => Expr::Not(Box::new(inner.transform(f))),
            Expr::IsNull(inner) => Expr::IsNull(Box::new(inner.transform(f))),
            Expr::IsNotNull(inner) => Expr::IsNotNull(Box::new(inner.transform(f))),
            Expr::Cast(inner, dt) => Expr::Cast(Box::new(inner.transform(f)), dt),
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.transform(f)),
                right: Box::new(right.transform(f)),
            },
            Expr::Case {
                branches,
                otherwise,
            } => Expr::Case {
                branches: branches
                    .into_iter()
                    .map(|(c, v)| (c.transform(f), v.transform(f)))
                    .collect(),
                otherwise: otherwise.map(|o| Box::new(o.transform(f))),
            },
            Expr::Function(func, args) => {
                Expr::Function(func, args.into_iter().map(|a| a.transform(f)).collect())
            }
            Expr::Aggregate { func, input } => Expr::Aggregate {
                func,
                input: input.map(|e| Box::new(e.transform(f))),
            },
            leaf => leaf,
        };
        f(rebuilt)
    }

    pub fn data_type(&self, schema: &Schema) -> Result<DataType> {
        match self {
            Expr::Column(path) => resolve_type(schema, path),
            Expr::Wildcard => Err(EtlError::schema("'*' is only valid in select")),
            Expr::Literal(v) => Ok(value::infer_type(v)),
            Expr::Alias(inner, _) => inner.data_type(schema),
            Expr::Binary { op, left, right } => {
                if !op.is_arithmetic() {
                    return Ok(DataType::Boolean);
                }
                let lt = left.data_type(schema)?;
                let rt = right.data_type(schema)?;
                if *op == BinaryOp::Div {
                    return Ok(DataType::Double);
                }
                match (&lt, &rt) {
                    (a, b) if a.is_integral() && b.is_integral() => Ok(a.widen(b)),
                    (a, DataType::Null) | (DataType::Null, a) if a.is_integral() => Ok(a.clone()),
                    _ => Ok(DataType::Double),
                }
            }
            Expr::Negate(inner) => inner.data_type(schema),
            Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) => Ok(DataType::Boolean),
            Expr::Cast(_, dt) => Ok(dt.clone()),
            Expr::Case {
                branches,
                otherwise,
            } => {
                let mut dt = DataType::Null;
                for (cond, val) in branches {
                    cond.data_type(schema)?;
                    dt = dt.widen(&val.data_type(schema)?);
                }
                if let Some(o) = otherwise {
                    dt = dt.widen(&o.data_type(schema)?);
                }
                Ok(dt)
            }
            Expr::Function(f, args) => {
                let types = args
                    .iter()
                    .map(|a| a.data_type(schema))
                    .collect::<Result<Vec<_>>>()?;
                match f {
                    ScalarFn::Concat | ScalarFn::Upper | ScalarFn::Lower => Ok(DataType::String),
                    ScalarFn::ToDate => Ok(DataType::Date),
                    ScalarFn::Coalesce => Ok(types
                        .iter()
                        .fold(DataType::Null, |acc, t| acc.widen(t))),
                    ScalarFn::Round => Ok(types.first().cloned().unwrap_or(DataType::Double)),
                }
            }
            Expr::Aggregate { func, input } => {
                let input_type = match input {
                    Some(e) => e.data_type(schema)?,
                    None => DataType::Long,
                };
                Ok(func.result_type(&input_type))
            }
            Expr::Window(w) => w.data_type(schema),
        }
    }

    pub fn eval(&self, schema: &Schema, row: &Row) -> Result<Value> {
        match self {
            Expr::Column(path) => resolve_value(schema, row, path),
            Expr::Wildcard => Err(EtlError::schema("'*' is only valid in select")),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Alias(inner, _) => inner.eval(schema, row),
            Expr::Binary { op, left, right } => {
                let l = left.eval(schema, row)?;
                // AND/OR short-circuit without evaluating the right side
                match (op, truth(&l)) {
                    (BinaryOp::And, Some(false)) => return Ok(Value::Bool(false)),
                    (BinaryOp::Or, Some(true)) => return Ok(Value::Bool(true)),
                    _ => {}
                }
                let r = right.eval(schema, row)?;
                Ok(apply_binary(*op, &l, &r))
            }
            Expr::Negate(inner) => {
                Ok(value::negate(&inner.eval(schema, row)?))
            }
            Expr::Not(inner) => {
                let v = inner.eval(schema, row)?;
                Ok(truth(&v).map(|b| Value::Bool(!b)).unwrap_or(Value::Null))
            }
            Expr::IsNull(inner) => Ok(Value::Bool(inner.eval(schema, row)?.is_null())),
            Expr::IsNotNull(inner) => Ok(Value::Bool(!inner.eval(schema, row)?.is_null())),
            Expr::Cast(inner, dt) => Ok(value::cast(&inner.eval(schema, row)?, dt)),
            Expr::Case {
                branches,
                otherwise,
            } => {
                for (cond, val) in branches {
                    if truth(&cond.eval(schema, row)?) == Some(true) {
                        return val.eval(schema, row);
                    }
                }
                match otherwise {
                    Some(o) => o.eval(schema, row),
                    None => Ok(Value::Null),
                }
            }
            Expr::Function(f, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(schema, row))
                    .collect::<Result<Vec<_>>>()?;
                apply_function(*f, &values)
            }
            Expr::Aggregate { .. } => Err(EtlError::schema(format!(
                "Aggregate '{}' can only be used in agg() or a GROUP BY query",
                self.name()
            ))),
            Expr::Window(_) => Err(EtlError::schema(format!(
                "Window expression '{}' can only be used in select() or with_column()",
                self.name()
            ))),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// SQL three-valued truth of a value; `None` means unknown.
pub fn truth(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Null => None,
        other => match value::cast(other, &DataType::Boolean) {
            Value::Bool(b) => Some(b),
            _ => None,
        },
    }
}

fn numeric_operand(v: &Value) -> Option<Value> {
    match v {
        Value::Number(_) => Some(v.clone()),
        Value::String(_) => match value::cast(v, &DataType::Double) {
            Value::Null => None,
            n => Some(n),
        },
        _ => None,
    }
}

fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::And => match (truth(l), truth(r)) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        BinaryOp::Or => match (truth(l), truth(r)) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        },
        _ if l.is_null() || r.is_null() => Value::Null,
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (Some(a), Some(b)) = (numeric_operand(l), numeric_operand(r)) else {
                return Value::Null;
            };
            if op != BinaryOp::Div {
                if let (Some(x), Some(y)) = (value::as_i64(&a), value::as_i64(&b)) {
                    let result = match op {
                        BinaryOp::Add => x.checked_add(y),
                        BinaryOp::Sub => x.checked_sub(y),
                        _ => x.checked_mul(y),
                    };
                    return result.map(value::int).unwrap_or(Value::Null);
                }
            }
            let (Some(x), Some(y)) = (value::as_f64(&a), value::as_f64(&b)) else {
                return Value::Null;
            };
            match op {
                BinaryOp::Add => value::double(x + y),
                BinaryOp::Sub => value::double(x - y),
                BinaryOp::Mul => value::double(x * y),
                _ if y == 0.0 => Value::Null,
                _ => value::double(x / y),
            }
        }
        _ => {
            // 數字與字串比較時，先把字串轉成數字
            let ordering = match (l, r) {
                (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
                    match (numeric_operand(l), numeric_operand(r)) {
                        (Some(a), Some(b)) => value::compare(&a, &b),
                        _ => return Value::Null,
                    }
                }
                _ => value::compare(l, r),
            };
            let result = match op {
                BinaryOp::Eq => ordering.is_eq(),
                BinaryOp::NotEq => ordering.is_ne(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::GtEq => ordering.is_ge(),
                BinaryOp::Lt => ordering.is_lt(),
                _ => ordering.is_le(),
            };
            Value::Bool(result)
        }
    }
}

/// Converts a Spark datetime pattern (`dd-MM-yyyy`) to a chrono format string.
pub fn spark_pattern_to_chrono(pattern: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let token = match (c, run) {
            ('y', 4) | ('y', 1) => Some("%Y"),
            ('y', 2) => Some("%y"),
            ('M', 2) | ('M', 1) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('d', 2) | ('d', 1) => Some("%d"),
            ('H', _) => Some("%H"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            _ => None,
        };
        match token {
            Some(t) => out.push_str(t),
            None => {
                for _ in 0..run {
                    if c == '%' {
                        out.push_str("%%");
                    } else {
                        out.push(c);
                    }
                }
            }
        }
        i += run;
    }
    out
}

fn apply_function(f: ScalarFn, args: &[Value]) -> Result<Value> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
    Ok(match f {
        ScalarFn::Concat => {
            if args.iter().any(|a| a.is_null()) {
                Value::Null
            } else {
                Value::String(args.iter().map(value::display).collect::<String>())
            }
        }
        ScalarFn::Upper => match arg(0) {
            Value::Null => Value::Null,
            v => Value::String(value::display(&v).to_uppercase()),
        },
        ScalarFn::Lower => match arg(0) {
            Value::Null => Value::Null,
            v => Value::String(value::display(&v).to_lowercase()),
        },
        ScalarFn::Coalesce => args
            .iter()
            .find(|a| !a.is_null())
            .cloned()
            .unwrap_or(Value::Null),
        ScalarFn::Round => {
            let scale = value::as_i64(&arg(1)).unwrap_or(0) as i32;
            match arg(0) {
                v @ Value::Number(_) if value::as_i64(&v).is_some() && scale >= 0 => v,
                v => match value::as_f64(&v) {
                    Some(x) => value::double(value::round_half_up(x, scale)),
                    None => Value::Null,
                },
            }
        }
        ScalarFn::ToDate => {
            let pattern = match arg(1) {
                Value::String(p) => spark_pattern_to_chrono(&p),
                _ => "%Y-%m-%d".to_string(),
            };
            match arg(0) {
                Value::String(s) => NaiveDate::parse_from_str(s.trim(), &pattern)
                    .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            }
        }
    })
}

fn nested_lookup<'a>(
    dt: &'a DataType,
    part: &str,
    path: &str,
) -> Result<&'a DataType> {
    match dt {
        DataType::Struct(fields) => fields
            .iter()
            .find(|f| f.name == part)
            .or_else(|| fields.iter().find(|f| f.name.eq_ignore_ascii_case(part)))
            .map(|f| &f.data_type)
            .ok_or_else(|| {
                EtlError::schema(format!("No such struct field '{}' in '{}'", part, path))
            }),
        other => Err(EtlError::schema(format!(
            "Can't extract '{}' from '{}' of type {}",
            part, path, other
        ))),
    }
}

fn resolve_type(schema: &Schema, path: &str) -> Result<DataType> {
    if let Some(field) = schema.field(path) {
        return Ok(field.data_type.clone());
    }
    let mut parts = path.split('.');
    let head = parts.next().unwrap_or(path);
    let idx = schema.require(head)?;
    let mut dt = &schema.fields[idx].data_type;
    for part in parts {
        dt = nested_lookup(dt, part, path)?;
    }
    Ok(dt.clone())
}

fn resolve_value(schema: &Schema, row: &Row, path: &str) -> Result<Value> {
    if let Some(idx) = schema.index_of(path) {
        return Ok(row.get(idx).cloned().unwrap_or(Value::Null));
    }
    let mut parts = path.split('.');
    let head = parts.next().unwrap_or(path);
    let idx = schema.require(head)?;
    let mut current = row.get(idx).cloned().unwrap_or(Value::Null);
    for part in parts {
        current = match current {
            Value::Object(mut map) => match map.remove(part) {
                Some(v) => v,
                None => map
                    .into_iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(part))
                    .map(|(_, v)| v)
                    .unwrap_or(Value::Null),
            },
            Value::Null => Value::Null,
            _ => {
                return Err(EtlError::schema(format!(
                    "Can't extract '{}' from a non-struct value in '{}'",
                    part, path
                )))
            }
        };
    }
    Ok(current)
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(Value::String(v.to_string()))
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Expr::Literal(Value::String(v))
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(value::int(v))
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(value::int(i64::from(v)))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Literal(value::double(v))
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Literal(Value::Bool(v))
    }
}

impl<T: Into<Expr>> std::ops::Add<T> for Expr {
    type Output = Expr;
    fn add(self, rhs: T) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Sub<T> for Expr {
    type Output = Expr;
    fn sub(self, rhs: T) -> Expr {
        self.binary(BinaryOp::Sub, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Mul<T> for Expr {
    type Output = Expr;
    fn mul(self, rhs: T) -> Expr {
        self.binary(BinaryOp::Mul, rhs)
    }
}

impl<T: Into<Expr>> std::ops::Div<T> for Expr {
    type Output = Expr;
    fn div(self, rhs: T) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Negate(Box::new(self))
    }
}
