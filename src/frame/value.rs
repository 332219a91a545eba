use crate::domain::model::{DataType, Field, Value};
use chrono::NaiveDate;
use serde_json::Number;
use std::cmp::Ordering;

pub fn int(v: i64) -> Value {
    Value::Number(Number::from(v))
}

pub fn double(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Rounds half away from zero on the shortest decimal form of `x`, so
/// `2.345` rounds to `2.35` like a decimal would.
pub fn round_half_up(x: f64, scale: i32) -> f64 {
    if !x.is_finite() || scale < 0 {
        let factor = 10f64.powi(scale);
        return (x * factor).round() / factor;
    }
    let text = x.abs().to_string();
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let scale = scale as usize;
    if frac.len() <= scale {
        return x;
    }

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac.bytes().take(scale))
        .map(|b| b - b'0')
        .collect();
    if frac.as_bytes()[scale] >= b'5' {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - scale;
    let to_char = |d: &u8| (b'0' + d) as char;
    let mut rounded: String = digits[..split].iter().map(to_char).collect();
    rounded.push('.');
    rounded.extend(digits[split..].iter().map(to_char));
    let magnitude: f64 = rounded.parse().unwrap_or(x.abs());
    if x < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Unary minus; overflow and non-numeric input give null.
pub fn negate(v: &Value) -> Value {
    match (as_i64(v), as_f64(v)) {
        (Some(i), _) => i.checked_neg().map(int).unwrap_or(Value::Null),
        (None, Some(f)) => double(-f),
        _ => Value::Null,
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over cell values. Nulls sort lowest; numbers compare by
/// magnitude regardless of integer/double representation.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i.cmp(&j),
            _ => {
                let fx = x.as_f64().unwrap_or(f64::NAN);
                let fy = y.as_f64().unwrap_or(f64::NAN);
                fx.total_cmp(&fy)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Canonical text used as a hash key for grouping, distinct and joins.
pub fn key_of(values: &[&Value]) -> String {
    let mut key = String::new();
    for value in values {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => key.push_str(&i.to_string()),
                None => {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if f.fract() == 0.0 && f.abs() < 9.0e15 {
                        key.push_str(&(f as i64).to_string());
                    } else {
                        key.push_str(&f.to_string());
                    }
                }
            },
            other => key.push_str(&other.to_string()),
        }
        key.push('\u{1f}');
    }
    key
}

pub fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                DataType::Long
            } else {
                DataType::Double
            }
        }
        Value::String(_) => DataType::String,
        Value::Array(items) => {
            let inner = items
                .iter()
                .map(infer_type)
                .fold(DataType::Null, |acc, t| acc.widen(&t));
            DataType::Array(Box::new(inner))
        }
        Value::Object(map) => {
            // serde_json 的 Map 以 key 排序，與 Spark JSON 推斷的欄位順序一致
            let fields = map
                .iter()
                .map(|(k, v)| Field::new(k.clone(), infer_type(v)))
                .collect();
            DataType::Struct(fields)
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Spark `cast` semantics: values that don't convert become null.
pub fn cast(value: &Value, to: &DataType) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match to {
        DataType::String => match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(display(other)),
        },
        DataType::Integer | DataType::Long => {
            let parsed = match value {
                Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                Value::Bool(b) => Some(i64::from(*b)),
                _ => None,
            };
            match parsed {
                Some(i) if *to == DataType::Integer && i32::try_from(i).is_err() => Value::Null,
                Some(i) => int(i),
                None => Value::Null,
            }
        }
        DataType::Double => match value {
            Value::Number(n) => n.as_f64().map(double).unwrap_or(Value::Null),
            Value::String(s) => s.trim().parse::<f64>().map(double).unwrap_or(Value::Null),
            Value::Bool(b) => double(if *b { 1.0 } else { 0.0 }),
            _ => Value::Null,
        },
        DataType::Boolean => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) => parse_bool(s).map(Value::Bool).unwrap_or(Value::Null),
            Value::Number(n) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
            _ => Value::Null,
        },
        DataType::Date => match value {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        DataType::Array(_) | DataType::Struct(_) => match value {
            Value::Array(_) | Value::Object(_) => value.clone(),
            _ => Value::Null,
        },
        DataType::Null => Value::Null,
    }
}

/// Java's `Double.toString`, which is what `show()` prints for doubles.
pub fn format_double(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1.0e-3..1.0e7).contains(&abs) {
        let formatted = format!("{:E}", f);
        // Rust: 2E7 / 1.5E-5 -> Java: 2.0E7 / 1.5E-5
        return match formatted.split_once('E') {
            Some((mantissa, exp)) if !mantissa.contains('.') => format!("{}.0E{}", mantissa, exp),
            _ => formatted,
        };
    }
    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Text form of a value as `show()` and the CSV writer print it.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => match n.as_u64() {
                Some(u) => u.to_string(),
                None => format_double(n.as_f64().unwrap_or(f64::NAN)),
            },
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(display).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map.values().map(display).collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_half_up_uses_decimal_digits() {
        assert_eq!(round_half_up(2.345, 2), 2.35);
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(-2.5, 0), -3.0);
        assert_eq!(round_half_up(9.995, 2), 10.0);
        assert_eq!(round_half_up(1.2, 3), 1.2);
    }

    #[test]
    fn test_negate_overflow_is_null() {
        assert_eq!(negate(&json!(5)), json!(-5));
        assert_eq!(negate(&json!(1.5)), json!(-1.5));
        assert_eq!(negate(&json!(i64::MIN)), Value::Null);
        assert_eq!(negate(&json!("x")), Value::Null);
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(compare(&json!(1), &json!(1.0)), Ordering::Equal);
        assert_eq!(compare(&json!(2), &json!(1.5)), Ordering::Greater);
        assert_eq!(compare(&Value::Null, &json!(0)), Ordering::Less);
    }

    #[test]
    fn test_cast_invalid_string_is_null() {
        assert_eq!(cast(&json!("abc"), &DataType::Integer), Value::Null);
        assert_eq!(cast(&json!(" 42 "), &DataType::Long), json!(42));
        assert_eq!(cast(&json!(7), &DataType::String), json!("7"));
        assert_eq!(cast(&json!(3_000_000_000i64), &DataType::Integer), Value::Null);
    }

    #[test]
    fn test_format_double_like_java() {
        assert_eq!(format_double(73750.0), "73750.0");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(2.0e7), "2.0E7");
    }

    #[test]
    fn test_key_of_normalizes_numbers() {
        assert_eq!(key_of(&[&json!(1)]), key_of(&[&json!(1.0)]));
        assert_ne!(key_of(&[&json!("1")]), key_of(&[&json!(1)]));
    }
}
