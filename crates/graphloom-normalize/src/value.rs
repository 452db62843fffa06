//! Property value coercion primitives.

use serde_json::{Number, Value};

const TRUTHY: &[&str] = &["true", "yes", "y", "1", "是", "有", "开启", "启用"];
const FALSY: &[&str] = &["false", "no", "n", "0", "否", "无", "关闭", "禁用"];

/// Interpret a value as a boolean via the multilingual token table.
/// `None` means "no opinion" and leaves the original value untouched.
pub fn coerce_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => {
            let normalized = text.trim().to_lowercase();
            if normalized.is_empty() {
                None
            } else if TRUTHY.contains(&normalized.as_str()) {
                Some(true)
            } else if FALSY.contains(&normalized.as_str()) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parse a value as a finite number; booleans map to 0/1.
pub fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Clamp into an optional `[min, max]` range.
pub fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut result = value;
    if let Some(min) = min {
        result = result.max(min);
    }
    if let Some(max) = max {
        result = result.min(max);
    }
    result
}

/// Round to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// JSON number from a float; integral values serialize without a fraction.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Coerce into an array: JSON-array strings parse, delimited strings split
/// on `,` `;` `、`, scalars wrap.
pub fn coerce_array(raw: &Value) -> Value {
    match raw {
        Value::Array(_) => raw.clone(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Value::Array(Vec::new());
            }
            if trimmed.starts_with('[') {
                return match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Array(items)) => Value::Array(items),
                    Ok(other) => Value::Array(vec![other]),
                    Err(_) => Value::Array(vec![Value::String(trimmed.to_string())]),
                };
            }
            let items = trimmed
                .split([',', ';', '、'])
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect();
            Value::Array(items)
        }
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other.clone()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boolean_table_is_multilingual() {
        assert_eq!(coerce_boolean(&json!("yes")), Some(true));
        assert_eq!(coerce_boolean(&json!("是")), Some(true));
        assert_eq!(coerce_boolean(&json!("关闭")), Some(false));
        assert_eq!(coerce_boolean(&json!("maybe")), None);
        assert_eq!(coerce_boolean(&json!(0)), Some(false));
        assert_eq!(coerce_boolean(&json!(true)), Some(true));
    }

    #[test]
    fn numbers_parse_clamp_and_round() {
        assert_eq!(coerce_number(&json!(" 3.75 ")), Some(3.75));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!("nope")), None);
        assert_eq!(clamp(1.5, Some(0.0), Some(1.0)), 1.0);
        assert_eq!(clamp(-0.3, Some(0.0), None), 0.0);
        assert_eq!(round_to(0.12345, 2), 0.12);
    }

    #[test]
    fn arrays_split_on_multilingual_delimiters() {
        assert_eq!(coerce_array(&json!("a, b; c、d")), json!(["a", "b", "c", "d"]));
        assert_eq!(coerce_array(&json!("[1, 2]")), json!([1, 2]));
        assert_eq!(coerce_array(&json!("[broken")), json!(["[broken"]));
        assert_eq!(coerce_array(&json!(5)), json!([5]));
        assert_eq!(coerce_array(&Value::Null), json!([]));
    }
}
