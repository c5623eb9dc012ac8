//! Conversions between attribute values and SeaQuery values.
//!
//! Model attributes are held as `serde_json::Value`. They are turned into
//! SeaQuery [`Value`]s when a statement is built and turned back into JSON
//! when an executor binds the statement parameters.

pub mod postgres;

use crate::executor::LifeError;
use sea_query::Value;
use serde_json::Value as JsonValue;

/// Convert an attribute value into a SeaQuery value for binding.
///
/// Integers that fit in `i64` bind as `BIGINT`, other numbers as `DOUBLE`.
/// Arrays and objects bind as JSON. `null` binds as an untyped NULL.
pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::String(None),
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => Value::from(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::from(value.clone()),
    }
}

/// Convert a bound SeaQuery value back into JSON.
///
/// # Errors
///
/// Returns `LifeError::Other` for value kinds this crate never produces.
pub fn value_to_json(value: &Value) -> Result<JsonValue, LifeError> {
    let json = match value {
        Value::Bool(v) => JsonValue::from(*v),
        Value::TinyInt(v) => JsonValue::from(*v),
        Value::SmallInt(v) => JsonValue::from(*v),
        Value::Int(v) => JsonValue::from(*v),
        Value::BigInt(v) => JsonValue::from(*v),
        Value::TinyUnsigned(v) => JsonValue::from(*v),
        Value::SmallUnsigned(v) => JsonValue::from(*v),
        Value::Unsigned(v) => JsonValue::from(*v),
        Value::BigUnsigned(v) => JsonValue::from(*v),
        Value::Float(v) => JsonValue::from(*v),
        Value::Double(v) => JsonValue::from(*v),
        Value::String(v) => match v {
            Some(s) => JsonValue::String(s.to_string()),
            None => JsonValue::Null,
        },
        Value::Json(v) => match v {
            Some(j) => serde_json::to_value(j)
                .map_err(|e| LifeError::Other(format!("Failed to serialize JSON: {e}")))?,
            None => JsonValue::Null,
        },
        other => {
            return Err(LifeError::Other(format!(
                "Unsupported value type in query: {other:?}"
            )))
        }
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_survive_the_trip() {
        for value in [json!(null), json!(true), json!(42), json!(-7), json!(1.5), json!("hi")] {
            let bound = json_to_value(&value);
            assert_eq!(value_to_json(&bound).unwrap(), value);
        }
    }

    #[test]
    fn test_structured_values_bind_as_json() {
        let value = json!({"tags": ["a", "b"]});
        assert!(matches!(json_to_value(&value), Value::Json(Some(_))));
    }

    #[test]
    fn test_null_binds_as_untyped_null() {
        assert!(matches!(json_to_value(&JsonValue::Null), Value::String(None)));
    }
}
