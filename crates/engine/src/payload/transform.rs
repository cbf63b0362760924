use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::metric::MetricValue;

/// A declarative conversion applied to one extracted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Nanoseconds to milliseconds
    NanosToMillis,
    /// `true` to 100, `false` to 0
    BoolToPercent,
    /// Element count of an array or object
    Length,
    Scale { factor: f64 },
    Divide { divisor: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("{transform} expects {expected}, got {found}")]
    UnexpectedType {
        transform: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{transform} produced a non-finite number")]
    NonFinite { transform: &'static str },
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::NanosToMillis => "nanos_to_millis",
            Transform::BoolToPercent => "bool_to_percent",
            Transform::Length => "length",
            Transform::Scale { .. } => "scale",
            Transform::Divide { .. } => "divide",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Transform::Scale { factor } if !factor.is_finite() => {
                Err("scale.factor must be finite".to_string())
            }
            Transform::Divide { divisor } if !divisor.is_finite() || *divisor == 0.0 => {
                Err("divide.divisor must be finite and non-zero".to_string())
            }
            _ => Ok(()),
        }
    }

    pub fn apply(&self, value: &Value) -> Result<MetricValue, TransformError> {
        let out = match self {
            Transform::NanosToMillis => self.number(value)? / 1_000_000.0,
            Transform::BoolToPercent => match value {
                Value::Bool(true) => 100.0,
                Value::Bool(false) => 0.0,
                other => return Err(self.unexpected("a boolean", other)),
            },
            Transform::Length => match value {
                Value::Array(items) => items.len() as f64,
                Value::Object(map) => map.len() as f64,
                other => return Err(self.unexpected("an array or object", other)),
            },
            Transform::Scale { factor } => self.number(value)? * factor,
            Transform::Divide { divisor } => self.number(value)? / divisor,
        };

        if out.is_finite() {
            Ok(MetricValue::Numeric(out))
        } else {
            Err(TransformError::NonFinite {
                transform: self.name(),
            })
        }
    }

    fn number(&self, value: &Value) -> Result<f64, TransformError> {
        value
            .as_f64()
            .ok_or_else(|| self.unexpected("a number", value))
    }

    fn unexpected(&self, expected: &'static str, found: &Value) -> TransformError {
        TransformError::UnexpectedType {
            transform: self.name(),
            expected,
            found: type_name(found),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numeric(result: Result<MetricValue, TransformError>) -> f64 {
        match result {
            Ok(MetricValue::Numeric(v)) => v,
            other => panic!("expected numeric, got {other:?}"),
        }
    }

    #[test]
    fn test_nanos_to_millis() {
        assert_eq!(numeric(Transform::NanosToMillis.apply(&json!(1_523_400))), 1.5234);
    }

    #[test]
    fn test_bool_to_percent() {
        assert_eq!(numeric(Transform::BoolToPercent.apply(&json!(true))), 100.0);
        assert_eq!(numeric(Transform::BoolToPercent.apply(&json!(false))), 0.0);
        assert!(Transform::BoolToPercent.apply(&json!("true")).is_err());
    }

    #[test]
    fn test_length() {
        assert_eq!(numeric(Transform::Length.apply(&json!([1, 2, 3]))), 3.0);
        assert_eq!(numeric(Transform::Length.apply(&json!({"a": 1}))), 1.0);
        assert_eq!(numeric(Transform::Length.apply(&json!([]))), 0.0);
    }

    #[test]
    fn test_scale_and_divide() {
        assert_eq!(numeric(Transform::Scale { factor: 0.5 }.apply(&json!(10))), 5.0);
        assert_eq!(numeric(Transform::Divide { divisor: 9.0 }.apply(&json!(18))), 2.0);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let err = Transform::NanosToMillis.apply(&json!("fast")).unwrap_err();
        assert_eq!(err.to_string(), "nanos_to_millis expects a number, got string");
    }

    #[test]
    fn test_validate() {
        assert!(Transform::Divide { divisor: 0.0 }.validate().is_err());
        assert!(Transform::Scale { factor: f64::NAN }.validate().is_err());
        assert!(Transform::Length.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        #[derive(Deserialize)]
        struct Holder {
            transform: Transform,
        }
        let h: Holder = toml::from_str("transform = { kind = \"divide\", divisor = 1000.0 }").unwrap();
        assert_eq!(h.transform, Transform::Divide { divisor: 1000.0 });

        let h: Holder = toml::from_str("transform = { kind = \"bool_to_percent\" }").unwrap();
        assert_eq!(h.transform, Transform::BoolToPercent);
    }
}
