use chrono::DateTime;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::domain::value::{TargetType, ValueKind};
use crate::util::time::{format_datetime, normalize_rfc3339_utc, parse_datetime};

/// Value present but not coercible to the requested target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert {kind} to {target}: {reason}")]
pub struct ConversionError {
    kind: ValueKind,
    target: TargetType,
    reason: String,
}

impl ConversionError {
    fn new(value: &Value, target: TargetType, reason: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::of(value),
            target,
            reason: reason.into(),
        }
    }

    pub fn target(&self) -> TargetType {
        self.target
    }
}

/// Coerces `value` into `target`. `time_format` applies to the time targets only.
pub fn convert(
    value: &Value,
    target: TargetType,
    time_format: Option<&str>,
) -> Result<Value, ConversionError> {
    match target {
        TargetType::Any => Ok(value.clone()),
        TargetType::String => to_string(value),
        TargetType::Integer => to_integer(value),
        TargetType::Float => to_float(value),
        TargetType::Boolean => to_boolean(value),
        TargetType::Timestamp => to_timestamp(value, time_format),
        TargetType::TimeString => to_time_string(value, time_format),
    }
}

fn to_string(value: &Value) -> Result<Value, ConversionError> {
    match value {
        Value::Null => Err(ConversionError::new(
            value,
            TargetType::String,
            "null has no text form",
        )),
        Value::String(_) => Ok(value.clone()),
        Value::Bool(flag) => Ok(Value::String(flag.to_string())),
        Value::Number(number) => Ok(Value::String(number.to_string())),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)
            .map(Value::String)
            .map_err(|error| ConversionError::new(value, TargetType::String, error.to_string())),
    }
}

fn to_integer(value: &Value) -> Result<Value, ConversionError> {
    let target = TargetType::Integer;
    match value {
        Value::Number(number) if number.is_i64() || number.is_u64() => Ok(value.clone()),
        Value::Number(number) => {
            let float = number.as_f64().unwrap_or(f64::NAN);
            integral_f64(float).map(Value::Number).ok_or_else(|| {
                ConversionError::new(value, target, format!("{float} is not integral"))
            })
        }
        Value::Bool(flag) => Ok(Value::Number(Number::from(i64::from(*flag)))),
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(parsed) = trimmed.parse::<i64>() {
                return Ok(Value::Number(Number::from(parsed)));
            }
            if let Ok(parsed) = trimmed.parse::<u64>() {
                return Ok(Value::Number(Number::from(parsed)));
            }
            let Some(float) = parse_finite(trimmed) else {
                return Err(ConversionError::new(
                    value,
                    target,
                    format!("`{trimmed}` is not a number"),
                ));
            };
            if float.fract() != 0.0 {
                return Err(ConversionError::new(
                    value,
                    target,
                    format!("`{trimmed}` is not integral"),
                ));
            }
            integral_f64(float).map(Value::Number).ok_or_else(|| {
                ConversionError::new(value, target, format!("`{trimmed}` is out of integer range"))
            })
        }
        _ => Err(ConversionError::new(value, target, "unsupported source type")),
    }
}

/// Integral floats within the range `f64` represents exactly.
fn integral_f64(value: f64) -> Option<Number> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        Some(Number::from(value as i64))
    } else {
        None
    }
}

fn parse_finite(input: &str) -> Option<f64> {
    input.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

fn to_float(value: &Value) -> Result<Value, ConversionError> {
    let target = TargetType::Float;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            let Some(parsed) = parse_finite(trimmed) else {
                return Err(ConversionError::new(
                    value,
                    target,
                    format!("`{trimmed}` is not a finite number"),
                ));
            };
            Some(parsed)
        }
        _ => return Err(ConversionError::new(value, target, "unsupported source type")),
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ConversionError::new(value, target, "not a finite number"))
}

fn to_boolean(value: &Value) -> Result<Value, ConversionError> {
    let target = TargetType::Boolean;
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(ConversionError::new(value, target, "only 0 and 1 are boolean")),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            other => Err(ConversionError::new(
                value,
                target,
                format!("`{other}` is not a boolean literal"),
            )),
        },
        _ => Err(ConversionError::new(value, target, "unsupported source type")),
    }
}

fn to_timestamp(value: &Value, time_format: Option<&str>) -> Result<Value, ConversionError> {
    let target = TargetType::Timestamp;
    match value {
        Value::Number(number) if number.is_i64() => Ok(value.clone()),
        Value::String(text) => {
            let trimmed = text.trim();
            if let Ok(seconds) = trimmed.parse::<i64>() {
                return Ok(Value::Number(Number::from(seconds)));
            }
            parse_datetime(trimmed, time_format)
                .or_else(|| parse_datetime(trimmed, None))
                .map(|dt| Value::Number(Number::from(dt.timestamp())))
                .ok_or_else(|| {
                    ConversionError::new(value, target, format!("`{trimmed}` is not a date-time"))
                })
        }
        _ => Err(ConversionError::new(value, target, "unsupported source type")),
    }
}

fn to_time_string(value: &Value, time_format: Option<&str>) -> Result<Value, ConversionError> {
    let target = TargetType::TimeString;
    let datetime = match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .ok_or_else(|| ConversionError::new(value, target, "timestamp out of range"))?,
        Value::String(text) => {
            let trimmed = text.trim();
            if time_format.is_none() {
                return normalize_rfc3339_utc(trimmed).map(Value::String).ok_or_else(|| {
                    ConversionError::new(value, target, format!("`{trimmed}` is not RFC3339"))
                });
            }
            parse_datetime(trimmed, None)
                .or_else(|| parse_datetime(trimmed, time_format))
                .ok_or_else(|| {
                    ConversionError::new(value, target, format!("`{trimmed}` is not a date-time"))
                })?
        }
        _ => return Err(ConversionError::new(value, target, "unsupported source type")),
    };
    format_datetime(&datetime, time_format)
        .map(Value::String)
        .ok_or_else(|| ConversionError::new(value, target, "invalid time format"))
}
