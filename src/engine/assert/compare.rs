use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Number, Value};

use crate::domain::assertion::{AssertionKind, AssertionOptions};
use crate::domain::value::{ValueKind, deep_eq, display_value, length_of, primitive_eq};
use crate::domain::value_path::ValuePath;
use crate::engine::extract;

/// Outcome of one comparison. A failure always carries its explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    Unsatisfied(String),
}

impl Verdict {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied)
    }

    fn from_bool(satisfied: bool, failure: impl FnOnce() -> String) -> Self {
        if satisfied {
            Self::Satisfied
        } else {
            Self::Unsatisfied(failure())
        }
    }
}

/// Applies `kind` to an already located and converted actual value.
pub fn check(
    kind: &AssertionKind,
    actual: &Value,
    expected: &Value,
    options: &AssertionOptions,
) -> Verdict {
    match kind {
        AssertionKind::Equal => Verdict::from_bool(equals(actual, expected, options), || {
            format!(
                "expected {} but got {}",
                display_value(expected),
                display_value(actual)
            )
        }),
        AssertionKind::NotEqual => Verdict::from_bool(!equals(actual, expected, options), || {
            format!("expected a value other than {}", display_value(expected))
        }),
        AssertionKind::Contains => match contains(actual, expected, options) {
            Ok(found) => Verdict::from_bool(found, || {
                format!(
                    "{} does not contain {}",
                    display_value(actual),
                    display_value(expected)
                )
            }),
            Err(reason) => Verdict::Unsatisfied(reason),
        },
        AssertionKind::NotContains => match contains(actual, expected, options) {
            Ok(found) => Verdict::from_bool(!found, || {
                format!(
                    "{} contains {}",
                    display_value(actual),
                    display_value(expected)
                )
            }),
            Err(reason) => Verdict::Unsatisfied(reason),
        },
        AssertionKind::GreaterThan => ordered(kind, actual, expected, options, |ord| {
            ord == Ordering::Greater
        }),
        AssertionKind::GreaterOrEqual => ordered(kind, actual, expected, options, |ord| {
            ord != Ordering::Less
        }),
        AssertionKind::LessThan => {
            ordered(kind, actual, expected, options, |ord| ord == Ordering::Less)
        }
        AssertionKind::LessOrEqual => ordered(kind, actual, expected, options, |ord| {
            ord != Ordering::Greater
        }),
        AssertionKind::RegexMatch => regex_match(actual, expected, options),
        AssertionKind::LengthEqual => length_equal(actual, expected),
        AssertionKind::TypeMatch => {
            let (actual_kind, expected_kind) = (ValueKind::of(actual), ValueKind::of(expected));
            Verdict::from_bool(actual_kind == expected_kind, || {
                format!("type mismatch: actual is {actual_kind}, expected {expected_kind}")
            })
        }
        AssertionKind::HasField => has_field(actual, expected),
        AssertionKind::Unsupported(name) => {
            Verdict::Unsatisfied(format!("unsupported assertion kind `{name}`"))
        }
    }
}

fn equals(actual: &Value, expected: &Value, options: &AssertionOptions) -> bool {
    if options.deep_comparison {
        deep_eq(actual, expected)
    } else {
        primitive_eq(actual, expected)
    }
}

fn contains(actual: &Value, expected: &Value, options: &AssertionOptions) -> Result<bool, String> {
    match actual {
        Value::Array(items) => Ok(items.iter().any(|item| deep_eq(item, expected))),
        Value::Object(map) => Ok(map.values().any(|item| deep_eq(item, expected))),
        Value::String(text) => {
            let Value::String(needle) = expected else {
                return Err(format!(
                    "text can only contain text, expected value is {}",
                    ValueKind::of(expected)
                ));
            };
            if options.ignore_case {
                Ok(text.to_lowercase().contains(&needle.to_lowercase()))
            } else {
                Ok(text.contains(needle.as_str()))
            }
        }
        other => Err(format!(
            "contains requires a sequence, text or record, got {}",
            ValueKind::of(other)
        )),
    }
}

fn ordered(
    kind: &AssertionKind,
    actual: &Value,
    expected: &Value,
    options: &AssertionOptions,
    accept: impl FnOnce(Ordering) -> bool,
) -> Verdict {
    let (Value::Number(left), Value::Number(right)) = (actual, expected) else {
        return Verdict::Unsatisfied(format!(
            "{kind} requires numeric operands, got {} and {}",
            ValueKind::of(actual),
            ValueKind::of(expected)
        ));
    };
    match compare_numbers(left, right, options.tolerance) {
        Some(ordering) => Verdict::from_bool(accept(ordering), || {
            format!("{left} is not {} {right}", kind.as_str().replace('_', " "))
        }),
        None => Verdict::Unsatisfied(format!("cannot order {left} and {right}")),
    }
}

/// Orders two numbers, treating values within `tolerance` of each other as equal.
///
/// Integers compare exactly; mixed or float operands go through `f64`.
pub fn compare_numbers(left: &Number, right: &Number, tolerance: f64) -> Option<Ordering> {
    if tolerance > 0.0
        && let (Some(left), Some(right)) = (left.as_f64(), right.as_f64())
        && (left - right).abs() <= tolerance
    {
        return Some(Ordering::Equal);
    }

    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return Some(left.cmp(&right));
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return Some(left.cmp(&right));
    }
    // Mixed signed/unsigned: the unsigned side is either above i64::MAX or the
    // signed side is negative.
    if left.as_i64().is_some() && right.as_u64().is_some() {
        return Some(Ordering::Less);
    }
    if left.as_u64().is_some() && right.as_i64().is_some() {
        return Some(Ordering::Greater);
    }

    left.as_f64()
        .zip(right.as_f64())
        .and_then(|(left, right)| left.partial_cmp(&right))
}

fn regex_match(actual: &Value, expected: &Value, options: &AssertionOptions) -> Verdict {
    let Value::String(subject) = actual else {
        return Verdict::Unsatisfied(format!(
            "regex_match requires text, got {}",
            ValueKind::of(actual)
        ));
    };
    let Value::String(pattern) = expected else {
        return Verdict::Unsatisfied(format!(
            "regex pattern must be text, got {}",
            ValueKind::of(expected)
        ));
    };

    let (pattern, subject) = if options.ignore_case {
        (
            format!("(?i){}", pattern.to_lowercase()),
            subject.to_lowercase(),
        )
    } else {
        (pattern.clone(), subject.clone())
    };
    match Regex::new(&pattern) {
        Ok(regex) => Verdict::from_bool(regex.is_match(&subject), || {
            format!("`{subject}` does not match /{pattern}/")
        }),
        Err(error) => Verdict::Unsatisfied(format!("invalid regex pattern `{pattern}`: {error}")),
    }
}

fn length_equal(actual: &Value, expected: &Value) -> Verdict {
    let Some(expected_len) = expected.as_u64() else {
        return Verdict::Unsatisfied(format!(
            "length_equal expects a non-negative integer, got {}",
            ValueKind::of(expected)
        ));
    };
    let Some(actual_len) = length_of(actual) else {
        return Verdict::Unsatisfied(format!(
            "length_equal requires a sequence, text or record, got {}",
            ValueKind::of(actual)
        ));
    };
    Verdict::from_bool(actual_len as u64 == expected_len, || {
        format!("length is {actual_len}, expected {expected_len}")
    })
}

fn has_field(actual: &Value, expected: &Value) -> Verdict {
    let Value::String(field) = expected else {
        return Verdict::Unsatisfied(format!(
            "has_field expects a field name, got {}",
            ValueKind::of(expected)
        ));
    };
    let path = match ValuePath::parse_relative(field) {
        Ok(path) => path,
        Err(error) => return Verdict::Unsatisfied(error.to_string()),
    };
    match extract::find(&path, actual) {
        Ok(_) => Verdict::Satisfied,
        Err(error) => Verdict::Unsatisfied(format!("field `{field}` is absent: {error}")),
    }
}
