pub mod compare;
pub mod group;
pub mod retry;
pub mod template;

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::domain::assertion::{Assertion, AssertionResult, Expected};
use crate::domain::dependency::ResolvedValues;
use crate::domain::value::{ValueKind, display_value};
use crate::domain::value_path::ValuePath;
use crate::engine::{convert, extract};

pub use compare::Verdict;
pub use group::{run_group, run_group_with_retry};

/// Evaluates one assertion against already resolved dependency values.
///
/// Never fails: locator, conversion and comparison problems all become a
/// failing result carrying the explanation.
pub fn evaluate(assertion: &Assertion, resolved: &ResolvedValues) -> AssertionResult {
    let mut detail = BTreeMap::new();
    detail.insert("kind".to_string(), json!(assertion.kind.as_str()));
    if let Some(locator) = &assertion.locator {
        detail.insert("locator".to_string(), json!(locator));
    }

    let expected = match &assertion.expected {
        Expected::Literal(value) => value.clone(),
        Expected::Dependency(id) => {
            detail.insert("dependency".to_string(), json!(id));
            match resolved.get(id) {
                Some(value) => value.clone(),
                None => {
                    return failed(
                        assertion,
                        assertion.actual.clone(),
                        Value::Null,
                        format!("dependency `{id}` has not been resolved"),
                        detail,
                    );
                }
            }
        }
    };

    let actual = match locate(assertion) {
        Ok(actual) => actual,
        Err(reason) => {
            return failed(assertion, Value::Null, expected, reason, detail);
        }
    };

    let actual = match assertion.options.convert {
        Some(target) => {
            detail.insert("convert".to_string(), json!(target.as_str()));
            match convert::convert(&actual, target, None) {
                Ok(converted) => converted,
                Err(error) => {
                    return failed(assertion, actual, expected, error.to_string(), detail);
                }
            }
        }
        None => actual,
    };

    let options = &assertion.options;
    if options.ignore_case {
        detail.insert("ignore_case".to_string(), json!(true));
    }
    if options.deep_comparison {
        detail.insert("deep_comparison".to_string(), json!(true));
    }
    if options.tolerance > 0.0 {
        detail.insert("tolerance".to_string(), json!(options.tolerance));
    }

    match compare::check(&assertion.kind, &actual, &expected, options) {
        Verdict::Satisfied => AssertionResult {
            name: assertion.name.clone(),
            passed: true,
            actual,
            expected,
            error: None,
            detail,
        },
        Verdict::Unsatisfied(reason) => failed(assertion, actual, expected, reason, detail),
    }
}

fn locate(assertion: &Assertion) -> Result<Value, String> {
    let Some(locator) = &assertion.locator else {
        return Ok(assertion.actual.clone());
    };
    let path = ValuePath::parse_relative(locator).map_err(|error| error.to_string())?;
    extract::find(&path, &assertion.actual)
        .cloned()
        .map_err(|error| format!("locator {error}"))
}

fn failed(
    assertion: &Assertion,
    actual: Value,
    expected: Value,
    reason: String,
    mut detail: BTreeMap<String, Value>,
) -> AssertionResult {
    let error = match &assertion.error_template {
        Some(template) => {
            detail.insert("reason".to_string(), json!(reason));
            let values = BTreeMap::from([
                ("name", assertion.name.clone()),
                ("type", ValueKind::of(&actual).to_string()),
                ("actual_value", display_value(&actual)),
                ("expected_value", display_value(&expected)),
                ("error", reason),
            ]);
            template::render(template, &values)
        }
        None => reason,
    };
    AssertionResult {
        name: assertion.name.clone(),
        passed: false,
        actual,
        expected,
        error: Some(error),
        detail,
    }
}
