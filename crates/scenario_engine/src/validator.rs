//!
//! Structural comparison of an expected fixture body against an actual response body.
//!
//! The expected side is always a subset: every key it declares must be present in the actual
//! body with a structurally equal value, extra actual keys are ignored.
//!

use std::fmt;

use error_stack::report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{CustomResult, ScenarioError, ScenarioResult};

/// Fields a response must carry. Keys absent here are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExpectedFields(Map<String, Value>);

impl ExpectedFields {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Same constraints minus `keys`, for flows that check those keys themselves.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for ExpectedFields {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// One differing field.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub key: String,
    pub expected: Value,
    /// `None` when the key is absent from the actual body
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "field `{}` expected {} but found {}",
                self.key, self.expected, actual
            ),
            None => write!(
                f,
                "field `{}` expected {} but it is absent",
                self.key, self.expected
            ),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Actual response body is not a JSON object")]
    NotAnObject,
    #[error("{0}")]
    Mismatch(Mismatch),
}

/// Fails on the first field of `expected` that `actual` does not match.
pub fn validate(expected: &ExpectedFields, actual: &Value) -> CustomResult<(), ValidationError> {
    match collect_mismatches(expected, actual)?.into_iter().next() {
        Some(mismatch) => Err(report!(ValidationError::Mismatch(mismatch))),
        None => Ok(()),
    }
}

/// Every field of `expected` that `actual` does not match. An empty `expected` accepts any body,
/// including `null` and plain text.
pub fn collect_mismatches(
    expected: &ExpectedFields,
    actual: &Value,
) -> CustomResult<Vec<Mismatch>, ValidationError> {
    if expected.is_empty() {
        return Ok(Vec::new());
    }
    let actual = actual
        .as_object()
        .ok_or_else(|| report!(ValidationError::NotAnObject))?;

    Ok(expected
        .iter()
        .filter_map(|(key, expected_value)| {
            let actual_value = actual.get(key);
            let matches = match actual_value {
                Some(actual_value) => values_match(expected_value, actual_value),
                // an expected `null` accepts a field the service left out
                None => expected_value.is_null(),
            };
            (!matches).then(|| Mismatch {
                key: key.clone(),
                expected: expected_value.clone(),
                actual: actual_value.cloned(),
            })
        })
        .collect())
}

/// [`validate`] with the failure mapped into the scenario taxonomy. `status_code` is the HTTP
/// status the body arrived with.
pub fn assert_subset(
    expected: &ExpectedFields,
    actual: &Value,
    status_code: u16,
) -> ScenarioResult<()> {
    validate(expected, actual).map_err(|report| {
        let scenario_error = match report.current_context() {
            ValidationError::Mismatch(mismatch) => ScenarioError::mismatch(
                mismatch.key.clone(),
                &mismatch.expected,
                mismatch
                    .actual
                    .as_ref()
                    .map_or_else(|| "<absent>".to_string(), Value::to_string),
            ),
            ValidationError::NotAnObject => ScenarioError::unhandled(status_code, actual),
        };
        report.change_context(scenario_error)
    })
}

/// Deep equality where numbers compare by value (`1000` equals `1000.0`) and object key order
/// is irrelevant. Arrays compare element by element.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(expected), Value::Number(actual)) => {
            match (expected.as_i64(), actual.as_i64()) {
                (Some(expected), Some(actual)) => expected == actual,
                _ => match (expected.as_u64(), actual.as_u64()) {
                    (Some(expected), Some(actual)) => expected == actual,
                    _ => expected.as_f64() == actual.as_f64(),
                },
            }
        }
        (Value::Array(expected), Value::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(expected, actual)| values_match(expected, actual))
        }
        (Value::Object(expected), Value::Object(actual)) => {
            expected.len() == actual.len()
                && expected.iter().all(|(key, expected)| {
                    actual
                        .get(key)
                        .is_some_and(|actual| values_match(expected, actual))
                })
        }
        (expected, actual) => expected == actual,
    }
}
