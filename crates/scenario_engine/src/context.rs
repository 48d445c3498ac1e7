//!
//! Scenario context: the state one scenario threads from step to step.
//!
//! A context belongs to exactly one scenario and is passed by `&mut` into every flow. Reads of
//! keys no earlier step wrote fail with [`ScenarioError::MissingContextKey`]; there is no
//! implicit defaulting.
//!

use std::{collections::HashMap, str::FromStr};

use error_stack::{report, ResultExt};
use masking::{PeekInterface, Secret};
use scenario_env::logger;
use serde_json::Value;

use crate::errors::{ScenarioError, ScenarioResult};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ContextKey {
    BaseUrl,
    AdminApiKey,
    ApiKey,
    ApiKeyId,
    PublishableKey,
    MerchantId,
    ProfileId,
    CustomerId,
    ConnectorId,
    MerchantConnectorId,
    PaymentId,
    ClientSecret,
    PaymentAmount,
    PaymentMethodType,
    NextActionUrl,
    NextActionType,
    RefundId,
    MandateId,
    MandateStatus,
    MandateAmount,
    PayoutId,
    PayoutAmount,
    PayoutStatus,
}

impl ContextKey {
    /// Keys whose absence is a legitimate state rather than a sequencing bug.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::NextActionUrl
                | Self::NextActionType
                | Self::PaymentMethodType
                | Self::MandateAmount
                | Self::MandateStatus
        )
    }
}

#[derive(Clone, Debug)]
pub enum ContextValue {
    Text(String),
    Number(i64),
    Flag(bool),
    Json(Value),
    Secret(Secret<String>),
}

impl ContextValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Flag(_) => "flag",
            Self::Json(_) => "json",
            Self::Secret(_) => "secret",
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Secret<String>> for ContextValue {
    fn from(value: Secret<String>) -> Self {
        Self::Secret(value)
    }
}

#[derive(Debug, Default)]
pub struct ScenarioContext {
    values: HashMap<ContextKey, ContextValue>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores unconditionally, overwriting any earlier value.
    pub fn set(&mut self, key: ContextKey, value: impl Into<ContextValue>) {
        let value = value.into();
        logger::debug!(tag = ?logger::Tag::ContextWrite, %key, ?value);
        self.values.insert(key, value);
    }

    /// Forgets a value, e.g. a continuation token consumed by an earlier step.
    pub fn remove(&mut self, key: ContextKey) -> Option<ContextValue> {
        self.values.remove(&key)
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn get(&self, key: ContextKey) -> ScenarioResult<&ContextValue> {
        self.values
            .get(&key)
            .ok_or_else(|| report!(ScenarioError::MissingContextKey(key)))
    }

    /// Presence-checked read of an optional key. Required keys still fail when unset.
    pub fn get_optional(&self, key: ContextKey) -> ScenarioResult<Option<&ContextValue>> {
        match self.values.get(&key) {
            Some(value) => Ok(Some(value)),
            None if key.is_optional() => Ok(None),
            None => Err(report!(ScenarioError::MissingContextKey(key)))
                .attach_printable("key is required and has no default"),
        }
    }

    pub fn get_string(&self, key: ContextKey) -> ScenarioResult<&str> {
        match self.get(key)? {
            ContextValue::Text(value) => Ok(value),
            other => Err(type_mismatch(key, "text", other)),
        }
    }

    pub fn get_optional_string(&self, key: ContextKey) -> ScenarioResult<Option<&str>> {
        match self.get_optional(key)? {
            Some(ContextValue::Text(value)) => Ok(Some(value)),
            Some(other) => Err(type_mismatch(key, "text", other)),
            None => Ok(None),
        }
    }

    pub fn get_secret(&self, key: ContextKey) -> ScenarioResult<&Secret<String>> {
        match self.get(key)? {
            ContextValue::Secret(value) => Ok(value),
            other => Err(type_mismatch(key, "secret", other)),
        }
    }

    pub fn get_i64(&self, key: ContextKey) -> ScenarioResult<i64> {
        match self.get(key)? {
            ContextValue::Number(value) => Ok(*value),
            other => Err(type_mismatch(key, "number", other)),
        }
    }

    pub fn get_optional_i64(&self, key: ContextKey) -> ScenarioResult<Option<i64>> {
        match self.get_optional(key)? {
            Some(ContextValue::Number(value)) => Ok(Some(*value)),
            Some(other) => Err(type_mismatch(key, "number", other)),
            None => Ok(None),
        }
    }

    pub fn get_bool(&self, key: ContextKey) -> ScenarioResult<bool> {
        match self.get(key)? {
            ContextValue::Flag(value) => Ok(*value),
            other => Err(type_mismatch(key, "flag", other)),
        }
    }

    pub fn get_json(&self, key: ContextKey) -> ScenarioResult<&Value> {
        match self.get(key)? {
            ContextValue::Json(value) => Ok(value),
            other => Err(type_mismatch(key, "json", other)),
        }
    }

    /// Reads a text value and parses it into one of the API enumerations.
    pub fn get_parsed<T>(&self, key: ContextKey) -> ScenarioResult<Option<T>>
    where
        T: FromStr,
    {
        self.get_optional_string(key)?
            .map(|raw| {
                raw.parse::<T>().map_err(|_| {
                    report!(ScenarioError::ContextTypeMismatch {
                        key,
                        expected: std::any::type_name::<T>(),
                        found: "text",
                    })
                    .attach_printable(format!("stored value: {raw}"))
                })
            })
            .transpose()
    }

    /// Text or secret value as a plain string, for building URLs and headers.
    pub(crate) fn expose_string(&self, key: ContextKey) -> ScenarioResult<String> {
        match self.get(key)? {
            ContextValue::Text(value) => Ok(value.clone()),
            ContextValue::Secret(value) => Ok(value.peek().clone()),
            other => Err(type_mismatch(key, "text", other)),
        }
    }
}

fn type_mismatch(
    key: ContextKey,
    expected: &'static str,
    found: &ContextValue,
) -> error_stack::Report<ScenarioError> {
    report!(ScenarioError::ContextTypeMismatch {
        key,
        expected,
        found: found.kind(),
    })
}
