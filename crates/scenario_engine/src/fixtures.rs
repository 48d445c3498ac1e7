//!
//! Expected-outcome fixtures keyed by step name.
//!
//! ```json
//! {
//!   "No3DSAutoCapture": {
//!     "Request": { "amount": 1000, "currency": "USD", "capture_method": "automatic" },
//!     "Response": { "status": 200, "body": { "status": "succeeded", "amount_capturable": 0 } }
//!   }
//! }
//! ```
//!

use std::{collections::HashMap, path::Path};

use error_stack::{report, ResultExt};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    errors::{ScenarioError, ScenarioResult},
    validator::ExpectedFields,
};

/// What a step's response must look like.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExpectedResponse {
    /// Expected HTTP status, not the domain `status` field
    pub status: u16,
    #[serde(default)]
    pub body: ExpectedFields,
}

impl ExpectedResponse {
    pub fn new(status: u16, body: ExpectedFields) -> Self {
        Self { status, body }
    }

    pub fn expects_success(&self) -> bool {
        self.status == 200
    }
}

/// Per-step switches.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct StepConfigs {
    /// Do not run this step for the connector the fixture set belongs to
    pub trigger_skip: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StepFixture {
    /// Request template; the flow fills in identifiers from the scenario context
    #[serde(default)]
    pub request: Map<String, Value>,
    pub response: ExpectedResponse,
    #[serde(default)]
    pub configs: StepConfigs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct FixtureSet(HashMap<String, StepFixture>);

impl FixtureSet {
    pub fn from_json_str(contents: &str) -> ScenarioResult<Self> {
        serde_json::from_str(contents)
            .change_context(ScenarioError::ConfigurationError(
                "fixture set is not valid JSON".to_string(),
            ))
    }

    pub fn from_file(path: impl AsRef<Path>) -> ScenarioResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .change_context(ScenarioError::ConfigurationError(
                "fixture file not readable".to_string(),
            ))
            .attach_printable_lazy(|| format!("path: {}", path.as_ref().display()))?;
        Self::from_json_str(&contents)
    }

    pub fn insert(&mut self, name: impl Into<String>, fixture: StepFixture) {
        self.0.insert(name.into(), fixture);
    }

    pub fn get(&self, name: &str) -> ScenarioResult<&StepFixture> {
        self.0
            .get(name)
            .ok_or_else(|| report!(ScenarioError::FixtureNotFound(name.to_string())))
    }
}
