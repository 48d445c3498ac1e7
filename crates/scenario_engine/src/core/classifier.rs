//!
//! Outcome classification of a successful (HTTP 200) payment response by
//! `capture_method × authentication_type`.
//!

use error_stack::{report, ResultExt};
use scenario_env::logger;
use serde_json::Value;

use crate::{
    errors::{ScenarioError, ScenarioResult},
    fixtures::ExpectedResponse,
    types::{
        enums::{AuthenticationType, CaptureMethod, ContinuationKind, IntentStatus},
        Response,
    },
    validator,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Classification {
    pub capture_method: CaptureMethod,
    pub authentication_type: AuthenticationType,
}

/// What a response must look like for its classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequiredShape {
    /// A continuation must be present; no terminal status is asserted yet
    RedirectPending,
    /// Body must carry every fixture field
    MatchesFixture,
}

impl Classification {
    pub fn new(capture_method: CaptureMethod, authentication_type: AuthenticationType) -> Self {
        Self {
            capture_method,
            authentication_type,
        }
    }

    /// Reads both axes from a response body. Values outside the modelled sets are fatal and
    /// quoted verbatim in the error.
    pub fn from_body(body: &Value) -> ScenarioResult<Self> {
        let capture_method = parse_axis(body, "capture_method")
            .map_err(|raw| report!(ScenarioError::InvalidCaptureMethod(raw)))?;
        let authentication_type = parse_axis(body, "authentication_type")
            .map_err(|raw| report!(ScenarioError::InvalidAuthenticationType(raw)))?;
        Ok(Self::new(capture_method, authentication_type))
    }

    pub fn required_shape(self) -> RequiredShape {
        match (self.capture_method, self.authentication_type) {
            (CaptureMethod::Automatic, AuthenticationType::ThreeDs) => RequiredShape::RedirectPending,
            (CaptureMethod::Automatic, AuthenticationType::NoThreeDs) => RequiredShape::MatchesFixture,
            (CaptureMethod::Manual, AuthenticationType::ThreeDs) => RequiredShape::RedirectPending,
            (CaptureMethod::Manual, AuthenticationType::NoThreeDs) => RequiredShape::MatchesFixture,
        }
    }
}

fn parse_axis<T: std::str::FromStr>(body: &Value, field: &str) -> Result<T, String> {
    match body.get(field) {
        Some(Value::String(raw)) => raw.parse().map_err(|_| Value::from(raw.as_str()).to_string()),
        Some(other) => Err(other.to_string()),
        None => Err("<absent>".to_string()),
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Continuation {
    pub kind: ContinuationKind,
    pub url: String,
}

impl Continuation {
    /// Reads `next_action.<kind>`, `None` when absent or `null`.
    pub fn from_response(response: &Response, kind: ContinuationKind) -> Option<Self> {
        response
            .str_field(&format!("next_action.{kind}"))
            .map(|url| Self {
                kind,
                url: url.to_string(),
            })
    }

    pub(crate) fn required(response: &Response, kind: ContinuationKind) -> ScenarioResult<Self> {
        Self::from_response(response, kind)
            .ok_or_else(|| report!(ScenarioError::MissingResponseField(format!("next_action.{kind}"))))
            .attach_printable_lazy(|| response.body.to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The customer has to act on the continuation before the payment can settle
    AwaitingContinuation(Continuation),
    /// Body matched the fixture
    Matched { status: Option<IntentStatus> },
    /// `failed` domain status accepted because the fixture declared the same error code
    AcceptedFailure { error_code: String },
    /// Connector shows a wait screen in place of a redirect
    WaitScreen,
    /// Non-200 response matching the fixture's declared status and body
    ExpectedError { status_code: u16 },
}

impl Outcome {
    pub fn continuation(&self) -> Option<&Continuation> {
        match self {
            Self::AwaitingContinuation(continuation) => Some(continuation),
            Self::Matched { .. }
            | Self::AcceptedFailure { .. }
            | Self::WaitScreen
            | Self::ExpectedError { .. } => None,
        }
    }
}

/// Applies the classification table to a 200 response whose continuation, if any, is a
/// `redirect_to_url`.
pub fn evaluate(
    classification: Classification,
    response: &Response,
    expected: &ExpectedResponse,
) -> ScenarioResult<Outcome> {
    let shape = classification.required_shape();
    logger::info!(
        tag = ?logger::Tag::Classification,
        capture_method = %classification.capture_method,
        authentication_type = %classification.authentication_type,
        ?shape,
    );

    match shape {
        RequiredShape::RedirectPending => Continuation::required(response, ContinuationKind::RedirectToUrl)
            .map(Outcome::AwaitingContinuation),
        RequiredShape::MatchesFixture => matched(response, expected),
    }
}

pub(crate) fn matched(response: &Response, expected: &ExpectedResponse) -> ScenarioResult<Outcome> {
    validator::assert_subset(&expected.body, &response.body, response.status_code)?;
    Ok(Outcome::Matched {
        status: response
            .str_field("status")
            .and_then(|status| status.parse().ok()),
    })
}
