//! Errors and error specific types for the scenario engine

use crate::context::ContextKey;

/// Custom Result
/// A custom datatype that wraps the error variant <E> into a report, allowing
/// error_stack::Report<E> specific extendability
///
/// Effectively, equivalent to `Result<T, error_stack::Report<E>>`
pub type CustomResult<T, E> = error_stack::Result<T, E>;

pub type ScenarioResult<T> = CustomResult<T, ScenarioError>;

/// Failure of a scenario step. Every variant halts the scenario; there are no retries.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Scenario context key `{0}` was read before it was set")]
    MissingContextKey(ContextKey),
    #[error("Scenario context key `{key}` holds a {found} value, expected {expected}")]
    ContextTypeMismatch {
        key: ContextKey,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid capture method {0}")]
    InvalidCaptureMethod(String),
    #[error("Invalid authentication type {0}")]
    InvalidAuthenticationType(String),
    #[error("Invalid payment method type {0}")]
    InvalidPaymentMethodType(String),
    #[error("Unhandled response shape (HTTP {status}): {body}")]
    UnhandledResponseShape { status: u16, body: String },
    #[error("Response field `{key}` mismatch: expected {expected}, found {actual}")]
    ValidationMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("Expected HTTP status {expected}, received {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },
    #[error("Response is missing field `{0}`")]
    MissingResponseField(String),
    #[error("Retrieved {field} {actual} does not match stored {expected}")]
    RoundTripMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
    #[error("Request to the service under test could not be completed")]
    TransportFailure,
    #[error("Redirection handler failed")]
    RedirectionFailed,
    #[error("No fixture named `{0}`")]
    FixtureNotFound(String),
    #[error("Scenario halted after step `{0}` failed")]
    ScenarioHalted(String),
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),
}

/// Coarse grouping of [`ScenarioError`] used when reporting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request never produced a response, or produced an undeclared status.
    Transport,
    /// The response shape is outside every modelled combination.
    Classification,
    /// A fixture field differs from the response.
    Validation,
    /// A step read context state that no earlier step wrote.
    Context,
    /// Fixtures, settings or collaborators are misconfigured.
    Setup,
}

impl ScenarioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransportFailure | Self::UnexpectedStatus { .. } | Self::RedirectionFailed => {
                ErrorKind::Transport
            }
            Self::InvalidCaptureMethod(_)
            | Self::InvalidAuthenticationType(_)
            | Self::InvalidPaymentMethodType(_)
            | Self::UnhandledResponseShape { .. } => ErrorKind::Classification,
            Self::ValidationMismatch { .. }
            | Self::MissingResponseField(_)
            | Self::RoundTripMismatch { .. } => ErrorKind::Validation,
            Self::MissingContextKey(_)
            | Self::ContextTypeMismatch { .. }
            | Self::ScenarioHalted(_) => ErrorKind::Context,
            Self::FixtureNotFound(_) | Self::ConfigurationError(_) => ErrorKind::Setup,
        }
    }

    pub(crate) fn unhandled(status: u16, body: &serde_json::Value) -> Self {
        Self::UnhandledResponseShape {
            status,
            body: body.to_string(),
        }
    }

    pub(crate) fn mismatch(
        key: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::ValidationMismatch {
            key: key.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Failures of the HTTP transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiClientError {
    #[error("Failed to construct the HTTP client")]
    ClientConstructionFailed,
    #[error("Failed to parse the request URL")]
    UrlEncodingFailed,
    #[error("Failed to construct the request headers")]
    HeaderMapConstructionFailed,
    #[error("Request was not sent: {0}")]
    RequestNotSent(String),
    #[error("Request timed out")]
    RequestTimeoutReceived,
    #[error("Failed to decode the response body")]
    ResponseDecodingFailed,
}

/// Failures reported by the redirection handler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RedirectionError {
    #[error("Redirection flow `{0}` is not supported by this handler")]
    UnsupportedFlow(String),
    #[error("Redirection did not reach the expected url: {0}")]
    ExpectedUrlNotReached(String),
    #[error("Redirection handler failed: {0}")]
    HandlerFailed(String),
}
