//!
//! Payment-method dispatch of confirm responses.
//!
//! Each family decides which `next_action` field carries its continuation and whether a
//! `failed` domain status can be a legitimate end state.
//!
//! | family                 | continuation                        |
//! |------------------------|-------------------------------------|
//! | generic, card, wallet  | `redirect_to_url` when `three_ds`   |
//! | bank_redirect          | `redirect_to_url` when `three_ds`   |
//! | bank_transfer          | `qr_code_url`, else `image_data_url`|
//! | upi_collect            | `redirect_to_url`                   |
//! | upi_intent             | `qr_code_fetch_url`                 |
//!

use error_stack::report;
use scenario_env::logger;
use serde_json::Value;

use super::{
    classifier::{self, Classification, Continuation, Outcome, RequiredShape},
    utils,
};
use crate::{
    consts,
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::ExpectedResponse,
    redirection::{RedirectionFlow, RedirectionOverride},
    scenario::ScenarioState,
    types::{
        enums::{ContinuationKind, IntentStatus, PaymentMethodFamily},
        Response,
    },
};

/// What the caller does after a dispatched step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    Continue,
    Redirect(RedirectionFlow),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispatchOutcome {
    /// `None` for declared error responses, which carry no payment method
    pub family: Option<PaymentMethodFamily>,
    pub outcome: Outcome,
}

impl DispatchOutcome {
    pub fn signal(&self) -> Signal {
        match (self.family, &self.outcome) {
            (Some(family), Outcome::AwaitingContinuation(_)) => Signal::Redirect(family.into()),
            _ => Signal::Continue,
        }
    }
}

/// Family of a response from its `payment_method` and, for UPI, `payment_method_type`. Methods
/// without a dedicated flow are [`PaymentMethodFamily::Generic`]; only an unknown UPI subtype is
/// rejected.
pub fn family_of(body: &Value) -> ScenarioResult<PaymentMethodFamily> {
    let payment_method = body.get("payment_method").and_then(Value::as_str);
    let payment_method_type = body.get("payment_method_type").and_then(Value::as_str);

    match (payment_method, payment_method_type) {
        (Some("card"), _) => Ok(PaymentMethodFamily::Card),
        (Some("wallet"), _) => Ok(PaymentMethodFamily::Wallet),
        (Some("bank_redirect"), _) => Ok(PaymentMethodFamily::BankRedirect),
        (Some("bank_transfer"), _) => Ok(PaymentMethodFamily::BankTransfer),
        (Some("upi"), Some("upi_collect")) => Ok(PaymentMethodFamily::UpiCollect),
        (Some("upi"), Some("upi_intent")) => Ok(PaymentMethodFamily::UpiIntent),
        (Some("upi"), other) => Err(report!(ScenarioError::InvalidPaymentMethodType(
            other.map_or_else(|| "<absent>".to_string(), |raw| format!("\"{raw}\""))
        ))),
        _ => Ok(PaymentMethodFamily::Generic),
    }
}

/// Classifies a confirm response, validates it and records the payment and its continuation in
/// the context.
pub fn dispatch(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    response: &Response,
    expected: &ExpectedResponse,
) -> ScenarioResult<DispatchOutcome> {
    if !response.is_success() {
        utils::default_error_handler(response, expected)?;
        return Ok(DispatchOutcome {
            family: None,
            outcome: Outcome::ExpectedError {
                status_code: response.status_code,
            },
        });
    }

    let connector_id = context.get_string(ContextKey::ConnectorId)?.to_string();
    let payment_id = utils::required_str(response, "payment_id")?.to_string();
    let family = family_of(&response.body)?;
    let classification = Classification::from_body(&response.body)?;
    let payment_method_type = response.str_field("payment_method_type");
    let exception = state
        .redirection_overrides
        .lookup(&connector_id, payment_method_type);

    logger::info!(
        tag = ?logger::Tag::Classification,
        %family,
        connector = %connector_id,
        payment_method_type = payment_method_type.unwrap_or("-"),
        exception = ?exception,
    );

    let outcome = match family {
        PaymentMethodFamily::Generic | PaymentMethodFamily::Card | PaymentMethodFamily::Wallet => {
            redirect_family(classification, exception, response, expected)?
        }
        PaymentMethodFamily::BankRedirect => bank_redirect(classification, response, expected)?,
        PaymentMethodFamily::BankTransfer => Outcome::AwaitingContinuation(bank_transfer(response)?),
        PaymentMethodFamily::UpiCollect => Outcome::AwaitingContinuation(Continuation::required(
            response,
            ContinuationKind::RedirectToUrl,
        )?),
        PaymentMethodFamily::UpiIntent => Outcome::AwaitingContinuation(Continuation::required(
            response,
            ContinuationKind::QrCodeFetchUrl,
        )?),
    };

    context.set(ContextKey::PaymentId, payment_id);
    match payment_method_type {
        Some(payment_method_type) => context.set(ContextKey::PaymentMethodType, payment_method_type),
        None => {
            context.remove(ContextKey::PaymentMethodType);
        }
    }
    match outcome.continuation() {
        Some(continuation) => {
            context.set(ContextKey::NextActionUrl, continuation.url.clone());
            context.set(ContextKey::NextActionType, continuation.kind.to_string());
        }
        None => {
            context.remove(ContextKey::NextActionUrl);
            context.remove(ContextKey::NextActionType);
        }
    }

    Ok(DispatchOutcome {
        family: Some(family),
        outcome,
    })
}

fn redirect_family(
    classification: Classification,
    exception: Option<RedirectionOverride>,
    response: &Response,
    expected: &ExpectedResponse,
) -> ScenarioResult<Outcome> {
    match (classification.required_shape(), exception) {
        (RequiredShape::RedirectPending, Some(RedirectionOverride::WaitScreen)) => wait_screen(response),
        _ => classifier::evaluate(classification, response, expected),
    }
}

fn wait_screen(response: &Response) -> ScenarioResult<Outcome> {
    match response.str_field("next_action.type") {
        Some(consts::WAIT_SCREEN_NEXT_ACTION) => Ok(Outcome::WaitScreen),
        _ => Err(report!(ScenarioError::mismatch(
            "next_action.type",
            consts::WAIT_SCREEN_NEXT_ACTION,
            response
                .field("next_action.type")
                .map_or_else(|| "<absent>".to_string(), Value::to_string),
        ))),
    }
}

fn bank_redirect(
    classification: Classification,
    response: &Response,
    expected: &ExpectedResponse,
) -> ScenarioResult<Outcome> {
    let failed = response
        .str_field("status")
        .and_then(|status| status.parse::<IntentStatus>().ok())
        == Some(IntentStatus::Failed);
    if !failed {
        return classifier::evaluate(classification, response, expected);
    }

    let declared = expected.body.get("error_code").and_then(Value::as_str);
    let returned = response.str_field("error_code");
    match (declared, returned) {
        (Some(declared), Some(returned)) if declared == returned => Ok(Outcome::AcceptedFailure {
            error_code: returned.to_string(),
        }),
        (Some(declared), returned) => Err(report!(ScenarioError::mismatch(
            "error_code",
            declared,
            returned.unwrap_or("<absent>"),
        ))),
        (None, _) => Err(report!(ScenarioError::unhandled(response.status_code, &response.body))),
    }
}

/// `qr_code_url`, falling back to `image_data_url` when the former is `null`.
fn bank_transfer(response: &Response) -> ScenarioResult<Continuation> {
    Continuation::from_response(response, ContinuationKind::QrCodeUrl)
        .map(Ok)
        .unwrap_or_else(|| Continuation::required(response, ContinuationKind::ImageDataUrl))
}
