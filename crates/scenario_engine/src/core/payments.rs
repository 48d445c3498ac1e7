use error_stack::{report, ResultExt};
use masking::{Mask, Secret};
use scenario_env::{instrument, logger, Flow};
use serde_json::{json, Value};

use super::{
    classifier::Outcome,
    dispatcher::{self, DispatchOutcome},
    utils,
};
use crate::{
    consts,
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::StepFixture,
    redirection::{RedirectionFlow, RedirectionOutcome, RedirectionOverride, RedirectionTarget},
    scenario::ScenarioState,
    types::{enums::ContinuationKind, Method, RequestBuilder, Response},
};

/// Creates an unconfirmed payment and stores its id and client secret.
#[instrument(skip_all, fields(flow = ?Flow::PaymentsCreate))]
pub async fn create_payment_intent(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let body = utils::request_body(
        &fixture.request,
        customer_field(context)?
            .into_iter()
            .chain([("confirm", json!(false))]),
    );
    let request = utils::merchant_request(context, Method::Post, "/payments")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    let outcome = fixture_outcome(&response, fixture)?;

    if response.is_success() {
        store_payment(context, &response)?;
    }
    Ok(outcome)
}

/// Confirms the stored payment with the publishable key and dispatches the response.
#[instrument(skip_all, fields(flow = ?Flow::PaymentsConfirm))]
pub async fn confirm_payment(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<DispatchOutcome> {
    let payment_id = context.get_string(ContextKey::PaymentId)?.to_string();
    let client_secret = context.expose_string(ContextKey::ClientSecret)?;
    let publishable_key = context.expose_string(ContextKey::PublishableKey)?;

    let url = utils::build_url(context, &format!("/payments/{payment_id}/confirm"))?;
    let body = utils::request_body(
        &fixture.request,
        [("client_secret", json!(client_secret))],
    );
    let request = RequestBuilder::new(Method::Post, &url)
        .header(consts::API_KEY_HEADER, publishable_key.into_masked())
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    dispatcher::dispatch(state, context, &response, &fixture.response)
}

/// Creates and confirms in one call.
#[instrument(skip_all, fields(flow = ?Flow::PaymentsCreate))]
pub async fn create_confirm_payment(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<DispatchOutcome> {
    let body = utils::request_body(
        &fixture.request,
        customer_field(context)?
            .into_iter()
            .chain([("confirm", json!(true))]),
    );
    let request = utils::merchant_request(context, Method::Post, "/payments")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    let dispatched = dispatcher::dispatch(state, context, &response, &fixture.response)?;

    if response.is_success() {
        store_payment(context, &response)?;
    }
    Ok(dispatched)
}

#[instrument(skip_all, fields(flow = ?Flow::PaymentsCapture))]
pub async fn capture_payment(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let payment_id = context.get_string(ContextKey::PaymentId)?;
    let body = utils::request_body(&fixture.request, []);
    let request =
        utils::merchant_request(context, Method::Post, &format!("/payments/{payment_id}/capture"))?
            .set_body(body)
            .build();
    let response = utils::call(state, request).await?;
    fixture_outcome(&response, fixture)
}

#[instrument(skip_all, fields(flow = ?Flow::PaymentsCancel))]
pub async fn void_payment(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let payment_id = context.get_string(ContextKey::PaymentId)?;
    let body = utils::request_body(&fixture.request, []);
    let request =
        utils::merchant_request(context, Method::Post, &format!("/payments/{payment_id}/cancel"))?
            .set_body(body)
            .build();
    let response = utils::call(state, request).await?;
    fixture_outcome(&response, fixture)
}

#[instrument(skip_all, fields(flow = ?Flow::PaymentsRetrieve))]
pub async fn retrieve_payment(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let payment_id = context.get_string(ContextKey::PaymentId)?;
    let request = utils::merchant_request(
        context,
        Method::Get,
        &format!("/payments/{payment_id}?force_sync=true"),
    )?
    .build();
    let response = utils::call(state, request).await?;
    let outcome = fixture_outcome(&response, fixture)?;

    if response.is_success() {
        utils::ensure_echoed(
            "payment_id",
            payment_id,
            utils::required_str(&response, "payment_id")?,
        )?;
    }
    Ok(outcome)
}

#[instrument(skip_all, fields(flow = ?Flow::RefundsCreate))]
pub async fn refund_payment(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let payment_id = context.get_string(ContextKey::PaymentId)?.to_string();
    let body = utils::request_body(&fixture.request, [("payment_id", json!(payment_id))]);
    let request = utils::merchant_request(context, Method::Post, "/refunds")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    let outcome = fixture_outcome(&response, fixture)?;

    if response.is_success() {
        utils::ensure_echoed(
            "payment_id",
            payment_id.as_str(),
            utils::required_str(&response, "payment_id")?,
        )?;
        let refund_id = utils::required_str(&response, "refund_id")?.to_string();
        context.set(ContextKey::RefundId, refund_id);
    }
    Ok(outcome)
}

#[instrument(skip_all, fields(flow = ?Flow::RefundsRetrieve))]
pub async fn sync_refund(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Outcome> {
    let refund_id = context.get_string(ContextKey::RefundId)?;
    let request =
        utils::merchant_request(context, Method::Get, &format!("/refunds/{refund_id}"))?.build();
    let response = utils::call(state, request).await?;
    let outcome = fixture_outcome(&response, fixture)?;

    if response.is_success() {
        utils::ensure_echoed(
            "refund_id",
            refund_id,
            utils::required_str(&response, "refund_id")?,
        )?;
    }
    Ok(outcome)
}

/// Hands the stored continuation to the redirection handler. Returns `None` when the exceptions
/// table says this connector and payment method are not redirected.
#[instrument(skip_all, fields(flow = ?Flow::PaymentsRedirect))]
pub async fn follow_continuation(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    flow: RedirectionFlow,
    expected_url: &str,
    extra: Option<Value>,
) -> ScenarioResult<Option<RedirectionOutcome>> {
    let connector_id = context.get_string(ContextKey::ConnectorId)?.to_string();
    let payment_method_type = context
        .get_optional_string(ContextKey::PaymentMethodType)?
        .map(str::to_string);
    let exception = state
        .redirection_overrides
        .lookup(&connector_id, payment_method_type.as_deref());
    let redirection_url = context
        .get_optional_string(ContextKey::NextActionUrl)?
        .map(str::to_string);

    match (exception, redirection_url) {
        (Some(RedirectionOverride::SkipRedirection), _) | (Some(RedirectionOverride::WaitScreen), None) => {
            logger::info!(
                tag = ?logger::Tag::Redirection,
                connector = %connector_id,
                exception = ?exception,
                "redirection not followed"
            );
            Ok(None)
        }
        (_, None) => Err(report!(ScenarioError::MissingContextKey(ContextKey::NextActionUrl)))
            .attach_printable("no continuation is pending"),
        (_, Some(redirection_url)) => {
            let kind = context
                .get_parsed::<ContinuationKind>(ContextKey::NextActionType)?
                .unwrap_or(ContinuationKind::RedirectToUrl);
            let target = RedirectionTarget {
                kind,
                redirection_url,
                expected_url: expected_url.to_string(),
            };
            logger::info!(tag = ?logger::Tag::Redirection, %flow, %kind, connector = %connector_id);

            let outcome = state
                .redirection_handler
                .follow(
                    flow,
                    target,
                    &connector_id,
                    payment_method_type.as_deref(),
                    extra,
                )
                .await
                .change_context(ScenarioError::RedirectionFailed)?;

            context.remove(ContextKey::NextActionUrl);
            context.remove(ContextKey::NextActionType);
            Ok(Some(outcome))
        }
    }
}

fn customer_field(context: &ScenarioContext) -> ScenarioResult<Option<(&'static str, Value)>> {
    if context.contains(ContextKey::CustomerId) {
        Ok(Some((
            "customer_id",
            json!(context.get_string(ContextKey::CustomerId)?),
        )))
    } else {
        Ok(None)
    }
}

fn store_payment(context: &mut ScenarioContext, response: &Response) -> ScenarioResult<()> {
    let payment_id = utils::required_str(response, "payment_id")?.to_string();
    context.set(ContextKey::PaymentId, payment_id);
    if let Some(client_secret) = response.str_field("client_secret") {
        context.set(ContextKey::ClientSecret, Secret::new(client_secret.to_string()));
    }
    if let Some(amount) = response.field("amount").and_then(Value::as_i64) {
        context.set(ContextKey::PaymentAmount, amount);
    }
    Ok(())
}

/// Fixture check for steps whose 200 response has a single shape.
fn fixture_outcome(response: &Response, fixture: &StepFixture) -> ScenarioResult<Outcome> {
    utils::default_error_handler(response, &fixture.response)?;
    if response.is_success() {
        Ok(Outcome::Matched {
            status: response
                .str_field("status")
                .and_then(|status| status.parse().ok()),
        })
    } else {
        Ok(Outcome::ExpectedError {
            status_code: response.status_code,
        })
    }
}
