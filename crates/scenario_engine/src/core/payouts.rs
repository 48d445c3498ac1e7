//!
//! Payout lifecycle: `created -> (auto_fulfill ? fulfilled : pending) -> fulfilled`.
//!
//! Every step after creation addresses the payout by the stored id, and the retrieve step checks
//! that the service still reports the id and amount it was created with.
//!

use error_stack::{report, ResultExt};
use scenario_env::{instrument, logger, Flow};
use serde_json::{json, Value};

use super::utils;
use crate::{
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::StepFixture,
    scenario::ScenarioState,
    types::{
        enums::{PayoutLifecycle, PayoutStatus},
        Method, Response,
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutRecord {
    pub payout_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
}

impl PayoutRecord {
    pub fn lifecycle(&self) -> PayoutLifecycle {
        self.status.lifecycle()
    }
}

#[instrument(skip_all, fields(flow = ?Flow::PayoutsCreate))]
pub async fn create(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<PayoutRecord>> {
    let mut fields = Vec::new();
    if context.contains(ContextKey::CustomerId) {
        fields.push((
            "customer_id",
            json!(context.get_string(ContextKey::CustomerId)?),
        ));
    }
    let body = utils::request_body(&fixture.request, fields);
    let declared_amount = body
        .get("amount")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            report!(ScenarioError::ConfigurationError(
                "payout request has no amount".to_string()
            ))
        })?;
    let auto_fulfill = body
        .get("auto_fulfill")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let request = utils::merchant_request(context, Method::Post, "/payouts/create")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(None);
    }

    let record = read_record(&response)?;
    utils::ensure_echoed("amount", declared_amount, record.amount)?;
    logger::info!(
        payout_id = %record.payout_id,
        status = %record.status,
        lifecycle = %record.lifecycle(),
        auto_fulfill,
    );
    let reached = if auto_fulfill {
        PayoutLifecycle::Fulfilled
    } else {
        PayoutLifecycle::Pending
    };
    ensure_lifecycle(&record, reached, &response, fixture)?;

    context.set(ContextKey::PayoutId, record.payout_id.clone());
    context.set(ContextKey::PayoutAmount, record.amount);
    context.set(ContextKey::PayoutStatus, record.status.to_string());
    Ok(Some(record))
}

#[instrument(skip_all, fields(flow = ?Flow::PayoutsFulfill))]
pub async fn fulfill(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<PayoutRecord>> {
    let payout_id = context.get_string(ContextKey::PayoutId)?.to_string();
    let body = utils::request_body(&fixture.request, [("payout_id", json!(payout_id))]);
    let request =
        utils::merchant_request(context, Method::Post, &format!("/payouts/{payout_id}/fulfill"))?
            .set_body(body)
            .build();
    let response = utils::call(state, request).await?;
    advance(
        context,
        &response,
        fixture,
        &payout_id,
        Some(PayoutLifecycle::Fulfilled),
    )
}

/// Updates the payout; an amount in the request becomes the new stored amount once echoed.
#[instrument(skip_all, fields(flow = ?Flow::PayoutsUpdate))]
pub async fn update(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<PayoutRecord>> {
    let payout_id = context.get_string(ContextKey::PayoutId)?.to_string();
    let body = utils::request_body(&fixture.request, [("payout_id", json!(payout_id))]);
    let updated_amount = body.get("amount").and_then(Value::as_i64);

    let request = utils::merchant_request(context, Method::Put, &format!("/payouts/{payout_id}"))?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(None);
    }

    let record = read_record(&response)?;
    utils::ensure_echoed("payout_id", payout_id.as_str(), record.payout_id.as_str())?;
    let stored_amount = match updated_amount {
        Some(amount) => amount,
        None => context.get_i64(ContextKey::PayoutAmount)?,
    };
    utils::ensure_echoed("amount", stored_amount, record.amount)?;

    context.set(ContextKey::PayoutAmount, record.amount);
    context.set(ContextKey::PayoutStatus, record.status.to_string());
    Ok(Some(record))
}

/// Read-after-write check of the payout id and amount.
#[instrument(skip_all, fields(flow = ?Flow::PayoutsRetrieve))]
pub async fn retrieve(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<PayoutRecord>> {
    let payout_id = context.get_string(ContextKey::PayoutId)?.to_string();
    let stored_amount = context.get_i64(ContextKey::PayoutAmount)?;

    let request = utils::merchant_request(context, Method::Get, &format!("/payouts/{payout_id}"))?
        .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(None);
    }

    let record = read_record(&response)?;
    utils::ensure_echoed("payout_id", payout_id.as_str(), record.payout_id.as_str())?;
    utils::ensure_echoed("amount", stored_amount, record.amount)?;

    context.set(ContextKey::PayoutStatus, record.status.to_string());
    Ok(Some(record))
}

#[instrument(skip_all, fields(flow = ?Flow::PayoutsCancel))]
pub async fn cancel(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<PayoutRecord>> {
    let payout_id = context.get_string(ContextKey::PayoutId)?.to_string();
    let body = utils::request_body(&fixture.request, [("payout_id", json!(payout_id))]);
    let request =
        utils::merchant_request(context, Method::Post, &format!("/payouts/{payout_id}/cancel"))?
            .set_body(body)
            .build();
    let response = utils::call(state, request).await?;
    advance(context, &response, fixture, &payout_id, None)
}

fn advance(
    context: &mut ScenarioContext,
    response: &Response,
    fixture: &StepFixture,
    payout_id: &str,
    reached: Option<PayoutLifecycle>,
) -> ScenarioResult<Option<PayoutRecord>> {
    utils::default_error_handler(response, &fixture.response)?;
    if !response.is_success() {
        return Ok(None);
    }

    let record = read_record(response)?;
    utils::ensure_echoed("payout_id", payout_id, record.payout_id.as_str())?;
    if let Some(reached) = reached {
        ensure_lifecycle(&record, reached, response, fixture)?;
    }
    context.set(ContextKey::PayoutStatus, record.status.to_string());
    Ok(Some(record))
}

/// The step must leave the payout in `reached`. A terminal status passes only when the fixture
/// declares that exact status.
fn ensure_lifecycle(
    record: &PayoutRecord,
    reached: PayoutLifecycle,
    response: &Response,
    fixture: &StepFixture,
) -> ScenarioResult<()> {
    let lifecycle = record.lifecycle();
    let declared_failure = lifecycle == PayoutLifecycle::Terminated
        && fixture.response.body.get("status").and_then(Value::as_str)
            == Some(record.status.to_string().as_str());
    if lifecycle == reached || declared_failure {
        return Ok(());
    }

    logger::error!(
        payout_id = %record.payout_id,
        status = %record.status,
        %lifecycle,
        expected = %reached,
        "payout did not reach the expected lifecycle stage"
    );
    Err(report!(ScenarioError::unhandled(
        response.status_code,
        &response.body
    )))
    .attach_printable_lazy(|| {
        format!(
            "payout status {} is {lifecycle}, expected {reached}",
            record.status
        )
    })
}

fn read_record(response: &Response) -> ScenarioResult<PayoutRecord> {
    let payout_id = utils::required_str(response, "payout_id")?.to_string();
    let amount = utils::required_i64(response, "amount")?;
    let raw_status = utils::required_str(response, "status")?;
    let status = raw_status
        .parse::<PayoutStatus>()
        .map_err(|_| report!(ScenarioError::unhandled(response.status_code, &response.body)))
        .attach_printable_lazy(|| format!("unknown payout status {raw_status}"))?;
    Ok(PayoutRecord {
        payout_id,
        amount,
        status,
    })
}
