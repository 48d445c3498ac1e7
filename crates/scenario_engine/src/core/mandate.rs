//!
//! Mandate lifecycle: `none -> pending -> active -> revoked`.
//!
//! A customer-initiated payment carrying `mandate_data` establishes the mandate and its ceiling;
//! merchant-initiated payments reuse it until it is revoked.
//!

use error_stack::{report, ResultExt};
use scenario_env::{instrument, logger, Flow};
use serde_json::{json, Value};

use super::{
    classifier::{self, Classification, Outcome},
    dispatcher, utils,
};
use crate::{
    consts,
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::StepFixture,
    scenario::ScenarioState,
    types::{enums::MandateStatus, Method, Response},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MandateOutcome {
    /// Customer-initiated payment that created a mandate
    Established { mandate_id: String, payment: Outcome },
    /// Customer-initiated payment without `mandate_data`
    OneOff(Outcome),
    /// Merchant-initiated payment accepted under the mandate
    Charged(Outcome),
    /// Merchant-initiated payment rejected with the ceiling triple
    CeilingExceeded,
    Revoked,
    AlreadyRevoked,
    /// Error response declared by the fixture
    Rejected { status_code: u16 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MandateSummary {
    pub mandate_id: String,
    pub status: MandateStatus,
}

/// `mandate_data.mandate_type.{single_use|multi_use}.amount` of a payment request.
pub fn mandate_ceiling(request: &Value) -> Option<i64> {
    let mandate_type = request.get("mandate_data")?.get("mandate_type")?;
    ["single_use", "multi_use"]
        .iter()
        .find_map(|usage| mandate_type.get(usage)?.get("amount")?.as_i64())
}

#[instrument(skip_all, fields(flow = ?Flow::MandateCustomerInitiated))]
pub async fn customer_initiated(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<MandateOutcome> {
    let customer_id = context.get_string(ContextKey::CustomerId)?.to_string();
    let body = utils::request_body(
        &fixture.request,
        [
            ("customer_id", json!(customer_id)),
            ("confirm", json!(true)),
        ],
    );
    let establishes_mandate = body.get("mandate_data").is_some_and(|data| !data.is_null());
    let ceiling = mandate_ceiling(&body);

    let request = utils::merchant_request(context, Method::Post, "/payments")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;

    if !response.is_success() {
        utils::default_error_handler(&response, &fixture.response)?;
        return Ok(MandateOutcome::Rejected {
            status_code: response.status_code,
        });
    }

    let payment = dispatcher::dispatch(state, context, &response, &fixture.response)?.outcome;

    if !establishes_mandate {
        if let Some(mandate_id) = response.field("mandate_id").filter(|id| !id.is_null()) {
            return Err(report!(ScenarioError::mismatch("mandate_id", Value::Null, mandate_id)))
                .attach_printable("one-off payment must not create a mandate");
        }
        return Ok(MandateOutcome::OneOff(payment));
    }

    let mandate_id = utils::required_str(&response, "mandate_id")?.to_string();
    let status = match payment {
        Outcome::AwaitingContinuation(_) => MandateStatus::Pending,
        _ => MandateStatus::Active,
    };
    logger::info!(%mandate_id, %status, ceiling = ?ceiling, "mandate established");

    context.set(ContextKey::MandateId, mandate_id.clone());
    context.set(ContextKey::MandateStatus, status.to_string());
    match ceiling {
        Some(ceiling) => context.set(ContextKey::MandateAmount, ceiling),
        None => {
            context.remove(ContextKey::MandateAmount);
        }
    }

    Ok(MandateOutcome::Established {
        mandate_id,
        payment,
    })
}

#[instrument(skip_all, fields(flow = ?Flow::MandateMerchantInitiated))]
pub async fn merchant_initiated(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<MandateOutcome> {
    let mandate_id = context.get_string(ContextKey::MandateId)?.to_string();
    let customer_id = context.get_string(ContextKey::CustomerId)?.to_string();
    let body = utils::request_body(
        &fixture.request,
        [
            ("mandate_id", json!(mandate_id)),
            ("customer_id", json!(customer_id)),
            ("confirm", json!(true)),
            ("off_session", json!(true)),
        ],
    );
    let amount = body.get("amount").and_then(Value::as_i64);
    let ceiling = context.get_optional_i64(ContextKey::MandateAmount)?;
    let exceeds_ceiling = matches!((amount, ceiling), (Some(amount), Some(ceiling)) if amount > ceiling);

    let request = utils::merchant_request(context, Method::Post, "/payments")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;

    if response.is_success() {
        if exceeds_ceiling || !fixture.response.expects_success() {
            return Err(report!(ScenarioError::UnexpectedStatus {
                expected: if exceeds_ceiling { 400 } else { fixture.response.status },
                actual: response.status_code,
            }))
            .attach_printable_lazy(|| format!("amount {amount:?} against mandate ceiling {ceiling:?}"));
        }

        let payment_id = utils::required_str(&response, "payment_id")?.to_string();
        let classification = Classification::from_body(&response.body)?;
        let payment = classifier::evaluate(classification, &response, &fixture.response)?;

        context.set(ContextKey::PaymentId, payment_id);
        match payment.continuation() {
            Some(continuation) => {
                context.set(ContextKey::NextActionUrl, continuation.url.clone());
                context.set(ContextKey::NextActionType, continuation.kind.to_string());
            }
            None => {
                context.remove(ContextKey::NextActionUrl);
                context.remove(ContextKey::NextActionType);
            }
        }
        return Ok(MandateOutcome::Charged(payment));
    }

    if response.error_field("message") == Some(consts::MANDATE_VALIDATION_FAILED_MESSAGE) {
        if ceiling.is_some() && !exceeds_ceiling {
            return Err(report!(ScenarioError::unhandled(response.status_code, &response.body)))
                .attach_printable("mandate validation failed for an amount within the ceiling");
        }
        ensure_ceiling_triple(&response)?;
        utils::default_error_handler(&response, &fixture.response)?;
        logger::info!(%mandate_id, amount = ?amount, ceiling = ?ceiling, "mandate ceiling enforced");
        return Ok(MandateOutcome::CeilingExceeded);
    }

    if exceeds_ceiling {
        return Err(report!(ScenarioError::unhandled(response.status_code, &response.body)))
            .attach_printable("amount above the mandate ceiling rejected with an unexpected shape");
    }
    utils::default_error_handler(&response, &fixture.response)?;
    Ok(MandateOutcome::Rejected {
        status_code: response.status_code,
    })
}

/// The only accepted rejection of an over-ceiling payment.
fn ensure_ceiling_triple(response: &Response) -> ScenarioResult<()> {
    if response.status_code != 400 {
        return Err(report!(ScenarioError::UnexpectedStatus {
            expected: 400,
            actual: response.status_code,
        }));
    }
    let triple = [
        ("error.code", "code", consts::MANDATE_VALIDATION_FAILED_CODE),
        ("error.message", "message", consts::MANDATE_VALIDATION_FAILED_MESSAGE),
        ("error.reason", "reason", consts::MANDATE_AMOUNT_EXCEEDED_REASON),
    ];
    for (key, field, expected) in triple {
        let actual = response.error_field(field);
        if actual != Some(expected) {
            return Err(report!(ScenarioError::mismatch(
                key,
                expected,
                actual.unwrap_or("<absent>"),
            )));
        }
    }
    Ok(())
}

#[instrument(skip_all, fields(flow = ?Flow::MandatesRevoke))]
pub async fn revoke(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<MandateOutcome> {
    let mandate_id = context.get_string(ContextKey::MandateId)?.to_string();
    let tracked = context.get_parsed::<MandateStatus>(ContextKey::MandateStatus)?;

    let request =
        utils::merchant_request(context, Method::Post, &format!("/mandates/revoke/{mandate_id}"))?
            .build();
    let response = utils::call(state, request).await?;

    if response.is_success() {
        if tracked == Some(MandateStatus::Revoked) {
            return Err(report!(ScenarioError::unhandled(response.status_code, &response.body)))
                .attach_printable("revoking a revoked mandate succeeded again");
        }
        utils::ensure_echoed(
            "mandate_id",
            mandate_id.as_str(),
            utils::required_str(&response, "mandate_id")?,
        )?;
        let status = utils::required_str(&response, "status")?;
        if status != MandateStatus::Revoked.to_string() {
            return Err(report!(ScenarioError::mismatch(
                "status",
                MandateStatus::Revoked,
                status,
            )));
        }
        utils::default_error_handler(&response, &fixture.response)?;
        context.set(ContextKey::MandateStatus, MandateStatus::Revoked.to_string());
        return Ok(MandateOutcome::Revoked);
    }

    utils::default_error_handler(&response, &fixture.response)?;
    if response.error_field("reason") == Some(consts::MANDATE_ALREADY_REVOKED_REASON) {
        context.set(ContextKey::MandateStatus, MandateStatus::Revoked.to_string());
        return Ok(MandateOutcome::AlreadyRevoked);
    }
    Ok(MandateOutcome::Rejected {
        status_code: response.status_code,
    })
}

/// Fetches the mandate and reconciles its status with the tracked one. A pending mandate may
/// have become active through its continuation; any other change is a mismatch.
#[instrument(skip_all, fields(flow = ?Flow::MandatesRetrieve))]
pub async fn retrieve(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Option<MandateStatus>> {
    let mandate_id = context.get_string(ContextKey::MandateId)?.to_string();
    let tracked = context.get_parsed::<MandateStatus>(ContextKey::MandateStatus)?;

    let request =
        utils::merchant_request(context, Method::Get, &format!("/mandates/{mandate_id}"))?.build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(None);
    }

    utils::ensure_echoed(
        "mandate_id",
        mandate_id.as_str(),
        utils::required_str(&response, "mandate_id")?,
    )?;
    let status = parse_status(&response, &response.body)?;
    match tracked {
        None | Some(MandateStatus::Pending) => {}
        Some(tracked) => utils::ensure_echoed("mandate status", tracked, status)?,
    }
    context.set(ContextKey::MandateStatus, status.to_string());
    Ok(Some(status))
}

#[instrument(skip_all, fields(flow = ?Flow::MandatesList))]
pub async fn list_for_customer(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<Vec<MandateSummary>> {
    let customer_id = context.get_string(ContextKey::CustomerId)?;
    let request = utils::merchant_request(
        context,
        Method::Get,
        &format!("/customers/{customer_id}/mandates"),
    )?
    .build();
    let response = utils::call(state, request).await?;

    if !response.is_success() {
        utils::default_error_handler(&response, &fixture.response)?;
        return Ok(Vec::new());
    }
    if !fixture.response.expects_success() {
        return Err(report!(ScenarioError::UnexpectedStatus {
            expected: fixture.response.status,
            actual: response.status_code,
        }));
    }

    let mandates = response
        .body
        .as_array()
        .ok_or_else(|| report!(ScenarioError::unhandled(response.status_code, &response.body)))?
        .iter()
        .map(|mandate| {
            let mandate_id = mandate
                .get("mandate_id")
                .and_then(Value::as_str)
                .ok_or_else(|| report!(ScenarioError::MissingResponseField("mandate_id".to_string())))?;
            Ok(MandateSummary {
                mandate_id: mandate_id.to_string(),
                status: parse_status(&response, mandate)?,
            })
        })
        .collect::<ScenarioResult<Vec<_>>>()?;

    if context.contains(ContextKey::MandateId) {
        let tracked = context.get_string(ContextKey::MandateId)?;
        if !mandates.iter().any(|mandate| mandate.mandate_id == tracked) {
            return Err(report!(ScenarioError::RoundTripMismatch {
                field: "mandate_id",
                expected: tracked.to_string(),
                actual: "<not listed>".to_string(),
            }));
        }
    }
    Ok(mandates)
}

fn parse_status(response: &Response, mandate: &Value) -> ScenarioResult<MandateStatus> {
    let raw = mandate
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| report!(ScenarioError::MissingResponseField("status".to_string())))?;
    raw.parse::<MandateStatus>()
        .map_err(|_| report!(ScenarioError::unhandled(response.status_code, &response.body)))
        .attach_printable_lazy(|| format!("unknown mandate status {raw}"))
}
