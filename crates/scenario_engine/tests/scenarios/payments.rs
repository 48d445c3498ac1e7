use scenario_engine::{
    core::{
        classifier::{Continuation, Outcome},
        dispatcher::Signal,
    },
    redirection::{RedirectionFlow, RedirectionOverride, RedirectionOverrides},
    types::{
        enums::{ContinuationKind, IntentStatus, PaymentMethodFamily},
        Method,
    },
    ContextKey, ScenarioError, StepOutcome,
};
use serde_json::json;

use crate::utils::{body, header, Harness, API_KEY, PUBLISHABLE_KEY};

fn card_fixtures() -> serde_json::Value {
    json!({
        "PaymentIntent": {
            "Request": {
                "amount": 1000,
                "currency": "USD",
                "capture_method": "automatic",
                "authentication_type": "no_three_ds"
            },
            "Response": { "status": 200, "body": { "status": "requires_payment_method" } }
        },
        "No3DSAutoCapture": {
            "Request": {
                "payment_method": "card",
                "payment_method_data": { "card": { "card_number": "4242424242424242" } }
            },
            "Response": {
                "status": 200,
                "body": { "status": "succeeded", "amount": 1000, "amount_capturable": 0 }
            }
        },
        "3DSAutoCapture": {
            "Request": {
                "amount": 1000,
                "currency": "USD",
                "capture_method": "automatic",
                "authentication_type": "three_ds",
                "payment_method": "card"
            },
            "Response": { "status": 200, "body": { "status": "requires_customer_action" } }
        },
        "No3DSManualCapture": {
            "Request": {
                "amount": 6500,
                "currency": "USD",
                "capture_method": "manual",
                "authentication_type": "no_three_ds",
                "payment_method": "card"
            },
            "Response": {
                "status": 200,
                "body": { "status": "requires_capture", "amount_capturable": 6500 }
            }
        },
        "Capture": {
            "Request": { "amount_to_capture": 6500 },
            "Response": { "status": 200, "body": { "status": "succeeded", "amount_received": 6500 } }
        },
        "Refund": {
            "Request": { "amount": 6500 },
            "Response": { "status": 200, "body": { "status": "pending" } }
        },
        "SyncRefund": {
            "Response": { "status": 200, "body": { "status": "succeeded" } }
        },
        "PaymentSync": {
            "Response": { "status": 200, "body": { "status": "succeeded" } }
        },
        "VoidAfterConfirm": {
            "Request": { "cancellation_reason": "requested_by_customer" },
            "Response": {
                "status": 400,
                "body": {
                    "error": {
                        "type": "invalid_request",
                        "code": "IR_16",
                        "message": "You cannot cancel this payment because it has status succeeded"
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn should_confirm_no_three_ds_automatic_payment() {
    let mut harness = Harness::new(card_fixtures());
    harness
        .transport
        .reply(
            200,
            json!({
                "payment_id": "pay_1000usd",
                "client_secret": "pay_1000usd_secret_x",
                "status": "requires_payment_method",
                "amount": 1000,
                "currency": "USD",
            }),
        )
        .reply(
            200,
            json!({
                "payment_id": "pay_1000usd",
                "status": "succeeded",
                "amount": 1000,
                "amount_capturable": 0,
                "amount_received": 1000,
                "capture_method": "automatic",
                "authentication_type": "no_three_ds",
                "payment_method": "card",
                "payment_method_type": "credit",
                "next_action": null,
            }),
        );

    let intent = harness
        .scenario
        .create_payment_intent("PaymentIntent")
        .await
        .unwrap();
    assert_eq!(
        intent,
        StepOutcome::Completed(Outcome::Matched {
            status: Some(IntentStatus::RequiresPaymentMethod)
        })
    );

    let confirmed = harness
        .scenario
        .confirm_payment("No3DSAutoCapture")
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(confirmed.family, Some(PaymentMethodFamily::Card));
    assert_eq!(
        confirmed.outcome,
        Outcome::Matched {
            status: Some(IntentStatus::Succeeded)
        }
    );
    assert_eq!(confirmed.signal(), Signal::Continue);

    let requests = harness.transport.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "http://localhost:8080/payments");
    assert_eq!(header(&requests[0], "api-key").as_deref(), Some(API_KEY));
    assert_eq!(body(&requests[0])["confirm"], json!(false));
    assert_eq!(body(&requests[0])["customer_id"], json!("cus_scripted"));

    assert_eq!(requests[1].url, "http://localhost:8080/payments/pay_1000usd/confirm");
    assert_eq!(header(&requests[1], "api-key").as_deref(), Some(PUBLISHABLE_KEY));
    assert_eq!(body(&requests[1])["client_secret"], json!("pay_1000usd_secret_x"));

    let context = harness.context();
    assert_eq!(context.get_string(ContextKey::PaymentId).unwrap(), "pay_1000usd");
    assert_eq!(context.get_i64(ContextKey::PaymentAmount).unwrap(), 1000);
    assert!(context.get_optional(ContextKey::NextActionUrl).unwrap().is_none());
}

#[tokio::test]
async fn should_store_redirect_for_three_ds_payment() {
    let mut harness = Harness::new(card_fixtures());
    harness
        .transport
        .reply(
            200,
            json!({
                "payment_id": "pay_3ds",
                "client_secret": "pay_3ds_secret",
                "status": "requires_customer_action",
                "amount": 1000,
                "capture_method": "automatic",
                "authentication_type": "three_ds",
                "payment_method": "card",
                "payment_method_type": "credit",
                "next_action": {
                    "type": "redirect_to_url",
                    "redirect_to_url": "http://localhost:8080/payments/redirect/pay_3ds/merchant/pay_3ds_1"
                }
            }),
        )
        .reply(200, json!({ "payment_id": "pay_3ds", "status": "succeeded" }));

    let dispatched = harness
        .scenario
        .create_confirm_payment("3DSAutoCapture")
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(
        dispatched.outcome,
        Outcome::AwaitingContinuation(Continuation {
            kind: ContinuationKind::RedirectToUrl,
            url: "http://localhost:8080/payments/redirect/pay_3ds/merchant/pay_3ds_1".to_string(),
        })
    );
    assert_eq!(dispatched.signal(), Signal::Redirect(RedirectionFlow::ThreeDs));
    assert_eq!(
        harness.context().get_string(ContextKey::NextActionType).unwrap(),
        "redirect_to_url"
    );

    let followed = harness
        .scenario
        .follow_continuation(RedirectionFlow::ThreeDs, "https://hyperswitch.io", None)
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(followed.is_some());

    let redirects = harness.redirection.followed();
    assert_eq!(redirects.len(), 1);
    assert_eq!(redirects[0].connector_id, "stripe");
    assert_eq!(redirects[0].payment_method_type.as_deref(), Some("credit"));
    assert_eq!(redirects[0].target.expected_url, "https://hyperswitch.io");
    assert!(harness
        .context()
        .get_optional(ContextKey::NextActionUrl)
        .unwrap()
        .is_none());

    harness.scenario.retrieve_payment("PaymentSync").await.unwrap();
    assert_eq!(
        harness.transport.last_request().url,
        "http://localhost:8080/payments/pay_3ds?force_sync=true"
    );
}

#[tokio::test]
async fn should_capture_and_refund_manual_payment() {
    let mut harness = Harness::new(card_fixtures());
    harness
        .transport
        .reply(
            200,
            json!({
                "payment_id": "pay_manual",
                "status": "requires_capture",
                "amount": 6500,
                "amount_capturable": 6500,
                "capture_method": "manual",
                "authentication_type": "no_three_ds",
                "payment_method": "card",
            }),
        )
        .reply(
            200,
            json!({ "payment_id": "pay_manual", "status": "succeeded", "amount_received": 6500 }),
        )
        .reply(
            200,
            json!({ "refund_id": "ref_1", "payment_id": "pay_manual", "status": "pending" }),
        )
        .reply(
            200,
            json!({ "refund_id": "ref_1", "payment_id": "pay_manual", "status": "succeeded" }),
        );

    let dispatched = harness
        .scenario
        .create_confirm_payment("No3DSManualCapture")
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(
        dispatched.outcome,
        Outcome::Matched {
            status: Some(IntentStatus::RequiresCapture)
        }
    );

    harness.scenario.capture_payment("Capture").await.unwrap();
    assert_eq!(
        harness.transport.last_request().url,
        "http://localhost:8080/payments/pay_manual/capture"
    );

    harness.scenario.refund_payment("Refund").await.unwrap();
    assert_eq!(body(&harness.transport.last_request())["payment_id"], json!("pay_manual"));
    assert_eq!(harness.context().get_string(ContextKey::RefundId).unwrap(), "ref_1");

    harness.scenario.sync_refund("SyncRefund").await.unwrap();
    assert_eq!(
        harness.transport.last_request().url,
        "http://localhost:8080/refunds/ref_1"
    );
}

#[tokio::test]
async fn should_accept_declared_error_response() {
    let mut harness = Harness::new(card_fixtures());
    harness.scenario.context_mut().set(ContextKey::PaymentId, "pay_done");
    harness.transport.reply(
        400,
        json!({
            "error": {
                "type": "invalid_request",
                "code": "IR_16",
                "message": "You cannot cancel this payment because it has status succeeded"
            }
        }),
    );

    let outcome = harness.scenario.void_payment("VoidAfterConfirm").await.unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Completed(Outcome::ExpectedError { status_code: 400 })
    );
    assert!(harness.scenario.halted_at().is_none());
}

#[tokio::test]
async fn should_report_first_mismatching_field() {
    let mut harness = Harness::new(card_fixtures());
    harness.scenario.context_mut().set(ContextKey::PaymentId, "pay_1");
    harness
        .scenario
        .context_mut()
        .set(ContextKey::ClientSecret, masking::Secret::new("pay_1_secret".to_string()));
    harness.transport.reply(
        200,
        json!({
            "payment_id": "pay_1",
            "status": "succeeded",
            "amount": 1000,
            "amount_capturable": 1000,
            "capture_method": "automatic",
            "authentication_type": "no_three_ds",
            "payment_method": "card",
        }),
    );

    let error = harness
        .scenario
        .confirm_payment("No3DSAutoCapture")
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::ValidationMismatch { key, expected, actual }
            if key == "amount_capturable" && expected == "0" && actual == "1000"
    ));
    assert_eq!(harness.scenario.halted_at(), Some("No3DSAutoCapture"));
}

#[tokio::test]
async fn should_skip_redirection_for_listed_exception() {
    let overrides: RedirectionOverrides = serde_json::from_value(json!({
        "exceptions": [
            { "connector": "stripe", "payment_method_type": "blik", "behaviour": "skip_redirection" }
        ]
    }))
    .unwrap();
    let mut harness = Harness::with_overrides(
        json!({
            "BlikCreateConfirm": {
                "Request": { "amount": 1000, "currency": "PLN", "payment_method": "bank_redirect" },
                "Response": { "status": 200, "body": {} }
            }
        }),
        overrides,
    );
    harness.transport.reply(
        200,
        json!({
            "payment_id": "pay_blik",
            "status": "requires_customer_action",
            "capture_method": "automatic",
            "authentication_type": "three_ds",
            "payment_method": "bank_redirect",
            "payment_method_type": "blik",
            "next_action": { "redirect_to_url": "https://blik.example/confirm" }
        }),
    );

    let dispatched = harness
        .scenario
        .create_confirm_payment("BlikCreateConfirm")
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(dispatched.signal(), Signal::Redirect(RedirectionFlow::BankRedirect));

    let followed = harness
        .scenario
        .follow_continuation(RedirectionFlow::BankRedirect, "https://hyperswitch.io", None)
        .await
        .unwrap();
    assert_eq!(followed, StepOutcome::Completed(None));
    assert!(harness.redirection.followed().is_empty());
    assert_eq!(
        RedirectionOverride::SkipRedirection.to_string(),
        "skip_redirection"
    );
}
