use scenario_engine::{
    core::payouts::PayoutRecord,
    types::{
        enums::{PayoutLifecycle, PayoutStatus},
        Method,
    },
    ContextKey, ScenarioError,
};
use serde_json::{json, Value};

use crate::utils::{body, Harness};

fn payout_fixtures() -> Value {
    json!({
        "CreateConfirmPayout": {
            "Request": {
                "amount": 1,
                "currency": "EUR",
                "payout_type": "card",
                "confirm": true,
                "auto_fulfill": false
            },
            "Response": { "status": 200, "body": { "status": "requires_fulfillment" } }
        },
        "CreateAutoFulfillPayout": {
            "Request": {
                "amount": 1,
                "currency": "EUR",
                "payout_type": "card",
                "confirm": true,
                "auto_fulfill": true
            },
            "Response": { "status": 200, "body": { "status": "success" } }
        },
        "CreateAutoFulfillAnyStatus": {
            "Request": {
                "amount": 1,
                "currency": "EUR",
                "payout_type": "card",
                "confirm": true,
                "auto_fulfill": true
            },
            "Response": { "status": 200 }
        },
        "Fulfill": {
            "Response": { "status": 200, "body": { "status": "success" } }
        },
        "FulfillAnyStatus": {
            "Response": { "status": 200 }
        },
        "Update": {
            "Request": { "amount": 5 },
            "Response": { "status": 200, "body": { "status": "requires_fulfillment" } }
        },
        "Retrieve": {
            "Response": { "status": 200 }
        }
    })
}

fn payout(status: &str, amount: i64) -> Value {
    json!({
        "payout_id": "po_round_trip",
        "amount": amount,
        "currency": "EUR",
        "status": status,
        "payout_type": "card",
    })
}

#[tokio::test]
async fn should_round_trip_payout_through_fulfill() {
    let mut harness = Harness::new(payout_fixtures());
    harness
        .transport
        .reply(200, payout("requires_fulfillment", 1))
        .reply(200, payout("success", 1))
        .reply(200, payout("success", 1));

    let created = harness
        .scenario
        .create_payout("CreateConfirmPayout")
        .await
        .unwrap()
        .completed()
        .flatten()
        .unwrap();
    assert_eq!(created.lifecycle(), PayoutLifecycle::Pending);
    assert_eq!(harness.context().get_string(ContextKey::PayoutId).unwrap(), "po_round_trip");
    assert_eq!(harness.context().get_i64(ContextKey::PayoutAmount).unwrap(), 1);

    let fulfilled = harness
        .scenario
        .fulfill_payout("Fulfill")
        .await
        .unwrap()
        .completed()
        .flatten()
        .unwrap();
    assert_eq!(fulfilled.lifecycle(), PayoutLifecycle::Fulfilled);
    let fulfill_request = harness.transport.last_request();
    assert_eq!(
        fulfill_request.url,
        "http://localhost:8080/payouts/po_round_trip/fulfill"
    );
    assert_eq!(body(&fulfill_request)["payout_id"], json!("po_round_trip"));

    let retrieved = harness
        .scenario
        .retrieve_payout("Retrieve")
        .await
        .unwrap()
        .completed()
        .flatten()
        .unwrap();
    assert_eq!(
        retrieved,
        PayoutRecord {
            payout_id: created.payout_id,
            amount: created.amount,
            status: PayoutStatus::Success,
        }
    );
    assert_eq!(harness.transport.last_request().method, Method::Get);
}

#[tokio::test]
async fn should_report_auto_fulfilled_payout() {
    let mut harness = Harness::new(payout_fixtures());
    harness.transport.reply(200, payout("success", 1));

    let created = harness
        .scenario
        .create_payout("CreateAutoFulfillPayout")
        .await
        .unwrap()
        .completed()
        .flatten()
        .unwrap();
    assert_eq!(created.lifecycle(), PayoutLifecycle::Fulfilled);
    assert_eq!(
        harness.context().get_parsed::<PayoutStatus>(ContextKey::PayoutStatus).unwrap(),
        Some(PayoutStatus::Success)
    );
}

#[tokio::test]
async fn should_fail_when_retrieved_amount_differs() {
    let mut harness = Harness::new(payout_fixtures());
    harness
        .transport
        .reply(200, payout("requires_fulfillment", 1))
        .reply(200, payout("requires_fulfillment", 100));

    harness.scenario.create_payout("CreateConfirmPayout").await.unwrap();
    let error = harness.scenario.retrieve_payout("Retrieve").await.unwrap_err();

    assert!(matches!(
        error.current_context(),
        ScenarioError::RoundTripMismatch { field: "amount", expected, actual }
            if expected == "1" && actual == "100"
    ));
}

#[tokio::test]
async fn should_fail_when_created_amount_is_not_echoed() {
    let mut harness = Harness::new(payout_fixtures());
    harness.transport.reply(200, payout("requires_fulfillment", 2));

    let error = harness
        .scenario
        .create_payout("CreateConfirmPayout")
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::RoundTripMismatch { field: "amount", .. }
    ));
    assert!(!harness.context().contains(ContextKey::PayoutId));
}

#[tokio::test]
async fn should_track_updated_amount() {
    let mut harness = Harness::new(payout_fixtures());
    harness
        .transport
        .reply(200, payout("requires_fulfillment", 1))
        .reply(200, payout("requires_fulfillment", 5))
        .reply(200, payout("requires_fulfillment", 5));

    harness.scenario.create_payout("CreateConfirmPayout").await.unwrap();
    harness.scenario.update_payout("Update").await.unwrap();
    assert_eq!(harness.transport.last_request().method, Method::Put);
    assert_eq!(harness.context().get_i64(ContextKey::PayoutAmount).unwrap(), 5);

    let retrieved = harness
        .scenario
        .retrieve_payout("Retrieve")
        .await
        .unwrap()
        .completed()
        .flatten()
        .unwrap();
    assert_eq!(retrieved.amount, 5);
}

#[tokio::test]
async fn should_fail_when_auto_fulfill_leaves_payout_pending() {
    let mut harness = Harness::new(payout_fixtures());
    harness.transport.reply(200, payout("requires_fulfillment", 1));

    let error = harness
        .scenario
        .create_payout("CreateAutoFulfillAnyStatus")
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::UnhandledResponseShape { status: 200, .. }
    ));
    assert!(!harness.context().contains(ContextKey::PayoutId));
}

#[tokio::test]
async fn should_fail_when_fulfill_does_not_complete_payout() {
    let mut harness = Harness::new(payout_fixtures());
    harness
        .transport
        .reply(200, payout("requires_fulfillment", 1))
        .reply(200, payout("pending", 1));

    harness.scenario.create_payout("CreateConfirmPayout").await.unwrap();
    let error = harness
        .scenario
        .fulfill_payout("FulfillAnyStatus")
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::UnhandledResponseShape { status: 200, .. }
    ));
    assert_eq!(
        harness.context().get_parsed::<PayoutStatus>(ContextKey::PayoutStatus).unwrap(),
        Some(PayoutStatus::RequiresFulfillment)
    );
}
