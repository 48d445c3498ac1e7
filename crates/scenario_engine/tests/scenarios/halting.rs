use scenario_engine::{errors::ErrorKind, ContextKey, ScenarioError, StepOutcome};
use serde_json::json;

use crate::utils::Harness;

fn fixtures() -> serde_json::Value {
    json!({
        "Confirm": {
            "Request": { "payment_method": "card" },
            "Response": { "status": 200, "body": { "status": "succeeded" } }
        },
        "Capture": {
            "Response": { "status": 200, "body": { "status": "succeeded" } }
        },
        "SkippedForConnector": {
            "Configs": { "TRIGGER_SKIP": true },
            "Response": { "status": 200 }
        }
    })
}

#[tokio::test]
async fn should_fail_on_unset_context_key() {
    let mut harness = Harness::new(fixtures());

    let error = harness.scenario.confirm_payment("Confirm").await.unwrap_err();

    assert!(matches!(
        error.current_context(),
        ScenarioError::MissingContextKey(ContextKey::PaymentId)
    ));
    assert_eq!(error.current_context().kind(), ErrorKind::Context);
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn should_not_run_steps_after_failure() {
    let mut harness = Harness::new(fixtures());
    harness.scenario.context_mut().set(ContextKey::PaymentId, "pay_1");

    harness.transport.reply(
        200,
        json!({
            "payment_id": "pay_1",
            "status": "succeeded",
            "capture_method": "scheduled",
            "authentication_type": "no_three_ds",
            "payment_method": "card",
        }),
    );
    harness
        .scenario
        .context_mut()
        .set(ContextKey::ClientSecret, masking::Secret::new("secret".to_string()));

    let error = harness.scenario.confirm_payment("Confirm").await.unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::InvalidCaptureMethod(raw) if raw == "\"scheduled\""
    ));
    assert_eq!(harness.scenario.halted_at(), Some("Confirm"));

    let error = harness.scenario.capture_payment("Capture").await.unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::ScenarioHalted(step) if step == "Confirm"
    ));
    assert_eq!(harness.transport.requests().len(), 1);
}

#[tokio::test]
async fn should_skip_step_without_request() {
    let mut harness = Harness::new(fixtures());

    let outcome = harness
        .scenario
        .capture_payment("SkippedForConnector")
        .await
        .unwrap();

    assert!(outcome.is_skipped());
    assert_eq!(outcome, StepOutcome::Skipped);
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn should_halt_on_unknown_fixture() {
    let mut harness = Harness::new(fixtures());

    let error = harness.scenario.capture_payment("Void").await.unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::FixtureNotFound(name) if name == "Void"
    ));
    assert_eq!(harness.scenario.halted_at(), Some("Void"));
}

#[tokio::test]
async fn should_halt_on_transport_failure() {
    let mut harness = Harness::new(fixtures());
    harness.scenario.context_mut().set(ContextKey::PaymentId, "pay_1");

    // nothing scripted: the transport cannot produce a response
    let error = harness.scenario.capture_payment("Capture").await.unwrap_err();
    assert!(matches!(error.current_context(), ScenarioError::TransportFailure));
    assert_eq!(error.current_context().kind(), ErrorKind::Transport);
}
