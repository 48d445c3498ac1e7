use masking::PeekInterface;
use scenario_engine::{ContextKey, ScenarioError};
use serde_json::json;
use test_utils::connector_auth::{ConnectorAuthenticationMap, ConnectorPurpose};

use crate::utils::{body, header, Harness};

const CREDENTIALS: &str = r#"
    [adyen]
    api_key = "adyen_payment_key"
    key1 = "PaymentAccount"

    [adyen_payout]
    api_key = "adyen_payout_key"
    key1 = "PayoutAccount"
    api_secret = "payout_secret"
"#;

fn admin_fixtures() -> serde_json::Value {
    json!({
        "MerchantCreate": {
            "Request": { "merchant_name": "Scenario Merchant", "return_url": "https://hyperswitch.io" },
            "Response": { "status": 200, "body": { "merchant_name": "Scenario Merchant" } }
        },
        "ApiKeyCreate": {
            "Request": { "name": "scenario key", "expiration": "never" },
            "Response": { "status": 200, "body": { "name": "scenario key" } }
        },
        "CustomerCreate": {
            "Request": { "email": "guest@example.com", "name": "John Doe" },
            "Response": { "status": 200, "body": { "email": "guest@example.com" } }
        },
        "PayoutConnectorCreate": {
            "Request": {
                "connector_type": "payout_processor",
                "connector_name": "adyen",
                "test_mode": true
            },
            "Response": { "status": 200, "body": { "connector_name": "adyen" } }
        },
        "MerchantRetrieve": {
            "Response": { "status": 200 }
        },
        "MerchantDelete": {
            "Response": { "status": 200 }
        }
    })
}

#[tokio::test]
async fn should_set_up_merchant_for_payouts() {
    let mut harness = Harness::new(admin_fixtures());
    let context = harness.scenario.context_mut();
    context.remove(ContextKey::MerchantId);
    context.remove(ContextKey::ApiKey);
    context.remove(ContextKey::CustomerId);
    context.remove(ContextKey::ConnectorId);

    harness
        .transport
        .reply(
            200,
            json!({
                "merchant_id": "merchant_1700000001",
                "merchant_name": "Scenario Merchant",
                "publishable_key": "pk_snd_fresh",
                "default_profile": "pro_1",
            }),
        )
        .reply(
            200,
            json!({
                "merchant_id": "merchant_1700000001",
                "key_id": "dev_key_1",
                "name": "scenario key",
                "api_key": "snd_fresh_key",
            }),
        )
        .reply(
            200,
            json!({ "customer_id": "cus_fresh", "email": "guest@example.com" }),
        )
        .reply(
            200,
            json!({
                "merchant_connector_id": "mca_adyen",
                "connector_name": "adyen",
                "connector_type": "payout_processor",
            }),
        );

    harness.scenario.merchant_create("MerchantCreate").await.unwrap();
    harness.scenario.api_key_create("ApiKeyCreate").await.unwrap();
    harness.scenario.customer_create("CustomerCreate").await.unwrap();

    let credentials = ConnectorAuthenticationMap::from_toml_str(CREDENTIALS).unwrap();
    harness
        .scenario
        .connector_create("PayoutConnectorCreate", &credentials, ConnectorPurpose::Payout)
        .await
        .unwrap();

    let requests = harness.transport.requests();
    assert_eq!(requests[0].url, "http://localhost:8080/accounts");
    assert_eq!(header(&requests[0], "api-key").as_deref(), Some("test_admin"));
    assert_eq!(
        requests[1].url,
        "http://localhost:8080/api_keys/merchant_1700000001"
    );
    assert_eq!(header(&requests[2], "api-key").as_deref(), Some("snd_fresh_key"));
    assert_eq!(
        requests[3].url,
        "http://localhost:8080/account/merchant_1700000001/connectors"
    );
    let connector_request = body(&requests[3]);
    assert_eq!(
        connector_request["connector_account_details"],
        json!({
            "auth_type": "SignatureKey",
            "api_key": "adyen_payout_key",
            "key1": "PayoutAccount",
            "api_secret": "payout_secret",
        })
    );
    assert_eq!(connector_request["profile_id"], json!("pro_1"));

    let context = harness.context();
    assert_eq!(context.get_secret(ContextKey::ApiKey).unwrap().peek(), "snd_fresh_key");
    assert_eq!(context.get_string(ContextKey::ApiKeyId).unwrap(), "dev_key_1");
    assert_eq!(context.get_string(ContextKey::CustomerId).unwrap(), "cus_fresh");
    assert_eq!(context.get_string(ContextKey::ConnectorId).unwrap(), "adyen");
    assert_eq!(
        context.get_string(ContextKey::MerchantConnectorId).unwrap(),
        "mca_adyen"
    );
    assert!(!format!("{context:?}").contains("snd_fresh_key"));
}

#[tokio::test]
async fn should_fail_for_unconfigured_connector() {
    let mut harness = Harness::new(admin_fixtures());
    let credentials = ConnectorAuthenticationMap::default();

    let error = harness
        .scenario
        .connector_create("PayoutConnectorCreate", &credentials, ConnectorPurpose::Payment)
        .await
        .unwrap_err();
    assert!(matches!(
        error.current_context(),
        ScenarioError::ConfigurationError(_)
    ));
    assert!(harness.transport.requests().is_empty());
}

#[tokio::test]
async fn should_retrieve_then_delete_merchant() {
    let mut harness = Harness::new(admin_fixtures());
    harness
        .transport
        .reply(200, json!({ "merchant_id": "merchant_1700000000" }))
        .reply(200, json!({ "merchant_id": "merchant_1700000000", "deleted": true }));

    harness.scenario.merchant_retrieve("MerchantRetrieve").await.unwrap();
    harness.scenario.merchant_delete("MerchantDelete").await.unwrap();

    assert!(!harness.context().contains(ContextKey::MerchantId));
    assert_eq!(
        harness.transport.last_request().method,
        scenario_engine::types::Method::Delete
    );
}
