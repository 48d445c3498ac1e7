use error_stack::{report, ResultExt};
use masking::Secret;
use scenario_env::{instrument, logger, Flow};
use serde_json::{json, Value};
use test_utils::connector_auth::{ConnectorAuthType, ConnectorAuthenticationMap, ConnectorPurpose};

use super::utils;
use crate::{
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::StepFixture,
    scenario::ScenarioState,
    types::Method,
};

#[instrument(skip_all, fields(flow = ?Flow::MerchantsAccountCreate))]
pub async fn merchant_create(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<bool> {
    let body = utils::request_body(&fixture.request, []);
    let request = utils::admin_request(context, Method::Post, "/accounts")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    let merchant_id = utils::required_str(&response, "merchant_id")?.to_string();
    let publishable_key = utils::required_str(&response, "publishable_key")?.to_string();
    context.set(ContextKey::MerchantId, merchant_id);
    context.set(ContextKey::PublishableKey, Secret::new(publishable_key));
    if let Some(profile_id) = response.str_field("default_profile") {
        context.set(ContextKey::ProfileId, profile_id);
    }
    Ok(true)
}

#[instrument(skip_all, fields(flow = ?Flow::MerchantsAccountRetrieve))]
pub async fn merchant_retrieve(
    state: &ScenarioState,
    context: &ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<bool> {
    let merchant_id = context.get_string(ContextKey::MerchantId)?;
    let request =
        utils::admin_request(context, Method::Get, &format!("/accounts/{merchant_id}"))?.build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    utils::ensure_echoed(
        "merchant_id",
        merchant_id,
        utils::required_str(&response, "merchant_id")?,
    )?;
    Ok(true)
}

#[instrument(skip_all, fields(flow = ?Flow::MerchantsAccountDelete))]
pub async fn merchant_delete(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<bool> {
    let merchant_id = context.get_string(ContextKey::MerchantId)?.to_string();
    let request =
        utils::admin_request(context, Method::Delete, &format!("/accounts/{merchant_id}"))?.build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    if response.field("deleted") != Some(&Value::Bool(true)) {
        return Err(report!(ScenarioError::mismatch(
            "deleted",
            true,
            response
                .field("deleted")
                .map_or_else(|| "<absent>".to_string(), Value::to_string),
        )));
    }
    context.remove(ContextKey::MerchantId);
    Ok(true)
}

#[instrument(skip_all, fields(flow = ?Flow::ApiKeyCreate))]
pub async fn api_key_create(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<bool> {
    let merchant_id = context.get_string(ContextKey::MerchantId)?.to_string();
    let body = utils::request_body(&fixture.request, []);
    let request =
        utils::admin_request(context, Method::Post, &format!("/api_keys/{merchant_id}"))?
            .set_body(body)
            .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    utils::ensure_echoed(
        "merchant_id",
        merchant_id.as_str(),
        utils::required_str(&response, "merchant_id")?,
    )?;
    let api_key = utils::required_str(&response, "api_key")?.to_string();
    let key_id = utils::required_str(&response, "key_id")?.to_string();
    context.set(ContextKey::ApiKey, Secret::new(api_key));
    context.set(ContextKey::ApiKeyId, key_id);
    Ok(true)
}

#[instrument(skip_all, fields(flow = ?Flow::CustomersCreate))]
pub async fn customer_create(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
) -> ScenarioResult<bool> {
    let body = utils::request_body(&fixture.request, []);
    let request = utils::merchant_request(context, Method::Post, "/customers")?
        .set_body(body)
        .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    let customer_id = utils::required_str(&response, "customer_id")?.to_string();
    context.set(ContextKey::CustomerId, customer_id);
    Ok(true)
}

/// Creates the merchant connector account, taking `connector_account_details` from the
/// credential source. Payout connectors prefer their `<connector>_payout` credentials.
#[instrument(skip_all, fields(flow = ?Flow::MerchantConnectorsCreate))]
pub async fn connector_create(
    state: &ScenarioState,
    context: &mut ScenarioContext,
    fixture: &StepFixture,
    credentials: &ConnectorAuthenticationMap,
    purpose: ConnectorPurpose,
) -> ScenarioResult<bool> {
    let merchant_id = context.get_string(ContextKey::MerchantId)?.to_string();
    let connector_name = fixture
        .request
        .get("connector_name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            report!(ScenarioError::ConfigurationError(
                "connector request has no connector_name".to_string()
            ))
        })?
        .to_string();
    let account_details = credentials
        .resolve(&connector_name, purpose)
        .and_then(ConnectorAuthType::to_account_details)
        .change_context(ScenarioError::ConfigurationError(format!(
            "no usable credentials for connector {connector_name}"
        )))?;

    let mut fields = vec![("connector_account_details", account_details)];
    if context.contains(ContextKey::ProfileId) {
        fields.push(("profile_id", json!(context.get_string(ContextKey::ProfileId)?)));
    }
    let body = utils::request_body(&fixture.request, fields);
    let request = utils::admin_request(
        context,
        Method::Post,
        &format!("/account/{merchant_id}/connectors"),
    )?
    .set_body(body)
    .build();
    let response = utils::call(state, request).await?;
    utils::default_error_handler(&response, &fixture.response)?;
    if !response.is_success() {
        return Ok(false);
    }

    let merchant_connector_id = utils::required_str(&response, "merchant_connector_id")?.to_string();
    logger::info!(connector = %connector_name, ?purpose, %merchant_connector_id);
    context.set(ContextKey::MerchantConnectorId, merchant_connector_id);
    context.set(ContextKey::ConnectorId, connector_name);
    Ok(true)
}
