use error_stack::{report, ResultExt};
use masking::Mask;
use scenario_env::logger;
use serde_json::{Map, Value};

use crate::{
    consts,
    context::{ContextKey, ScenarioContext},
    errors::{ScenarioError, ScenarioResult},
    fixtures::ExpectedResponse,
    scenario::ScenarioState,
    types::{Method, Request, RequestBuilder, Response},
    validator,
};

pub(crate) fn build_url(context: &ScenarioContext, path: &str) -> ScenarioResult<String> {
    let base_url = context.get_string(ContextKey::BaseUrl)?;
    Ok(format!("{}{path}", base_url.trim_end_matches('/')))
}

/// Request authenticated with the merchant's API key.
pub(crate) fn merchant_request(
    context: &ScenarioContext,
    method: Method,
    path: &str,
) -> ScenarioResult<RequestBuilder> {
    let url = build_url(context, path)?;
    let api_key = context.expose_string(ContextKey::ApiKey)?;
    Ok(RequestBuilder::new(method, &url).header(consts::API_KEY_HEADER, api_key.into_masked()))
}

/// Request authenticated with the admin API key.
pub(crate) fn admin_request(
    context: &ScenarioContext,
    method: Method,
    path: &str,
) -> ScenarioResult<RequestBuilder> {
    let url = build_url(context, path)?;
    let admin_api_key = context.expose_string(ContextKey::AdminApiKey)?;
    Ok(RequestBuilder::new(method, &url)
        .header(consts::API_KEY_HEADER, admin_api_key.into_masked()))
}

pub(crate) async fn call(state: &ScenarioState, request: Request) -> ScenarioResult<Response> {
    let (method, url) = (request.method, request.url.clone());
    let response = state
        .transport
        .send(request)
        .await
        .change_context(ScenarioError::TransportFailure)
        .attach_printable_lazy(|| format!("{method} {url}"))?;

    logger::info!(
        status_code = response.status_code,
        request_id = response.request_id().unwrap_or("-"),
        "{method} {url}"
    );
    Ok(response)
}

/// Fixture-driven check for responses without a specialised handler: the HTTP status must be
/// the declared one and the body must carry every declared field.
pub fn default_error_handler(response: &Response, expected: &ExpectedResponse) -> ScenarioResult<()> {
    if response.status_code != expected.status {
        logger::error!(
            expected = expected.status,
            actual = response.status_code,
            body = %response.body,
            "unexpected status"
        );
        return Err(report!(ScenarioError::UnexpectedStatus {
            expected: expected.status,
            actual: response.status_code,
        }))
        .attach_printable(response.body.to_string());
    }
    validator::assert_subset(&expected.body, &response.body, response.status_code).inspect_err(
        |report| {
            logger::error!(error = ?report.current_context(), "response does not match fixture");
        },
    )
}

/// Fixture request template with the context-derived fields laid over it.
pub(crate) fn request_body<'a>(
    template: &Map<String, Value>,
    fields: impl IntoIterator<Item = (&'a str, Value)>,
) -> Value {
    let mut body = template.clone();
    for (key, value) in fields {
        body.insert(key.to_string(), value);
    }
    Value::Object(body)
}

pub(crate) fn required_str<'a>(response: &'a Response, path: &str) -> ScenarioResult<&'a str> {
    response
        .str_field(path)
        .ok_or_else(|| report!(ScenarioError::MissingResponseField(path.to_string())))
        .attach_printable_lazy(|| response.body.to_string())
}

pub(crate) fn required_i64(response: &Response, path: &str) -> ScenarioResult<i64> {
    response
        .field(path)
        .and_then(Value::as_i64)
        .ok_or_else(|| report!(ScenarioError::MissingResponseField(path.to_string())))
        .attach_printable_lazy(|| response.body.to_string())
}

/// Fails with [`ScenarioError::RoundTripMismatch`] when the service echoes a different value.
pub(crate) fn ensure_echoed<T>(field: &'static str, stored: T, returned: T) -> ScenarioResult<()>
where
    T: PartialEq + ToString,
{
    if stored == returned {
        Ok(())
    } else {
        Err(report!(ScenarioError::RoundTripMismatch {
            field,
            expected: stored.to_string(),
            actual: returned.to_string(),
        }))
    }
}
