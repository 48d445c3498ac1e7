use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use error_stack::report;
use masking::Secret;
use scenario_engine::{
    errors::{ApiClientError, CustomResult, RedirectionError},
    fixtures::FixtureSet,
    redirection::{
        RedirectionFlow, RedirectionHandler, RedirectionOutcome, RedirectionOverrides,
        RedirectionTarget,
    },
    transport::Transport,
    types::{Request, Response},
    ContextKey, Scenario, ScenarioContext, ScenarioState,
};
use serde_json::{json, Value};

pub const BASE_URL: &str = "http://localhost:8080";
pub const API_KEY: &str = "snd_merchant_key";
pub const PUBLISHABLE_KEY: &str = "pk_snd_merchant";

/// Replays canned responses in order and records every request it was given.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn reply(&self, status_code: u16, body: Value) -> &Self {
        self.responses.lock().unwrap().push_back(Response {
            status_code,
            headers: HashMap::from([("x-request-id".to_string(), "req_scripted".to_string())]),
            body,
        });
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Request {
        self.requests().pop().unwrap()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: Request) -> CustomResult<Response, ApiClientError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| report!(ApiClientError::RequestNotSent("script exhausted".to_string())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowedRedirect {
    pub flow: RedirectionFlow,
    pub target: RedirectionTarget,
    pub connector_id: String,
    pub payment_method_type: Option<String>,
}

/// Completes every interaction and remembers what it was asked to follow.
#[derive(Debug, Default)]
pub struct RecordingRedirection {
    followed: Mutex<Vec<FollowedRedirect>>,
}

impl RecordingRedirection {
    pub fn followed(&self) -> Vec<FollowedRedirect> {
        self.followed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RedirectionHandler for RecordingRedirection {
    async fn follow(
        &self,
        flow: RedirectionFlow,
        target: RedirectionTarget,
        connector_id: &str,
        payment_method_type: Option<&str>,
        _extra: Option<Value>,
    ) -> CustomResult<RedirectionOutcome, RedirectionError> {
        let landed_on = target.expected_url.clone();
        self.followed.lock().unwrap().push(FollowedRedirect {
            flow,
            target,
            connector_id: connector_id.to_string(),
            payment_method_type: payment_method_type.map(str::to_string),
        });
        Ok(RedirectionOutcome::new(json!({ "landed_on": landed_on })))
    }
}

#[derive(Debug)]
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub redirection: Arc<RecordingRedirection>,
    pub scenario: Scenario,
}

impl Harness {
    pub fn new(fixtures: Value) -> Self {
        Self::with_overrides(fixtures, RedirectionOverrides::default())
    }

    pub fn with_overrides(fixtures: Value, overrides: RedirectionOverrides) -> Self {
        let transport = Arc::new(ScriptedTransport::default());
        let redirection = Arc::new(RecordingRedirection::default());
        let state = ScenarioState::new(transport.clone(), redirection.clone(), overrides);
        let fixtures = FixtureSet::from_json_str(&fixtures.to_string()).unwrap();

        let scenario = Scenario::new(
            "scripted",
            Arc::new(state),
            Arc::new(fixtures),
            merchant_context("stripe"),
        );
        Self {
            transport,
            redirection,
            scenario,
        }
    }

    pub fn context(&self) -> &ScenarioContext {
        self.scenario.context()
    }
}

/// Context of a merchant that already has keys, a customer and a connector.
pub fn merchant_context(connector: &str) -> ScenarioContext {
    let mut context = ScenarioContext::new();
    context.set(ContextKey::BaseUrl, BASE_URL);
    context.set(ContextKey::AdminApiKey, Secret::new("test_admin".to_string()));
    context.set(ContextKey::MerchantId, "merchant_1700000000");
    context.set(ContextKey::ApiKey, Secret::new(API_KEY.to_string()));
    context.set(ContextKey::PublishableKey, Secret::new(PUBLISHABLE_KEY.to_string()));
    context.set(ContextKey::CustomerId, "cus_scripted");
    context.set(ContextKey::ConnectorId, connector);
    context
}

pub fn header(request: &Request, name: &str) -> Option<String> {
    request.header(name).map(|value| value.inner().clone())
}

pub fn body(request: &Request) -> Value {
    request.body.clone().unwrap_or(Value::Null)
}
