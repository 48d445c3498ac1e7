pub mod enums;

use std::collections::HashMap;

use masking::Maskable;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts;

pub type Headers = Vec<(String, Maskable<String>)>;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One outbound call to the service under test.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: String::from(url),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header, replacing an earlier header of the same name.
    pub fn add_header(&mut self, header: &str, value: Maskable<String>) {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(header));
        self.headers.push((String::from(header), value));
    }

    pub fn set_body(&mut self, body: Value) {
        self.body.replace(body);
    }

    pub fn header(&self, header: &str) -> Option<&Maskable<String>> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(header))
            .map(|(_, value)| value)
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn new(method: Method, url: &str) -> Self {
        let mut request = Request::new(method, url);
        request.add_header("Content-Type", consts::CONTENT_TYPE_JSON.into());
        Self { request }
    }

    pub fn header(mut self, header: &str, value: Maskable<String>) -> Self {
        self.request.add_header(header, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        for (name, value) in headers {
            self.request.add_header(&name, value);
        }
        self
    }

    pub fn set_body(mut self, body: Value) -> Self {
        self.request.set_body(body);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

/// Response envelope of one step. Only the fields a flow copies into the
/// [`crate::context::ScenarioContext`] outlive the step.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(consts::REQUEST_ID_HEADER)
            .map(String::as_str)
    }

    /// Value at a dot-separated path of the body, e.g. `next_action.redirect_to_url`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        lookup(&self.body, path)
    }

    /// String at `path`; `None` when absent, `null` or not a string.
    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    /// Field of the `error` object of an error response.
    pub fn error_field(&self, name: &str) -> Option<&str> {
        self.body
            .get("error")
            .and_then(|error| error.get(name))
            .and_then(Value::as_str)
    }
}

pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}
