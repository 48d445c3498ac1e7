//!
//! Transport seam: issues one request and hands back the response envelope.
//!

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use error_stack::{report, ResultExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scenario_env::{instrument, logger};
use serde_json::Value;

use crate::{
    consts,
    errors::{ApiClientError, CustomResult},
    types::{Headers, Method, Request, Response},
};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request`. Non-2xx statuses are responses, not errors; only failures to obtain a
    /// response are reported as [`ApiClientError`].
    async fn send(&self, request: Request) -> CustomResult<Response, ApiClientError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> CustomResult<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .change_context(ApiClientError::ClientConstructionFailed)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: Request) -> CustomResult<Response, ApiClientError> {
        logger::debug!(tag = ?logger::Tag::ApiOutgoingRequest, headers = ?request.headers, body = ?request.body);

        let url = reqwest::Url::parse(&request.url)
            .change_context(ApiClientError::UrlEncodingFailed)
            .attach_printable_lazy(|| format!("url: {}", request.url))?;
        let headers = construct_header_map(request.headers)?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        }
        .headers(headers);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                report!(ApiClientError::RequestTimeoutReceived)
            } else {
                report!(ApiClientError::RequestNotSent(error.to_string()))
            }
        })?;

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect::<HashMap<_, _>>();
        let bytes = response
            .bytes()
            .await
            .change_context(ApiClientError::ResponseDecodingFailed)
            .attach_printable("Error while waiting for response")?;
        let body = decode_body(&bytes);

        logger::info!(
            tag = ?logger::Tag::ApiIncomingResponse,
            status_code,
            request_id = headers.get(consts::REQUEST_ID_HEADER).map(String::as_str).unwrap_or("-"),
        );
        logger::debug!(response_body = %body);

        Ok(Response {
            status_code,
            headers,
            body,
        })
    }
}

fn construct_header_map(headers: Headers) -> CustomResult<HeaderMap, ApiClientError> {
    headers
        .into_iter()
        .try_fold(HeaderMap::new(), |mut header_map, (name, value)| {
            let name = HeaderName::from_bytes(name.as_bytes())
                .change_context(ApiClientError::HeaderMapConstructionFailed)?;
            let mut value = HeaderValue::from_str(&value.clone().into_inner())
                .change_context(ApiClientError::HeaderMapConstructionFailed)?;
            // masked values are credentials
            value.set_sensitive(true);
            header_map.append(name, value);
            Ok(header_map)
        })
}

/// Empty bodies decode to `null`; non-JSON bodies are kept as a string so validation reports
/// them instead of the transport failing.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
