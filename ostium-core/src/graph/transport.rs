use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::graph::error::{GraphError, Result};

/// One remote call: plain query or mutation text plus optional variables.
///
/// The query builders inline every argument into the text, so `variables`
/// stays null for all current operations; it is part of the wire contract
/// regardless.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub variables: Value,
}

impl GraphRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Null,
        }
    }
}

/// The single outbound seam to the graph backend.
///
/// Every remote call goes through this one method; nothing else in the
/// broker depends on transport-level details.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: GraphRequest) -> Result<Value>;
}

/// Production transport: POSTs the request as JSON to the backend's
/// query endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: GraphRequest) -> Result<Value> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let envelope: Value = response.json().await?;
        decode_envelope(envelope)
    }
}

/// Splits a response envelope into data or a classified error.
///
/// The backend reports a missing object as a regular error whose message
/// carries "Object not found"; that class becomes [`GraphError::NotFound`]
/// so callers can branch on it structurally.
fn decode_envelope(mut envelope: Value) -> Result<Value> {
    if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|err| err.get("message").and_then(Value::as_str))
                .collect();
            let joined = if messages.is_empty() {
                "unspecified backend error".to_string()
            } else {
                messages.join("; ")
            };
            if joined.contains("Object not found") {
                return Err(GraphError::not_found(joined));
            }
            return Err(GraphError::Backend(joined));
        }
    }
    match envelope.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(GraphError::protocol(
            "response carried neither data nor errors",
        )),
    }
}
