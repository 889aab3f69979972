//! Downstream facilities API client
//!
//! One GET per call to the MHFR location history endpoint. No retries.

use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::config::FacilitiesConfig;
use crate::error::FacilitiesError;

/// Downstream response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Parse as JSON, keeping the raw text when it is not JSON
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text),
        }
    }

    /// Body for the hub response record: JSON pretty-printed with a
    /// four-space indent, text as received
    pub fn to_body_string(&self) -> String {
        match self {
            Payload::Json(value) => pretty_json(value),
            Payload::Text(text) => text.clone(),
        }
    }

    /// Body for the orchestration record
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Json(value) => value.clone(),
            Payload::Text(text) => Value::String(text.clone()),
        }
    }
}

fn pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

/// What the facilities API answered
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: u16,
    pub body: Payload,
}

impl DownstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Facilities API client
#[derive(Debug, Clone)]
pub struct FacilitiesClient {
    url: String,
    client: reqwest::Client,
}

impl FacilitiesClient {
    pub fn new(config: &FacilitiesConfig) -> Result<Self, FacilitiesError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FacilitiesError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the facility records
    ///
    /// Any HTTP status is a response; only transport failures are errors.
    pub async fn fetch(&self) -> Result<DownstreamResponse, FacilitiesError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FacilitiesError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| FacilitiesError::Body(e.to_string()))?;

        tracing::debug!(url = %self.url, status = status, bytes = text.len(), "Facilities API answered");

        Ok(DownstreamResponse {
            status,
            body: Payload::from_text(text),
        })
    }
}
