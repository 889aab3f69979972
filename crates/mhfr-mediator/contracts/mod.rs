//! Hub envelope contracts
//!
//! The JSON shapes a mediator returns to the OpenHIM hub. Served with
//! content type [`OPENHIM_CONTENT_TYPE`].

mod orchestration;

pub use orchestration::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Content type the hub recognizes as a mediator envelope
pub const OPENHIM_CONTENT_TYPE: &str = "application/json+openhim";

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Outcome reported to the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediatorStatus {
    Processing,
    Failed,
    Completed,
    Successful,
    #[serde(rename = "Completed with error(s)")]
    CompletedWithErrors,
}

impl MediatorStatus {
    /// `Successful` for a 2xx downstream answer, `Completed` otherwise
    pub fn from_downstream(status: u16) -> Self {
        if (200..300).contains(&status) {
            MediatorStatus::Successful
        } else {
            MediatorStatus::Completed
        }
    }
}

/// The response the hub relays to its client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub timestamp: i64,
}

impl ResponseRecord {
    /// A JSON response record stamped with the current time
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status,
            headers,
            body: body.into(),
            timestamp: now_millis(),
        }
    }
}

/// Mediator response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediatorResponse {
    #[serde(rename = "x-mediator-urn")]
    pub mediator_urn: String,

    pub status: MediatorStatus,

    /// Serialized [`ResponseRecord`]
    pub response: String,

    #[serde(default)]
    pub orchestrations: Vec<Orchestration>,

    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl MediatorResponse {
    pub fn new(
        mediator_urn: impl Into<String>,
        status: MediatorStatus,
        response: &ResponseRecord,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            mediator_urn: mediator_urn.into(),
            status,
            response: serde_json::to_string(response)?,
            orchestrations: Vec::new(),
            properties: HashMap::new(),
        })
    }

    pub fn with_orchestration(mut self, orchestration: Orchestration) -> Self {
        self.orchestrations.push(orchestration);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Decode the serialized response record
    pub fn response_record(&self) -> Result<ResponseRecord, serde_json::Error> {
        serde_json::from_str(&self.response)
    }
}
