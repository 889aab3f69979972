//! Orchestration records
//!
//! One record per upstream call, kept by the hub for auditing.

use axum::http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::now_millis;

/// An upstream call made while handling a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orchestration {
    pub name: String,
    pub request: OrchestrationRequest,
    pub response: OrchestrationResponse,
}

impl Orchestration {
    pub fn new(
        name: impl Into<String>,
        request: OrchestrationRequest,
        response: OrchestrationResponse,
    ) -> Self {
        Self {
            name: name.into(),
            request,
            response,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationRequest {
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Query string without the leading `?`
    #[serde(default)]
    pub querystring: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub method: String,
    pub timestamp: i64,
}

impl OrchestrationRequest {
    /// Capture an inbound request, stamped with the current time
    pub fn capture(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            path: uri.path().to_string(),
            headers: header_map(headers),
            querystring: uri.query().unwrap_or_default().to_string(),
            body: None,
            method: method.to_string(),
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub timestamp: i64,
}

impl OrchestrationResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
            timestamp: now_millis(),
        }
    }
}

/// Flatten headers to a string map; repeated headers are comma-joined
fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}
