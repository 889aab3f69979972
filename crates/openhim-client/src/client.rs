//! HTTP client for the OpenHIM hub API
//!
//! Every call authenticates first: the hub hands out a salt, the client
//! signs the real request with it (see [`crate::auth`]).

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

use crate::auth::{AuthChallenge, AuthHeaders};
use crate::error::{HubError, Result};
use crate::mediator::MediatorConfig;

/// Request timeout for hub calls
pub const HUB_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the hub API (the `api` section of the config file)
#[derive(Clone, Deserialize)]
pub struct HubApiConfig {
    pub username: String,
    pub password: String,

    /// Base URL of the hub API, e.g. `https://localhost:8080`
    #[serde(rename = "apiURL")]
    pub api_url: String,

    /// Accept self-signed hub certificates
    #[serde(rename = "trustSelfSigned", default)]
    pub trust_self_signed: bool,
}

impl HubApiConfig {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            api_url: api_url.into(),
            trust_self_signed: false,
        }
    }

    pub fn with_trust_self_signed(mut self, trust: bool) -> Self {
        self.trust_self_signed = trust;
        self
    }
}

impl fmt::Debug for HubApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubApiConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("trust_self_signed", &self.trust_self_signed)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct HeartbeatRequest {
    uptime: f64,
    config: bool,
}

/// Client for the hub API
///
/// Cheap to clone; clones share the connection pool and the uptime origin.
#[derive(Debug, Clone)]
pub struct HubClient {
    client: Client,
    api: HubApiConfig,
    started: Instant,
}

impl HubClient {
    /// Create a client for the given hub
    pub fn new(api: HubApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(HUB_REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(api.trust_self_signed)
            .build()
            .map_err(|e| HubError::Config(format!("Failed to create HTTP client: {}", e)))?;

        if api.trust_self_signed {
            tracing::warn!(api_url = %api.api_url, "Certificate verification disabled for hub API");
        }

        Ok(Self {
            client,
            api,
            started: Instant::now(),
        })
    }

    /// Hub connection settings
    pub fn api(&self) -> &HubApiConfig {
        &self.api
    }

    /// Seconds since this client was created, reported in heartbeats
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Hub URL for the given path segments, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api.api_url)
            .map_err(|e| HubError::Config(format!("Invalid hub API URL {}: {}", self.api.api_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| HubError::Config(format!("Hub API URL {} cannot carry a path", self.api.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the authentication salt for the configured user
    pub async fn authenticate(&self) -> Result<AuthChallenge> {
        let url = self.endpoint(&["authenticate", &self.api.username])?;

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(HubError::Authentication {
                username: self.api.username.clone(),
                status: status.as_u16(),
            });
        }

        response
            .json::<AuthChallenge>()
            .await
            .map_err(|e| HubError::InvalidResponse(format!("Malformed auth challenge: {}", e)))
    }

    async fn signed_headers(&self) -> Result<AuthHeaders> {
        let challenge = self.authenticate().await?;
        let now = chrono::Utc::now().to_rfc3339();
        Ok(AuthHeaders::derive(
            &self.api.username,
            &self.api.password,
            &challenge.salt,
            &now,
        ))
    }

    /// Register (or update) the mediator with the hub
    pub async fn register_mediator(&self, mediator: &MediatorConfig) -> Result<()> {
        let headers = self.signed_headers().await?;
        let url = self.endpoint(&["mediators"])?;

        let response = headers
            .apply(self.client.post(url))
            .json(mediator)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            tracing::debug!(urn = %mediator.urn, "Mediator registered");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(HubError::Registration {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Fetch the mediator's current config from the hub
    pub async fn fetch_config(&self, urn: &str) -> Result<Value> {
        let response = self.heartbeat_request(urn, true).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::ConfigFetch {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Send one heartbeat
    ///
    /// Returns the config carried in the hub's answer, if it sent a
    /// non-empty one.
    pub async fn send_heartbeat(&self, urn: &str, force_config: bool) -> Result<Option<Value>> {
        let response = self.heartbeat_request(urn, force_config).await?;
        let status = response.status();

        if status != StatusCode::OK {
            return Err(HubError::Heartbeat {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&body)? {
            Value::Object(map) if !map.is_empty() => Ok(Some(Value::Object(map))),
            _ => Ok(None),
        }
    }

    async fn heartbeat_request(&self, urn: &str, config: bool) -> Result<reqwest::Response> {
        let headers = self.signed_headers().await?;
        let url = self.endpoint(&["mediators", urn, "heartbeat"])?;

        let body = HeartbeatRequest {
            uptime: self.uptime(),
            config,
        };

        Ok(headers
            .apply(self.client.post(url))
            .json(&body)
            .send()
            .await?)
    }
}
