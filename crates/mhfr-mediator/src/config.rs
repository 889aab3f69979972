//! Mediator configuration
//!
//! Two documents live in the config directory:
//!
//! - the API config, `config.{json,yaml,yml}` or `test.{json,yaml,yml}`
//!   depending on the environment
//! - the mediator descriptor, `mediator.{json,yaml,yml}`
//!
//! The listening port comes from the descriptor's first endpoint, except in
//! the test environment which always listens on [`TEST_PORT`].

use openhim_client::{HubApiConfig, MediatorConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Port used in the test environment
pub const TEST_PORT: u16 = 7001;

pub const DEFAULT_FACILITIES_URL: &str =
    "http://localhost:3000/api/Facilities/fhir/location/_history";

pub const DEFAULT_FACILITIES_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

const MEDIATOR_STEM: &str = "mediator";

/// Deployment environment, selects the API config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Default,
    Test,
}

impl Environment {
    /// `test` (any case) selects the test environment, anything else the default
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("test") {
            Environment::Test
        } else {
            Environment::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Default => "default",
            Environment::Test => "test",
        }
    }

    fn config_stem(&self) -> &'static str {
        match self {
            Environment::Default => "config",
            Environment::Test => "test",
        }
    }
}

/// Downstream facilities API settings
#[derive(Debug, Clone, Deserialize)]
pub struct FacilitiesConfig {
    #[serde(default = "default_facilities_url")]
    pub url: String,

    #[serde(rename = "timeoutMs", default = "default_facilities_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FacilitiesConfig {
    fn default() -> Self {
        Self {
            url: default_facilities_url(),
            timeout_ms: default_facilities_timeout_ms(),
        }
    }
}

impl FacilitiesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_facilities_url() -> String {
    DEFAULT_FACILITIES_URL.to_string()
}

fn default_facilities_timeout_ms() -> u64 {
    DEFAULT_FACILITIES_TIMEOUT_MS
}

fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

/// The environment-selected API config file
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Hub connection; required when `register` is set
    #[serde(default)]
    pub api: Option<HubApiConfig>,

    /// Register with the hub before serving
    #[serde(default)]
    pub register: bool,

    /// Keep a heartbeat running after registration
    #[serde(default)]
    pub heartbeat: bool,

    #[serde(rename = "heartbeatIntervalMs", default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default)]
    pub facilities: FacilitiesConfig,
}

impl ApiConfig {
    /// Hub connection settings, or an error if none are configured
    pub fn hub_api(&self) -> Result<&HubApiConfig, ConfigError> {
        self.api.as_ref().ok_or_else(|| {
            ConfigError::invalid("registration is enabled but the config has no `api` section")
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub api: ApiConfig,
    pub mediator: MediatorConfig,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Load both documents from `dir` and resolve the listening port
    pub fn load(dir: impl AsRef<Path>, environment: Environment) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();

        let api: ApiConfig = load_document(dir, environment.config_stem())?;
        let mediator: MediatorConfig = load_document(dir, MEDIATOR_STEM)?;

        if mediator.urn.trim().is_empty() {
            return Err(ConfigError::invalid("mediator descriptor has an empty urn"));
        }
        if api.register {
            api.hub_api()?;
        }
        if api.facilities.timeout_ms == 0 {
            return Err(ConfigError::invalid("facilities.timeoutMs must be greater than zero"));
        }
        if api.heartbeat_interval_ms == 0 {
            return Err(ConfigError::invalid("heartbeatIntervalMs must be greater than zero"));
        }

        let port = match environment {
            Environment::Test => TEST_PORT,
            Environment::Default => mediator.primary_port().ok_or_else(|| {
                ConfigError::invalid("mediator descriptor must declare at least one endpoint")
            })?,
        };

        Ok(Self {
            environment,
            api,
            mediator,
            host: "0.0.0.0".to_string(),
            port,
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_facilities_url(mut self, url: impl Into<String>) -> Self {
        self.api.facilities.url = url.into();
        self
    }
}

/// Find `{stem}.json`, `{stem}.yaml` or `{stem}.yml` in `dir` and parse it
fn load_document<T: DeserializeOwned>(dir: &Path, stem: &str) -> Result<T, ConfigError> {
    let path = ["json", "yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
        })?;

    parse_document(&path)
}

fn parse_document<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);

    let parsed = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
