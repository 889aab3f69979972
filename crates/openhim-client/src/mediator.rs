//! Mediator descriptor
//!
//! The static document a mediator registers with the hub: identity,
//! default channels, endpoints and the default config.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Mediator registration descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorConfig {
    /// Unique mediator identifier, e.g. `urn:mediator:mhfr-facilities`
    pub urn: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Channels the hub creates for this mediator (forwarded verbatim)
    #[serde(default)]
    pub default_channel_config: Vec<Value>,

    #[serde(default)]
    pub endpoints: Vec<MediatorEndpoint>,

    /// Config definitions shown in the hub console (forwarded verbatim)
    #[serde(default)]
    pub config_defs: Vec<Value>,

    /// Default config used when the mediator does not register
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl MediatorConfig {
    /// Port of the first endpoint; this is where the mediator listens
    pub fn primary_port(&self) -> Option<u16> {
        self.endpoints.first().map(|e| e.port)
    }

    /// The descriptor's default config, or an empty object
    pub fn default_config(&self) -> Value {
        self.config
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

/// One route the hub can reach the mediator on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediatorEndpoint {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub path: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    #[serde(default)]
    pub primary: bool,
    #[serde(rename = "type", default = "default_endpoint_type")]
    pub endpoint_type: String,
}

fn default_endpoint_type() -> String {
    "http".to_string()
}

/// Descriptors in the wild write ports both as `4000` and `"4000"`
fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {}", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(port: Value) -> Value {
        json!({
            "urn": "urn:mediator:test",
            "version": "0.1.0",
            "name": "Test Mediator",
            "defaultChannelConfig": [{ "name": "Test", "urlPattern": "^/test$" }],
            "endpoints": [{
                "name": "Test Route",
                "host": "localhost",
                "path": "/test",
                "port": port,
                "primary": true,
                "type": "http"
            }],
            "configDefs": [],
            "config": { "upstream": "http://localhost:3000" }
        })
    }

    #[test]
    fn test_port_accepts_number_and_string() {
        let numeric: MediatorConfig = serde_json::from_value(descriptor(json!(4000))).unwrap();
        let textual: MediatorConfig = serde_json::from_value(descriptor(json!("4000"))).unwrap();

        assert_eq!(numeric.primary_port(), Some(4000));
        assert_eq!(textual.primary_port(), Some(4000));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = serde_json::from_value::<MediatorConfig>(descriptor(json!("http")));
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_hub_field_names() {
        let config: MediatorConfig = serde_json::from_value(descriptor(json!(4000))).unwrap();
        let value = serde_json::to_value(&config).unwrap();

        assert!(value.get("defaultChannelConfig").is_some());
        assert!(value.get("configDefs").is_some());
        assert_eq!(value["endpoints"][0]["type"], "http");
        assert_eq!(value["endpoints"][0]["port"], 4000);
    }

    #[test]
    fn test_default_config_falls_back_to_empty_object() {
        let mut config: MediatorConfig = serde_json::from_value(descriptor(json!(4000))).unwrap();
        assert_eq!(config.default_config()["upstream"], "http://localhost:3000");

        config.config = None;
        assert_eq!(config.default_config(), json!({}));
        assert_eq!(config.endpoints[0].endpoint_type, "http");
    }
}
