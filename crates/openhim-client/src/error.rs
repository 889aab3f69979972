//! Error types for hub communication

use thiserror::Error;

/// Errors raised while talking to the OpenHIM hub
#[derive(Error, Debug)]
pub enum HubError {
    /// Transport-level failure (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The authentication challenge was refused
    #[error("Authentication failed for {username}: status {status}")]
    Authentication { username: String, status: u16 },

    /// The hub did not answer the registration with 201
    #[error("Received a non-201 response code {status}, the response body was: {body}")]
    Registration { status: u16, body: String },

    /// The hub did not answer the config request with 200
    #[error("Config fetch failed with status {status}: {body}")]
    ConfigFetch { status: u16, body: String },

    /// The hub refused a heartbeat
    #[error("Heartbeat rejected with status {status}")]
    Heartbeat { status: u16 },

    /// The hub answered with a body we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The client could not be built from its configuration
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl HubError {
    /// Status code returned by the hub, when the error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            HubError::Authentication { status, .. }
            | HubError::Registration { status, .. }
            | HubError::ConfigFetch { status, .. }
            | HubError::Heartbeat { status } => Some(*status),
            HubError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::InvalidResponse(format!("JSON error: {}", err))
    }
}

/// Result type alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_error_display() {
        let err = HubError::Registration {
            status: 400,
            body: "duplicate urn".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Received a non-201 response code 400, the response body was: duplicate urn"
        );
    }

    #[test]
    fn test_status_extraction() {
        assert_eq!(HubError::Heartbeat { status: 503 }.status(), Some(503));
        assert_eq!(
            HubError::ConfigFetch {
                status: 404,
                body: String::new()
            }
            .status(),
            Some(404)
        );
        assert_eq!(HubError::Config("bad url".to_string()).status(), None);
    }
}
