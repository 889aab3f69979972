//! Hub API authentication
//!
//! The hub hands out a per-user salt from `GET /authenticate/{username}`.
//! Every subsequent request carries four headers derived from that salt,
//! the user's password and the current time:
//!
//! - `passhash = hex(sha512(salt + password))`
//! - `token    = hex(sha512(passhash + salt + now))`

use reqwest::RequestBuilder;
use serde::Deserialize;
use sha2::{Digest, Sha512};

pub const HEADER_USERNAME: &str = "auth-username";
pub const HEADER_TS: &str = "auth-ts";
pub const HEADER_SALT: &str = "auth-salt";
pub const HEADER_TOKEN: &str = "auth-token";

/// Response of the authentication challenge endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AuthChallenge {
    pub salt: String,
    #[serde(default)]
    pub ts: Option<String>,
}

/// Signed headers for one hub request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub username: String,
    pub ts: String,
    pub salt: String,
    pub token: String,
}

impl AuthHeaders {
    /// Derive the request headers for `username` at time `now`
    pub fn derive(username: &str, password: &str, salt: &str, now: &str) -> Self {
        let passhash = sha512_hex(&[salt, password]);
        let token = sha512_hex(&[&passhash, salt, now]);

        Self {
            username: username.to_string(),
            ts: now.to_string(),
            salt: salt.to_string(),
            token,
        }
    }

    /// Attach the headers to an outgoing request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(HEADER_USERNAME, &self.username)
            .header(HEADER_TS, &self.ts)
            .header(HEADER_SALT, &self.salt)
            .header(HEADER_TOKEN, &self.token)
    }
}

fn sha512_hex(parts: &[&str]) -> String {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}
