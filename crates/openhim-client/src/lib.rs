//! OpenHIM hub client
//!
//! Everything a mediator needs to plug into an OpenHIM hub:
//!
//! - `auth`: challenge/response header derivation for the hub API
//! - `client`: mediator registration, initial config fetch and single heartbeats
//! - `heartbeat`: periodic heartbeat task delivering config updates
//! - `mediator`: the static mediator descriptor sent at registration
//!
//! ```rust,no_run
//! use openhim_client::{HubApiConfig, HubClient, MediatorConfig};
//!
//! # async fn run(descriptor: MediatorConfig) -> Result<(), openhim_client::HubError> {
//! let client = HubClient::new(HubApiConfig::new(
//!     "root@openhim.org",
//!     "openhim-password",
//!     "https://localhost:8080",
//! ))?;
//! client.register_mediator(&descriptor).await?;
//! let config = client.fetch_config(&descriptor.urn).await?;
//! println!("initial config: {}", config);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod heartbeat;
pub mod mediator;

pub use auth::{AuthChallenge, AuthHeaders};
pub use client::{HubApiConfig, HubClient};
pub use error::{HubError, Result};
pub use heartbeat::{Heartbeat, DEFAULT_HEARTBEAT_INTERVAL};
pub use mediator::{MediatorConfig, MediatorEndpoint};
