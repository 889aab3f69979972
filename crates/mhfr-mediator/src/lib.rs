//! MHFR Facilities Mediator
//!
//! An OpenHIM mediator that forwards `GET /mhfr-facilities` to the Master
//! Health Facility Registry and wraps the answer in the envelope the hub
//! expects (`application/json+openhim`).
//!
//! ## Architecture
//!
//! 1. **Config** (`config`): environment-selected API config plus the static
//!    mediator descriptor.
//! 2. **Contracts** (`contracts/`): the hub envelope and orchestration records.
//! 3. **Client** (`client/`): downstream facilities API client.
//! 4. **Handler** (`handler/`): axum router.
//! 5. **Startup** (`startup`): optional hub registration, listener, heartbeat.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod startup;

#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use client::{DownstreamResponse, FacilitiesClient, Payload};
pub use config::{ApiConfig, Environment, FacilitiesConfig, Settings};
pub use contracts::*;
pub use error::{ConfigError, FacilitiesError, MediatorError, Result};
pub use handler::{create_router, AppState};
pub use startup::{BoundMediator, ConfigStore};

/// Mediator version (from Cargo.toml)
pub const MEDIATOR_VERSION: &str = env!("CARGO_PKG_VERSION");
