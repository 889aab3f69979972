//! Mediator startup
//!
//! With `register` set, the mediator registers with the hub and fetches its
//! initial config before the listener is bound; either failure aborts
//! startup. Without it, the descriptor's default config is used. Once
//! listening, an optional heartbeat keeps replacing the stored config with
//! whatever the hub sends.

use axum::Router;
use openhim_client::{Heartbeat, HubClient, MediatorConfig};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::client::FacilitiesClient;
use crate::config::Settings;
use crate::error::Result;
use crate::handler::{create_router, AppState};

/// In-memory copy of the mediator config, replaced wholesale on update
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<Value>>,
}

impl ConfigStore {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn replace(&self, config: Value) {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = config;
    }

    pub fn snapshot(&self) -> Value {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Register with the hub and fetch the initial config
pub async fn register(client: &HubClient, mediator: &MediatorConfig) -> Result<Value> {
    if let Err(e) = client.register_mediator(mediator).await {
        tracing::error!(urn = %mediator.urn, error = %e, "Failed to register this mediator, check your config");
        return Err(e.into());
    }

    let config = match client.fetch_config(&mediator.urn).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(urn = %mediator.urn, error = %e, "Failed to fetch initial config");
            return Err(e.into());
        }
    };

    tracing::info!(config = %config, "Received initial config");
    tracing::info!(urn = %mediator.urn, "Successfully registered mediator!");
    Ok(config)
}

/// A mediator whose listener is bound but not yet serving
pub struct BoundMediator {
    listener: TcpListener,
    router: Router,
    config: ConfigStore,
    heartbeat: Option<HubClient>,
    urn: String,
    heartbeat_interval: Duration,
}

impl BoundMediator {
    /// Run the startup handshake (if configured) and bind the listener
    pub async fn bind(settings: Settings) -> Result<Self> {
        let config = ConfigStore::default();

        let hub = if settings.api.register {
            let client = HubClient::new(settings.api.hub_api()?.clone())?;
            config.replace(register(&client, &settings.mediator).await?);
            Some(client)
        } else {
            config.replace(settings.mediator.default_config());
            None
        };

        let facilities = FacilitiesClient::new(&settings.api.facilities)?;
        let state = Arc::new(AppState::new(settings.mediator.urn.clone(), facilities));
        let router = create_router(state);

        let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;

        Ok(Self {
            listener,
            router,
            config,
            heartbeat: hub.filter(|_| settings.api.heartbeat),
            urn: settings.mediator.urn,
            heartbeat_interval: settings.api.heartbeat_interval(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the stored mediator config
    pub fn config(&self) -> ConfigStore {
        self.config.clone()
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let BoundMediator {
            listener,
            router,
            config,
            heartbeat,
            urn,
            heartbeat_interval,
        } = self;

        let addr = listener.local_addr()?;
        tracing::info!("Listening on {}...", addr.port());

        let updater = heartbeat.map(|client| {
            let mut heartbeat = Heartbeat::activate(client, urn, heartbeat_interval);
            tokio::spawn(async move {
                while let Some(update) = heartbeat.recv().await {
                    tracing::info!(config = %update, "Received updated config");
                    config.replace(update);
                }
            })
        });

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(task) = updater {
            task.abort();
        }

        tracing::info!("Mediator stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_store_replaces_wholesale() {
        let store = ConfigStore::new(json!({ "a": 1, "b": 2 }));
        let shared = store.clone();

        shared.replace(json!({ "c": 3 }));

        assert_eq!(store.snapshot(), json!({ "c": 3 }));
    }

    #[test]
    fn test_config_store_default_is_null() {
        assert_eq!(ConfigStore::default().snapshot(), Value::Null);
    }
}
