//! Periodic heartbeat
//!
//! Tells the hub the mediator is alive and picks up config changes made in
//! the hub console. Updates arrive on a channel; the task keeps beating
//! through failures until it is deactivated or the receiver goes away.

use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::HubClient;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

const UPDATE_QUEUE_SIZE: usize = 16;

/// Handle to a running heartbeat
///
/// Dropping the handle stops the heartbeat.
#[derive(Debug)]
pub struct Heartbeat {
    updates: mpsc::Receiver<Value>,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Start beating for `urn`, immediately and then every `interval`
    pub fn activate(client: HubClient, urn: impl Into<String>, interval: Duration) -> Self {
        let (sender, updates) = mpsc::channel(UPDATE_QUEUE_SIZE);
        let urn = urn.into();
        let interval = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(Self::run(client, urn, interval, sender));

        Self { updates, task }
    }

    /// Wait for the next config update from the hub
    pub async fn recv(&mut self) -> Option<Value> {
        self.updates.recv().await
    }

    /// Stop beating
    pub fn deactivate(self) {
        self.task.abort();
    }

    async fn run(client: HubClient, urn: String, interval: Duration, sender: mpsc::Sender<Value>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match client.send_heartbeat(&urn, false).await {
                Ok(Some(config)) => {
                    tracing::debug!(urn = %urn, "Heartbeat returned config update");
                    if sender.send(config).await.is_err() {
                        tracing::debug!(urn = %urn, "Heartbeat receiver dropped, stopping");
                        break;
                    }
                }
                Ok(None) => {
                    tracing::trace!(urn = %urn, "Heartbeat acknowledged");
                }
                Err(e) => {
                    tracing::warn!(urn = %urn, error = %e, "Heartbeat failed");
                }
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}
