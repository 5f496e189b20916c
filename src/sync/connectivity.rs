// src/sync/connectivity.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::remote::client::RemoteStore;

/// Probes the remote store on a fixed cadence and publishes the result on a
/// watch channel. Receivers only wake on actual transitions, so the sync
/// engine can react to the offline-to-online edge without polling.
pub struct ConnectivityMonitor {
    remote: Arc<dyn RemoteStore>,
    probe_interval: Duration,
    online_tx: watch::Sender<bool>,
    shutdown: Notify,
}

impl ConnectivityMonitor {
    pub fn new(remote: Arc<dyn RemoteStore>, probe_interval: Duration) -> Self {
        // Pessimistic until the first probe lands.
        let (online_tx, _) = watch::channel(false);
        Self {
            remote,
            probe_interval,
            online_tx,
            shutdown: Notify::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.online_tx.borrow()
    }

    /// Runs one probe and updates the channel. Public so callers can force a
    /// check outside the regular cadence.
    pub async fn refresh(&self) -> bool {
        let online = match self.remote.health_check().await {
            Ok(()) => true,
            Err(error) => {
                warn!("Connectivity probe failed: {}", error);
                false
            }
        };

        self.online_tx.send_if_modified(|current| {
            if *current != online {
                if online {
                    info!("Remote store reachable again");
                } else {
                    info!("Remote store unreachable, switching to offline mode");
                }
                *current = online;
                true
            } else {
                false
            }
        });

        online
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        loop {
            self.refresh().await;
            tokio::select! {
                _ = tokio::time::sleep(self.probe_interval) => {}
                _ = self.shutdown.notified() => break,
            }
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}
