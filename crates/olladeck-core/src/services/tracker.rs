//! Connection state tracker.
//!
//! Holds the one [`ConnectionStatus`] record for the configured endpoint.
//! The record lives in a `watch` channel so readers always see a complete
//! value; refreshes are serialized so an older probe never overwrites a newer
//! one.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::domain::ConnectionStatus;
use crate::error::OpResult;
use crate::services::probe::TransportProbe;
use crate::utils::endpoint::validate_endpoint;

pub struct ConnectionTracker {
    probe: Arc<TransportProbe>,
    status: watch::Sender<ConnectionStatus>,
    refresh_lock: Mutex<()>,
}

impl ConnectionTracker {
    /// Create a tracker for an already validated endpoint.
    ///
    /// The initial status is disconnected until [`Self::refresh`] runs.
    pub fn new(probe: Arc<TransportProbe>, endpoint: impl Into<String>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::unchecked(endpoint));
        Self {
            probe,
            status,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the current record.
    pub fn current(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn endpoint(&self) -> String {
        self.status.borrow().endpoint.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// Receive every replacement of the record.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Re-probe the configured endpoint and replace the record.
    pub async fn refresh(&self) -> ConnectionStatus {
        let _guard = self.refresh_lock.lock().await;
        let endpoint = self.endpoint();
        let status = self.probe.diagnose(&endpoint).await;
        self.publish(status.clone());
        status
    }

    /// Switch to a new endpoint and probe it immediately.
    ///
    /// Invalid URIs are rejected before any probe and leave the configured
    /// endpoint untouched.
    pub async fn set_endpoint(&self, uri: &str) -> OpResult<ConnectionStatus> {
        let endpoint = validate_endpoint(uri)?;
        let _guard = self.refresh_lock.lock().await;
        let status = self.probe.diagnose(&endpoint).await;
        info!(endpoint, connected = status.is_connected(), "Endpoint updated");
        self.publish(status.clone());
        Ok(status)
    }

    /// Probe a candidate endpoint without adopting it.
    pub async fn check_endpoint(&self, uri: &str) -> OpResult<ConnectionStatus> {
        let endpoint = validate_endpoint(uri)?;
        Ok(self.probe.diagnose(&endpoint).await)
    }

    fn publish(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        let current = self.status.borrow();
        if previous.state != current.state || previous.endpoint != current.endpoint {
            info!(
                endpoint = %current.endpoint,
                state = ?current.state,
                message = current.message.as_deref().unwrap_or_default(),
                "Connection status changed"
            );
        }
    }
}
