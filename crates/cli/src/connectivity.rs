// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitoring.
//!
//! A background task probes the network at a fixed interval and turns the
//! level readings into transitions. Each transition updates the shared state
//! and emits a status event; a transition to online also queues one sync
//! trigger. A reachable probe only means the device has a route to the
//! endpoint host, not that the endpoint will answer.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::events::{EventBus, StatusEvent};
use crate::sync::Trigger;

/// Connectivity state values for the atomic state field.
pub const STATE_UNKNOWN: u8 = 0;
pub const STATE_ONLINE: u8 = 1;
pub const STATE_OFFLINE: u8 = 2;

/// Connectivity visible to the monitor, the orchestrator and status reporting.
///
/// Uses an atomic field for lock-free reads.
#[derive(Debug)]
pub struct SharedConnectivity {
    state: AtomicU8,
}

impl SharedConnectivity {
    /// Create a new shared state that has not observed anything yet.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_UNKNOWN),
        }
    }

    pub fn get(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    pub fn set_online(&self, online: bool) {
        let state = if online { STATE_ONLINE } else { STATE_OFFLINE };
        self.state.store(state, Ordering::Release);
    }

    pub fn is_online(&self) -> bool {
        self.get() == STATE_ONLINE
    }

    /// True only after a probe has actually failed; unknown is not offline.
    pub fn is_offline(&self) -> bool {
        self.get() == STATE_OFFLINE
    }

    pub fn status_str(&self) -> &'static str {
        match self.get() {
            STATE_ONLINE => "online",
            STATE_OFFLINE => "offline",
            _ => "unknown",
        }
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can tell whether the network is usable right now.
pub trait ConnectivityProbe: Send + Sync {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Probe that opens (and immediately drops) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            target: target.into(),
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl ConnectivityProbe for TcpProbe {
    fn probe(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    tracing::debug!(target = %self.target, error = %e, "probe failed");
                    false
                }
                Err(_) => {
                    tracing::debug!(target = %self.target, "probe timed out");
                    false
                }
            }
        })
    }
}

/// Turns level observations into transitions.
///
/// The first observation always counts as a transition away from unknown.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last: Option<bool>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new level if it differs from the previous observation.
    pub fn observe(&mut self, online: bool) -> Option<bool> {
        if self.last == Some(online) {
            return None;
        }
        self.last = Some(online);
        Some(online)
    }
}

/// Background connectivity monitor.
pub struct ConnectivityMonitor {
    probe: Box<dyn ConnectivityProbe>,
    interval: Duration,
    state: Arc<SharedConnectivity>,
    events: EventBus,
    trigger_tx: mpsc::Sender<Trigger>,
    edges: EdgeDetector,
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Box<dyn ConnectivityProbe>,
        interval: Duration,
        state: Arc<SharedConnectivity>,
        events: EventBus,
        trigger_tx: mpsc::Sender<Trigger>,
    ) -> Self {
        ConnectivityMonitor {
            probe,
            interval,
            state,
            events,
            trigger_tx,
            edges: EdgeDetector::new(),
        }
    }

    /// Probes once and reacts to a transition. Returns the new level on a
    /// transition.
    pub async fn check(&mut self) -> Option<bool> {
        let online = self.probe.probe().await;
        let edge = self.edges.observe(online)?;

        self.state.set_online(edge);
        if edge {
            tracing::info!("network is online");
        } else {
            tracing::info!("network is offline");
        }
        self.events
            .emit(StatusEvent::ConnectivityChanged { online: edge });

        if edge {
            match self.trigger_tx.try_send(Trigger::Connectivity) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!("sync trigger already pending");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!("trigger receiver dropped");
                }
            }
        }
        Some(edge)
    }

    /// Runs until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = self.check() => {}
            }

            if self.trigger_tx.is_closed() {
                tracing::debug!("connectivity monitor stopping: no trigger receiver");
                return;
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
