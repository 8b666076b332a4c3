// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync client for the remote synchronization endpoint.
//!
//! Provides a request/response interface on top of a [`Transport`]:
//! - Connects on demand, with a connect timeout
//! - Pings a reused connection first and reconnects if it went stale
//! - Tags every batch with a request id and waits for the matching answer
//! - Drops the connection after any failure so the next call reconnects

use std::time::Duration;

use tk_core::protocol::{ClientMessage, ServerMessage, SyncRequest, SyncResponse};
use tokio::time::Instant;

use super::transport::{Transport, TransportError, WebSocketTransport};

/// Configuration for the sync client.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// URL of the remote endpoint.
    pub url: String,
    /// Max time to establish a connection.
    pub connect_timeout: Duration,
    /// Max time to wait for the answer to one request.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            url: "ws://localhost:7890".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Error type for sync client operations.
///
/// Every variant means the request as a whole did not produce per-record
/// outcomes; nothing about individual records may be inferred from it.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No answer within the request timeout.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The endpoint refused the request (for example, bad credentials).
    #[error("remote error: {0}")]
    Remote(String),

    /// The endpoint answered with a non-success status.
    #[error("remote reported status '{0}'")]
    Status(String),
}

/// Result type for sync client operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync client for remote operations.
pub struct SyncClient<T: Transport = WebSocketTransport> {
    /// Configuration.
    config: SyncConfig,
    /// Transport layer.
    transport: T,
    /// Id for the next request.
    next_request_id: u64,
    /// Id for the next liveness ping.
    next_ping_id: u64,
}

impl SyncClient<WebSocketTransport> {
    /// Create a new sync client with default WebSocket transport.
    pub fn new(config: SyncConfig) -> Self {
        let transport = WebSocketTransport::new(config.connect_timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> SyncClient<T> {
    /// Create a new sync client with custom transport (for testing).
    pub fn with_transport(config: SyncConfig, transport: T) -> Self {
        SyncClient {
            config,
            transport,
            next_request_id: 1,
            next_ping_id: 1,
        }
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Get the transport (for tests and diagnostics).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Disconnect from the remote endpoint.
    pub async fn disconnect(&mut self) -> SyncResult<()> {
        self.transport.disconnect().await?;
        Ok(())
    }

    /// Submit a batch and wait for the endpoint's per-record answer.
    ///
    /// Returns `Ok` only for a structurally complete `success` response.
    pub async fn submit(
        &mut self,
        auth_token: &str,
        request: SyncRequest,
    ) -> SyncResult<SyncResponse> {
        let result = self.exchange(auth_token, request).await;
        if result.is_err() {
            // The connection state is unknown after a failure; start fresh.
            let _ = self.transport.disconnect().await;
        }
        result
    }

    /// Reuses a live connection or opens a new one.
    async fn ensure_connected(&mut self) -> SyncResult<()> {
        if self.transport.is_connected() {
            match self.ping().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(error = %e, "idle connection is stale, reconnecting");
                    let _ = self.transport.disconnect().await;
                }
            }
        }
        tracing::debug!(url = %self.config.url, "connecting to sync endpoint");
        self.transport.connect(&self.config.url).await?;
        Ok(())
    }

    /// Round-trips a ping within the connect timeout.
    async fn ping(&mut self) -> SyncResult<()> {
        let id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1);
        self.transport.send(ClientMessage::ping(id)).await?;

        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            let msg = tokio::time::timeout_at(deadline, self.transport.recv())
                .await
                .map_err(|_| SyncError::Timeout(self.config.connect_timeout))??;
            match msg {
                Some(ServerMessage::Pong { id: pong }) if pong == id => return Ok(()),
                Some(other) => tracing::debug!(?other, "ignoring message while waiting for pong"),
                None => return Err(TransportError::ConnectionClosed.into()),
            }
        }
    }

    async fn exchange(&mut self, auth_token: &str, request: SyncRequest) -> SyncResult<SyncResponse> {
        self.ensure_connected().await?;

        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);

        let batch_size = request.offline_records.len();
        self.transport
            .send(ClientMessage::sync(request_id, auth_token, request))
            .await?;
        tracing::debug!(request_id, batch_size, "sync request sent");

        let deadline = Instant::now() + self.config.request_timeout;
        loop {
            let msg = tokio::time::timeout_at(deadline, self.transport.recv())
                .await
                .map_err(|_| SyncError::Timeout(self.config.request_timeout))??;

            match msg {
                Some(ServerMessage::SyncResult {
                    request_id: id,
                    response,
                }) if id == request_id => {
                    if !response.is_success() {
                        return Err(SyncError::Status(response.status));
                    }
                    return Ok(response);
                }
                Some(ServerMessage::Error {
                    request_id: id,
                    message,
                }) if id.is_none() || id == Some(request_id) => {
                    return Err(SyncError::Remote(message));
                }
                Some(other) => {
                    tracing::debug!(?other, "ignoring unrelated message");
                }
                None => return Err(TransportError::ConnectionClosed.into()),
            }
        }
    }
}
