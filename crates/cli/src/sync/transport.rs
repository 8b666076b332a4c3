// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response channel to the sync endpoint.
//!
//! The orchestrator only sees the [`Transport`] trait; tests swap in a
//! scripted transport instead of a socket.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tk_core::protocol::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Why a request could not reach the endpoint or get an answer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt did not finish in time.
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// A message channel to the sync endpoint.
pub trait Transport: Send + Sync {
    /// Open a connection to `url`.
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()>;

    /// Close the connection, if any.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send one client message.
    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()>;

    /// Next server message, or `None` once the peer has closed.
    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Transport`] over a tokio-tungstenite socket.
pub struct WebSocketTransport {
    sink: Option<SplitSink<WsStream, Message>>,
    stream: Option<SplitStream<WsStream>>,
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Unconnected transport that gives up connecting after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        WebSocketTransport {
            sink: None,
            stream: None,
            connect_timeout,
        }
    }

    fn drop_connection(&mut self) {
        self.sink = None;
        self.stream = None;
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> TransportFuture<'_, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let connect = tokio_tungstenite::connect_async(url.as_str());
            let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect)
                .await
                .map_err(|_| TransportError::ConnectTimeout(self.connect_timeout))?
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.sink = Some(sink);
            self.stream = Some(stream);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut sink) = self.sink.take() {
                // Best effort; the peer may already be gone.
                let _ = sink.close().await;
            }
            self.stream = None;
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let sink = self.sink.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // `send` flushes, so a dead peer shows up here rather than later.
            if let Err(e) = sink.send(Message::Text(json.into())).await {
                self.drop_connection();
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<ServerMessage>> {
        Box::pin(async move {
            let stream = self.stream.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return ServerMessage::from_json(&text)
                            .map(Some)
                            .map_err(|e| TransportError::SerializationError(e.to_string()));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.drop_connection();
                        return Ok(None);
                    }
                    // Ping/pong and binary frames carry nothing for us
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        self.drop_connection();
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.sink.is_some() && self.stream.is_some()
    }
}
