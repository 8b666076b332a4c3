// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Each connection is served in its own task; requests on one connection are
//! answered in order.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use tk_core::protocol::{ClientMessage, ServerMessage};

use crate::state::ServerState;

/// Error sent when a sync request carries an unknown token.
pub const UNAUTHENTICATED: &str = "unauthenticated";

/// Run the WebSocket server on the given address.
pub async fn run(
    addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);
    serve(listener, state).await
}

/// Accept connections from `listener` forever.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_client_message(&text, &state).await;
                let json = response.to_json()?;
                ws_sink.send(Message::Text(json.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {
                // Ignore other message types (Binary, Pong, Frame)
            }
            Err(e) => {
                warn!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Process a client message and return the response.
pub(crate) async fn handle_client_message(text: &str, state: &ServerState) -> ServerMessage {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Malformed message: {}", e);
            return ServerMessage::error(None, format!("malformed message: {}", e));
        }
    };

    match msg {
        ClientMessage::SyncOfflineRecords {
            request_id,
            auth_token,
            payload,
        } => {
            let Some(user_id) = state.authenticate(&auth_token) else {
                warn!(request_id, "sync request with unknown token");
                return ServerMessage::error(Some(request_id), UNAUTHENTICATED);
            };
            debug!(
                request_id,
                user_id,
                records = payload.offline_records.len(),
                "sync request"
            );
            match state.process(user_id, &payload).await {
                Ok(response) => ServerMessage::sync_result(request_id, response),
                Err(e) => {
                    error!(request_id, error = %e, "failed to store sync batch");
                    ServerMessage::error(Some(request_id), format!("storage error: {}", e))
                }
            }
        }

        ClientMessage::Ping { id } => {
            debug!("Ping received: {}", id);
            ServerMessage::pong(id)
        }
    }
}
