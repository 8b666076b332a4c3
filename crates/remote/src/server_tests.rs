// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test server utilities and end-to-end protocol tests.
//!
//! Provides a TestServer that runs on a random port, driven by a real
//! WebSocket client.

#![cfg(test)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::{Duration, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tk_core::protocol::{ClientMessage, ServerMessage, SyncRequest, WireRecord};
use tk_core::ClockAction;

use crate::ledger::Ledger;
use crate::server::{self, UNAUTHENTICATED};
use crate::state::ServerState;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A test server that runs on a random port and can be controlled.
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    /// Start a new test server on a random available port.
    pub async fn start() -> Self {
        let tokens = HashMap::from([
            ("t0k".to_string(), "emp-7".to_string()),
            ("other".to_string(), "emp-8".to_string()),
        ]);
        let state =
            ServerState::with_ledger(Ledger::open_in_memory().unwrap(), tokens, Duration::seconds(300));

        // Bind to port 0 to get a random available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                result = server::serve(listener, state) => {
                    if let Err(e) = result {
                        eprintln!("Test server error: {}", e);
                    }
                }
                _ = shutdown_rx => {}
            }
        });

        TestServer { addr, shutdown_tx }
    }

    /// Get the WebSocket URL for connecting to this server.
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the test server.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

struct Client {
    sink: SplitSink<Ws, Message>,
    stream: SplitStream<Ws>,
}

impl Client {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(&server.ws_url()).await.unwrap();
        let (sink, stream) = ws.split();
        Client { sink, stream }
    }

    async fn send_text(&mut self, text: String) {
        self.sink.send(Message::Text(text.into())).await.unwrap();
    }

    async fn request(&mut self, msg: ClientMessage) -> ServerMessage {
        self.send_text(msg.to_json().unwrap()).await;
        self.recv().await
    }

    async fn recv(&mut self) -> ServerMessage {
        let next = tokio::time::timeout(std::time::Duration::from_secs(5), self.stream.next())
            .await
            .expect("timeout waiting for server message");
        match next {
            Some(Ok(Message::Text(text))) => ServerMessage::from_json(&text).unwrap(),
            other => unreachable!("unexpected frame: {:?}", other),
        }
    }
}

fn wire(offline_id: &str, store_id: &str) -> WireRecord {
    WireRecord {
        timestamp: Utc::now() - Duration::minutes(5),
        store_id: store_id.to_string(),
        action: ClockAction::ClockIn,
        location: None,
        device_info: Some(serde_json::json!({"platform": "linux"})),
        offline_id: offline_id.to_string(),
    }
}

fn sync(request_id: u64, token: &str, records: Vec<WireRecord>) -> ClientMessage {
    ClientMessage::sync(
        request_id,
        token,
        SyncRequest {
            offline_records: records,
        },
    )
}

#[tokio::test]
async fn ping_pong() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    let response = client.request(ClientMessage::ping(42)).await;
    assert_eq!(response, ServerMessage::pong(42));

    server.shutdown();
}

#[tokio::test]
async fn accepts_batch() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    let response = client
        .request(sync(7, "t0k", vec![wire("a", "s1"), wire("b", "s1")]))
        .await;
    let ServerMessage::SyncResult {
        request_id,
        response,
    } = response
    else {
        unreachable!("expected sync_result, got {:?}", response);
    };
    assert_eq!(request_id, 7);
    assert!(response.is_success());
    assert_eq!(response.processed, 2);
    assert_eq!(response.errors, 0);
    let ids: Vec<&str> = response
        .details
        .processed_records
        .iter()
        .map(|p| p.processed.as_str())
        .collect();
    assert_eq!(ids, vec!["clk-000001", "clk-000002"]);

    server.shutdown();
}

#[tokio::test]
async fn rejects_per_record() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    let response = client
        .request(sync(1, "t0k", vec![wire("a", "s1"), wire("b", " ")]))
        .await;
    let ServerMessage::SyncResult { response, .. } = response else {
        unreachable!("expected sync_result, got {:?}", response);
    };
    assert_eq!(response.processed, 1);
    assert_eq!(response.errors, 1);
    assert_eq!(response.details.error_records[0].original.offline_id, "b");
    assert_eq!(response.details.error_records[0].error, "storeId is required");

    server.shutdown();
}

#[tokio::test]
async fn resubmission_is_idempotent_across_connections() {
    let server = TestServer::start().await;

    let mut first = Client::connect(&server).await;
    let before = first.request(sync(1, "t0k", vec![wire("a", "s1")])).await;
    drop(first);

    let mut second = Client::connect(&server).await;
    let after = second.request(sync(1, "t0k", vec![wire("a", "s1")])).await;

    let (
        ServerMessage::SyncResult { response: before, .. },
        ServerMessage::SyncResult { response: after, .. },
    ) = (before, after)
    else {
        unreachable!("expected two sync results");
    };
    assert_eq!(
        before.details.processed_records,
        after.details.processed_records
    );

    server.shutdown();
}

#[tokio::test]
async fn users_do_not_share_offline_ids() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    let first = client.request(sync(1, "t0k", vec![wire("a", "s1")])).await;
    let second = client.request(sync(2, "other", vec![wire("a", "s1")])).await;

    let (
        ServerMessage::SyncResult { response: first, .. },
        ServerMessage::SyncResult { response: second, .. },
    ) = (first, second)
    else {
        unreachable!("expected two sync results");
    };
    assert_eq!(first.details.processed_records[0].processed, "clk-000001");
    assert_eq!(second.details.processed_records[0].processed, "clk-000002");

    server.shutdown();
}

#[tokio::test]
async fn unknown_token_is_unauthenticated() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    let response = client.request(sync(9, "wrong", vec![wire("a", "s1")])).await;
    assert_eq!(response, ServerMessage::error(Some(9), UNAUTHENTICATED));

    server.shutdown();
}

#[tokio::test]
async fn malformed_message_gets_error() {
    let server = TestServer::start().await;
    let mut client = Client::connect(&server).await;

    client.send_text("{\"type\":\"bogus\"}".to_string()).await;
    let response = client.recv().await;
    assert!(matches!(
        response,
        ServerMessage::Error {
            request_id: None,
            ..
        }
    ));

    // The connection stays usable.
    assert_eq!(
        client.request(ClientMessage::ping(1)).await,
        ServerMessage::pong(1)
    );

    server.shutdown();
}
