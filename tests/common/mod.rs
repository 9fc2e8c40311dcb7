//! Test helpers for end-to-end tests.
//!
//! Provides a real server bound to an ephemeral port and a WebSocket chat
//! client that understands newline-batched frames.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chathub::web::ws::SessionDrain;
use chathub::{Config, Hub, Message, WebServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server and the hub behind it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: Hub,
    pub hub_task: JoinHandle<()>,
    pub sessions: Option<SessionDrain>,
}

/// Configuration bound to localhost on an ephemeral port.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.web.serve_static = false;
    config
}

/// Start a server with the default test configuration.
pub async fn start_server() -> TestServer {
    start_server_with(test_config()).await
}

/// Start a server with the given configuration.
pub async fn start_server_with(config: Config) -> TestServer {
    let (hub, hub_task) = Hub::spawn(&config.hub);
    let mut server = WebServer::new(&config, hub.clone()).expect("Failed to create server");
    let sessions = server.take_session_drain();
    let addr = server
        .run_with_addr()
        .await
        .expect("Failed to start server");

    TestServer {
        addr,
        hub,
        hub_task,
        sessions,
    }
}

impl TestServer {
    /// Wait until the hub holds exactly `expected` connections.
    pub async fn wait_for_connections(&self, expected: usize) {
        let result = timeout(DEFAULT_TIMEOUT, async {
            loop {
                self.hub.flush().await.expect("hub stopped");
                if self.hub.connection_count().await == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        if result.is_err() {
            panic!(
                "Timed out waiting for {} connections, have {}",
                expected,
                self.hub.connection_count().await
            );
        }
    }

    /// Connect a chat client and wait for it to be registered.
    pub async fn join(&self, username: &str, expected_total: usize) -> ChatClient {
        let client = ChatClient::connect(self.addr, Some(username)).await;
        self.wait_for_connections(expected_total).await;
        client
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket chat client.
pub struct ChatClient {
    ws: WsStream,
    pending: VecDeque<Message>,
}

impl ChatClient {
    /// Connect to `/ws`, optionally with a username.
    pub async fn connect(addr: SocketAddr, username: Option<&str>) -> Self {
        let url = match username {
            Some(name) => format!("ws://{}/ws?username={}", addr, name),
            None => format!("ws://{}/ws", addr),
        };
        let (ws, _) = connect_async(url).await.expect("WebSocket connect failed");
        Self {
            ws,
            pending: VecDeque::new(),
        }
    }

    /// Send a chat frame.
    pub async fn send_chat(&mut self, content: &str) {
        let frame = serde_json::json!({ "content": content }).to_string();
        self.send_raw(&frame).await;
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(WsMessage::Text(text.to_string()))
            .await
            .expect("WebSocket send failed");
    }

    /// Receive the next message, splitting batched frames.
    ///
    /// Returns `None` if the connection closed first.
    pub async fn try_recv(&mut self) -> Option<Message> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(message);
            }

            let frame = timeout(DEFAULT_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for a frame");
            match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    for line in text.split('\n') {
                        let message = Message::from_json(line).expect("Invalid message JSON");
                        self.pending.push_back(message);
                    }
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => return None,
                Some(Ok(_)) => {}
            }
        }
    }

    /// Receive the next message, panicking if the connection closed.
    pub async fn recv(&mut self) -> Message {
        self.try_recv().await.expect("Connection closed")
    }

    /// True if nothing arrives within `wait`.
    pub async fn is_silent(&mut self, wait: Duration) -> bool {
        if !self.pending.is_empty() {
            return false;
        }
        loop {
            match timeout(wait, self.ws.next()).await {
                Err(_) => return true,
                Ok(Some(Ok(WsMessage::Text(_)))) => return false,
                Ok(Some(Ok(WsMessage::Ping(_)))) | Ok(Some(Ok(WsMessage::Pong(_)))) => {}
                Ok(_) => return true,
            }
        }
    }

    /// Read until the server closes the connection, discarding messages.
    pub async fn wait_closed(&mut self) {
        while self.try_recv().await.is_some() {}
    }

    /// Close the connection from the client side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
