//! Per-connection read and write pumps.
//!
//! Each accepted WebSocket becomes a [`Connection`] registered with the hub.
//! Two pumps run for it:
//!
//! - the inbound pump reads frames, turns well-formed ones into chat
//!   broadcasts and enforces the frame size limit and the idle deadline;
//! - the outbound pump drains the connection's [`OutboundQueue`] into
//!   batched text frames and pings the peer periodically.
//!
//! Whichever pump stops first ends the connection. Unregistration always
//! happens on the inbound side, after its loop exits.

use std::fmt::Display;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::chat::{InboundFrame, Message};
use crate::config::ConnectionSettings;
use crate::hub::{ClientId, Delivery, Hub, HubClient, OutboundQueue};
use crate::ChatHubError;

/// Content of the private error sent back for undecodable frames.
const INVALID_FRAME_NOTICE: &str = "invalid message format";

/// A peer's live session as seen by the hub.
pub struct Connection {
    id: ClientId,
    identity: String,
    queue: OutboundQueue,
}

impl Connection {
    /// Create a connection and the receiver its outbound pump drains.
    pub fn new(
        identity: impl Into<String>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (queue, receiver) = OutboundQueue::new(queue_capacity);
        let connection = Arc::new(Self {
            id: ClientId::new(),
            identity: identity.into(),
            queue,
        });
        (connection, receiver)
    }

    /// Stop accepting messages; the outbound pump flushes what is queued and
    /// sends a close frame.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl HubClient for Connection {
    fn id(&self) -> ClientId {
        self.id
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn deliver(&self, message: Message) {
        if self.queue.push(message) == Delivery::Overflowed {
            warn!(
                "Outbound queue full for {} ({}), disconnecting slow client",
                self.identity, self.id
            );
        }
    }

    fn close(&self) {
        Connection::close(self);
    }
}

/// Why the inbound pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEnd {
    /// The peer sent a close frame or the stream ended.
    PeerClosed,
    /// No pong arrived before the read deadline.
    IdleTimeout,
    /// A frame exceeded the size limit.
    Oversized,
    /// The transport reported an error.
    TransportError,
    /// The hub stopped accepting broadcasts.
    HubClosed,
}

/// Why the outbound pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEnd {
    /// The queue was closed; a close frame was sent.
    QueueClosed,
    /// A write failed.
    TransportError,
    /// A write did not complete within the write deadline.
    WriteTimeout,
}

/// Keeps a connection registered until released.
///
/// Dropping it without calling [`Registration::release`] (task cancelled or
/// panicked) still submits the unregistration.
struct Registration {
    hub: Hub,
    client: Option<Arc<dyn HubClient>>,
}

impl Registration {
    async fn acquire(hub: &Hub, client: Arc<dyn HubClient>) -> crate::Result<Self> {
        hub.register(Arc::clone(&client)).await?;
        Ok(Self {
            hub: hub.clone(),
            client: Some(client),
        })
    }

    async fn release(mut self) {
        if let Some(client) = self.client.take() {
            match self.hub.unregister(client).await {
                Ok(()) => {}
                // The hub already released every connection.
                Err(ChatHubError::HubClosed) => debug!("Hub stopped before unregistration"),
                Err(e) => error!("Failed to unregister client: {}", e),
            }
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let hub = self.hub.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let _ = hub.unregister(client).await;
            });
        }
    }
}

/// Serve an upgraded WebSocket until it disconnects.
pub async fn serve(socket: WebSocket, identity: String, hub: Hub, settings: ConnectionSettings) {
    let (sink, stream) = socket.split();
    run(stream, sink, identity, hub, settings).await;
}

/// Register a connection over `stream`/`sink` and pump until it ends.
pub async fn run<S, E, K>(
    stream: S,
    sink: K,
    identity: String,
    hub: Hub,
    settings: ConnectionSettings,
) where
    S: Stream<Item = Result<WsMessage, E>> + Unpin + Send,
    E: Display + Send,
    K: Sink<WsMessage> + Unpin + Send + 'static,
    K::Error: Display + Send,
{
    let (connection, receiver) = Connection::new(identity, settings.send_queue_capacity);
    let client: Arc<dyn HubClient> = connection.clone();

    let registration = match Registration::acquire(&hub, client).await {
        Ok(registration) => registration,
        Err(e) => {
            error!("Failed to register {}: {}", connection.identity, e);
            return;
        }
    };
    debug!("Connection opened: {} ({})", connection.identity, connection.id);

    let mut writer = tokio::spawn(write_pump(sink, receiver, settings.clone()));

    let writer_finished = tokio::select! {
        end = read_pump(stream, &connection, &hub, &settings) => {
            debug!("Inbound pump for {} stopped: {:?}", connection.identity, end);
            false
        }
        end = &mut writer => {
            debug!("Outbound pump for {} stopped: {:?}", connection.identity, end.ok());
            true
        }
    };

    registration.release().await;

    if !writer_finished {
        connection.close();
        if tokio::time::timeout(settings.write_wait, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }
    }
    debug!("Connection closed: {} ({})", connection.identity, connection.id);
}

/// Read frames until the peer goes away, misbehaves or falls silent.
pub async fn read_pump<S, E>(
    mut stream: S,
    connection: &Connection,
    hub: &Hub,
    settings: &ConnectionSettings,
) -> ReadEnd
where
    S: Stream<Item = Result<WsMessage, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + settings.pong_wait;

    loop {
        let frame = match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => return ReadEnd::IdleTimeout,
            Ok(None) => return ReadEnd::PeerClosed,
            Ok(Some(Err(e))) => {
                debug!("WebSocket read from {} failed: {}", connection.identity, e);
                return ReadEnd::TransportError;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let handled = match frame {
            WsMessage::Text(text) => handle_payload(text.as_bytes(), connection, hub, settings).await,
            WsMessage::Binary(data) => handle_payload(&data, connection, hub, settings).await,
            WsMessage::Pong(_) => {
                deadline = Instant::now() + settings.pong_wait;
                Ok(())
            }
            // Pings are answered by the transport.
            WsMessage::Ping(_) => Ok(()),
            WsMessage::Close(_) => Err(ReadEnd::PeerClosed),
        };

        if let Err(end) = handled {
            return end;
        }
    }
}

async fn handle_payload(
    payload: &[u8],
    connection: &Connection,
    hub: &Hub,
    settings: &ConnectionSettings,
) -> Result<(), ReadEnd> {
    if payload.len() > settings.max_message_size {
        debug!(
            "Frame from {} exceeds size limit ({} > {})",
            connection.identity,
            payload.len(),
            settings.max_message_size
        );
        return Err(ReadEnd::Oversized);
    }

    let frame = match InboundFrame::parse(payload) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Discarding malformed frame from {}: {}", connection.identity, e);
            connection.deliver(Message::error(INVALID_FRAME_NOTICE));
            return Ok(());
        }
    };

    if frame.content.trim().is_empty() {
        return Ok(());
    }

    hub.broadcast(Message::chat(&connection.identity, frame.content))
        .await
        .map_err(|e| {
            error!("Broadcast from {} rejected: {}", connection.identity, e);
            ReadEnd::HubClosed
        })
}

/// Drain the queue to the peer and keep it alive with pings.
pub async fn write_pump<K>(
    mut sink: K,
    mut queue: mpsc::Receiver<Message>,
    settings: ConnectionSettings,
) -> WriteEnd
where
    K: Sink<WsMessage> + Unpin,
    K::Error: Display,
{
    let mut ticker = tokio::time::interval_at(
        Instant::now() + settings.ping_period,
        settings.ping_period,
    );

    loop {
        tokio::select! {
            next = queue.recv() => {
                let Some(first) = next else {
                    // Best effort: the peer may already be gone.
                    let _ = send_frame(&mut sink, WsMessage::Close(None), &settings).await;
                    return WriteEnd::QueueClosed;
                };
                let Some(batch) = encode_batch(first, &mut queue) else {
                    continue;
                };
                if let Err(end) = send_frame(&mut sink, WsMessage::Text(batch), &settings).await {
                    return end;
                }
            }
            _ = ticker.tick() => {
                if let Err(end) = send_frame(&mut sink, WsMessage::Ping(Vec::new()), &settings).await {
                    return end;
                }
            }
        }
    }
}

/// Encode `first` plus everything queued right now as newline-separated JSON.
///
/// Messages that fail to encode are dropped. Returns `None` if nothing could
/// be encoded.
fn encode_batch(first: Message, queue: &mut mpsc::Receiver<Message>) -> Option<String> {
    let mut batch = String::new();
    append_encoded(&mut batch, &first);

    for _ in 0..queue.len() {
        match queue.try_recv() {
            Ok(message) => append_encoded(&mut batch, &message),
            Err(_) => break,
        }
    }

    (!batch.is_empty()).then_some(batch)
}

fn append_encoded(batch: &mut String, message: &Message) {
    match message.to_json() {
        Ok(json) => {
            if !batch.is_empty() {
                batch.push('\n');
            }
            batch.push_str(&json);
        }
        Err(e) => warn!("Dropping unencodable {} message: {}", message.kind(), e),
    }
}

async fn send_frame<K>(
    sink: &mut K,
    frame: WsMessage,
    settings: &ConnectionSettings,
) -> Result<(), WriteEnd>
where
    K: Sink<WsMessage> + Unpin,
    K::Error: Display,
{
    match tokio::time::timeout(settings.write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            debug!("WebSocket write failed: {}", e);
            Err(WriteEnd::TransportError)
        }
        Err(_) => Err(WriteEnd::WriteTimeout),
    }
}
