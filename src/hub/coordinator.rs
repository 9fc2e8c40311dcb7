//! Hub coordination loop.
//!
//! All changes to the connection set go through one task, [`HubLoop`], which
//! takes tagged commands off a single channel. Because there is one channel
//! and one consumer, registrations, unregistrations and broadcasts are
//! totally ordered by arrival, and every command is fully processed
//! (including its fan-out) before the next one is taken.
//!
//! [`Hub`] is the cheap, cloneable handle used to submit commands. Status
//! queries read the set through a shared lock and never go through the loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chat::Message;
use crate::config::HubConfig;
use crate::{ChatHubError, Result};

use super::client::{ClientId, HubClient};

type ClientSet = HashMap<ClientId, Arc<dyn HubClient>>;

/// Content of the notice sent to every connection when the hub stops.
const SHUTDOWN_NOTICE: &str = "server is shutting down";

/// A request for the coordination loop.
enum HubCommand {
    Register(Arc<dyn HubClient>),
    Unregister(Arc<dyn HubClient>),
    Broadcast(Message),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the hub.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
    clients: Arc<RwLock<ClientSet>>,
}

impl Hub {
    /// Create a hub handle and the loop that serves it.
    ///
    /// Nothing is processed until [`HubLoop::run`] is polled.
    pub fn new(config: &HubConfig) -> (Self, HubLoop) {
        let (commands, receiver) = mpsc::channel(config.command_capacity.max(1));
        let clients = Arc::new(RwLock::new(HashMap::new()));

        let hub = Self {
            commands,
            clients: Arc::clone(&clients),
        };
        let hub_loop = HubLoop {
            commands: receiver,
            clients,
        };
        (hub, hub_loop)
    }

    /// Create a hub and spawn its loop on the current runtime.
    pub fn spawn(config: &HubConfig) -> (Self, JoinHandle<()>) {
        let (hub, hub_loop) = Self::new(config);
        let handle = tokio::spawn(hub_loop.run());
        (hub, handle)
    }

    async fn submit(&self, command: HubCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChatHubError::HubClosed)
    }

    /// Add a connection and announce it to everyone else.
    pub async fn register(&self, client: Arc<dyn HubClient>) -> Result<()> {
        self.submit(HubCommand::Register(client)).await
    }

    /// Remove a connection and announce its departure.
    ///
    /// Unregistering a connection that is not registered does nothing.
    pub async fn unregister(&self, client: Arc<dyn HubClient>) -> Result<()> {
        self.submit(HubCommand::Unregister(client)).await
    }

    /// Fan a message out to every registered connection.
    pub async fn broadcast(&self, message: Message) -> Result<()> {
        self.submit(HubCommand::Broadcast(message)).await
    }

    /// Wait until every command submitted before this call has been processed.
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.submit(HubCommand::Flush(done)).await?;
        wait.await.map_err(|_| ChatHubError::HubClosed)
    }

    /// Notify every connection, release them and stop the loop.
    ///
    /// Commands submitted afterwards fail with [`ChatHubError::HubClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.submit(HubCommand::Shutdown).await
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Identities of registered connections, sorted.
    pub async fn connected_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self
            .clients
            .read()
            .await
            .values()
            .map(|client| client.identity().to_string())
            .collect();
        identities.sort();
        identities
    }
}

/// The single writer of the connection set.
pub struct HubLoop {
    commands: mpsc::Receiver<HubCommand>,
    clients: Arc<RwLock<ClientSet>>,
}

impl HubLoop {
    /// Process commands until shutdown or until every [`Hub`] handle is gone.
    pub async fn run(mut self) {
        debug!("Hub loop started");

        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(client) => self.handle_register(client).await,
                HubCommand::Unregister(client) => self.handle_unregister(client).await,
                HubCommand::Broadcast(message) => {
                    let clients = self.clients.read().await;
                    fan_out(&clients, &message, None);
                }
                HubCommand::Flush(done) => {
                    let _ = done.send(());
                }
                HubCommand::Shutdown => {
                    self.handle_shutdown().await;
                    break;
                }
            }
        }

        debug!("Hub loop stopped");
    }

    async fn handle_register(&self, client: Arc<dyn HubClient>) {
        let id = client.id();
        let mut clients = self.clients.write().await;
        if clients.contains_key(&id) {
            debug!("Ignoring duplicate registration of {}", id);
            return;
        }

        let join = Message::join(client.identity());
        clients.insert(id, client);
        let total = clients.len();

        let clients = RwLockWriteGuard::downgrade(clients);
        fan_out(&clients, &join, Some(id));
        info!("{} joined ({} connected)", join.username(), total);
    }

    async fn handle_unregister(&self, client: Arc<dyn HubClient>) {
        let id = client.id();
        let mut clients = self.clients.write().await;
        if clients.remove(&id).is_none() {
            return;
        }
        let total = clients.len();

        let clients = RwLockWriteGuard::downgrade(clients);
        fan_out(&clients, &Message::leave(client.identity()), None);
        info!("{} left ({} connected)", client.identity(), total);
    }

    async fn handle_shutdown(&self) {
        let mut clients = self.clients.write().await;
        let notified = fan_out(&clients, &Message::error(SHUTDOWN_NOTICE), None);
        for (_, client) in clients.drain() {
            client.close();
        }
        info!("Hub shutting down, notified {} clients", notified);
    }
}

/// Deliver to every client except `skip`. Returns the number of recipients.
fn fan_out(clients: &ClientSet, message: &Message, skip: Option<ClientId>) -> usize {
    let mut delivered = 0;
    for (id, client) in clients {
        if Some(*id) == skip {
            continue;
        }
        client.deliver(message.clone());
        delivered += 1;
    }
    delivered
}
