//! WebSocket module for real-time chat.
//!
//! - [`handler`]: upgrades `/ws` requests
//! - [`connection`]: the per-connection inbound and outbound pumps
//! - [`sessions`]: lets shutdown wait for open sockets to flush

pub mod connection;
pub mod handler;
pub mod sessions;

pub use connection::{Connection, ReadEnd, WriteEnd};
pub use handler::{chat_ws_handler, WsQuery};
pub use sessions::{SessionDrain, SessionPermit, SessionTracker};
