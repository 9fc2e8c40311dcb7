//! Chat module for chathub.
//!
//! Defines the events exchanged with peers: chat messages, join and leave
//! announcements, and server errors.

mod message;

pub use message::{InboundFrame, Message, MessageKind, SYSTEM_USERNAME};
