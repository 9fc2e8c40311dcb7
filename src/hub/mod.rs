//! Connection registry and broadcast coordination.
//!
//! - [`Hub`] / [`HubLoop`]: the single-writer coordination loop
//! - [`HubClient`]: the narrow capability the hub holds for each connection
//! - [`OutboundQueue`]: the bounded, close-on-full queue connections own

mod client;
mod coordinator;

pub use client::{ClientId, Delivery, HubClient, OutboundQueue};
pub use coordinator::{Hub, HubLoop};
