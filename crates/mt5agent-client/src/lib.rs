//! MetaTrader 5 client seam and connection lifecycle.
//!
//! The platform itself is an external collaborator: this crate only defines
//! the [`Mt5Api`] contract the skills call through, a thin bridge client
//! that forwards each call to the terminal over length-prefixed JSON
//! frames, and the [`ConnectionManager`] guarding the single active
//! session.
//!
//! # Main types
//!
//! - [`Mt5Config`] — Connection credentials and timeout.
//! - [`Mt5Api`] — The operation contract of the external client.
//! - [`Mt5Connector`] — Factory seam opening a client from a config.
//! - [`BridgeConnector`] / [`BridgeClient`] — Default terminal transport.
//! - [`ConnectionManager`] — Guarded configure/connect/disconnect state.
//! - [`mock`] — Scriptable in-memory client for tests and offline runs.

/// The external client contract and its factory seam.
pub mod api;
/// Terminal bridge transport: framing, request envelope, client.
pub mod bridge;
/// Connection configuration.
pub mod config;
/// Guarded connection lifecycle.
pub mod manager;
/// In-memory client for tests and offline development.
pub mod mock;

pub use api::{Mt5Api, Mt5Connector};
pub use bridge::{BridgeClient, BridgeConnector};
pub use config::Mt5Config;
pub use manager::ConnectionManager;
pub use mock::{MockConnector, MockMt5};
