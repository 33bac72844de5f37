//! Storage Bridge Server Module
//!
//! Provides a WebSocket server so external processes (native messaging hosts,
//! test harnesses, pages talking to a local companion) can open ports to the
//! storage bridge. Every wired connection also counts as a tab for the
//! `unlocked` broadcast.

mod error;
mod host;
mod protocol;
mod registry;
mod server;

pub use error::BridgeError;
pub use host::BridgeHost;
pub use protocol::ProtocolMessage;
pub use registry::ClientRegistry;
pub use server::{BridgeServer, DEFAULT_BRIDGE_PORT};
