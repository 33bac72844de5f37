//! Transport adapters
//!
//! Carriers that move request envelopes to the router and responses back:
//! the page window surface with its content relay, short-lived runtime
//! messages, and long-lived named ports. The router treats every carrier the
//! same way and keeps no per-transport state.

mod error;
mod port;
mod relay;
mod runtime;
mod window;
mod window_storage;
#[cfg(test)]
mod tests;

pub use error::{TransportError, WindowStorageError};
pub use port::{connect, Port, PortClient, PortEvent, PortListener, LOCAL_STORAGE_CHANNEL};
pub use relay::ContentRelay;
pub use runtime::{LocalRuntime, RuntimeChannel};
pub use window::PageWindow;
pub use window_storage::{ClearOutcome, WindowStorage};
