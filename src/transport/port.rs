//! Long-lived named ports
//!
//! A caller opens a port once and sends any number of requests over it; each
//! is answered independently and possibly out of order. Only ports named
//! [`LOCAL_STORAGE_CHANNEL`] are wired to the router. Other names are
//! accepted and then ignored: nothing is answered and no error is reported.

use super::error::TransportError;
use crate::router::MessageRouter;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The only port name wired to the router
pub const LOCAL_STORAGE_CHANNEL: &str = "LocalStorageChannel";

/// What the extension side sends back over a port
#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent {
    /// A response envelope
    Message(JsonValue),
    /// A request could not be served; no response follows for it
    Failed {
        request_id: Option<String>,
        code: &'static str,
        message: String,
    },
}

/// Extension side of a port
pub struct Port {
    name: String,
    incoming: mpsc::UnboundedReceiver<JsonValue>,
    outgoing: mpsc::UnboundedSender<PortEvent>,
}

impl Port {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Caller side of a port
pub struct PortClient {
    name: String,
    outgoing: mpsc::UnboundedSender<JsonValue>,
    incoming: mpsc::UnboundedReceiver<PortEvent>,
}

impl PortClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn post_message(&self, message: JsonValue) -> Result<(), TransportError> {
        self.outgoing
            .send(message)
            .map_err(|_| TransportError::Disconnected(self.name.clone()))
    }

    /// Next event from the extension side; `None` once it has gone away
    pub async fn recv(&mut self) -> Option<PortEvent> {
        self.incoming.recv().await
    }

    /// Split into the request sender and the event receiver
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<JsonValue>,
        mpsc::UnboundedReceiver<PortEvent>,
    ) {
        (self.outgoing, self.incoming)
    }
}

/// Open a port pair under `name`
pub fn connect(name: &str) -> (Port, PortClient) {
    let (to_extension, incoming) = mpsc::unbounded_channel();
    let (outgoing, to_caller) = mpsc::unbounded_channel();
    (
        Port {
            name: name.to_string(),
            incoming,
            outgoing,
        },
        PortClient {
            name: name.to_string(),
            outgoing: to_extension,
            incoming: to_caller,
        },
    )
}

/// Accepts ports and wires the expected channel to the router
pub struct PortListener {
    router: Arc<MessageRouter>,
}

impl PortListener {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    /// Accept a port. Returns whether it was wired to the router.
    pub fn on_connect(&self, port: Port) -> bool {
        let Port {
            name,
            mut incoming,
            outgoing,
        } = port;

        if name != LOCAL_STORAGE_CHANNEL {
            tracing::debug!("[Port] Ignoring port {:?}", name);
            // Keep the port open but never answer on it
            tokio::spawn(async move {
                let _outgoing = outgoing;
                while incoming.recv().await.is_some() {}
            });
            return false;
        }

        tracing::info!("[Port] Port connected: {}", name);
        let router = Arc::clone(&self.router);

        tokio::spawn(async move {
            while let Some(message) = incoming.recv().await {
                let router = Arc::clone(&router);
                let outgoing = outgoing.clone();
                tokio::spawn(async move {
                    let request_id = message
                        .get("requestId")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string);

                    let event = match router.handle_message(message).await {
                        Ok(response) => PortEvent::Message(response),
                        Err(e) => {
                            tracing::error!("[Port] Request {:?} failed: {}", request_id, e);
                            PortEvent::Failed {
                                request_id,
                                code: e.code(),
                                message: e.to_string(),
                            }
                        }
                    };
                    // The caller may have disconnected meanwhile
                    let _ = outgoing.send(event);
                });
            }
            tracing::info!("[Port] Port disconnected: {}", name);
        });
        true
    }
}
