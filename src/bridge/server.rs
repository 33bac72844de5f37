//! WebSocket server for the storage bridge
//!
//! Each connection opens one port by sending a `connect` frame, then sends
//! `request` frames over it. Responses come back as `response` frames,
//! failures as `error` frames carrying the request id, and the `unlocked`
//! broadcast as `event` frames.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value as JsonValue;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use super::error::BridgeError;
use super::protocol::ProtocolMessage;
use super::registry::ClientRegistry;
use crate::host::TabId;
use crate::router::{MessageRouter, ResponseEnvelope};
use crate::transport::{connect, PortEvent, PortListener};

/// Default port for the bridge WebSocket server
pub const DEFAULT_BRIDGE_PORT: u16 = 19455;

/// How long a closing connection may take to flush its close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Bridge WebSocket server
pub struct BridgeServer {
    running: bool,
    current_port: u16,
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Cancelled on stop; every connection accepted since start watches it
    connections: CancellationToken,
    router: Arc<MessageRouter>,
    clients: Arc<ClientRegistry>,
}

impl BridgeServer {
    pub fn new(router: Arc<MessageRouter>, clients: Arc<ClientRegistry>) -> Self {
        Self {
            running: false,
            current_port: DEFAULT_BRIDGE_PORT,
            shutdown_tx: None,
            connections: CancellationToken::new(),
            router,
            clients,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get the port the server is bound to (or will bind to)
    pub fn get_port(&self) -> u16 {
        self.current_port
    }

    pub fn clients(&self) -> Arc<ClientRegistry> {
        self.clients.clone()
    }

    /// Start listening on 127.0.0.1. Port 0 picks a free port.
    pub async fn start(&mut self, port: Option<u16>) -> Result<SocketAddr, BridgeError> {
        if self.running {
            return Err(BridgeError::AlreadyRunning);
        }

        let port = port.unwrap_or(DEFAULT_BRIDGE_PORT);
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let local_addr = listener.local_addr()?;
        self.current_port = local_addr.port();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        tracing::info!("[BridgeServer] WebSocket server listening on {}", local_addr);

        self.connections = CancellationToken::new();
        let connections = self.connections.clone();
        let router = self.router.clone();
        let clients = self.clients.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                tracing::debug!("[BridgeServer] New connection from {}", addr);
                                let router = router.clone();
                                let clients = clients.clone();
                                let shutdown = connections.clone();

                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, router, clients, shutdown).await {
                                        tracing::warn!("[BridgeServer] Connection error: {}", e);
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!("[BridgeServer] Accept error: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("[BridgeServer] Shutdown signal received");
                        break;
                    }
                }
            }
        });

        self.running = true;
        Ok(local_addr)
    }

    /// Stop accepting connections and close the open ones
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        if !self.running {
            return Err(BridgeError::NotRunning);
        }

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        self.connections.cancel();

        self.clients.clear().await;

        self.running = false;
        tracing::info!("[BridgeServer] Server stopped");
        Ok(())
    }
}

/// Per-connection port state
enum PortState {
    /// No `connect` frame yet
    Unopened,
    /// Port open; requests go to the listener (which may be ignoring them)
    Open {
        requests: mpsc::UnboundedSender<JsonValue>,
        tab_id: Option<TabId>,
    },
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    router: Arc<MessageRouter>,
    clients: Arc<ClientRegistry>,
    shutdown: CancellationToken,
) -> Result<(), BridgeError> {
    let ws_stream = accept_async(stream).await?;
    let (mut write, mut read) = ws_stream.split();

    // Channel for sending messages to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if write.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let listener = PortListener::new(router);
    let mut state = PortState::Unopened;
    let mut closed_by_server = false;

    loop {
        let msg_result = tokio::select! {
            next = read.next() => match next {
                Some(msg_result) => msg_result,
                None => break,
            },
            _ = shutdown.cancelled() => {
                tracing::debug!("[BridgeServer] Closing connection, server stopping");
                let _ = tx.send(Message::Close(None));
                closed_by_server = true;
                break;
            }
        };
        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("[BridgeServer] Read error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let protocol_msg: ProtocolMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!("[BridgeServer] Parse error: {}", e);
                        send_frame(&tx, &ProtocolMessage::error("PARSE_ERROR", e.to_string(), None))?;
                        continue;
                    }
                };

                match protocol_msg {
                    ProtocolMessage::Connect { name } => {
                        if matches!(state, PortState::Open { .. }) {
                            send_frame(
                                &tx,
                                &ProtocolMessage::error("ALREADY_CONNECTED", "Port already open", None),
                            )?;
                            continue;
                        }

                        let (port, client) = connect(&name);
                        let (requests, events) = client.into_parts();
                        let tab_id = if listener.on_connect(port) {
                            let tab_id = clients.register(tx.clone()).await;
                            tokio::spawn(forward_events(events, tx.clone()));
                            Some(tab_id)
                        } else {
                            None
                        };
                        state = PortState::Open { requests, tab_id };
                    }

                    ProtocolMessage::Request(envelope) => match &state {
                        PortState::Open { requests, .. } => {
                            let message = serde_json::to_value(&envelope)?;
                            if requests.send(message).is_err() {
                                tracing::warn!("[BridgeServer] Port closed, dropping request");
                            }
                        }
                        PortState::Unopened => {
                            send_frame(
                                &tx,
                                &ProtocolMessage::error(
                                    "NOT_CONNECTED",
                                    "Send a connect frame first",
                                    Some(envelope.request_id),
                                ),
                            )?;
                        }
                    },

                    ProtocolMessage::Ping => {
                        send_frame(&tx, &ProtocolMessage::Pong)?;
                    }

                    _ => {
                        // Server-to-client frame types
                    }
                }
            }

            Message::Ping(data) => {
                tx.send(Message::Pong(data))?;
            }

            Message::Close(_) => {
                break;
            }

            Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    // Cleanup on disconnect
    if let PortState::Open {
        tab_id: Some(tab_id),
        ..
    } = state
    {
        clients.unregister(tab_id).await;
    }

    if closed_by_server {
        let _ = tokio::time::timeout(CLOSE_GRACE, &mut write_task).await;
    }
    write_task.abort();

    Ok(())
}

/// Turn port events into response and error frames
async fn forward_events(
    mut events: mpsc::UnboundedReceiver<PortEvent>,
    tx: mpsc::UnboundedSender<Message>,
) {
    while let Some(event) = events.recv().await {
        let frame = match event {
            PortEvent::Message(message) => {
                match serde_json::from_value::<ResponseEnvelope>(message) {
                    Ok(envelope) => ProtocolMessage::Response(envelope),
                    Err(e) => ProtocolMessage::error("SERIALIZATION_ERROR", e.to_string(), None),
                }
            }
            PortEvent::Failed {
                request_id,
                code,
                message,
            } => ProtocolMessage::error(code, message, request_id),
        };
        if send_frame(&tx, &frame).is_err() {
            break;
        }
    }
}

fn send_frame(tx: &mpsc::UnboundedSender<Message>, frame: &ProtocolMessage) -> Result<(), BridgeError> {
    let json = serde_json::to_string(frame)?;
    tx.send(Message::Text(json.into()))?;
    Ok(())
}
