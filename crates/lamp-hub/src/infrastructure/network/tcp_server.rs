//! TCP server for the ESP32 lamp.
//!
//! Architecture:
//! - `TcpServer` owns the listener and runs the accept loop.
//! - Each accepted connection gets a UUID, a registry entry in the shared
//!   [`ClientHub`], a writer task, and a reader loop.
//! - Inbound bytes are split into JSON objects by `JsonStreamDecoder` and
//!   forwarded to the router as `DataTcp` events.
//! - The router sends commands to the `ClientHub` (it is an `EventSink`),
//!   which broadcasts them as lamp messages to every client.
//!
//! ```text
//!   lamp ──bytes──► reader loop ──DataTcp──► router
//!   lamp ◄─bytes─── writer task ◄──queue─── ClientHub ◄──command── router
//! ```
//!
//! More than one lamp may connect.  The transport counts as connected while
//! at least one client remains, so the router is told `Disconnected` only
//! when the last one leaves.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use lamp_core::{
    encode_message, AppEvent, ConnectionState, ConnectionType, EventKind, JsonStreamDecoder,
    LampMessage,
};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{tcp::OwnedReadHalf, tcp::OwnedWriteHalf, TcpListener, TcpStream},
    sync::{mpsc, Mutex},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::route_event::EventSink;

/// Outbound messages buffered per client before new ones are dropped.
const CLIENT_QUEUE_CAPACITY: usize = 32;

/// Size of the per-read buffer on client sockets.
const READ_CHUNK: usize = 1024;

/// Errors that can occur in the hub's network layer.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The listening socket could not be created.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Client registry ───────────────────────────────────────────────────────────

/// Registry of connected lamps and the router-facing side of the server.
pub struct ClientHub {
    clients: Mutex<HashMap<Uuid, mpsc::Sender<Vec<u8>>>>,
    router: Arc<dyn EventSink>,
}

impl ClientHub {
    pub fn new(router: Arc<dyn EventSink>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            router,
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Sends `msg` to every connected client.
    ///
    /// A client whose queue is full or closed is skipped.
    pub async fn broadcast(&self, msg: &LampMessage) {
        let bytes = match encode_message(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("tcp: cannot encode {msg:?}: {e}");
                return;
            }
        };
        let clients = self.clients.lock().await;
        if clients.is_empty() {
            debug!("tcp: no clients, {} not sent", msg.event);
        }
        for (id, tx) in clients.iter() {
            if let Err(e) = tx.try_send(bytes.clone()) {
                warn!(client = %id, "tcp: skipping client: {e}");
            }
        }
    }

    /// Executes one router command.
    pub async fn handle_command(&self, event: AppEvent) {
        match event.kind() {
            EventKind::DeviceReqUpdate => self.broadcast(&LampMessage::req_update()).await,
            EventKind::UserInput => match event.user_button() {
                Some(button) => self.broadcast(&LampMessage::user_click(button)).await,
                None => debug!("tcp: unsupported button in {event}"),
            },
            EventKind::Null
            | EventKind::Timer
            | EventKind::ConnectionUpdate
            | EventKind::DeviceUpdate
            | EventKind::DataTcp
            | EventKind::DataBle => debug!("tcp: unsupported {event}"),
        }
    }

    async fn register(&self, id: Uuid, tx: mpsc::Sender<Vec<u8>>) {
        self.clients.lock().await.insert(id, tx);
        self.post(AppEvent::connection_update(
            ConnectionType::Tcp,
            ConnectionState::Connected,
        ))
        .await;
    }

    async fn unregister(&self, id: Uuid) {
        let remaining = {
            let mut clients = self.clients.lock().await;
            clients.remove(&id);
            clients.len()
        };
        let state = if remaining > 0 {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.post(AppEvent::connection_update(ConnectionType::Tcp, state))
            .await;
    }

    async fn post(&self, event: AppEvent) {
        if let Err(e) = self.router.send(event).await {
            warn!("tcp: router unavailable: {e}");
        }
    }
}

#[async_trait]
impl EventSink for ClientHub {
    async fn send(&self, event: AppEvent) -> Result<(), String> {
        self.handle_command(event).await;
        Ok(())
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// Accepts ESP32 lamp connections.
pub struct TcpServer {
    listener: TcpListener,
    hub: Arc<ClientHub>,
}

impl TcpServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Bind`] if the address is invalid or in use.
    pub async fn bind(addr: &str, router: Arc<dyn EventSink>) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            hub: Arc::new(ClientHub::new(router)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The router-facing command sink of this server.
    pub fn hub(&self) -> Arc<ClientHub> {
        Arc::clone(&self.hub)
    }

    /// Runs the accept loop forever.  Each client is served on its own task.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("tcp: listening on {addr}");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = Arc::clone(&self.hub);
                    tokio::spawn(async move { serve_client(hub, stream, peer).await });
                }
                Err(e) => {
                    // Transient accept error (e.g., too many open file descriptors).
                    error!("tcp: accept error: {e}");
                }
            }
        }
    }
}

async fn serve_client(hub: Arc<ClientHub>, stream: TcpStream, peer: SocketAddr) {
    let id = Uuid::new_v4();
    info!(client = %id, "tcp: {peer} connected");

    let (reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel(CLIENT_QUEUE_CAPACITY);
    let writer_task = tokio::spawn(write_loop(writer, rx));

    hub.register(id, tx).await;
    read_loop(&hub, reader, id).await;
    hub.unregister(id).await;

    writer_task.abort();
    info!(client = %id, "tcp: {peer} disconnected");
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            warn!("tcp: write failed: {e}");
            break;
        }
    }
}

/// Reads until EOF or an I/O error.  Bad JSON is logged and skipped; it never
/// ends the connection.
async fn read_loop(hub: &ClientHub, mut reader: OwnedReadHalf, id: Uuid) {
    let mut decoder = JsonStreamDecoder::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(client = %id, "tcp: read error: {e}");
                break;
            }
        };
        for item in decoder.push(&buf[..n]) {
            match item {
                Ok(obj) => {
                    debug!(client = %id, ?obj, "tcp: received");
                    hub.post(AppEvent::data_tcp(obj)).await;
                }
                Err(e) => warn!(client = %id, "tcp: dropping input: {e}"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
