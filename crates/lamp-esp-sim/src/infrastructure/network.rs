//! TCP session between the simulated lamp and the hub.
//!
//! The lamp is the TCP *client*.  [`LampClient::run`] keeps it connected:
//!
//! ```text
//! loop:
//!   connect ──fail──► wait reconnect_interval ──┐
//!     │                                         │
//!     ▼                                         │
//!   serve until EOF or I/O error ───────────────┘
//! ```
//!
//! [`serve`] is generic over the stream type so the message handling can be
//! driven by an in-memory mock in tests.

use std::time::Duration;

use lamp_core::{encode_message, JsonStreamDecoder, LampMessage, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::application::lamp::SimulatedLamp;

const READ_CHUNK: usize = 1024;

/// Errors that can occur in the simulator's network layer.
#[derive(Debug, Error)]
pub enum SimError {
    /// TCP connection to the hub failed.
    #[error("failed to connect to hub at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A reply could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Where to connect and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// `host:port` of the hub.
    pub server: String,
    pub reconnect_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8080".to_string(),
            reconnect_interval: Duration::from_secs(3),
        }
    }
}

/// The simulated lamp plus its connection settings.
pub struct LampClient {
    config: SimConfig,
    lamp: SimulatedLamp,
}

impl LampClient {
    pub fn new(config: SimConfig, lamp: SimulatedLamp) -> Self {
        Self { config, lamp }
    }

    pub fn lamp(&self) -> &SimulatedLamp {
        &self.lamp
    }

    /// Opens one TCP connection to the hub.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConnectFailed`] if the hub is unreachable.
    pub async fn connect(&self) -> Result<TcpStream, SimError> {
        TcpStream::connect(&self.config.server)
            .await
            .map_err(|source| SimError::ConnectFailed {
                addr: self.config.server.clone(),
                source,
            })
    }

    /// Connects, serves, and reconnects forever.  The lamp keeps its state
    /// across reconnects, like the firmware does.
    pub async fn run(&mut self) {
        loop {
            match self.connect().await {
                Ok(mut stream) => {
                    info!("connected to hub at {}", self.config.server);
                    match serve(&mut stream, &mut self.lamp).await {
                        Ok(()) => info!("hub closed the connection"),
                        Err(e) => warn!("connection lost: {e}"),
                    }
                }
                Err(e) => warn!("{e}"),
            }
            debug!(
                "reconnecting in {} seconds",
                self.config.reconnect_interval.as_secs_f32()
            );
            tokio::time::sleep(self.config.reconnect_interval).await;
        }
    }
}

/// Handles messages from the hub until the stream ends.
///
/// Malformed input is logged and dropped; the session continues.
///
/// # Errors
///
/// Returns [`SimError::Io`] on a read or write failure.
pub async fn serve<S>(stream: &mut S, lamp: &mut SimulatedLamp) -> Result<(), SimError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut decoder = JsonStreamDecoder::new();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        for item in decoder.push(&buf[..n]) {
            let msg = match item.and_then(|obj| LampMessage::from_object(&obj)) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("dropping input: {e}");
                    continue;
                }
            };
            debug!(?msg, "received");
            if let Some(reply) = lamp.handle(&msg) {
                stream.write_all(&encode_message(&reply)?).await?;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lamp_core::{EspLampState, UserButton};
    use tokio_test::io::Builder;

    fn wire(msg: &LampMessage) -> Vec<u8> {
        encode_message(msg).unwrap()
    }

    #[tokio::test]
    async fn test_req_update_is_answered_with_state() {
        // Arrange
        let mut lamp = SimulatedLamp::new(EspLampState::ColorRed);
        let mut io = Builder::new()
            .read(&wire(&LampMessage::req_update()))
            .write(br#"{"device":"lamp-esp","event":"update","arg0":0,"arg1":3}"#)
            .build();

        // Act
        let result = serve(&mut io, &mut lamp).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_click_split_across_reads_is_handled_once() {
        // Arrange
        let click = wire(&LampMessage::user_click(UserButton::LampEspOn));
        let (head, tail) = click.split_at(12);
        let mut lamp = SimulatedLamp::default();
        let mut io = Builder::new()
            .read(head)
            .read(tail)
            .write(&wire(&LampMessage::update("lamp-esp", 1)))
            .build();

        // Act
        serve(&mut io, &mut lamp).await.unwrap();

        // Assert
        assert_eq!(lamp.state(), EspLampState::ColorWhite);
    }

    #[tokio::test]
    async fn test_garbage_is_dropped_and_session_continues() {
        // Arrange
        let mut lamp = SimulatedLamp::default();
        let mut io = Builder::new()
            .read(b"{oops")
            .read(b"[1,2]")
            .read(br#"{"device":"lamp-esp"}"#)
            .read(&wire(&LampMessage::req_update()))
            .write(&wire(&LampMessage::update("lamp-esp", 0)))
            .build();

        // Act
        let result = serve(&mut io, &mut lamp).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_click_writes_nothing() {
        // Arrange
        let mut lamp = SimulatedLamp::default();
        let mut io = Builder::new()
            .read(&wire(&LampMessage::user_click(UserButton::LampNrfOnOff)))
            .build();

        // Act
        serve(&mut io, &mut lamp).await.unwrap();

        // Assert
        assert_eq!(lamp.state(), EspLampState::Off);
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        // Arrange
        let mut lamp = SimulatedLamp::default();
        let mut io = Builder::new()
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();

        // Act
        let result = serve(&mut io, &mut lamp).await;

        // Assert
        assert!(matches!(result, Err(SimError::Io(_))));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Arrange: bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let client = LampClient::new(
            SimConfig {
                server: addr,
                reconnect_interval: Duration::from_millis(10),
            },
            SimulatedLamp::default(),
        );

        // Act
        let result = client.connect().await;

        // Assert
        assert!(matches!(result, Err(SimError::ConnectFailed { .. })));
    }
}
