//! BleAdapter: keeps the nRF lamp connected and executes router commands.
//!
//! The adapter runs in its own task and talks to the router only through the
//! bridge queues:
//!
//! ```text
//!   router ──commands──► command loop ──write / read──► lamp
//!   router ◄──mailbox─── connect loop ◄──notifications── lamp
//! ```
//!
//! Both loops run concurrently inside [`BleAdapter::run`].  The command loop
//! waits on the command queue; the connect loop scans, pumps notifications
//! while connected, and rescans after a drop.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use lamp_core::{AppEvent, ConnectionState, ConnectionType, EventKind, NrfLampState, UserButton};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{BleLink, BleScanner};
use crate::application::route_event::EventSink;
use crate::infrastructure::bridge::EventReceiver;

pub struct BleAdapter {
    scanner: Arc<dyn BleScanner>,
    device_name: String,
    retry_interval: Duration,
    /// Events for the router (the bridge mailbox).
    mailbox: Arc<dyn EventSink>,
    link: Mutex<Option<Arc<dyn BleLink>>>,
    state: Mutex<NrfLampState>,
}

impl BleAdapter {
    pub fn new(
        scanner: Arc<dyn BleScanner>,
        device_name: impl Into<String>,
        retry_interval: Duration,
        mailbox: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            scanner,
            device_name: device_name.into(),
            retry_interval,
            mailbox,
            link: Mutex::new(None),
            state: Mutex::new(NrfLampState::Off),
        }
    }

    /// Last lamp state the adapter knows of.
    pub async fn state(&self) -> NrfLampState {
        *self.state.lock().await
    }

    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.is_some()
    }

    /// Runs the command loop and the connect loop until the command queue
    /// closes.  The connect loop never finishes on its own, so callers stop
    /// the adapter by aborting its task.
    pub async fn run(&self, commands: EventReceiver) {
        tokio::join!(self.command_loop(commands), self.connect_loop());
    }

    // ── Command loop ──────────────────────────────────────────────────────────

    pub async fn command_loop(&self, mut commands: EventReceiver) {
        while let Some(event) = commands.recv().await {
            self.handle_command(event).await;
        }
        debug!("ble: command queue closed");
    }

    /// Executes one command from the router.
    pub async fn handle_command(&self, event: AppEvent) {
        debug!("ble: command {event}");
        match event.kind() {
            EventKind::UserInput => match event.user_button() {
                Some(UserButton::LampNrfOnOff) => self.toggle().await,
                other => warn!(button = ?other, arg0 = event.arg0(), "ble: unsupported button"),
            },
            EventKind::DeviceReqUpdate => self.request_update().await,
            EventKind::Null
            | EventKind::Timer
            | EventKind::ConnectionUpdate
            | EventKind::DeviceUpdate
            | EventKind::DataTcp
            | EventKind::DataBle => debug!("ble: unsupported {event}"),
        }
    }

    async fn toggle(&self) {
        let Some(link) = self.current_link().await else {
            warn!("ble: write skipped, lamp not connected");
            return;
        };
        let next = {
            let mut state = self.state.lock().await;
            *state = state.toggled();
            *state
        };
        let Some(byte) = next.to_wire() else {
            return;
        };
        debug!(state = ?next, "ble: writing {byte:#04x}");
        if let Err(e) = link.write(&[byte]).await {
            warn!("ble: write failed: {e}");
        }
    }

    async fn request_update(&self) {
        let read = match self.current_link().await {
            Some(link) => link.read().await,
            None => Err(super::BleError::NotConnected),
        };
        match read {
            Ok(bytes) if !bytes.is_empty() => {
                *self.state.lock().await = NrfLampState::from_wire(&bytes);
                self.post(AppEvent::data_ble(bytes)).await;
            }
            Ok(_) => {
                *self.state.lock().await = NrfLampState::Unknown;
                warn!("ble: read returned no data");
            }
            Err(e) => {
                *self.state.lock().await = NrfLampState::Unknown;
                warn!("ble: read failed: {e}");
            }
        }
    }

    // ── Connect loop ──────────────────────────────────────────────────────────

    pub async fn connect_loop(&self) {
        loop {
            if !self.connect_once().await {
                debug!(
                    "ble: retry after {} seconds",
                    self.retry_interval.as_secs_f32()
                );
                tokio::time::sleep(self.retry_interval).await;
            }
        }
    }

    /// One scan-connect-pump cycle.  Returns `false` if the lamp was not
    /// reached.
    pub async fn connect_once(&self) -> bool {
        let link = match self.scanner.scan(&self.device_name).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                debug!("ble: {} not found", self.device_name);
                return false;
            }
            Err(e) => {
                warn!("ble: scan failed: {e}");
                return false;
            }
        };
        let notes = match link.notifications().await {
            Ok(notes) => notes,
            Err(e) => {
                warn!("ble: could not subscribe: {e}");
                return false;
            }
        };

        *self.link.lock().await = Some(link);
        info!("ble: {} connected", self.device_name);
        self.post(AppEvent::connection_update(
            ConnectionType::Ble,
            ConnectionState::Connected,
        ))
        .await;

        self.pump(notes).await;

        *self.link.lock().await = None;
        info!("ble: {} disconnected", self.device_name);
        self.post(AppEvent::connection_update(
            ConnectionType::Ble,
            ConnectionState::Disconnected,
        ))
        .await;
        true
    }

    async fn pump(&self, mut notes: BoxStream<'static, Vec<u8>>) {
        while let Some(bytes) = notes.next().await {
            debug!(?bytes, "ble: notification");
            *self.state.lock().await = NrfLampState::from_wire(&bytes);
            self.post(AppEvent::data_ble(bytes)).await;
        }
    }

    async fn current_link(&self) -> Option<Arc<dyn BleLink>> {
        self.link.lock().await.clone()
    }

    async fn post(&self, event: AppEvent) {
        if let Err(e) = self.mailbox.send(event).await {
            warn!("ble: mailbox unavailable: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::route_event::MockEventSink;
    use crate::infrastructure::ble::mock::{MockLamp, MockScanner};
    use mockall::predicate::eq;

    fn adapter(scanner: MockScanner, mailbox: MockEventSink) -> BleAdapter {
        BleAdapter::new(
            Arc::new(scanner),
            "nrf52840-lamp",
            Duration::from_millis(10),
            Arc::new(mailbox),
        )
    }

    fn accepting() -> MockEventSink {
        let mut sink = MockEventSink::new();
        sink.expect_send().returning(|_| Ok(()));
        sink
    }

    #[tokio::test]
    async fn test_toggle_while_disconnected_writes_nothing() {
        // Arrange
        let lamp = MockLamp::new(0);
        let mut mailbox = MockEventSink::new();
        mailbox.expect_send().never();
        let adapter = adapter(MockScanner::new([lamp.clone()]), mailbox);

        // Act: no connect cycle has run, so there is no link.
        adapter
            .handle_command(AppEvent::user_input(UserButton::LampNrfOnOff))
            .await;

        // Assert
        assert!(lamp.writes().is_empty());
        assert_eq!(adapter.state().await, NrfLampState::Off);
    }

    #[tokio::test]
    async fn test_toggle_while_connected_writes_on_byte() {
        // Arrange
        let lamp = MockLamp::new(0);
        let adapter = Arc::new(adapter(MockScanner::new([lamp.clone()]), accepting()));
        let runner = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.connect_once().await })
        };
        while !adapter.is_connected().await {
            tokio::task::yield_now().await;
        }

        // Act
        adapter
            .handle_command(AppEvent::user_input(UserButton::LampNrfOnOff))
            .await;

        // Assert
        assert_eq!(lamp.writes(), vec![vec![1]]);
        lamp.disconnect();
        assert!(runner.await.unwrap());
        assert!(!adapter.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_cycle_posts_connected_data_disconnected() {
        // Arrange
        let lamp = MockLamp::new(0);
        let mut mailbox = MockEventSink::new();
        let mut seq = mockall::Sequence::new();
        mailbox
            .expect_send()
            .with(eq(AppEvent::connection_update(
                ConnectionType::Ble,
                ConnectionState::Connected,
            )))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mailbox
            .expect_send()
            .with(eq(AppEvent::data_ble(vec![1])))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mailbox
            .expect_send()
            .with(eq(AppEvent::connection_update(
                ConnectionType::Ble,
                ConnectionState::Disconnected,
            )))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let adapter = Arc::new(adapter(MockScanner::new([lamp.clone()]), mailbox));
        let runner = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.connect_once().await })
        };
        while !adapter.is_connected().await {
            tokio::task::yield_now().await;
        }

        // Act
        lamp.notify(vec![1]);
        while adapter.state().await != NrfLampState::On {
            tokio::task::yield_now().await;
        }
        lamp.disconnect();

        // Assert
        assert!(runner.await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_miss_returns_false() {
        let adapter = adapter(MockScanner::default(), MockEventSink::new());
        assert!(!adapter.connect_once().await);
    }

    #[tokio::test]
    async fn test_req_update_while_disconnected_sets_unknown() {
        let mut mailbox = MockEventSink::new();
        mailbox.expect_send().never();
        let adapter = adapter(MockScanner::default(), mailbox);

        adapter
            .handle_command(AppEvent::device_req_update(ConnectionType::Ble))
            .await;

        assert_eq!(adapter.state().await, NrfLampState::Unknown);
    }

    #[tokio::test]
    async fn test_req_update_with_empty_value_sets_unknown_and_posts_nothing() {
        // Arrange
        let lamp = MockLamp::new(1);
        let mut mailbox = MockEventSink::new();
        mailbox
            .expect_send()
            .with(eq(AppEvent::connection_update(
                ConnectionType::Ble,
                ConnectionState::Connected,
            )))
            .times(1)
            .returning(|_| Ok(()));
        mailbox
            .expect_send()
            .with(eq(AppEvent::connection_update(
                ConnectionType::Ble,
                ConnectionState::Disconnected,
            )))
            .times(1)
            .returning(|_| Ok(()));
        let adapter = Arc::new(adapter(MockScanner::new([lamp.clone()]), mailbox));
        let runner = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.connect_once().await })
        };
        while !adapter.is_connected().await {
            tokio::task::yield_now().await;
        }
        lamp.set_value(Vec::new());

        // Act
        adapter
            .handle_command(AppEvent::device_req_update(ConnectionType::Ble))
            .await;

        // Assert
        assert_eq!(adapter.state().await, NrfLampState::Unknown);
        lamp.disconnect();
        assert!(runner.await.unwrap());
    }

    #[tokio::test]
    async fn test_unsupported_commands_are_ignored() {
        let mut mailbox = MockEventSink::new();
        mailbox.expect_send().never();
        let adapter = adapter(MockScanner::default(), mailbox);

        adapter.handle_command(AppEvent::timer()).await;
        adapter
            .handle_command(AppEvent::user_input(UserButton::LampEspOn))
            .await;
        adapter.handle_command(AppEvent::data_ble(vec![1])).await;

        assert_eq!(adapter.state().await, NrfLampState::Off);
    }
}
