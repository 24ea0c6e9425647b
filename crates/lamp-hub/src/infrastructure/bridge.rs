//! Event queues between the hub's tasks.
//!
//! Every hop between tasks is a tokio channel wrapped in a [`ChannelSink`],
//! so the router and the GUI can hold it as an [`EventSink`] without knowing
//! where the events go.  The receiving side is an [`EventReceiver`].
//!
//! # Overflow policy
//!
//! Queues never block the sender.  Events fall into two classes:
//!
//! | class   | kinds                                  | when the queue is full |
//! |---------|----------------------------------------|------------------------|
//! | control | `ConnectionUpdate`, `DeviceReqUpdate`  | always queued          |
//! | data    | everything else                        | newest dropped + warn  |
//!
//! Only data events count against the capacity.  Lamp data is best effort: a
//! lost click is repeated by the user, a lost update is superseded by the
//! next one.  A lost connection transition is never superseded, so control
//! events are always delivered, in order with the data around them.
//! Control events only appear on connection changes, which keeps their share
//! of the queue small.
//!
//! # The BLE bridge
//!
//! The BLE adapter runs in its own task.  [`ble_bridge`] creates the pair of
//! one-directional queues that connect it to the router:
//!
//! ```text
//!   RouterEnd.commands ──────────► AdapterEnd.commands   (router → adapter)
//!   RouterEnd.mailbox  ◄────────── AdapterEnd.mailbox    (adapter → router)
//! ```
//!
//! The router drains its mailbox on every Timer tick; the adapter awaits its
//! command queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lamp_core::{AppEvent, EventKind};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::warn;

use crate::application::route_event::{EventSink, Mailbox};

fn is_control(event: &AppEvent) -> bool {
    matches!(
        event.kind(),
        EventKind::ConnectionUpdate | EventKind::DeviceReqUpdate
    )
}

/// An [`EventSink`] that pushes into a named queue.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    name: &'static str,
    capacity: usize,
    tx: mpsc::UnboundedSender<AppEvent>,
    /// Data events sent but not yet received.
    queued: Arc<AtomicUsize>,
}

impl ChannelSink {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&self, event: AppEvent) -> Result<(), String> {
        let counted = !is_control(&event);
        if counted && self.queued.fetch_add(1, Ordering::SeqCst) >= self.capacity {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            warn!(queue = self.name, "queue full, dropping {event}");
            return Ok(());
        }
        if self.tx.send(event).is_err() {
            if counted {
                self.queued.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(format!("{} queue closed", self.name));
        }
        Ok(())
    }
}

/// The receiving end of a [`queue`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    queued: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Waits for the next event.  Returns `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<AppEvent> {
        let event = self.rx.recv().await?;
        self.release(&event);
        Some(event)
    }

    pub fn try_recv(&mut self) -> Result<AppEvent, TryRecvError> {
        let event = self.rx.try_recv()?;
        self.release(&event);
        Ok(event)
    }

    fn release(&self, event: &AppEvent) {
        if !is_control(event) {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Mailbox for EventReceiver {
    fn try_next(&mut self) -> Option<AppEvent> {
        self.try_recv().ok()
    }
}

/// Creates a named queue holding up to `capacity` data events.  A capacity
/// of zero is raised to one.
pub fn queue(name: &'static str, capacity: usize) -> (ChannelSink, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queued = Arc::new(AtomicUsize::new(0));
    (
        ChannelSink {
            name,
            capacity: capacity.max(1),
            tx,
            queued: Arc::clone(&queued),
        },
        EventReceiver { rx, queued },
    )
}

/// The router's side of the BLE bridge.
pub struct RouterEnd {
    pub commands: ChannelSink,
    pub mailbox: EventReceiver,
}

/// The BLE adapter's side of the BLE bridge.
pub struct AdapterEnd {
    pub commands: EventReceiver,
    pub mailbox: ChannelSink,
}

pub fn ble_bridge(capacity: usize) -> (RouterEnd, AdapterEnd) {
    let (commands_tx, commands_rx) = queue("ble-commands", capacity);
    let (mailbox_tx, mailbox_rx) = queue("ble-mailbox", capacity);
    (
        RouterEnd {
            commands: commands_tx,
            mailbox: mailbox_rx,
        },
        AdapterEnd {
            commands: commands_rx,
            mailbox: mailbox_tx,
        },
    )
}
