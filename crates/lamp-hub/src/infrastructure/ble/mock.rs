//! In-memory BLE lamp for tests and hardware-free runs.
//!
//! [`MockLamp`] behaves like the nRF firmware: it stores one byte, echoes
//! every write back as a notification, and ends its notification streams
//! when disconnected.  [`MockScanner`] hands out lamps in the order they were
//! queued and reports "not found" once the queue is empty.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use super::{BleError, BleLink, BleScanner};

/// A fake nRF lamp.
pub struct MockLamp {
    value: Mutex<Vec<u8>>,
    writes: Mutex<Vec<Vec<u8>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    connected: AtomicBool,
}

impl MockLamp {
    /// A connected lamp whose characteristic holds `initial`.
    pub fn new(initial: u8) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(vec![initial]),
            writes: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    /// Every payload written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        lock(&self.writes).clone()
    }

    pub fn value(&self) -> Vec<u8> {
        lock(&self.value).clone()
    }

    /// Replaces the characteristic value without notifying.
    pub fn set_value(&self, value: Vec<u8>) {
        *lock(&self.value) = value;
    }

    /// Pushes a notification, as when the lamp's own button is pressed.
    pub fn notify(&self, value: Vec<u8>) {
        *lock(&self.value) = value.clone();
        lock(&self.subscribers).retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Simulates the lamp going out of range.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.subscribers).clear();
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), BleError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BleError::NotConnected)
        }
    }
}

#[async_trait]
impl BleLink for MockLamp {
    async fn read(&self) -> Result<Vec<u8>, BleError> {
        self.ensure_connected()?;
        Ok(self.value())
    }

    async fn write(&self, data: &[u8]) -> Result<(), BleError> {
        self.ensure_connected()?;
        lock(&self.writes).push(data.to_vec());
        self.notify(data.to_vec());
        Ok(())
    }

    async fn notifications(&self) -> Result<BoxStream<'static, Vec<u8>>, BleError> {
        self.ensure_connected()?;
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|v| (v, rx)) }).boxed())
    }
}

/// Scanner that returns queued lamps one per scan.
#[derive(Default)]
pub struct MockScanner {
    lamps: Mutex<VecDeque<Arc<MockLamp>>>,
    scans: AtomicUsize,
}

impl MockScanner {
    pub fn new(lamps: impl IntoIterator<Item = Arc<MockLamp>>) -> Self {
        Self {
            lamps: Mutex::new(lamps.into_iter().collect()),
            scans: AtomicUsize::new(0),
        }
    }

    /// Number of scans performed so far.
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleScanner for MockScanner {
    async fn scan(&self, _name: &str) -> Result<Option<Arc<dyn BleLink>>, BleError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.lamps).pop_front();
        Ok(next.map(|lamp| lamp as Arc<dyn BleLink>))
    }
}

/// Locks a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_is_recorded_and_echoed_as_notification() {
        // Arrange
        let lamp = MockLamp::new(0);
        let mut notes = lamp.notifications().await.unwrap();

        // Act
        lamp.write(&[1]).await.unwrap();

        // Assert
        assert_eq!(lamp.writes(), vec![vec![1]]);
        assert_eq!(notes.next().await, Some(vec![1]));
        assert_eq!(lamp.read().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_disconnect_ends_notification_stream() {
        let lamp = MockLamp::new(0);
        let mut notes = lamp.notifications().await.unwrap();

        lamp.disconnect();

        assert_eq!(notes.next().await, None);
        assert!(matches!(lamp.write(&[1]).await, Err(BleError::NotConnected)));
    }

    #[tokio::test]
    async fn test_scanner_hands_out_lamps_then_nothing() {
        let scanner = MockScanner::new([MockLamp::new(0)]);

        assert!(scanner.scan("lamp").await.unwrap().is_some());
        assert!(scanner.scan("lamp").await.unwrap().is_none());
        assert_eq!(scanner.scans(), 2);
    }
}
