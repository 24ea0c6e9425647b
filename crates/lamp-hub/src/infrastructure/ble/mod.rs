//! Bluetooth LE access to the nRF lamp.
//!
//! # How the hub talks to the lamp (for beginners)
//!
//! The nRF52840 lamp is a BLE *peripheral*: it advertises a name and exposes
//! one GATT characteristic holding a single byte (`0` = off, `1` = on).  The
//! hub acts as the *central*:
//!
//! 1. **Scan** until something advertises the lamp's name.
//! 2. **Connect** and discover the lamp's services.
//! 3. **Subscribe** to the characteristic so every change is pushed to us as
//!    a *notification*.
//! 4. **Read** the characteristic when the GUI asks for the current state,
//!    and **write** it when the user presses the button.
//!
//! The radio work is hidden behind two traits so the adapter logic can be
//! tested without hardware:
//!
//! - [`BleScanner`] finds the lamp and returns a connected [`BleLink`].
//! - [`BleLink`] reads, writes, and streams notifications.
//!
//! | Implementation                  | When                              |
//! |---------------------------------|-----------------------------------|
//! | `btleplug_impl::BtleplugScanner`| built with the `ble` feature      |
//! | [`NoBluetoothScanner`]          | built without it                  |
//! | [`mock::MockScanner`]           | tests                             |

pub mod adapter;
#[cfg(feature = "ble")]
pub mod btleplug_impl;
pub mod mock;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use tracing::warn;

pub use adapter::BleAdapter;

/// Error type for BLE operations.
#[derive(Debug, Error)]
pub enum BleError {
    /// No Bluetooth adapter is present on this machine.
    #[error("no Bluetooth adapter available")]
    NoAdapter,

    /// The lamp does not expose the expected characteristic.
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(uuid::Uuid),

    /// The link has been dropped.
    #[error("link is not connected")]
    NotConnected,

    /// Any error reported by the Bluetooth stack.
    #[error("bluetooth stack error: {0}")]
    Stack(String),
}

/// A connected lamp.
#[async_trait]
pub trait BleLink: Send + Sync {
    /// Reads the current characteristic value.
    async fn read(&self) -> Result<Vec<u8>, BleError>;

    /// Writes the characteristic without waiting for a response.
    async fn write(&self, data: &[u8]) -> Result<(), BleError>;

    /// Stream of notified characteristic values.  Ends when the link drops.
    async fn notifications(&self) -> Result<BoxStream<'static, Vec<u8>>, BleError>;
}

/// Finds the lamp.
#[async_trait]
pub trait BleScanner: Send + Sync {
    /// Scans for a peripheral advertising `name` and connects to it.
    ///
    /// Returns `Ok(None)` when nothing was found within the scan window.
    async fn scan(&self, name: &str) -> Result<Option<Arc<dyn BleLink>>, BleError>;
}

/// Scanner used when the hub is built without Bluetooth support.
///
/// It never finds anything, so the adapter's retry loop idles harmlessly
/// while the TCP side keeps working.
#[derive(Debug, Default)]
pub struct NoBluetoothScanner {
    warned: AtomicBool,
}

#[async_trait]
impl BleScanner for NoBluetoothScanner {
    async fn scan(&self, name: &str) -> Result<Option<Arc<dyn BleLink>>, BleError> {
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("built without the `ble` feature; {name} will never be found");
        }
        Ok(None)
    }
}

/// Picks the scanner this build supports.
pub fn default_scanner(scan_timeout: std::time::Duration) -> Arc<dyn BleScanner> {
    #[cfg(feature = "ble")]
    {
        Arc::new(btleplug_impl::BtleplugScanner::new(scan_timeout))
    }

    #[cfg(not(feature = "ble"))]
    {
        let _ = scan_timeout;
        Arc::new(NoBluetoothScanner::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_bluetooth_scanner_never_finds_anything() {
        let scanner = NoBluetoothScanner::default();

        let first = scanner.scan("nrf52840-lamp").await.unwrap();
        let second = scanner.scan("nrf52840-lamp").await.unwrap();

        assert!(first.is_none());
        assert!(second.is_none());
    }
}
