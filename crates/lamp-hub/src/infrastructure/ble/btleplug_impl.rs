//! Real BLE central built on `btleplug`.
//!
//! Only compiled with the `ble` feature.  On Linux btleplug talks to BlueZ
//! over D-Bus, on macOS to CoreBluetooth, on Windows to WinRT.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{BoxStream, StreamExt};
use lamp_core::protocol::gatt::{LAMP_CHARACTERISTIC_UUID, LAMP_SERVICE_UUID};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{BleError, BleLink, BleScanner};

fn stack_err(e: btleplug::Error) -> BleError {
    BleError::Stack(e.to_string())
}

/// Scans with the first Bluetooth adapter on the machine.
pub struct BtleplugScanner {
    adapter: OnceCell<Adapter>,
    scan_timeout: Duration,
}

impl BtleplugScanner {
    pub fn new(scan_timeout: Duration) -> Self {
        Self {
            adapter: OnceCell::new(),
            scan_timeout,
        }
    }

    async fn adapter(&self) -> Result<&Adapter, BleError> {
        self.adapter
            .get_or_try_init(|| async {
                let manager = Manager::new().await.map_err(stack_err)?;
                let adapters = manager.adapters().await.map_err(stack_err)?;
                let adapter = adapters.into_iter().next().ok_or(BleError::NoAdapter)?;
                info!("BLE adapter initialized");
                Ok::<_, BleError>(adapter)
            })
            .await
    }

    /// Waits for a peripheral advertising `name` to show up.
    async fn find(adapter: &Adapter, name: &str) -> Result<Option<Peripheral>, BleError> {
        let mut events = adapter.events().await.map_err(stack_err)?;

        // The lamp may already be known from an earlier scan.
        for p in adapter.peripherals().await.map_err(stack_err)? {
            if has_name(&p, name).await {
                return Ok(Some(p));
            }
        }

        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };
            if let Ok(p) = adapter.peripheral(&id).await {
                if has_name(&p, name).await {
                    return Ok(Some(p));
                }
            }
        }
        Ok(None)
    }
}

async fn has_name(p: &Peripheral, name: &str) -> bool {
    matches!(
        p.properties().await,
        Ok(Some(props)) if props.local_name.as_deref() == Some(name)
    )
}

#[async_trait]
impl BleScanner for BtleplugScanner {
    async fn scan(&self, name: &str) -> Result<Option<Arc<dyn BleLink>>, BleError> {
        let adapter = self.adapter().await?;

        debug!("scanning for {name} ...");
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(stack_err)?;
        let found = tokio::time::timeout(self.scan_timeout, Self::find(adapter, name)).await;
        adapter.stop_scan().await.map_err(stack_err)?;

        let peripheral = match found {
            Ok(Ok(Some(p))) => p,
            Ok(Ok(None)) | Err(_) => return Ok(None),
            Ok(Err(e)) => return Err(e),
        };
        debug!("scan done: found {:?}", peripheral.id());

        peripheral.connect().await.map_err(stack_err)?;
        peripheral.discover_services().await.map_err(stack_err)?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == LAMP_CHARACTERISTIC_UUID && c.service_uuid == LAMP_SERVICE_UUID)
            .ok_or(BleError::CharacteristicNotFound(LAMP_CHARACTERISTIC_UUID))?;
        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(stack_err)?;

        info!("connected to {name}");
        Ok(Some(Arc::new(BtleplugLink {
            adapter: adapter.clone(),
            peripheral,
            characteristic,
        })))
    }
}

/// A connected, subscribed lamp.
pub struct BtleplugLink {
    adapter: Adapter,
    peripheral: Peripheral,
    characteristic: Characteristic,
}

#[async_trait]
impl BleLink for BtleplugLink {
    async fn read(&self) -> Result<Vec<u8>, BleError> {
        self.peripheral
            .read(&self.characteristic)
            .await
            .map_err(stack_err)
    }

    async fn write(&self, data: &[u8]) -> Result<(), BleError> {
        self.peripheral
            .write(&self.characteristic, data, WriteType::WithoutResponse)
            .await
            .map_err(stack_err)
    }

    async fn notifications(&self) -> Result<BoxStream<'static, Vec<u8>>, BleError> {
        let uuid = self.characteristic.uuid;
        let id = self.peripheral.id();
        let notes = self.peripheral.notifications().await.map_err(stack_err)?;
        let events = self.adapter.events().await.map_err(stack_err)?;

        // btleplug keeps the notification stream open after a disconnect, so
        // cut it when the central reports the peripheral gone.
        let disconnected = events
            .filter(move |e| {
                futures::future::ready(
                    matches!(e, CentralEvent::DeviceDisconnected(gone) if *gone == id),
                )
            })
            .into_future();

        Ok(notes
            .filter(move |n| futures::future::ready(n.uuid == uuid))
            .map(|n| n.value)
            .take_until(disconnected)
            .boxed())
    }
}
