//! BlueZ D-Bus backend for BTHome scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! An advertisement monitor matching BTHome service data reports each device
//! once; after that, the device's service data and RSSI property changes are
//! followed so that every new advertisement is forwarded.

use super::{ADVERTISEMENT_CHANNEL_BUFFER_SIZE, Advertisement, BTHOME_SERVICE_UUID16, ScanError};
use crate::mac_address::MacAddress;
use bluer::monitor::{Monitor, MonitorEvent, Pattern};
use bluer::{Adapter, Address, DeviceEvent, DeviceProperty, Uuid};
use futures::StreamExt;
use std::collections::HashSet;
use tokio::sync::mpsc;

/// Service Data - 16-bit UUID (AD type 0x16)
const SERVICE_DATA_16_TYPE: u8 = 0x16;

/// Full 128-bit form of the BTHome service UUID.
const BTHOME_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_fcd2_0000_1000_8000_0080_5f9b_34fb);

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start scanning for BTHome devices using the BlueZ D-Bus backend.
///
/// This function initializes the Bluetooth adapter and registers a passive
/// advertisement monitor for BTHome service data. Runs indefinitely until
/// interrupted.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

    // Service data AD structures start with the UUID in little-endian order
    let pattern = Pattern {
        data_type: SERVICE_DATA_16_TYPE,
        start_position: 0,
        content: BTHOME_SERVICE_UUID16.to_le_bytes().to_vec(),
    };

    let monitor_manager = adapter.monitor().await?;
    let mut monitor_handle = monitor_manager
        .register(Monitor {
            patterns: Some(vec![pattern]),
            ..Default::default()
        })
        .await?;

    tokio::spawn(async move {
        // Keep all Bluetooth state alive by moving it into this task
        let _session = session;
        let _monitor_manager = monitor_manager;
        let mut followed = HashSet::new();

        while let Some(event) = monitor_handle.next().await {
            let MonitorEvent::DeviceFound(device_id) = event else {
                continue;
            };
            let address = device_id.device;

            if let Err(e) = forward_current(&adapter, address, &tx).await {
                log::warn!("{}: {e}", MacAddress::from(address));
            }
            if followed.insert(address) {
                follow_device(adapter.clone(), address, tx.clone());
            }
        }
    });

    Ok(rx)
}

/// Forward the service data the adapter currently holds for a device.
async fn forward_current(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<Advertisement>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;
    let rssi = device.rssi().await?.unwrap_or_default();
    let service_data = device
        .service_data()
        .await?
        .and_then(|mut data| data.remove(&BTHOME_SERVICE_UUID));

    let _ = tx
        .send(Advertisement {
            address: address.into(),
            rssi,
            service_data,
        })
        .await;
    Ok(())
}

/// Forward every later service data change of a device.
fn follow_device(adapter: Adapter, address: Address, tx: mpsc::Sender<Advertisement>) {
    tokio::spawn(async move {
        let mac = MacAddress::from(address);
        let device = match adapter.device(address) {
            Ok(device) => device,
            Err(e) => {
                log::warn!("{mac}: {e}");
                return;
            }
        };
        let mut events = match device.events().await {
            Ok(events) => Box::pin(events),
            Err(e) => {
                log::warn!("{mac}: cannot follow device: {e}");
                return;
            }
        };
        let mut rssi = device.rssi().await.ok().flatten().unwrap_or_default();

        while let Some(event) = events.next().await {
            let DeviceEvent::PropertyChanged(property) = event else {
                continue;
            };
            match property {
                DeviceProperty::Rssi(value) => rssi = value,
                DeviceProperty::ServiceData(mut data) => {
                    let Some(service_data) = data.remove(&BTHOME_SERVICE_UUID) else {
                        continue;
                    };
                    let advertisement = Advertisement {
                        address: mac,
                        rssi,
                        service_data: Some(service_data),
                    };
                    if tx.send(advertisement).await.is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
    });
}
