//! BLE scanning for BTHome advertisements.
//!
//! Backends deliver raw [`Advertisement`]s through a channel; decoding happens
//! downstream in [`crate::pipeline`] so that every backend shares it.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::mac_address::MacAddress;
use thiserror::Error;
use tokio::sync::mpsc;

/// One received advertisement from a BTHome device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Source address of the advertisement
    pub address: MacAddress,
    /// Received signal strength in dBm
    pub rssi: i16,
    /// BTHome service data payload, `None` if the device sent none
    pub service_data: Option<Vec<u8>>,
}

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(&'static str),
}

/// BTHome 16-bit service UUID.
///
/// See: https://bthome.io/format/
pub const BTHOME_SERVICE_UUID16: u16 = 0xFCD2;

/// Channel buffer size for received advertisements.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// Start scanning for BTHome advertisements.
///
/// # Returns
/// A receiver for advertisements. The channel stays open as long as the
/// backend keeps scanning.
pub async fn start_scan() -> Result<mpsc::Receiver<Advertisement>, ScanError> {
    #[cfg(feature = "bluer")]
    return bluer::start_scan().await;

    #[cfg(not(feature = "bluer"))]
    Err(ScanError::BackendNotAvailable("bluer"))
}
