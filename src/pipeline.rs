//! Decode, admit and dispatch, one advertisement at a time.

use crate::admission::{AdmissionState, Rejection};
use crate::decoder::{DecodeStop, decode_service_data};
use crate::router::{RouteError, Router};
use crate::scanner::Advertisement;

/// Result of a dispatched advertisement.
#[derive(Debug)]
pub struct Dispatched {
    /// Source address of the advertisement
    pub address: String,
    /// Why decoding ended early, if it did
    pub stop: Option<DecodeStop>,
    /// Handlers that failed
    pub errors: Vec<RouteError>,
}

/// Long-lived owner of the admission state and the router.
#[derive(Debug)]
pub struct Pipeline<'a> {
    admission: AdmissionState,
    router: Router<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(admission: AdmissionState, router: Router<'a>) -> Self {
        Pipeline { admission, router }
    }

    pub fn admission(&self) -> &AdmissionState {
        &self.admission
    }

    /// Run one advertisement through the decoder, the admission filter and the
    /// router.
    ///
    /// Every advertisement is independent; a rejected one leaves the admission
    /// state untouched and the next retransmission is judged on its own.
    pub fn process(&mut self, advertisement: &Advertisement) -> Result<Dispatched, Rejection> {
        let address = advertisement.address.to_string();
        let decoded = decode_service_data(advertisement.service_data.as_deref());
        let admitted = self
            .admission
            .admit(decoded, &address, advertisement.rssi)?;

        let stop = admitted.record.stop();
        if let Some(stop) = stop {
            log::debug!("{address}: partial record, {stop}");
        }

        let errors = self.router.dispatch(&admitted);
        Ok(Dispatched {
            address,
            stop,
            errors,
        })
    }
}
