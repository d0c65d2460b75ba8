//! Business logic attached to the event routes.
//!
//! - [`MotionSwitch`] turns a switch on when a sensor reports motion.
//! - [`IlluminanceMonitor`] reports when a sensor's light level drops to or
//!   below a threshold, and when it recovers.
//! - [`UpdatePrinter`] writes every admitted record to an output stream.

use crate::admission::AdmittedRecord;
use crate::mac_address::normalize_address;
use crate::output::RecordFormatter;
use crate::router::{Handler, HandlerError};
use std::collections::HashMap;
use std::io::Write;

/// An output that can be switched on and off.
///
/// The actual actuation belongs to the host; implementations only translate
/// the request.
pub trait Switch {
    fn set(&mut self, on: bool) -> Result<(), HandlerError>;
}

impl<S: Switch + ?Sized> Switch for &mut S {
    fn set(&mut self, on: bool) -> Result<(), HandlerError> {
        (**self).set(on)
    }
}

/// Switch that only logs the requested state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSwitch {
    id: u8,
    state: Option<bool>,
}

impl LogSwitch {
    pub fn new(id: u8) -> Self {
        LogSwitch { id, state: None }
    }

    /// Last requested state, `None` before the first request.
    pub fn state(&self) -> Option<bool> {
        self.state
    }
}

impl Switch for LogSwitch {
    fn set(&mut self, on: bool) -> Result<(), HandlerError> {
        log::info!("switch {}: {}", self.id, if on { "on" } else { "off" });
        self.state = Some(on);
        Ok(())
    }
}

/// Turns the switch on whenever motion is detected.
///
/// Motion cleared does not turn it off again.
#[derive(Debug)]
pub struct MotionSwitch<S> {
    switch: S,
}

impl<S: Switch> MotionSwitch<S> {
    pub fn new(switch: S) -> Self {
        MotionSwitch { switch }
    }

    pub fn into_inner(self) -> S {
        self.switch
    }
}

impl<S: Switch> Handler for MotionSwitch<S> {
    fn handle(&mut self, record: &AdmittedRecord) -> Result<(), HandlerError> {
        if record.record.motion() == Some(true) {
            log::debug!("{}: motion detected", record.source_address);
            self.switch.set(true)?;
        }
        Ok(())
    }
}

/// Light level relative to the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightLevel {
    /// At or below the threshold
    Low,
    Normal,
}

/// Classifies illuminance readings against a threshold, per device.
#[derive(Debug)]
pub struct IlluminanceMonitor {
    threshold: f64,
    last_level: HashMap<String, LightLevel>,
}

impl IlluminanceMonitor {
    pub fn new(threshold: f64) -> Self {
        IlluminanceMonitor {
            threshold,
            last_level: HashMap::new(),
        }
    }

    pub fn classify(&self, lux: f64) -> LightLevel {
        if lux <= self.threshold {
            LightLevel::Low
        } else {
            LightLevel::Normal
        }
    }

    /// Last classification for a device.
    pub fn level(&self, address: &str) -> Option<LightLevel> {
        self.last_level.get(&normalize_address(address)).copied()
    }
}

impl Handler for IlluminanceMonitor {
    fn handle(&mut self, record: &AdmittedRecord) -> Result<(), HandlerError> {
        let Some(lux) = record.record.illuminance() else {
            return Ok(());
        };
        let level = self.classify(lux);
        let previous = self
            .last_level
            .insert(normalize_address(&record.source_address), level);

        if previous == Some(level) {
            log::debug!("{}: illuminance {lux} lx", record.source_address);
            return Ok(());
        }
        match level {
            LightLevel::Low => log::info!(
                "{}: low light, {lux} lx at or below {} lx",
                record.source_address,
                self.threshold
            ),
            LightLevel::Normal => log::info!(
                "{}: light level {lux} lx above {} lx",
                record.source_address,
                self.threshold
            ),
        }
        Ok(())
    }
}

/// Writes every admitted record as one formatted line.
pub struct UpdatePrinter<'w, F> {
    formatter: F,
    out: &'w mut dyn Write,
}

impl<'w, F: RecordFormatter> UpdatePrinter<'w, F> {
    pub fn new(formatter: F, out: &'w mut dyn Write) -> Self {
        UpdatePrinter { formatter, out }
    }
}

impl<F: RecordFormatter> Handler for UpdatePrinter<'_, F> {
    fn handle(&mut self, record: &AdmittedRecord) -> Result<(), HandlerError> {
        let line = self.formatter.format(record);
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}
