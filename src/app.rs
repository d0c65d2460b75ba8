//! Core application runner (business logic) for `bthome-listener`.
//!
//! This module is decoupled from CLI parsing, logger setup and process exit
//! codes so it can be tested deterministically.

use crate::admission::{AdmissionState, AllowList};
use crate::handlers::{IlluminanceMonitor, MotionSwitch, Switch, UpdatePrinter};
use crate::output::influxdb::InfluxDbFormatter;
use crate::pipeline::Pipeline;
use crate::router::Router;
use crate::scanner::{Advertisement, ScanError};
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Only process advertisements from this device. Repeat for more devices;
    /// without any, every device is processed.
    /// Format: --allow B0:C7:DE:3B:29:15
    #[arg(
        long = "allow",
        value_parser = crate::mac_address::parse_allowed_address,
        value_name = "MAC"
    )]
    pub allowed: Vec<String>,

    /// Illuminance in lux at or below which a reading counts as low light.
    #[arg(long, default_value_t = 10.0, value_name = "LUX")]
    pub illuminance_threshold: f64,

    /// Switch turned on when motion is detected.
    #[arg(long, default_value_t = 0, value_name = "ID")]
    pub switch_id: u8,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "bthome_measurement")]
    pub influxdb_measurement: String,

    /// Verbose output, print rejected and partially decoded advertisements
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Advertisement>, ScanError>> + Send + '_>>
    {
        Box::pin(crate::scanner::start_scan())
    }
}

/// Run the core processing loop until the scanner closes its channel.
///
/// - Admitted records are routed to the motion switch, the illuminance
///   monitor and an InfluxDB line written to `out`.
/// - Handler failures are always written to `err`.
/// - Rejected and partially decoded advertisements are written to `err` only
///   when `options.verbose` is true.
pub async fn run_with_io<S: Switch>(
    options: Options,
    scanner: &dyn Scanner,
    switch: S,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let allowed = (!options.allowed.is_empty())
        .then(|| options.allowed.iter().collect::<AllowList>());
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement);

    let router = Router::new()
        .on_motion(MotionSwitch::new(switch))
        .on_illuminance(IlluminanceMonitor::new(options.illuminance_threshold))
        .on_update(UpdatePrinter::new(formatter, out));
    let mut pipeline = Pipeline::new(AdmissionState::new(allowed), router);

    let mut advertisements = scanner.start_scan().await?;

    while let Some(advertisement) = advertisements.recv().await {
        match pipeline.process(&advertisement) {
            Ok(dispatched) => {
                for error in &dispatched.errors {
                    writeln!(err, "{error}")?;
                }
                if options.verbose
                    && let Some(stop) = dispatched.stop
                {
                    writeln!(err, "{}: partial record, {stop}", dispatched.address)?;
                }
            }
            Err(rejection) => {
                if options.verbose {
                    writeln!(err, "{rejection}")?;
                }
            }
        }
    }

    Ok(())
}
