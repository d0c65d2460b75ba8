//! `bthome-listener` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logger setup and
//! process exit codes. Decoding, admission and routing of BTHome v2
//! advertisements live in the modules below; [`crate::app`] ties them to a
//! scanner and can be tested deterministically with injected scanner and
//! output streams.

pub mod admission;
pub mod app;
pub mod decoder;
pub mod handlers;
pub mod mac_address;
pub mod output;
pub mod pipeline;
pub mod reader;
pub mod router;
pub mod scanner;
pub mod schema;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use admission::{AdmissionState, AdmittedRecord, AllowList, Rejection};
pub use decoder::{DecodeError, DecodeStop, DecodedRecord, decode, decode_service_data};
pub use handlers::{IlluminanceMonitor, LogSwitch, MotionSwitch, Switch, UpdatePrinter};
pub use mac_address::MacAddress;
pub use output::RecordFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use pipeline::{Dispatched, Pipeline};
pub use router::{Handler, HandlerError, Route, RouteError, Router};
pub use scanner::{Advertisement, ScanError};
pub use schema::{FieldKind, FieldSpec, Value};
