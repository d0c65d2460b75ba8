//! Output formatters for admitted BTHome records.
//!
//! This module provides a trait for formatting records and implementations
//! for various output formats. Currently supports InfluxDB line protocol.

pub mod influxdb;

use crate::admission::AdmittedRecord;

/// Trait for formatting admitted records into output strings.
pub trait RecordFormatter: Send + Sync {
    /// Format a record as a single line (without the trailing newline).
    fn format(&self, record: &AdmittedRecord) -> String;
}
