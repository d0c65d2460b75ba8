//! InfluxDB line protocol output formatter.

use crate::admission::AdmittedRecord;
use crate::output::RecordFormatter;
use crate::schema::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Integer(num) => write!(f, "{num}i"),
            FieldValue::Float(num) => write!(f, "{num}"),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Integer(v) => FieldValue::Integer(i64::from(v)),
            Value::Float(v) => FieldValue::Float(v),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
}

fn fmt_tags(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (key, value) in data_point.tag_set.iter() {
        write!(fmt, ",{}={}", key, value)?;
    }
    Ok(())
}

fn fmt_fields(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (i, (key, value)) in data_point.field_set.iter().enumerate() {
        if i > 0 {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}={}", key, value)?;
    }
    Ok(())
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        fmt_tags(self, fmt)?;
        write!(fmt, " ")?;
        fmt_fields(self, fmt)
    }
}

/// InfluxDB line protocol formatter.
///
/// Every decoded field becomes a line protocol field, the signal strength is
/// written as `rssi`, and the source address is the `mac` tag. Lines carry no
/// timestamp; the receiving agent stamps them on arrival.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(&self, record: &AdmittedRecord) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("mac".to_string(), record.source_address.clone());
        tags
    }

    fn field_set(&self, record: &AdmittedRecord) -> BTreeMap<String, FieldValue> {
        let mut fields: BTreeMap<String, FieldValue> = record
            .record
            .fields()
            .iter()
            .map(|field| (field.name().to_string(), field.value.into()))
            .collect();
        fields.insert(
            "rssi".to_string(),
            FieldValue::Integer(i64::from(record.signal_strength)),
        );
        fields
    }

    fn to_data_point(&self, record: &AdmittedRecord) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(record),
            field_set: self.field_set(record),
        }
    }
}

impl RecordFormatter for InfluxDbFormatter {
    fn format(&self, record: &AdmittedRecord) -> String {
        format!("{}", self.to_data_point(record))
    }
}
