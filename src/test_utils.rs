use crate::admission::AdmittedRecord;
use crate::decoder::decode;
use crate::mac_address::MacAddress;
use crate::schema::FieldKind;

/// A stable MAC address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xB0, 0xC7, 0xDE, 0x3B, 0x29, 0x15]);

/// Device information byte: version 2, unencrypted, not trigger based.
pub const HEADER_V2: u8 = 0x40;

/// Encode one object as `object id, little-endian value`.
///
/// `value` is the scaled value; it is divided by the field's scale and
/// rounded before encoding.
pub fn encode_field(kind: FieldKind, value: f64) -> Vec<u8> {
    let spec = kind.spec();
    let raw = (value / spec.scale).round() as i32;
    let width = spec.int_type.width().bytes();

    let mut bytes = Vec::with_capacity(1 + width);
    bytes.push(spec.tag);
    bytes.extend_from_slice(&raw.to_le_bytes()[..width]);
    bytes
}

/// Build a complete version 2 payload from `(kind, scaled value)` pairs.
pub fn payload(fields: &[(FieldKind, f64)]) -> Vec<u8> {
    let mut data = vec![HEADER_V2];
    for &(kind, value) in fields {
        data.extend(encode_field(kind, value));
    }
    data
}

/// Decode `data` and wrap it as if it had been admitted from [`TEST_MAC`].
pub fn admitted(data: &[u8]) -> AdmittedRecord {
    AdmittedRecord {
        record: decode(data).unwrap(),
        source_address: TEST_MAC.to_string(),
        signal_strength: -60,
    }
}
