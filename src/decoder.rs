//! BTHome v2 service data decoder.
//!
//! A payload is one device information byte followed by a sequence of
//! `object id, value` pairs. The object id selects the value width,
//! signedness and scale from [`crate::schema`]. Decoding is best effort: an
//! unknown object id or a truncated value ends the stream, and everything read
//! before that point is kept.

use crate::reader::Cursor;
use crate::schema::{FieldKind, Value};
use thiserror::Error;

/// The only BTHome format version this decoder understands.
pub const BTHOME_VERSION: u8 = 2;

const ENCRYPTION_FLAG: u8 = 0x01;
const TRIGGER_BASED_FLAG: u8 = 0x04;
const VERSION_SHIFT: u8 = 5;

/// Device information byte at the start of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Payload is AES-CCM encrypted
    pub encrypted: bool,
    /// Device only advertises on events rather than at a fixed interval
    pub trigger_based: bool,
    /// Format version (bits 5-7)
    pub version: u8,
}

impl Header {
    pub fn parse(byte: u8) -> Self {
        Header {
            encrypted: byte & ENCRYPTION_FLAG != 0,
            trigger_based: byte & TRIGGER_BASED_FLAG != 0,
            version: byte >> VERSION_SHIFT,
        }
    }
}

/// Payloads that cannot be decoded at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No service data, or an empty service data payload
    #[error("no data")]
    EmptyInput,
    #[error(
        "unsupported BTHome version {version} (only version {supported} supported)",
        supported = BTHOME_VERSION
    )]
    UnsupportedVersion { version: u8 },
    /// Only the header is available; field data is never exposed
    #[error("encrypted payload")]
    Encrypted { header: Header },
}

/// Why a decode ended before the end of the payload.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStop {
    #[error("unknown field tag {tag:#04x} at offset {offset}")]
    UnknownFieldTag { tag: u8, offset: usize },
    #[error(
        "truncated {} field at offset {offset}: needed {needed} bytes, {available} available",
        .kind.name()
    )]
    Truncated {
        kind: FieldKind,
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// One decoded object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    pub value: Value,
}

impl Field {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Fields decoded from one advertisement, in payload order.
///
/// Keys are field names. Objects that share a name (the different resolutions
/// of temperature, humidity, count, ...) overwrite the earlier value in place.
///
/// Records only come out of [`decode`] and cannot be changed afterwards:
///
/// ```compile_fail
/// use bthome_listener::decoder::decode;
/// use bthome_listener::schema::{FieldKind, Value};
///
/// let mut record = decode(&[0x40]).unwrap();
/// record.insert(FieldKind::PacketId, Value::Integer(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    header: Header,
    fields: Vec<Field>,
    stop: Option<DecodeStop>,
}

impl DecodedRecord {
    fn new(header: Header) -> Self {
        DecodedRecord {
            header,
            fields: Vec::new(),
            stop: None,
        }
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Insert a field, replacing any earlier field with the same name.
    fn insert(&mut self, kind: FieldKind, value: Value) {
        let field = Field { kind, value };
        match self.fields.iter_mut().find(|f| f.name() == kind.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Packet id, used to drop retransmissions of the same reading.
    pub fn packet_id(&self) -> Option<u8> {
        self.get(FieldKind::PacketId.name())
            .and_then(Value::as_integer)
            .and_then(|id| u8::try_from(id).ok())
    }

    /// Motion state, `true` when motion is detected.
    pub fn motion(&self) -> Option<bool> {
        self.get(FieldKind::Motion.name()).map(|v| v.as_f64() != 0.0)
    }

    /// Illuminance in lux.
    pub fn illuminance(&self) -> Option<f64> {
        self.get(FieldKind::Illuminance.name()).map(Value::as_f64)
    }

    /// Reason decoding ended early, or `None` if the whole payload was read.
    pub fn stop(&self) -> Option<DecodeStop> {
        self.stop
    }

    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }
}

/// Decode a BTHome v2 service data payload.
///
/// # Errors
/// - [`DecodeError::EmptyInput`] for an empty payload
/// - [`DecodeError::UnsupportedVersion`] when the header version is not 2
/// - [`DecodeError::Encrypted`] when the encryption flag is set
///
/// Unknown object ids and truncated values are not errors: the record decoded
/// so far is returned with [`DecodedRecord::stop`] set.
pub fn decode(data: &[u8]) -> Result<DecodedRecord, DecodeError> {
    let mut cursor = Cursor::new(data);
    let header = Header::parse(cursor.next_byte().ok_or(DecodeError::EmptyInput)?);

    if header.version != BTHOME_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            version: header.version,
        });
    }
    if header.encrypted {
        return Err(DecodeError::Encrypted { header });
    }

    let mut record = DecodedRecord::new(header);

    while let Some(tag) = cursor.next_byte() {
        let offset = cursor.position() - 1;

        let Some(kind) = FieldKind::from_tag(tag) else {
            log::debug!("unknown BTHome object id {tag:#04x} at offset {offset}");
            record.stop = Some(DecodeStop::UnknownFieldTag { tag, offset });
            break;
        };

        let spec = kind.spec();
        match cursor.read(spec.int_type) {
            Ok(raw) => record.insert(kind, spec.apply(raw)),
            Err(truncated) => {
                log::debug!("truncated {} at offset {offset}: {truncated}", spec.name);
                record.stop = Some(DecodeStop::Truncated {
                    kind,
                    offset,
                    needed: truncated.needed,
                    available: truncated.available,
                });
                break;
            }
        }
    }

    Ok(record)
}

/// Decode optional service data, treating a missing payload as empty input.
pub fn decode_service_data(data: Option<&[u8]>) -> Result<DecodedRecord, DecodeError> {
    data.map_or(Err(DecodeError::EmptyInput), decode)
}
