//! Packet admission for decoded BTHome records.
//!
//! Beacons repeat every advertisement many times so that at least one copy
//! reaches the receiver. Only the first copy of each reading should trigger
//! handlers, so records are de-duplicated on their packet id. Devices are
//! tracked independently, keyed on the normalized source address, and an
//! optional allow-list restricts which devices are processed at all.

use crate::decoder::{DecodeError, DecodedRecord};
use crate::mac_address::normalize_address;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A decoded record that passed the admission filter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmittedRecord {
    pub record: DecodedRecord,
    /// Source address as reported by the scanner
    pub source_address: String,
    /// Received signal strength in dBm
    pub signal_strength: i16,
}

/// Reasons for dropping an advertisement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("{address}: address not allowed")]
    AddressNotAllowed { address: String },
    #[error("{address}: undecodable advertisement: {source}")]
    Undecodable {
        address: String,
        #[source]
        source: DecodeError,
    },
    #[error("{address}: duplicate packet id {packet_id}")]
    Duplicate { address: String, packet_id: u8 },
}

/// Case-insensitive set of source addresses, de-duplicated on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    addresses: HashSet<String>,
}

impl AllowList {
    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(&normalize_address(address))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        AllowList {
            addresses: iter
                .into_iter()
                .map(|a| normalize_address(a.as_ref()))
                .collect(),
        }
    }
}

/// Admission state for the lifetime of the listener.
///
/// Holds the last admitted packet id for each device and the optional
/// allow-list. A device that has never been admitted has no entry, which no
/// packet id can match.
#[derive(Debug, Default)]
pub struct AdmissionState {
    allowed: Option<AllowList>,
    last_packet_ids: HashMap<String, u8>,
}

impl AdmissionState {
    /// Create a filter. `None` allows every address.
    ///
    /// # Example
    /// ```
    /// use bthome_listener::admission::{AdmissionState, AllowList};
    ///
    /// let allowed: AllowList = ["B0:C7:DE:3B:29:15"].into_iter().collect();
    /// let state = AdmissionState::new(Some(allowed));
    /// assert!(state.is_allowed("b0:c7:de:3b:29:15"));
    /// assert!(!state.is_allowed("11:22:33:44:55:66"));
    /// ```
    pub fn new(allowed: Option<AllowList>) -> Self {
        AdmissionState {
            allowed,
            last_packet_ids: HashMap::new(),
        }
    }

    pub fn is_allowed(&self, address: &str) -> bool {
        self.allowed
            .as_ref()
            .is_none_or(|allowed| allowed.contains(address))
    }

    /// Last admitted packet id for a device.
    pub fn last_packet_id(&self, address: &str) -> Option<u8> {
        self.last_packet_ids
            .get(&normalize_address(address))
            .copied()
    }

    /// Decide whether a decoded advertisement should be dispatched.
    ///
    /// Checks, in order: the allow-list, whether the payload could be decoded,
    /// and whether the packet id repeats the last one admitted from the same
    /// device. Records without a packet id are admitted without touching the
    /// duplicate state. On success the packet id is remembered and the source
    /// address and signal strength are attached to the record.
    ///
    /// Packet ids wrap at 256, so a new reading is only mistaken for a
    /// duplicate if exactly 256 readings in between were missed.
    pub fn admit(
        &mut self,
        decoded: Result<DecodedRecord, DecodeError>,
        source_address: &str,
        signal_strength: i16,
    ) -> Result<AdmittedRecord, Rejection> {
        if !self.is_allowed(source_address) {
            log::trace!("{source_address}: not in allow-list");
            return Err(Rejection::AddressNotAllowed {
                address: source_address.to_string(),
            });
        }

        let record = decoded.map_err(|source| Rejection::Undecodable {
            address: source_address.to_string(),
            source,
        })?;

        if let Some(packet_id) = record.packet_id() {
            let key = normalize_address(source_address);
            if self.last_packet_ids.get(&key) == Some(&packet_id) {
                log::trace!("{source_address}: duplicate packet id {packet_id}");
                return Err(Rejection::Duplicate {
                    address: source_address.to_string(),
                    packet_id,
                });
            }
            self.last_packet_ids.insert(key, packet_id);
        }

        Ok(AdmittedRecord {
            record,
            source_address: source_address.to_string(),
            signal_strength,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Header, decode};
    use crate::schema::FieldKind::{Illuminance, Motion, PacketId};
    use crate::test_utils::payload;

    const ADDR: &str = "B0:C7:DE:3B:29:15";
    const OTHER: &str = "11:22:33:44:55:66";

    fn with_pid(pid: u8) -> Result<DecodedRecord, DecodeError> {
        decode(&payload(&[(PacketId, f64::from(pid)), (Motion, 1.0)]))
    }

    #[test]
    fn test_first_packet_admitted() {
        let mut state = AdmissionState::default();
        let admitted = state.admit(with_pid(5), ADDR, -70).unwrap();
        assert_eq!(admitted.source_address, ADDR);
        assert_eq!(admitted.signal_strength, -70);
        assert_eq!(admitted.record.packet_id(), Some(5));
        assert_eq!(state.last_packet_id(ADDR), Some(5));
    }

    #[test]
    fn test_duplicate_rejected_then_new_pid_admitted() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(5), ADDR, -70).is_ok());
        assert_eq!(
            state.admit(with_pid(5), ADDR, -71),
            Err(Rejection::Duplicate {
                address: ADDR.to_string(),
                packet_id: 5
            })
        );
        assert!(state.admit(with_pid(6), ADDR, -72).is_ok());
        assert_eq!(state.last_packet_id(ADDR), Some(6));
    }

    #[test]
    fn test_rejected_duplicate_does_not_reset_state() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(1), ADDR, -70).is_ok());
        for _ in 0..10 {
            assert!(state.admit(with_pid(1), ADDR, -70).is_err());
        }
        assert_eq!(state.last_packet_id(ADDR), Some(1));
    }

    #[test]
    fn test_first_pid_zero_is_admitted() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(0), ADDR, -70).is_ok());
    }

    #[test]
    fn test_devices_tracked_independently() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(9), ADDR, -70).is_ok());
        assert!(state.admit(with_pid(9), OTHER, -70).is_ok());
        assert!(state.admit(with_pid(9), ADDR, -70).is_err());
        assert!(state.admit(with_pid(9), OTHER, -70).is_err());
    }

    #[test]
    fn test_duplicate_key_is_case_insensitive() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(3), ADDR, -70).is_ok());
        assert!(matches!(
            state.admit(with_pid(3), &ADDR.to_lowercase(), -70),
            Err(Rejection::Duplicate { .. })
        ));
    }

    #[test]
    fn test_pid_wraps() {
        let mut state = AdmissionState::default();
        assert!(state.admit(with_pid(255), ADDR, -70).is_ok());
        assert!(state.admit(with_pid(0), ADDR, -70).is_ok());
    }

    #[test]
    fn test_record_without_pid_always_admitted() {
        let mut state = AdmissionState::default();
        let no_pid = || decode(&payload(&[(Illuminance, 12.5)]));
        assert!(state.admit(no_pid(), ADDR, -70).is_ok());
        assert!(state.admit(no_pid(), ADDR, -70).is_ok());
        assert_eq!(state.last_packet_id(ADDR), None);

        assert!(state.admit(with_pid(4), ADDR, -70).is_ok());
        assert!(state.admit(no_pid(), ADDR, -70).is_ok());
        assert_eq!(state.last_packet_id(ADDR), Some(4));
    }

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let allowed: AllowList = ["b0:c7:de:3b:29:15"].into_iter().collect();
        let mut state = AdmissionState::new(Some(allowed));

        assert!(state.admit(with_pid(1), "B0:C7:DE:3B:29:15", -70).is_ok());
        assert_eq!(
            state.admit(with_pid(2), OTHER, -70),
            Err(Rejection::AddressNotAllowed {
                address: OTHER.to_string()
            })
        );
    }

    #[test]
    fn test_allow_list_deduplicates() {
        let allowed: AllowList = ["B0:C7:DE:3B:29:15", "b0:c7:de:3b:29:15", OTHER]
            .into_iter()
            .collect();
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains(" 11:22:33:44:55:66"));
    }

    #[test]
    fn test_empty_allow_list_rejects_everything() {
        let state = AdmissionState::new(Some(AllowList::default()));
        assert!(!state.is_allowed(ADDR));
    }

    #[test]
    fn test_address_checked_before_decode_result() {
        let allowed: AllowList = [ADDR].into_iter().collect();
        let mut state = AdmissionState::new(Some(allowed));
        assert!(matches!(
            state.admit(Err(DecodeError::EmptyInput), OTHER, -70),
            Err(Rejection::AddressNotAllowed { .. })
        ));
    }

    #[test]
    fn test_undecodable_rejected() {
        let mut state = AdmissionState::default();
        let header = Header::parse(0x41);
        assert_eq!(
            state.admit(Err(DecodeError::Encrypted { header }), ADDR, -70),
            Err(Rejection::Undecodable {
                address: ADDR.to_string(),
                source: DecodeError::Encrypted { header }
            })
        );
        assert!(matches!(
            state.admit(decode(&[0x20]), ADDR, -70),
            Err(Rejection::Undecodable {
                source: DecodeError::UnsupportedVersion { version: 1 },
                ..
            })
        ));
        assert_eq!(state.last_packet_id(ADDR), None);
    }

    #[test]
    fn test_partial_record_admitted() {
        let mut state = AdmissionState::default();
        let partial = decode(&[0x40, 0x00, 0x05, 0xFF]);
        let admitted = state.admit(partial, ADDR, -70).unwrap();
        assert!(!admitted.record.is_complete());
        assert_eq!(state.last_packet_id(ADDR), Some(5));
    }

    #[test]
    fn test_rejection_display() {
        let err = Rejection::Duplicate {
            address: ADDR.to_string(),
            packet_id: 5,
        };
        assert_eq!(err.to_string(), "B0:C7:DE:3B:29:15: duplicate packet id 5");

        let err = Rejection::Undecodable {
            address: ADDR.to_string(),
            source: DecodeError::EmptyInput,
        };
        assert_eq!(
            err.to_string(),
            "B0:C7:DE:3B:29:15: undecodable advertisement: no data"
        );
    }
}
