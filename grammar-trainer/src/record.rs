//! The fixed-layout binary progress record.
//!
//! | Offset | Size | Field          |
//! |--------|------|----------------|
//! | 0      | 1    | version        |
//! | 1      | 4    | created_at     |
//! | 5      | 4    | last_active_at |
//! | 9      | 2    | rule_slots     |
//! | 11     | 1120 | powers         |
//!
//! All integers are big-endian, timestamps are unix seconds.

use chrono::{DateTime, Utc};

use crate::power::{Powers, RULE_SLOTS};

pub const RECORD_VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 11;
pub const BLOB_SIZE: usize = HEADER_SIZE + RULE_SLOTS * 2;

const VERSION_OFFSET: usize = 0;
const CREATED_AT_OFFSET: usize = 1;
const LAST_ACTIVE_AT_OFFSET: usize = 5;
const RULE_SLOTS_OFFSET: usize = 9;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Progress record is {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub created_at: u32,
    pub last_active_at: u32,
    pub rule_slots: u16,
}

impl RecordHeader {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.created_at), 0)
    }

    pub fn last_active_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.last_active_at), 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressRecord {
    pub header: RecordHeader,
    pub powers: Powers,
}

fn unix_seconds(time: DateTime<Utc>) -> u32 {
    // The field is 32 bits wide; anything outside saturates.
    u32::try_from(time.timestamp().max(0)).unwrap_or(u32::MAX)
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Serialize `powers` with both timestamps set to `now`.
pub fn encode_record(powers: &Powers, now: DateTime<Utc>) -> Vec<u8> {
    let timestamp = unix_seconds(now);
    let mut bytes = Vec::with_capacity(BLOB_SIZE);
    bytes.push(RECORD_VERSION);
    bytes.extend_from_slice(&timestamp.to_be_bytes());
    bytes.extend_from_slice(&timestamp.to_be_bytes());
    bytes.extend_from_slice(&(RULE_SLOTS as u16).to_be_bytes());
    for power in powers.as_slice() {
        bytes.extend_from_slice(&power.to_be_bytes());
    }
    debug_assert_eq!(bytes.len(), BLOB_SIZE);
    bytes
}

pub fn encode_record_now(powers: &Powers) -> Vec<u8> {
    encode_record(powers, Utc::now())
}

fn check_length(bytes: &[u8]) -> Result<(), RecordError> {
    if bytes.len() != BLOB_SIZE {
        return Err(RecordError::WrongLength {
            expected: BLOB_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(())
}

pub fn decode_header(bytes: &[u8]) -> Result<RecordHeader, RecordError> {
    check_length(bytes)?;
    Ok(RecordHeader {
        version: bytes[VERSION_OFFSET],
        created_at: read_u32(bytes, CREATED_AT_OFFSET),
        last_active_at: read_u32(bytes, LAST_ACTIVE_AT_OFFSET),
        rule_slots: read_u16(bytes, RULE_SLOTS_OFFSET),
    })
}

/// Parse a progress record.
///
/// Only the length is enforced. A record with an unexpected version or slot count is still read
/// with the current layout, and the mismatch is logged.
pub fn decode_record(bytes: &[u8]) -> Result<ProgressRecord, RecordError> {
    let header = decode_header(bytes)?;
    if header.version != RECORD_VERSION {
        log::warn!(
            "Progress record has version {}, reading it as version {RECORD_VERSION}",
            header.version
        );
    }
    if usize::from(header.rule_slots) != RULE_SLOTS {
        log::warn!(
            "Progress record claims {} rule slots, reading {RULE_SLOTS}",
            header.rule_slots
        );
    }

    let mut slots = [0u16; RULE_SLOTS];
    for (slot, chunk) in slots
        .iter_mut()
        .zip(bytes[HEADER_SIZE..].chunks_exact(2))
    {
        *slot = u16::from_be_bytes([chunk[0], chunk[1]]);
    }

    Ok(ProgressRecord {
        header,
        powers: Powers::from_raw(slots),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::MAX_POWER;
    use rand::Rng;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn test_layout() {
        let mut powers = Powers::empty();
        powers.record_answer("01-01", true); // 4095 = 0x0FFF
        powers.record_answer("28-20", false); // 1
        let bytes = encode_record(&powers, at(0x0102_0304));

        assert_eq!(bytes.len(), 1131);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[5..9], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[9..11], &[0x02, 0x30]);
        assert_eq!(&bytes[11..13], &[0x0F, 0xFF]);
        assert_eq!(&bytes[1129..1131], &[0x00, 0x01]);
    }

    #[test]
    fn test_round_trip_extremes() {
        for value in [0u16, 1, MAX_POWER] {
            let powers = Powers::from_raw([value; RULE_SLOTS]);
            let record = decode_record(&encode_record(&powers, at(1_700_000_000))).unwrap();
            assert_eq!(record.powers, powers);
            assert_eq!(record.header.created_at, 1_700_000_000);
            assert_eq!(record.header.last_active_at, 1_700_000_000);
            assert_eq!(record.header.rule_slots, 560);
        }
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = weighted_sampler::seeded_rng(7);
        for _ in 0..20 {
            let mut slots = [0u16; RULE_SLOTS];
            rng.fill(&mut slots[..]);
            let powers = Powers::from_raw(slots);
            let decoded = decode_record(&encode_record_now(&powers)).unwrap();
            assert_eq!(decoded.powers, powers);
        }
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            decode_record(&[1, 2, 3]).unwrap_err(),
            RecordError::WrongLength {
                expected: 1131,
                actual: 3
            }
        );
        let mut long = encode_record_now(&Powers::empty());
        long.push(0);
        assert!(decode_record(&long).is_err());
    }

    #[test]
    fn test_unknown_version_still_decodes() {
        let mut powers = Powers::empty();
        powers.record_answer("04-07", true);
        let mut bytes = encode_record(&powers, at(10));
        bytes[0] = 9;
        let record = decode_record(&bytes).unwrap();
        assert_eq!(record.header.version, 9);
        assert_eq!(record.powers, powers);
    }

    #[test]
    fn test_timestamps_saturate() {
        let bytes = encode_record(&Powers::empty(), at(-5));
        assert_eq!(decode_header(&bytes).unwrap().created_at, 0);
        assert_eq!(
            decode_header(&bytes).unwrap().created_at(),
            Some(at(0))
        );
    }
}
