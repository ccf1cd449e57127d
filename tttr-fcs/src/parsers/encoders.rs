//! Inverse of the layouts in `parsers::records`.
//!
//! Values wider than their field are truncated to the field width.
use byteorder::{ByteOrder, LittleEndian};

use crate::headers::RecordFormat;

#[inline(always)]
fn masked(value: u64, width: u32) -> u64 {
    value & ((1u64 << width) - 1)
}

/// Encode a photon. `sync` is the raw (not overflow corrected) time field and
/// `micro_time` is ignored by T2 formats.
pub fn encode_photon(format: RecordFormat, sync: u64, micro_time: u32, channel: i16) -> u64 {
    let micro_time = micro_time as u64;
    let channel = channel as u64;
    match format {
        RecordFormat::PicoHarpT2 => (masked(channel, 4) << 28) | masked(sync, 28),
        RecordFormat::PicoHarpT3 => {
            (masked(channel, 4) << 28) | (masked(micro_time, 12) << 16) | masked(sync, 16)
        }
        RecordFormat::HydraHarpV1T2 | RecordFormat::HydraHarpV2T2 => {
            (masked(channel, 6) << 25) | masked(sync, 25)
        }
        RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => {
            (masked(channel, 6) << 25) | (masked(micro_time, 15) << 10) | masked(sync, 10)
        }
        RecordFormat::Spc130 => {
            (masked(micro_time, 12) << 16) | (masked(channel, 4) << 12) | masked(sync, 12)
        }
        RecordFormat::Spc600_256 => {
            (masked(channel, 3) << 25) | (masked(sync, 17) << 8) | masked(micro_time, 8)
        }
        RecordFormat::Spc600_4096 => {
            (masked(channel, 8) << 40) | (masked(sync, 24) << 16) | masked(micro_time, 12)
        }
    }
}

/// Encode a marker record. The SPC-600 layouts have no marker flag and give `None`.
pub fn encode_marker(format: RecordFormat, sync: u64, markers: i16) -> Option<u64> {
    let markers = markers as u64;
    match format {
        RecordFormat::PicoHarpT2 => {
            Some((0xF << 28) | (masked(sync, 28) & !0xF) | masked(markers, 4))
        }
        RecordFormat::PicoHarpT3 => {
            Some((0xF << 28) | (masked(markers, 4) << 16) | masked(sync, 16))
        }
        RecordFormat::HydraHarpV1T2 | RecordFormat::HydraHarpV2T2 => {
            Some((1 << 31) | (masked(markers, 4) << 25) | masked(sync, 25))
        }
        RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => {
            Some((1 << 31) | (masked(markers, 4) << 25) | masked(sync, 10))
        }
        RecordFormat::Spc130 => Some((1 << 28) | (masked(markers, 4) << 12) | masked(sync, 12)),
        RecordFormat::Spc600_256 | RecordFormat::Spc600_4096 => None,
    }
}

/// Encode an overflow record standing for `count` wraparounds.
///
/// PicoHarp and HydraHarp v1 T2 records always stand for a single wraparound,
/// so `count` is ignored for them.
pub fn encode_overflow(format: RecordFormat, count: u64) -> u64 {
    match format {
        RecordFormat::PicoHarpT2 | RecordFormat::PicoHarpT3 => 0xF << 28,
        RecordFormat::HydraHarpV1T2 => (1 << 31) | (0x3F << 25),
        RecordFormat::HydraHarpV2T2 => (1 << 31) | (0x3F << 25) | masked(count, 25),
        RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => {
            (1 << 31) | (0x3F << 25) | masked(count, 10)
        }
        RecordFormat::Spc130 | RecordFormat::Spc600_256 => {
            (1 << 31) | (1 << 30) | masked(count, 28)
        }
        RecordFormat::Spc600_4096 => (1 << 12) | (masked(count, 24) << 16),
    }
}

/// Append `record` to `out` in its on-disk little-endian representation.
pub fn write_record(format: RecordFormat, record: u64, out: &mut Vec<u8>) {
    let mut buffer = [0u8; 8];
    match format.record_bytes() {
        6 => LittleEndian::write_u48(&mut buffer, masked(record, 48)),
        _ => LittleEndian::write_u32(&mut buffer, record as u32),
    }
    out.extend_from_slice(&buffer[..format.record_bytes()]);
}

/// Serialize a sequence of records into a byte buffer.
pub fn records_to_bytes(format: RecordFormat, records: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * format.record_bytes());
    for &record in records {
        write_record(format, record, &mut out);
    }
    out
}
