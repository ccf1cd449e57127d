//! Per-format record decoders.
//!
//! Each decoder takes one raw record and the running [`DecoderState`] and
//! returns the calibrated [`Event`] it encodes, or `None` when the record is a
//! pure overflow (or otherwise carries no event). Fields are extracted with
//! explicit shifts and masks; bit 0 is the least significant bit of the record
//! read as a little-endian integer.
use crate::headers::RecordFormat;
use crate::Event;

pub const PHT2_WRAPAROUND: u64 = 210_698_240;
pub const PHT3_WRAPAROUND: u64 = 65_536;
pub const HHT2_V1_WRAPAROUND: u64 = 33_552_000;
pub const HHT2_V2_WRAPAROUND: u64 = 33_554_432;
pub const HHT3_WRAPAROUND: u64 = 1_024;
pub const SPC130_WRAPAROUND: u64 = 4_096;
pub const SPC600_256_WRAPAROUND: u64 = 65_536;
pub const SPC600_4096_WRAPAROUND: u64 = 16_777_216;

/// Running state of a decode session.
///
/// `overflow_counter` counts wraparounds of the hardware clock seen so far.
/// It starts at 0 and never decreases.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecoderState {
    pub overflow_counter: u64,
}

impl DecoderState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn add_overflows(&mut self, count: u64) {
        self.overflow_counter += count;
    }

    #[inline(always)]
    fn macro_time(&self, wraparound: u64, raw_time: u64) -> u64 {
        self.overflow_counter * wraparound + raw_time
    }
}

#[inline(always)]
pub(crate) fn field(raw: u64, shift: u32, width: u32) -> u64 {
    (raw >> shift) & ((1u64 << width) - 1)
}

#[inline(always)]
fn flag(raw: u64, bit: u32) -> bool {
    (raw >> bit) & 1 == 1
}

/// Decode one raw record of the given format.
///
/// 32-bit formats only look at the low 32 bits of `raw`; SPC-600 4096 uses the
/// low 48.
#[inline]
pub fn decode(format: RecordFormat, raw: u64, state: &mut DecoderState) -> Option<Event> {
    match format {
        RecordFormat::PicoHarpT2 => decode_picoharp_t2(raw as u32, state),
        RecordFormat::PicoHarpT3 => decode_picoharp_t3(raw as u32, state),
        RecordFormat::HydraHarpV1T2 => decode_hydraharp_t2(raw as u32, state, false),
        RecordFormat::HydraHarpV2T2 => decode_hydraharp_t2(raw as u32, state, true),
        RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => {
            decode_hydraharp_t3(raw as u32, state)
        }
        RecordFormat::Spc130 => decode_spc130(raw as u32, state),
        RecordFormat::Spc600_256 => decode_spc600_256(raw as u32, state),
        RecordFormat::Spc600_4096 => decode_spc600_4096(raw, state),
    }
}

// - - - - - - - - - - //
//      PicoHarp       //
// - - - - - - - - - - //

/// PicoHarp T2: bits 0-27 time tag, bits 28-31 channel.
///
/// Channel 0xF marks a special record. With the low four time bits at zero it
/// is an overflow, otherwise those bits carry the marker pattern.
pub fn decode_picoharp_t2(record: u32, state: &mut DecoderState) -> Option<Event> {
    let record = record as u64;
    let time = field(record, 0, 28);
    let channel = field(record, 28, 4);

    if channel == 0xF {
        let markers = time & 0xF;
        if markers == 0 {
            state.add_overflows(1);
            return None;
        }
        // The low four bits of a marker's time carry the marker pattern. The
        // marker resolution is far coarser than that, so they are kept.
        return Some(Event::marker(state.macro_time(PHT2_WRAPAROUND, time), markers as i16));
    }
    Some(Event::photon(state.macro_time(PHT2_WRAPAROUND, time), 0, channel as i16))
}

/// PicoHarp T3: bits 0-15 sync count, bits 16-27 dtime, bits 28-31 channel.
pub fn decode_picoharp_t3(record: u32, state: &mut DecoderState) -> Option<Event> {
    let record = record as u64;
    let n_sync = field(record, 0, 16);
    let dtime = field(record, 16, 12);
    let channel = field(record, 28, 4);

    if channel == 0xF {
        if dtime == 0 {
            state.add_overflows(1);
            return None;
        }
        let markers = dtime & 0xF;
        return Some(Event::marker(state.macro_time(PHT3_WRAPAROUND, n_sync), markers as i16));
    }
    Some(Event::photon(
        state.macro_time(PHT3_WRAPAROUND, n_sync),
        dtime as u32,
        channel as i16,
    ))
}

// - - - - - - - - - - //
//      HydraHarp      //
// - - - - - - - - - - //

/// Overflow records of the multi-overflow layouts carry how many wraparounds
/// happened. A count of 0 comes from old firmware and means exactly one.
#[inline(always)]
fn embedded_overflows(count: u64) -> u64 {
    if count == 0 {
        1
    } else {
        count
    }
}

/// HydraHarp T2: bits 0-24 time tag, bits 25-30 channel, bit 31 special.
///
/// Version 1 overflow records always stand for a single wraparound of
/// 33 552 000. Version 2 records carry the overflow count in the time tag and
/// wrap at 2^25. Special records with channel 0 are sync events and channels
/// 1-15 are markers; both are reported as markers.
pub fn decode_hydraharp_t2(record: u32, state: &mut DecoderState, version_2: bool) -> Option<Event> {
    let record = record as u64;
    let time_tag = field(record, 0, 25);
    let channel = field(record, 25, 6);
    let special = flag(record, 31);

    let wraparound = if version_2 { HHT2_V2_WRAPAROUND } else { HHT2_V1_WRAPAROUND };

    if special {
        if channel == 0x3F {
            let count = if version_2 { embedded_overflows(time_tag) } else { 1 };
            state.add_overflows(count);
            return None;
        }
        return Some(Event::marker(state.macro_time(wraparound, time_tag), channel as i16));
    }
    Some(Event::photon(state.macro_time(wraparound, time_tag), 0, channel as i16))
}

/// HydraHarp T3 (v1 and v2): bits 0-9 sync count, bits 10-24 dtime,
/// bits 25-30 channel, bit 31 special.
///
/// Overflow records carry their count in the sync field.
pub fn decode_hydraharp_t3(record: u32, state: &mut DecoderState) -> Option<Event> {
    let record = record as u64;
    let n_sync = field(record, 0, 10);
    let dtime = field(record, 10, 15);
    let channel = field(record, 25, 6);
    let special = flag(record, 31);

    if special {
        if channel == 0x3F {
            state.add_overflows(embedded_overflows(n_sync));
            return None;
        }
        return Some(Event::marker(state.macro_time(HHT3_WRAPAROUND, n_sync), channel as i16));
    }
    Some(Event::photon(
        state.macro_time(HHT3_WRAPAROUND, n_sync),
        dtime as u32,
        channel as i16,
    ))
}

// - - - - - - - - - - //
//    Becker&Hickl     //
// - - - - - - - - - - //

const SPC_OVERFLOW_COUNT_MASK: u64 = 0x0FFF_FFFF;

/// SPC-130: bits 0-11 macro time, 12-15 routing, 16-27 ADC, 28 mark, 29 gap,
/// 30 mtov, 31 invalid.
///
/// * invalid without mtov: rejected photon, nothing changes.
/// * invalid with mtov: overflow record, bits 0-27 hold the overflow count.
/// * mtov alone: one overflow happened before this valid photon.
pub fn decode_spc130(record: u32, state: &mut DecoderState) -> Option<Event> {
    let record = record as u64;
    let mt = field(record, 0, 12);
    let rout = field(record, 12, 4);
    let adc = field(record, 16, 12);
    let mark = flag(record, 28);
    let mtov = flag(record, 30);
    let invalid = flag(record, 31);

    if invalid {
        if mtov {
            state.add_overflows(record & SPC_OVERFLOW_COUNT_MASK);
        }
        return None;
    }
    if mtov {
        state.add_overflows(1);
    }
    let macro_time = state.macro_time(SPC130_WRAPAROUND, mt);
    Some(if mark {
        Event::marker(macro_time, rout as i16)
    } else {
        Event::photon(macro_time, adc as u32, rout as i16)
    })
}

/// SPC-600/630 in 256 channel mode: bits 0-7 ADC, 8-24 macro time,
/// 25-27 routing, 29 gap, 30 mtov, 31 invalid. Bit 28 is unused.
///
/// Overflow handling follows the SPC-130.
pub fn decode_spc600_256(record: u32, state: &mut DecoderState) -> Option<Event> {
    let record = record as u64;
    let adc = field(record, 0, 8);
    let mt = field(record, 8, 17);
    let rout = field(record, 25, 3);
    let mtov = flag(record, 30);
    let invalid = flag(record, 31);

    if invalid {
        if mtov {
            state.add_overflows(record & SPC_OVERFLOW_COUNT_MASK);
        }
        return None;
    }
    if mtov {
        state.add_overflows(1);
    }
    Some(Event::photon(
        state.macro_time(SPC600_256_WRAPAROUND, mt),
        adc as u32,
        rout as i16,
    ))
}

/// SPC-600/630 in 4096 channel mode, 48 bit records: bits 0-11 ADC,
/// 12 invalid, 13 mtov, 14 gap, 16-39 macro time (three bytes), 40-47 routing.
///
/// An invalid record is an overflow record whose macro time bytes hold the
/// overflow count. mtov on a valid record adds one overflow before it.
pub fn decode_spc600_4096(record: u64, state: &mut DecoderState) -> Option<Event> {
    let adc = field(record, 0, 12);
    let invalid = flag(record, 12);
    let mtov = flag(record, 13);
    let mt = field(record, 16, 24);
    let rout = field(record, 40, 8);

    if invalid {
        state.add_overflows(mt);
        return None;
    }
    if mtov {
        state.add_overflows(1);
    }
    Some(Event::photon(
        state.macro_time(SPC600_4096_WRAPAROUND, mt),
        adc as u32,
        rout as i16,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::encoders::{encode_marker, encode_overflow, encode_photon};

    fn run(format: RecordFormat, records: &[u64]) -> (Vec<Option<Event>>, DecoderState) {
        let mut state = DecoderState::new();
        let events = records.iter().map(|&r| decode(format, r, &mut state)).collect();
        (events, state)
    }

    #[test]
    fn picoharp_t2_overflow_and_marker() {
        let f = RecordFormat::PicoHarpT2;
        let records = [
            encode_photon(f, 100, 0, 2),
            encode_overflow(f, 1),
            encode_marker(f, 0x30, 0b0101).unwrap(),
            encode_photon(f, 7, 0, 1),
        ];
        let (events, state) = run(f, &records);
        assert_eq!(state.overflow_counter, 1);
        assert_eq!(events[0], Some(Event::photon(100, 0, 2)));
        assert_eq!(events[1], None);
        assert_eq!(events[2], Some(Event::marker(PHT2_WRAPAROUND + 0x35, 0b0101)));
        assert_eq!(events[3], Some(Event::photon(PHT2_WRAPAROUND + 7, 0, 1)));
    }

    #[test]
    fn picoharp_t3_layout() {
        // channel 3, dtime 0xABC, nsync 0x1234
        let raw = (3u64 << 28) | (0xABC << 16) | 0x1234;
        let mut state = DecoderState::new();
        let event = decode(RecordFormat::PicoHarpT3, raw, &mut state).unwrap();
        assert_eq!(event, Event::photon(0x1234, 0xABC, 3));

        // channel 0xF with dtime 0 is an overflow
        assert_eq!(decode(RecordFormat::PicoHarpT3, 0xF000_0000, &mut state), None);
        assert_eq!(state.overflow_counter, 1);
        let event = decode(RecordFormat::PicoHarpT3, 0x0000_0005, &mut state).unwrap();
        assert_eq!(event.macro_time, PHT3_WRAPAROUND + 5);
    }

    #[test]
    fn hydraharp_v1_t2_counts_single_overflows() {
        let f = RecordFormat::HydraHarpV1T2;
        // A v1 overflow always means a single wraparound, whatever the time tag says.
        let overflow = (1u64 << 31) | (0x3F << 25) | 17;
        let (_, state) = run(f, &[overflow]);
        assert_eq!(state.overflow_counter, 1);
    }

    #[test]
    fn hydraharp_v2_t2_uses_embedded_count() {
        let f = RecordFormat::HydraHarpV2T2;
        let (events, state) = run(
            f,
            &[encode_overflow(f, 3), encode_photon(f, 11, 0, 4)],
        );
        assert_eq!(state.overflow_counter, 3);
        assert_eq!(events[1], Some(Event::photon(3 * HHT2_V2_WRAPAROUND + 11, 0, 4)));
    }

    #[test]
    fn hydraharp_zero_overflow_count_is_one_wraparound() {
        let overflow_zero = (1u64 << 31) | (0x3F << 25);
        let (_, state) = run(RecordFormat::HydraHarpV2T2, &[overflow_zero]);
        assert_eq!(state.overflow_counter, 1);
        let (_, state) = run(RecordFormat::HydraHarpV1T3, &[overflow_zero]);
        assert_eq!(state.overflow_counter, 1);
    }

    #[test]
    fn hydraharp_t3_sync_and_marker() {
        let f = RecordFormat::HydraHarpV2T3;
        let (events, state) = run(
            f,
            &[
                encode_photon(f, 1000, 20_000, 5),
                encode_overflow(f, 2),
                encode_marker(f, 4, 2).unwrap(),
            ],
        );
        assert_eq!(events[0], Some(Event::photon(1000, 20_000, 5)));
        assert_eq!(state.overflow_counter, 2);
        assert_eq!(events[2], Some(Event::marker(2 * HHT3_WRAPAROUND + 4, 2)));
    }

    #[test]
    fn spc130_flag_combinations() {
        let f = RecordFormat::Spc130;
        let invalid_only = 1u64 << 31;
        let invalid_mtov = (1u64 << 31) | (1 << 30) | 5;
        let mtov_photon = (1u64 << 30) | (7 << 16) | (2 << 12) | 9;
        let mut state = DecoderState::new();

        assert_eq!(decode(f, invalid_only, &mut state), None);
        assert_eq!(state.overflow_counter, 0);

        // Invalid and mtov together carry the count, not a single overflow.
        assert_eq!(decode(f, invalid_mtov, &mut state), None);
        assert_eq!(state.overflow_counter, 5);

        let event = decode(f, mtov_photon, &mut state).unwrap();
        assert_eq!(state.overflow_counter, 6);
        assert_eq!(event, Event::photon(6 * SPC130_WRAPAROUND + 9, 7, 2));
    }

    #[test]
    fn spc130_marker() {
        let raw = (1u64 << 28) | (3 << 12) | 10;
        let mut state = DecoderState::new();
        assert_eq!(decode(RecordFormat::Spc130, raw, &mut state), Some(Event::marker(10, 3)));
    }

    #[test]
    fn spc600_256_layout() {
        let raw = (5u64 << 25) | (0x1_0001 << 8) | 0xAB;
        let mut state = DecoderState::new();
        let event = decode(RecordFormat::Spc600_256, raw, &mut state).unwrap();
        assert_eq!(event, Event::photon(0x1_0001, 0xAB, 5));
    }

    #[test]
    fn spc600_4096_overflow_count_in_macro_time_bytes() {
        let f = RecordFormat::Spc600_4096;
        let overflow = (1u64 << 12) | (4 << 16);
        let photon = (9u64 << 40) | (0x12_3456 << 16) | 0xFFF;
        let (events, state) = run(f, &[overflow, photon]);
        assert_eq!(state.overflow_counter, 4);
        assert_eq!(
            events[1],
            Some(Event::photon(4 * SPC600_4096_WRAPAROUND + 0x12_3456, 0xFFF, 9))
        );
    }

    #[test]
    fn encoders_invert_decoders() {
        let formats = [
            RecordFormat::PicoHarpT3,
            RecordFormat::HydraHarpV1T3,
            RecordFormat::Spc130,
            RecordFormat::Spc600_256,
            RecordFormat::Spc600_4096,
        ];
        for &f in formats.iter() {
            let mut state = DecoderState::new();
            let raw = encode_photon(f, 200, 100, 1);
            assert_eq!(decode(f, raw, &mut state), Some(Event::photon(200, 100, 1)), "{}", f);
        }
    }
}
