use proptest::prelude::*;

use tttr_fcs::parsers::encoders::{encode_overflow, encode_photon, records_to_bytes};
use tttr_fcs::parsers::streamer::RecordStream;
use tttr_fcs::tttr_tools::selection::{select_by_count_rate, CountRateParams};
use tttr_fcs::{CorrelatorPhotonStream, Event, EventKind, RecordFormat};

const FORMATS: [RecordFormat; 9] = [
    RecordFormat::PicoHarpT2,
    RecordFormat::PicoHarpT3,
    RecordFormat::HydraHarpV1T2,
    RecordFormat::HydraHarpV1T3,
    RecordFormat::HydraHarpV2T2,
    RecordFormat::HydraHarpV2T3,
    RecordFormat::Spc130,
    RecordFormat::Spc600_256,
    RecordFormat::Spc600_4096,
];

/// Wraparounds added by one overflow record carrying `count`.
fn overflow_increment(format: RecordFormat, count: u64) -> u64 {
    match format {
        RecordFormat::PicoHarpT2 | RecordFormat::PicoHarpT3 | RecordFormat::HydraHarpV1T2 => 1,
        _ => count,
    }
}

/// Photon records grouped by wraparound period, each group followed by an
/// overflow record. Returns the records and the macro times they decode to.
fn build(format: RecordFormat, periods: &[(Vec<u64>, u64)]) -> (Vec<u64>, Vec<u64>) {
    let mut records = Vec::new();
    let mut expected = Vec::new();
    let mut overflows = 0;
    for (syncs, count) in periods {
        for &sync in syncs {
            records.push(encode_photon(format, sync, (sync % 200) as u32, 0));
            expected.push(overflows * format.wraparound() + sync);
        }
        records.push(encode_overflow(format, *count));
        overflows += overflow_increment(format, *count);
    }
    (records, expected)
}

fn decode(format: RecordFormat, bytes: &[u8], chunk_records: usize) -> Vec<Event> {
    RecordStream::new(bytes, format)
        .with_chunk_records(chunk_records)
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn periods() -> impl Strategy<Value = Vec<(Vec<u64>, u64)>> {
    let syncs = prop::collection::vec(0u64..1000, 0..20).prop_map(|mut v| {
        v.sort_unstable();
        v
    });
    prop::collection::vec((syncs, 1u64..4), 1..8)
}

proptest! {
    #[test]
    fn overflows_extend_the_macro_time(
        format in prop::sample::select(FORMATS.to_vec()),
        periods in periods(),
    ) {
        let (records, expected) = build(format, &periods);
        let events = decode(format, &records_to_bytes(format, &records), 1024);

        let macro_times: Vec<u64> = events.iter().map(|e| e.macro_time).collect();
        prop_assert_eq!(&macro_times, &expected);
        prop_assert!(macro_times.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(events.iter().all(|e| e.kind == EventKind::Photon && e.channel == 0));
        prop_assert!(events.len() <= records.len());
    }

    #[test]
    fn chunking_does_not_change_the_events(
        format in prop::sample::select(FORMATS.to_vec()),
        periods in periods(),
        chunk_records in 1usize..17,
    ) {
        let (records, _) = build(format, &periods);
        let bytes = records_to_bytes(format, &records);
        prop_assert_eq!(decode(format, &bytes, chunk_records), decode(format, &bytes, 4096));

        let mut stream = RecordStream::new(&bytes[..], format).with_chunk_records(chunk_records);
        for event in stream.by_ref() {
            prop_assert!(event.is_ok());
        }
        prop_assert_eq!(stream.records_read(), records.len());
    }

    #[test]
    fn micro_times_survive_for_t3(
        syncs in prop::collection::vec(0u64..1000, 1..50),
        micro in 0u32..256,
    ) {
        for &format in &[RecordFormat::PicoHarpT3, RecordFormat::HydraHarpV2T3, RecordFormat::Spc130] {
            let records: Vec<u64> = syncs.iter().map(|&s| encode_photon(format, s, micro, 2)).collect();
            let events = decode(format, &records_to_bytes(format, &records), 64);
            prop_assert!(events.iter().all(|e| e.micro_time == micro && e.channel == 2));
        }
    }

    #[test]
    fn count_rate_selection_partitions_the_stream(
        gaps in prop::collection::vec(0u64..50, 0..200),
        window in 0u64..100,
        max_photons in 0usize..10,
    ) {
        let times: Vec<u64> = gaps
            .iter()
            .scan(0u64, |t, &gap| {
                *t += gap;
                Some(*t)
            })
            .collect();
        let params = CountRateParams { window, max_photons, invert: false };
        let kept = select_by_count_rate(&times, &params);
        let dropped = select_by_count_rate(&times, &CountRateParams { invert: true, ..params });

        prop_assert!(kept.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(dropped.windows(2).all(|w| w[0] < w[1]));
        let mut all: Vec<usize> = kept.iter().chain(&dropped).copied().collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..times.len()).collect::<Vec<_>>());
    }

    #[test]
    fn coarsening_merges_without_losing_weight(
        mut photons in prop::collection::vec((0u64..10_000, 1u32..10), 0..300),
    ) {
        photons.sort_unstable();
        let times: Vec<u64> = photons.iter().map(|&(t, _)| t).collect();
        let weights: Vec<f64> = photons.iter().map(|&(_, w)| w as f64).collect();
        let total: f64 = weights.iter().sum();

        let mut stream = CorrelatorPhotonStream::new();
        stream.set_events(&times, &weights).unwrap();
        for level in 1..=8 {
            let before = stream.len();
            stream.coarsen();
            prop_assert!(stream.times.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(stream.len() <= before);
            prop_assert_eq!(stream.times.len(), stream.weights.len());
            prop_assert_eq!(stream.sum_of_weights(), total);
            prop_assert_eq!(stream.time_axis_calibration, (1u64 << level) as f64);
        }
    }
}
