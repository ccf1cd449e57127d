//! Decoded TTTR data held as parallel arrays.
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, warn};

use crate::errors::Error;
use crate::headers::{ContainerType, File, HeaderCalibration};
use crate::parsers::streamer::RecordStream;
use crate::tttr_tools::microtime::{micro_time_histogram, MicroTimeHistogram, MicroTimeHistogramParams};
use crate::tttr_tools::selection::{self, CountRateParams, TimeWindowParams};
use crate::tttr_tools::timetrace::{timetrace, TimeTraceParams};
use crate::{Event, EventKind, TTTRFile};

/// A calibrated stream of events in arrival order.
///
/// The stream owns its arrays. Selections copy the selected events into a new
/// stream, so a selection can be moved to another thread while the parent
/// keeps being used.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStream {
    macro_times: Vec<u64>,
    micro_times: Vec<u32>,
    channels: Vec<i16>,
    kinds: Vec<EventKind>,
    calibration: HeaderCalibration,
    n_records: usize,
}

impl EventStream {
    /// An empty stream with the given calibration.
    pub fn new(calibration: HeaderCalibration) -> Self {
        Self {
            macro_times: Vec::new(),
            micro_times: Vec::new(),
            channels: Vec::new(),
            kinds: Vec::new(),
            calibration,
            n_records: 0,
        }
    }

    /// Build a stream out of already decoded events.
    pub fn from_events(events: &[Event], calibration: HeaderCalibration) -> Self {
        let mut stream = Self::new(calibration);
        stream.reserve(events.len());
        for &event in events {
            stream.push(event);
        }
        stream.n_records = events.len();
        stream
    }

    fn reserve(&mut self, additional: usize) {
        self.macro_times.reserve(additional);
        self.micro_times.reserve(additional);
        self.channels.reserve(additional);
        self.kinds.reserve(additional);
    }

    #[inline(always)]
    fn push(&mut self, event: Event) {
        self.macro_times.push(event.macro_time);
        self.micro_times.push(event.micro_time);
        self.channels.push(event.channel);
        self.kinds.push(event.kind);
    }

    /// Decode an in-memory buffer of records.
    ///
    /// The format is taken from `calibration`. Any malformed input aborts the
    /// whole decode.
    pub fn decode_all(buffer: &[u8], calibration: HeaderCalibration) -> Result<Self, Error> {
        Self::from_reader(buffer, calibration, None)
    }

    /// Decode records from `reader` until EOF or until `record_limit` records
    /// have been consumed.
    pub fn from_reader<R: Read>(
        reader: R,
        calibration: HeaderCalibration,
        record_limit: Option<usize>,
    ) -> Result<Self, Error> {
        let mut records =
            RecordStream::new(reader, calibration.record_format).with_record_limit(record_limit);
        let mut stream = Self::new(calibration);
        if let Some(limit) = record_limit {
            stream.reserve(limit.min(1 << 24));
        }
        for event in records.by_ref() {
            stream.push(event?);
        }
        stream.n_records = records.records_read();

        debug!(
            "Decoded {} events out of {} {} records ({} overflows)",
            stream.len(),
            stream.n_records,
            records.format(),
            records.state().overflow_counter,
        );
        if let Some(limit) = record_limit {
            if stream.n_records < limit {
                warn!(
                    "Header announced {} records but the data holds only {}",
                    limit, stream.n_records
                );
            }
        }
        Ok(stream)
    }

    /// Decode every record of an opened TTTR file.
    pub fn from_tttr_file(file: &dyn TTTRFile) -> Result<Self, Error> {
        let calibration = file.calibration()?;
        let mut buffered = BufReader::with_capacity(8 * 1024, std::fs::File::open(file.path())?);
        buffered.seek(SeekFrom::Start(file.data_offset()?))?;
        Self::from_reader(buffered, calibration, file.number_of_records()?)
    }

    /// Open `path` as the given container and decode it.
    pub fn from_file<P: AsRef<Path>>(path: P, container: ContainerType) -> Result<Self, Error> {
        let file = File::open(path, container)?;
        Self::from_tttr_file(file.as_tttr_file())
    }

    pub fn calibration(&self) -> &HeaderCalibration {
        &self.calibration
    }

    pub fn macro_times(&self) -> &[u64] {
        &self.macro_times
    }

    pub fn micro_times(&self) -> &[u32] {
        &self.micro_times
    }

    pub fn channels(&self) -> &[i16] {
        &self.channels
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// Number of valid events.
    pub fn len(&self) -> usize {
        self.macro_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macro_times.is_empty()
    }

    /// Number of raw records consumed to build this stream, overflows included.
    pub fn n_records_read(&self) -> usize {
        self.n_records
    }

    pub fn event(&self, index: usize) -> Option<Event> {
        if index >= self.len() {
            return None;
        }
        Some(Event {
            macro_time: self.macro_times[index],
            micro_time: self.micro_times[index],
            channel: self.channels[index],
            kind: self.kinds[index],
        })
    }

    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        (0..self.len()).filter_map(move |i| self.event(i))
    }

    /// Copy the events at `indices` into a new stream.
    ///
    /// A selection longer than the stream or pointing past its end is a caller
    /// error and is reported rather than clamped.
    pub fn select(&self, indices: &[usize]) -> Result<Self, Error> {
        if indices.len() > self.len() {
            return Err(Error::SelectionTooLarge {
                requested: indices.len(),
                available: self.len(),
            });
        }
        let mut selection = Self::new(self.calibration);
        selection.reserve(indices.len());
        for &index in indices {
            let event = self.event(index).ok_or(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            })?;
            selection.push(event);
        }
        selection.n_records = indices.len();
        Ok(selection)
    }

    /// Indices of the events on any of `channels`.
    pub fn select_by_channel(&self, channels: &[i16]) -> Vec<usize> {
        selection::select_by_channel(&self.channels, channels)
    }

    /// Indices of events outside high count rate bursts. See
    /// [`selection::select_by_count_rate`].
    pub fn select_by_count_rate(&self, params: &CountRateParams) -> Vec<usize> {
        selection::select_by_count_rate(&self.macro_times, params)
    }

    /// Half open index ranges of consecutive time windows. See
    /// [`selection::ranges_by_time_window`].
    pub fn ranges_by_time_window(&self, params: &TimeWindowParams) -> Vec<(usize, usize)> {
        selection::ranges_by_time_window(&self.macro_times, params)
    }

    /// Routing channels that saw at least one photon, sorted.
    pub fn used_channels(&self) -> Vec<i16> {
        let mut used: Vec<i16> = self
            .channels
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| **kind == EventKind::Photon)
            .map(|(&ch, _)| ch)
            .collect();
        used.sort_unstable();
        used.dedup();
        used
    }

    /// Time between the first and the last event in seconds.
    pub fn acquisition_time(&self) -> f64 {
        match (self.macro_times.first(), self.macro_times.last()) {
            (Some(first), Some(last)) => {
                last.saturating_sub(*first) as f64 * self.calibration.macro_time_resolution
            }
            _ => 0.0,
        }
    }

    /// Events per second, 0 when the stream spans no time.
    pub fn mean_count_rate(&self) -> f64 {
        let duration = self.acquisition_time();
        if self.len() < 2 || duration <= 0.0 {
            return 0.0;
        }
        self.len() as f64 / duration
    }

    pub fn intensity_trace(&self, resolution: f64, channel: Option<i16>) -> Vec<u64> {
        timetrace(self, &TimeTraceParams { resolution, channel })
    }

    pub fn micro_time_histogram(&self, params: &MicroTimeHistogramParams) -> MicroTimeHistogram {
        micro_time_histogram(self, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::RecordFormat;
    use crate::parsers::encoders::{encode_marker, encode_overflow, encode_photon, records_to_bytes};
    use crate::parsers::ptu::header::tests::ptu_header_bytes;
    use crate::parsers::records::PHT3_WRAPAROUND;
    use std::io::Write;

    fn pht3() -> HeaderCalibration {
        HeaderCalibration::new(RecordFormat::PicoHarpT3, 100e-9, 25e-12)
    }

    fn sample_records() -> Vec<u64> {
        let f = RecordFormat::PicoHarpT3;
        vec![
            encode_photon(f, 10, 100, 0),
            encode_photon(f, 60_000, 200, 1),
            encode_overflow(f, 1),
            encode_photon(f, 5, 300, 0),
            encode_marker(f, 6, 1).unwrap(),
            encode_photon(f, 7, 400, 1),
        ]
    }

    #[test]
    fn decodes_buffer() {
        let bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        let stream = EventStream::decode_all(&bytes, pht3()).unwrap();
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.n_records_read(), 6);
        assert_eq!(
            stream.macro_times(),
            &[10, 60_000, PHT3_WRAPAROUND + 5, PHT3_WRAPAROUND + 6, PHT3_WRAPAROUND + 7]
        );
        assert_eq!(stream.micro_times(), &[100, 200, 300, 0, 400]);
        assert_eq!(stream.kinds()[3], EventKind::Marker);
        assert_eq!(stream.used_channels(), vec![0, 1]);
    }

    #[test]
    fn truncated_buffer_returns_no_stream() {
        let mut bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        bytes.truncate(bytes.len() - 2);
        assert!(EventStream::decode_all(&bytes, pht3()).is_err());
    }

    #[test]
    fn selection_copies_events() {
        let bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        let stream = EventStream::decode_all(&bytes, pht3()).unwrap();
        let indices = stream.select_by_channel(&[1]);
        assert_eq!(indices, vec![1, 3, 4]);

        let selection = stream.select(&indices).unwrap();
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.channels(), &[1, 1, 1]);
        assert_eq!(selection.macro_times()[0], 60_000);
        assert_eq!(stream.len(), 5);
    }

    #[test]
    fn selection_preconditions() {
        let bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        let stream = EventStream::decode_all(&bytes, pht3()).unwrap();
        assert!(matches!(
            stream.select(&[0, 1, 2, 3, 4, 0]),
            Err(Error::SelectionTooLarge { requested: 6, available: 5 })
        ));
        assert!(matches!(
            stream.select(&[0, 9]),
            Err(Error::IndexOutOfBounds { index: 9, len: 5 })
        ));
    }

    #[test]
    fn events_round_trip() {
        let bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        let stream = EventStream::decode_all(&bytes, pht3()).unwrap();
        let events: Vec<Event> = stream.events().collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[3], Event::marker(PHT3_WRAPAROUND + 6, 1));
        assert_eq!(EventStream::from_events(&events, pht3()).macro_times(), stream.macro_times());
    }

    #[test]
    fn micro_time_histogram_of_photons() {
        let bytes = records_to_bytes(RecordFormat::PicoHarpT3, &sample_records());
        let stream = EventStream::decode_all(&bytes, pht3()).unwrap();
        let params = MicroTimeHistogramParams { coarsening: 100, channel: None };
        let histogram = stream.micro_time_histogram(&params);
        assert_eq!(histogram.hist.len(), 41);
        // the marker is not counted
        assert_eq!(&histogram.hist[..5], &[0, 1, 1, 1, 1]);
        assert_eq!(histogram.hist.iter().sum::<u64>(), 4);

        let ch1 = stream.micro_time_histogram(&MicroTimeHistogramParams { coarsening: 100, channel: Some(1) });
        assert_eq!(&ch1.hist[..5], &[0, 0, 1, 0, 1]);
    }

    #[test]
    fn unordered_events_do_not_panic() {
        let calibration = HeaderCalibration::new(RecordFormat::PicoHarpT2, 1e-6, 1e-6);
        let stream = EventStream::from_events(&[Event::photon(10, 0, 0), Event::photon(3, 0, 0)], calibration);
        let params = CountRateParams { window: 5, max_photons: 10, invert: false };
        assert_eq!(stream.select_by_count_rate(&params), vec![0, 1]);
        assert_eq!(stream.acquisition_time(), 0.0);

        let stream = EventStream::from_events(&[Event::photon(100, 0, 0), Event::photon(3, 0, 0)], calibration);
        let trace = stream.intensity_trace(1e-6, None);
        assert_eq!(trace.len(), 101);
        assert_eq!(trace.iter().sum::<u64>(), 2);
    }

    #[test]
    fn count_rate_of_short_streams() {
        let stream = EventStream::from_events(&[Event::photon(3, 0, 0)], pht3());
        assert_eq!(stream.mean_count_rate(), 0.0);
        assert_eq!(EventStream::new(pht3()).acquisition_time(), 0.0);
    }

    #[test]
    fn reads_ptu_file() {
        let records = sample_records();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&ptu_header_bytes(0x00010303, records.len() as i64, 100e-9, 25e-12))
            .unwrap();
        file.write_all(&records_to_bytes(RecordFormat::PicoHarpT3, &records))
            .unwrap();
        file.flush().unwrap();

        let stream = EventStream::from_file(file.path(), ContainerType::PTU).unwrap();
        assert_eq!(stream.len(), 5);
        assert_eq!(stream.calibration().record_format, RecordFormat::PicoHarpT3);
        assert_eq!(stream.calibration().number_of_micro_time_channels, 4000);
    }

    #[test]
    fn missing_file() {
        let result = EventStream::from_file("/definitely/not/here.ptu", ContainerType::PTU);
        assert!(matches!(result, Err(Error::FileNotAvailable(_))));
    }
}
