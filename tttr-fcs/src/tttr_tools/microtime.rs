use crate::event_stream::EventStream;
use crate::EventKind;

/// Result from the micro time histogram
pub struct MicroTimeHistogram {
    pub t: Vec<f64>,
    pub hist: Vec<u64>,
}

/// Parameters for the micro time histogram
///
/// # Parameters
///    - coarsening: Number of adjacent micro time channels merged into one bin
///    - channel: Only count photons on this routing channel, or all if None
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MicroTimeHistogramParams {
    pub coarsening: u32,
    pub channel: Option<i16>,
}

impl Default for MicroTimeHistogramParams {
    fn default() -> Self {
        Self { coarsening: 1, channel: None }
    }
}

/// Fluorescence decay histogram of the photon micro times.
///
/// The histogram covers every micro time the record format can encode, and
/// `t` holds the start of each bin in seconds. For T2 data all photons land in
/// the first bin.
pub fn micro_time_histogram(stream: &EventStream, params: &MicroTimeHistogramParams) -> MicroTimeHistogram {
    let calibration = stream.calibration();
    let coarsening = params.coarsening.max(1);
    let range = calibration.record_format.micro_time_range();
    let n_bins = ((range + coarsening - 1) / coarsening) as usize;

    let mut hist = vec![0u64; n_bins];
    let events = stream
        .micro_times()
        .iter()
        .zip(stream.channels())
        .zip(stream.kinds());
    for ((&micro_time, &channel), &kind) in events {
        if kind != EventKind::Photon || !params.channel.map_or(true, |ch| ch == channel) {
            continue;
        }
        let idx = (micro_time / coarsening) as usize;
        if idx < n_bins {
            hist[idx] += 1;
        }
    }

    let bin_width = calibration.micro_time_resolution * coarsening as f64;
    let t = (0..n_bins).map(|i| (i as f64) * bin_width).collect::<Vec<f64>>();
    MicroTimeHistogram { t, hist }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{HeaderCalibration, RecordFormat};
    use crate::Event;
    use approx::assert_relative_eq;

    #[test]
    fn coarsened_histogram() {
        let calibration = HeaderCalibration::new(RecordFormat::PicoHarpT3, 100e-9, 4e-12);
        let events = vec![
            Event::photon(0, 0, 0),
            Event::photon(1, 3, 0),
            Event::photon(2, 4, 1),
            Event::photon(3, 4095, 0),
            Event::marker(4, 2),
        ];
        let stream = EventStream::from_events(&events, calibration);
        let params = MicroTimeHistogramParams { coarsening: 4, channel: Some(0) };
        let histogram = micro_time_histogram(&stream, &params);

        assert_eq!(histogram.hist.len(), 1024);
        assert_eq!(histogram.hist[0], 2);
        assert_eq!(histogram.hist[1], 0);
        assert_eq!(histogram.hist[1023], 1);
        assert_relative_eq!(histogram.t[1], 16e-12, max_relative = 1e-12);
    }
}
