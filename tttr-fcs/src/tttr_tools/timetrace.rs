use crate::event_stream::EventStream;
use crate::EventKind;

/// Parameters for the timetrace algorithm
///
/// ## Parameters
///   1. resolution: The resolution in seconds of the intensity time trace.
///   2. channel: Optional channel we want to monitor. If None is passed then all
///      all channels are summed together.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeTraceParams {
    pub resolution: f64,
    pub channel: Option<i16>,
}

/// Calculate the intensity timetrace of clicks on a TCSPC.
///
/// The intensity is computed by discretizing the duration of the experiment into
/// intervals of fixed duration and counting how many photons occur on each of them.
/// Bins start at macro time zero, so every bin up to the latest event is present
/// even if it is empty. Markers are never counted.
///
/// ## Resolution/Variance tradeoff
/// Reducing the resolution value (finer discretization in time) makes it possible to
/// look at intensity dynamics on a finer timescale. Finer resolutions lead to smaller
/// numbers of clicks per interval and therefore the relative error for the number of
/// counts grows as we make intervals finer.
pub fn timetrace(stream: &EventStream, params: &TimeTraceParams) -> Vec<u64> {
    let macro_time_resolution = stream.calibration().macro_time_resolution;
    let blips_per_bin = ((params.resolution / macro_time_resolution).round() as u64).max(1);

    let last = match stream.macro_times().iter().max() {
        Some(&t) => t,
        None => return vec![],
    };
    let mut trace = vec![0u64; (last / blips_per_bin) as usize + 1];

    let events = stream
        .macro_times()
        .iter()
        .zip(stream.channels())
        .zip(stream.kinds());
    for ((&tof, &channel), &kind) in events {
        if kind != EventKind::Photon {
            continue;
        }
        if params.channel.map_or(true, |ch| ch == channel) {
            trace[(tof / blips_per_bin) as usize] += 1;
        }
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::{HeaderCalibration, RecordFormat};
    use crate::Event;

    #[test]
    fn counts_per_bin() {
        let calibration = HeaderCalibration::new(RecordFormat::PicoHarpT2, 1e-12, 1e-12);
        let events = vec![
            Event::photon(0, 0, 0),
            Event::photon(5, 0, 1),
            Event::marker(6, 1),
            Event::photon(12, 0, 0),
            Event::photon(35, 0, 0),
        ];
        let stream = EventStream::from_events(&events, calibration);

        let all = timetrace(&stream, &TimeTraceParams { resolution: 10e-12, channel: None });
        assert_eq!(all, vec![2, 1, 0, 1]);

        let ch1 = timetrace(&stream, &TimeTraceParams { resolution: 10e-12, channel: Some(1) });
        assert_eq!(ch1, vec![1, 0, 0, 0]);
    }

    #[test]
    fn trace_spans_the_latest_event() {
        let calibration = HeaderCalibration::new(RecordFormat::PicoHarpT2, 1e-12, 1e-12);
        let events = vec![Event::photon(100, 0, 0), Event::photon(3, 0, 0)];
        let stream = EventStream::from_events(&events, calibration);

        let trace = timetrace(&stream, &TimeTraceParams { resolution: 10e-12, channel: None });
        assert_eq!(trace.len(), 11);
        assert_eq!(trace[0], 1);
        assert_eq!(trace[10], 1);
    }
}
