use crate::errors::Error;
use crate::event_stream::EventStream;
use crate::EventKind;

/// Weighted photon arrival times of one correlation channel.
///
/// `times` is non-decreasing and always as long as `weights`.
/// `time_axis_calibration` is the duration of one time unit in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatorPhotonStream {
    pub times: Vec<u64>,
    pub weights: Vec<f64>,
    pub time_axis_calibration: f64,
}

impl Default for CorrelatorPhotonStream {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            weights: Vec::new(),
            time_axis_calibration: 1.0,
        }
    }
}

impl CorrelatorPhotonStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use externally supplied times and weights.
    ///
    /// `times` must be non-decreasing. On error the stream is left unchanged.
    pub fn set_events(&mut self, times: &[u64], weights: &[f64]) -> Result<(), Error> {
        if times.len() != weights.len() {
            return Err(Error::LengthMismatch(times.len(), weights.len()));
        }
        if let Some(i) = times.windows(2).position(|w| w[0] > w[1]) {
            return Err(Error::UnsortedTimes(i + 1));
        }
        self.times = times.to_vec();
        self.weights = weights.to_vec();
        Ok(())
    }

    /// Take the photons of `stream` with unit weights. Markers are skipped.
    ///
    /// With `make_fine` the micro times are folded into the time axis, see
    /// [`CorrelatorPhotonStream::make_fine`]. Returns the micro times of the
    /// photons taken, in the same order as `times`.
    pub fn set_tttr(&mut self, stream: &EventStream, make_fine: bool) -> Vec<u32> {
        let photons = stream
            .macro_times()
            .iter()
            .zip(stream.micro_times())
            .zip(stream.kinds())
            .filter(|(_, &kind)| kind == EventKind::Photon)
            .map(|((&t, &micro), _)| (t, micro));

        self.times.clear();
        let mut micro_times = Vec::with_capacity(stream.len());
        for (t, micro) in photons {
            self.times.push(t);
            micro_times.push(micro);
        }
        self.weights = vec![1.0; self.times.len()];

        let calibration = stream.calibration();
        self.time_axis_calibration = calibration.macro_time_resolution;
        if make_fine {
            self.fold_micro_times(&micro_times, calibration.number_of_micro_time_channels);
        }
        micro_times
    }

    /// Combine macro and micro times into one clock ticking once per micro
    /// time channel.
    ///
    /// Each time becomes `time * n_micro_channels + micro_time` and the time
    /// calibration is divided by `n_micro_channels`.
    pub fn make_fine(&mut self, micro_times: &[u32], n_micro_channels: u32) -> Result<(), Error> {
        if micro_times.len() != self.times.len() {
            return Err(Error::LengthMismatch(self.times.len(), micro_times.len()));
        }
        self.fold_micro_times(micro_times, n_micro_channels);
        Ok(())
    }

    fn fold_micro_times(&mut self, micro_times: &[u32], n_micro_channels: u32) {
        let n = n_micro_channels.max(1);
        for (t, &micro) in self.times.iter_mut().zip(micro_times) {
            *t = *t * n as u64 + micro as u64;
        }
        self.time_axis_calibration /= n as f64;
    }

    /// Weight every photon by `filter[micro_time]`; photons beyond the filter get 0.
    pub fn set_weights_from_filter(&mut self, micro_times: &[u32], filter: &[f64]) -> Result<(), Error> {
        if micro_times.len() != self.times.len() {
            return Err(Error::LengthMismatch(self.times.len(), micro_times.len()));
        }
        self.weights = micro_times
            .iter()
            .map(|&micro| filter.get(micro as usize).copied().unwrap_or(0.0))
            .collect();
        Ok(())
    }

    /// Halve the time resolution.
    ///
    /// Every time is divided by two. Photons that end up on the same time are
    /// merged into one slot carrying the sum of their weights, and slots whose
    /// weight is zero are dropped. The compaction runs in place with a read and
    /// a write cursor; the write cursor never overtakes the read cursor.
    /// Afterwards all times are distinct.
    pub fn coarsen(&mut self) {
        let mut write = 0;
        for read in 0..self.times.len() {
            let t = self.times[read] / 2;
            let w = self.weights[read];
            if write > 0 && self.times[write - 1] == t {
                self.weights[write - 1] += w;
            } else {
                self.times[write] = t;
                self.weights[write] = w;
                write += 1;
            }
        }
        self.times.truncate(write);
        self.weights.truncate(write);

        let mut keep = 0;
        for read in 0..self.times.len() {
            if self.weights[read] != 0.0 {
                self.times[keep] = self.times[read];
                self.weights[keep] = self.weights[read];
                keep += 1;
            }
        }
        self.times.truncate(keep);
        self.weights.truncate(keep);

        self.time_axis_calibration *= 2.0;
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn sum_of_weights(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// `times.last() - times.first()`, 0 for fewer than two photons.
    pub fn time_span(&self) -> u64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last.saturating_sub(*first),
            _ => 0,
        }
    }

    /// Weight per time unit between the first and the last photon.
    ///
    /// Streams with fewer than two photons or spanning no time have a rate of 0.
    pub fn mean_count_rate(&self) -> f64 {
        let span = self.time_span();
        if self.len() < 2 || span == 0 {
            return 0.0;
        }
        self.sum_of_weights() / span as f64
    }
}
