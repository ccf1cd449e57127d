//! Correlation on an arbitrary lag axis.
//!
//! The lag edges do not need to follow the multi-tau pattern. Every edge keeps
//! one pointer into the second stream; as the first stream is walked in time
//! order each pointer advances to the first photon at or after `t1 + x[k]`, and
//! the weight between two neighbouring pointers falls into that bin.
use super::photon_stream::CorrelatorPhotonStream;

pub(crate) fn ccf_laurence(
    x_axis: &[u64],
    correlation: &mut [f64],
    p1: &CorrelatorPhotonStream,
    p2: &CorrelatorPhotonStream,
) {
    let t2 = &p2.times;
    let mut cumulative = Vec::with_capacity(t2.len() + 1);
    cumulative.push(0.0);
    for (j, &w) in p2.weights.iter().enumerate() {
        cumulative.push(cumulative[j] + w);
    }

    let mut pointers = vec![0usize; x_axis.len()];
    for (&t, &w) in p1.times.iter().zip(&p1.weights) {
        for (pointer, &x) in pointers.iter_mut().zip(x_axis) {
            let target = t.saturating_add(x);
            while *pointer < t2.len() && t2[*pointer] < target {
                *pointer += 1;
            }
        }
        for k in 0..x_axis.len().saturating_sub(1) {
            correlation[k] += w * (cumulative[pointers[k + 1]] - cumulative[pointers[k]]);
        }
    }
}

/// First and last time of a stream together with its summed weight.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct StreamExtent {
    pub first: u64,
    pub last: u64,
    pub weight: f64,
}

impl StreamExtent {
    pub fn of(stream: &CorrelatorPhotonStream) -> Option<Self> {
        Some(Self {
            first: *stream.times.first()?,
            last: *stream.times.last()?,
            weight: stream.sum_of_weights(),
        })
    }

    fn rate(&self) -> f64 {
        if self.last > self.first {
            self.weight / (self.last - self.first) as f64
        } else {
            0.0
        }
    }
}

/// Normalize by the counts expected for uncorrelated streams.
///
/// Bin `k` is divided by `(x[k+1] - x[k]) * cr1 * cr2 * overlap`, where the
/// overlap is the time during which a photon of the first stream can find a
/// partner at lag `x[k]`:
/// `min(last1, last2 - x[k]) - max(first1, first2 - x[k])`.
/// Bins without a positive denominator are left as they are.
pub(crate) fn normalize_ccf_laurence(
    s1: Option<StreamExtent>,
    s2: Option<StreamExtent>,
    x_axis: &[u64],
    correlation: &[f64],
    corr_normalized: &mut [f64],
) {
    for (i, &corr) in correlation.iter().enumerate() {
        let denominator = match (s1, s2, x_axis.get(i + 1)) {
            (Some(s1), Some(s2), Some(&next)) => {
                let tau = x_axis[i] as i128;
                let width = (next - x_axis[i]) as f64;
                let end = (s1.last as i128).min(s2.last as i128 - tau);
                let begin = (s1.first as i128).max(s2.first as i128 - tau);
                width * s1.rate() * s2.rate() * (end - begin) as f64
            }
            _ => 0.0,
        };
        let factor = if denominator > 0.0 && denominator.is_finite() {
            denominator
        } else {
            1.0
        };
        corr_normalized[i] = corr / factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(times: &[u64]) -> CorrelatorPhotonStream {
        let mut p = CorrelatorPhotonStream::new();
        p.set_events(times, &vec![1.0; times.len()]).unwrap();
        p
    }

    #[test]
    fn irregular_axis() {
        let p1 = stream(&[0, 10]);
        let p2 = stream(&[3, 10, 11, 40]);
        let x_axis = [0, 5, 7, 100];
        let mut correlation = [0.0; 4];
        ccf_laurence(&x_axis, &mut correlation, &p1, &p2);
        // lags from 0: 3, 10, 11, 40; from 10: 0, 1, 30
        assert_eq!(correlation, [3.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn overlap_shrinks_with_lag() {
        let s = StreamExtent { first: 0, last: 10, weight: 10.0 };
        let x_axis = [0, 2, 4];
        let correlation = [10.0, 8.0, 0.0];
        let mut normalized = [0.0; 3];
        normalize_ccf_laurence(Some(s), Some(s), &x_axis, &correlation, &mut normalized);
        assert_eq!(normalized[0], 10.0 / 20.0);
        assert_eq!(normalized[1], 8.0 / 16.0);
        assert_eq!(normalized[2], 0.0);
    }

    #[test]
    fn missing_stream_is_neutral() {
        let x_axis = [0, 1];
        let correlation = [2.0, 0.0];
        let mut normalized = [0.0; 2];
        normalize_ccf_laurence(None, StreamExtent::of(&stream(&[1, 2])), &x_axis, &correlation, &mut normalized);
        assert_eq!(normalized, [2.0, 0.0]);
    }
}
