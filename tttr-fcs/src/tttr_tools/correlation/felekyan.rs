//! Pair counting on the full resolution time axis.
//!
//! For every photon of the first stream the photons of the second stream are
//! counted into the lag bins `[x[k], x[k+1])`. Each first-stream photon keeps
//! one pointer into the second stream that only ever moves forward as the bins
//! widen, and prefix sums of the second stream's weights turn each bin into a
//! single subtraction.
use super::photon_stream::CorrelatorPhotonStream;

fn prefix_sums(weights: &[f64]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(weights.len() + 1);
    let mut acc = 0.0;
    cumulative.push(acc);
    for &w in weights {
        acc += w;
        cumulative.push(acc);
    }
    cumulative
}

pub(crate) fn ccf_felekyan(
    x_axis: &[u64],
    correlation: &mut [f64],
    p1: &CorrelatorPhotonStream,
    p2: &CorrelatorPhotonStream,
) {
    if x_axis.len() < 2 {
        return;
    }
    let t2 = &p2.times;
    let cumulative = prefix_sums(&p2.weights);

    // edge[i]: first photon of p2 at or after t1[i] + x[k]
    let mut edge = Vec::with_capacity(p1.times.len());
    let mut j = 0;
    for &t in &p1.times {
        let lower = t.saturating_add(x_axis[0]);
        while j < t2.len() && t2[j] < lower {
            j += 1;
        }
        edge.push(j);
    }

    for k in 0..x_axis.len() - 1 {
        let mut acc = 0.0;
        for (i, (&t, &w)) in p1.times.iter().zip(&p1.weights).enumerate() {
            let start = edge[i];
            let upper = t.saturating_add(x_axis[k + 1]);
            let mut end = start;
            while end < t2.len() && t2[end] < upper {
                end += 1;
            }
            edge[i] = end;
            acc += w * (cumulative[end] - cumulative[start]);
        }
        correlation[k] = acc;
    }
}

/// Normalize pair counts by the counts expected for uncorrelated streams.
///
/// With `max_time` the largest time of both streams and `np` their summed
/// weights, bin `k` is divided by `(x[k+1] - x[k]) * np1 * np2 / max_time^2 * (max_time - x[k])`.
/// Bins whose denominator is not positive are left as they are.
pub(crate) fn normalize_ccf_felekyan(
    np1: f64,
    np2: f64,
    max_time: u64,
    x_axis: &[u64],
    correlation: &[f64],
    corr_normalized: &mut [f64],
) {
    let maxmat = max_time as f64;
    for (i, &corr) in correlation.iter().enumerate() {
        let width = match x_axis.get(i + 1) {
            Some(&next) => (next - x_axis[i]) as f64,
            None => 0.0,
        };
        let remaining = maxmat - x_axis[i] as f64;
        let denominator = width * np1 * np2 / (maxmat * maxmat) * remaining;
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

    fn stream(times: &[u64], weights: &[f64]) -> CorrelatorPhotonStream {
        let mut p = CorrelatorPhotonStream::new();
        p.set_events(times, weights).unwrap();
        p
    }

    #[test]
    fn counts_pairs_per_bin() {
        let p1 = stream(&[0, 10], &[1.0, 2.0]);
        let p2 = stream(&[0, 1, 5, 12, 30], &[1.0, 1.0, 1.0, 1.0, 1.0]);
        let x_axis = [0, 1, 2, 4, 8, 16];
        let mut correlation = [0.0; 6];
        ccf_felekyan(&x_axis, &mut correlation, &p1, &p2);

        // lags from photon at 0: 0, 1, 5, 12, 30
        // lags from photon at 10 (weight 2): 2, 20
        assert_eq!(correlation, [1.0, 1.0, 2.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn negative_lags_are_ignored() {
        let p1 = stream(&[10], &[1.0]);
        let p2 = stream(&[2, 9, 10], &[1.0, 1.0, 1.0]);
        let x_axis = [0, 1, 2];
        let mut correlation = [0.0; 3];
        ccf_felekyan(&x_axis, &mut correlation, &p1, &p2);
        assert_eq!(correlation, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn normalization() {
        let x_axis = [0, 2, 4];
        let correlation = [5.0, 5.0, 0.0];
        let mut normalized = [0.0; 3];
        normalize_ccf_felekyan(10.0, 10.0, 10, &x_axis, &correlation, &mut normalized);
        // np1 * np2 / maxmat^2 = 1
        assert_eq!(normalized[0], 5.0 / 20.0);
        assert_eq!(normalized[1], 5.0 / 16.0);
        assert_eq!(normalized[2], 0.0);
    }

    #[test]
    fn normalization_without_photons_is_neutral() {
        let x_axis = [0, 1];
        let correlation = [3.0, 0.0];
        let mut normalized = [0.0; 2];
        normalize_ccf_felekyan(0.0, 0.0, 0, &x_axis, &correlation, &mut normalized);
        assert_eq!(normalized, [3.0, 0.0]);
    }
}
