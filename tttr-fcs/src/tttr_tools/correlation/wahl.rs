//! Multi-tau correlation on successively coarsened time axes.
//!
//! Cascade `j` correlates streams whose times have been halved `j` times, so
//! every lag of that cascade is a plain shift by `x / 2^j` coarse units.
//! Photons landing on the same coarse time are merged and only the merged
//! weights are multiplied, which keeps the cost of every cascade linear in
//! the number of distinct times.
use super::photon_stream::CorrelatorPhotonStream;

/// Sum of `w1[i] * w2[j]` over all pairs with `t2[j] == t1[i] + shift`.
fn correlate_shifted(t1: &[u64], w1: &[f64], t2: &[u64], w2: &[f64], shift: u64) -> f64 {
    let mut sum = 0.0;
    let mut j = 0;
    for (&t, &w) in t1.iter().zip(w1) {
        let target = match t.checked_add(shift) {
            Some(target) => target,
            None => break,
        };
        while j < t2.len() && t2[j] < target {
            j += 1;
        }
        if j == t2.len() {
            break;
        }
        let mut k = j;
        while k < t2.len() && t2[k] == target {
            sum += w * w2[k];
            k += 1;
        }
    }
    sum
}

/// Fill `correlation` for the cascaded lag axis `x_axis`.
///
/// Both streams are coarsened after every cascade and are left at the
/// resolution of the last one.
pub(crate) fn ccf_wahl(
    n_bins: usize,
    n_casc: usize,
    x_axis: &[u64],
    correlation: &mut [f64],
    p1: &mut CorrelatorPhotonStream,
    p2: &mut CorrelatorPhotonStream,
) {
    for i_casc in 0..n_casc {
        for i_bin in 0..n_bins {
            let i_tau = i_casc * n_bins + i_bin;
            let shift = x_axis[i_tau].checked_shr(i_casc as u32).unwrap_or(0);
            correlation[i_tau] = correlate_shifted(&p1.times, &p1.weights, &p2.times, &p2.weights, shift);
        }
        p1.coarsen();
        p2.coarsen();
    }
}

/// Count-rate normalization of a multi-tau curve.
///
/// A bin of cascade `j` multiplies weights summed over `2^j` time units, so the
/// raw value is divided by `2^j` and by the product of both count rates and the
/// overlap time `min(dt1, dt2 - tau)`. Rates and spans describe the streams
/// before any coarsening. A bin whose denominator is not positive keeps only
/// the `2^j` factor.
pub(crate) fn normalize_ccf_wahl(
    n_bins: usize,
    (np1, dt1): (f64, u64),
    (np2, dt2): (f64, u64),
    x_axis: &[u64],
    correlation: &[f64],
    corr_normalized: &mut [f64],
) {
    let cr1 = if dt1 > 0 { np1 / dt1 as f64 } else { 0.0 };
    let cr2 = if dt2 > 0 { np2 / dt2 as f64 } else { 0.0 };
    let n_computed = correlation.len().saturating_sub(1);

    for (i, (&tau, &corr)) in x_axis.iter().zip(correlation).enumerate() {
        let i_casc = if n_bins == 0 { 0 } else { i.min(n_computed.saturating_sub(1)) / n_bins };
        let pw = 2f64.powi(i_casc as i32);
        let t_corr = dt1.min(dt2.saturating_sub(tau)) as f64;
        let denominator = cr1 * cr2 * t_corr;
        let factor = if denominator > 0.0 && denominator.is_finite() {
            denominator
        } else {
            1.0
        };
        corr_normalized[i] = corr / pw / factor;
    }
}
