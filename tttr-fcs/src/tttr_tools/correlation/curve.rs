use log::warn;

use crate::errors::Error;

/// Shape of the correlation curve.
///
/// `macro_time_duration` is the duration in seconds of one unit on the x axis.
/// It is taken from the photon streams every time a correlation is run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CurveSettings {
    pub n_bins: usize,
    pub n_casc: usize,
    pub macro_time_duration: f64,
}

/// Lag axis and correlation amplitudes.
///
/// `x_axis`, `correlation` and `corr_normalized` always have the same length.
/// The last lag closes the final bin and carries no amplitude of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatorCurve {
    pub settings: CurveSettings,
    pub(crate) x_axis: Vec<u64>,
    pub(crate) correlation: Vec<f64>,
    pub(crate) corr_normalized: Vec<f64>,
    custom_axis: bool,
}

/// Largest number of cascades of `n_bins` whose lags still fit in a `u64`.
pub fn max_cascades(n_bins: usize) -> usize {
    (0..=64u32)
        .take_while(|&c| {
            let steps = if c == 64 { u64::MAX } else { (1u64 << c) - 1 };
            steps.checked_mul(n_bins as u64).is_some()
        })
        .last()
        .map_or(0, |c| c as usize)
}

/// Build the multi-tau lag axis.
///
/// Bins are grouped in `n_casc` cascades of `n_bins`. The first lag is 0 and
/// every following lag adds `2^cascade` to the previous one:
///
/// ```text
/// n_bins = 4, n_casc = 3:  0  1 2 3 4  6 8 10 12  16 20 24 28
/// ```
///
/// The axis has `n_bins * n_casc + 1` points. `n_casc` is capped at
/// [`max_cascades`].
pub fn cascade_axis(n_bins: usize, n_casc: usize) -> Vec<u64> {
    let n_casc = n_casc.min(max_cascades(n_bins));
    let n_correlation = n_bins * n_casc + 1;
    let mut x_axis = Vec::with_capacity(n_correlation);
    let mut lag = 0u64;
    x_axis.push(lag);
    for i in 1..n_correlation {
        let cascade = ((i - 1) / n_bins) as u32;
        lag = match 1u64.checked_shl(cascade).and_then(|step| lag.checked_add(step)) {
            Some(lag) => lag,
            None => break,
        };
        x_axis.push(lag);
    }
    x_axis
}

/// Check a user supplied lag axis: non-empty, starts at 0 and strictly increasing.
pub fn validate_axis(edges: &[u64]) -> Result<(), Error> {
    match edges.first() {
        None => return Err(Error::InvalidAxis("lag axis is empty".to_string())),
        Some(&first) if first != 0 => {
            return Err(Error::InvalidAxis(format!("lag axis starts at {} instead of 0", first)))
        }
        _ => {}
    }
    if let Some(i) = edges.windows(2).position(|w| w[0] >= w[1]) {
        return Err(Error::InvalidAxis(format!(
            "lag axis is not strictly increasing at index {}",
            i + 1
        )));
    }
    Ok(())
}

impl CorrelatorCurve {
    pub fn new(n_bins: usize, n_casc: usize) -> Self {
        let mut curve = Self {
            settings: CurveSettings {
                n_bins,
                n_casc,
                macro_time_duration: 1.0,
            },
            x_axis: vec![],
            correlation: vec![],
            corr_normalized: vec![],
            custom_axis: false,
        };
        curve.update_axis();
        curve
    }

    /// Number of points on the lag axis.
    pub fn n_correlation(&self) -> usize {
        if self.custom_axis {
            self.x_axis.len()
        } else {
            self.settings.n_bins * self.settings.n_casc + 1
        }
    }

    /// Rebuild the cascaded lag axis and zero both amplitude arrays.
    ///
    /// A cascade count beyond [`max_cascades`] is lowered to it.
    pub fn update_axis(&mut self) {
        let max = max_cascades(self.settings.n_bins);
        if self.settings.n_casc > max {
            warn!(
                "{} cascades of {} bins overflow the lag axis, using {}",
                self.settings.n_casc, self.settings.n_bins, max
            );
            self.settings.n_casc = max;
        }
        self.custom_axis = false;
        self.x_axis = cascade_axis(self.settings.n_bins, self.settings.n_casc);
        self.clear();
    }

    /// Replace the lag axis by `edges` and zero both amplitude arrays.
    pub fn set_x_axis(&mut self, edges: &[u64]) -> Result<(), Error> {
        validate_axis(edges)?;
        self.custom_axis = true;
        self.x_axis = edges.to_vec();
        self.clear();
        Ok(())
    }

    pub fn has_custom_axis(&self) -> bool {
        self.custom_axis
    }

    pub(crate) fn clear(&mut self) {
        let n = self.x_axis.len();
        self.correlation = vec![0.0; n];
        self.corr_normalized = vec![0.0; n];
    }

    pub fn x_axis(&self) -> &[u64] {
        &self.x_axis
    }

    pub fn correlation(&self) -> &[f64] {
        &self.correlation
    }

    pub fn corr_normalized(&self) -> &[f64] {
        &self.corr_normalized
    }

    /// Lag axis in seconds.
    pub fn x_axis_seconds(&self) -> Vec<f64> {
        self.x_axis
            .iter()
            .map(|&x| x as f64 * self.settings.macro_time_duration)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.x_axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_axis.is_empty()
    }
}
