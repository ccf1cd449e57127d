//! Fluorescence correlation of photon streams.
//!
//! A [`Correlator`] holds two [`CorrelatorPhotonStream`]s, the settings of the
//! lag axis and the last computed [`CorrelatorCurve`]. Changing any input marks
//! the curve stale and the next [`Correlator::get_curve`] recomputes it.
//!
//! ```no_run
//! # use tttr_fcs::{ContainerType, Correlator, CorrelatorSettings, EventStream};
//! # fn main() -> Result<(), tttr_fcs::errors::Error> {
//! let stream = EventStream::from_file("sample.ptu", ContainerType::PTU)?;
//! let ch1 = stream.select(&stream.select_by_channel(&[0]))?;
//! let ch2 = stream.select(&stream.select_by_channel(&[1]))?;
//!
//! let mut correlator = Correlator::new(CorrelatorSettings::default());
//! correlator.set_tttr(&ch1, Some(&ch2), false);
//! let curve = correlator.get_curve();
//! println!("{:?}", curve.corr_normalized());
//! # Ok(())
//! # }
//! ```
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};

use crate::errors::Error;
use crate::event_stream::EventStream;

mod curve;
mod felekyan;
mod laurence;
mod photon_stream;
mod wahl;

pub use curve::{cascade_axis, max_cascades, validate_axis, CorrelatorCurve, CurveSettings};
pub use photon_stream::CorrelatorPhotonStream;

use laurence::StreamExtent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CorrelationMethod {
    Wahl,
    Felekyan,
    Laurence,
}

impl Default for CorrelationMethod {
    fn default() -> Self {
        CorrelationMethod::Wahl
    }
}

impl FromStr for CorrelationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wahl" => Ok(CorrelationMethod::Wahl),
            "felekyan" => Ok(CorrelationMethod::Felekyan),
            "laurence" => Ok(CorrelationMethod::Laurence),
            _ => Err(Error::UnknownCorrelationMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CorrelationMethod::Wahl => "wahl",
            CorrelationMethod::Felekyan => "felekyan",
            CorrelationMethod::Laurence => "laurence",
        };
        write!(f, "{}", name)
    }
}

/// Parameters for the correlator
///
/// # Parameters
///    - n_bins: Number of lag bins in every cascade
///    - n_casc: Number of cascades, each doubling the bin width of the last
///    - method: Algorithm used to compute the curve
///    - make_fine: Fold micro times into the time axis when photons are taken
///      from an event stream
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CorrelatorSettings {
    pub n_bins: usize,
    pub n_casc: usize,
    pub method: CorrelationMethod,
    pub make_fine: bool,
}

impl Default for CorrelatorSettings {
    fn default() -> Self {
        Self {
            n_bins: 17,
            n_casc: 25,
            method: CorrelationMethod::Wahl,
            make_fine: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Correlator {
    method: CorrelationMethod,
    make_fine: bool,
    p1: CorrelatorPhotonStream,
    p2: CorrelatorPhotonStream,
    // micro times of the photons in p1 and p2, kept for filtering
    micro_times: Option<(Vec<u32>, Vec<u32>)>,
    laurence_axis: Option<Vec<u64>>,
    curve: CorrelatorCurve,
    is_valid: bool,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(CorrelatorSettings::default())
    }
}

impl Correlator {
    pub fn new(settings: CorrelatorSettings) -> Self {
        Self {
            method: settings.method,
            make_fine: settings.make_fine,
            p1: CorrelatorPhotonStream::new(),
            p2: CorrelatorPhotonStream::new(),
            micro_times: None,
            laurence_axis: None,
            curve: CorrelatorCurve::new(settings.n_bins, settings.n_casc),
            is_valid: false,
        }
    }

    pub fn settings(&self) -> CorrelatorSettings {
        CorrelatorSettings {
            n_bins: self.curve.settings.n_bins,
            n_casc: self.curve.settings.n_casc,
            method: self.method,
            make_fine: self.make_fine,
        }
    }

    /// Whether the curve reflects the current inputs.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn set_n_bins(&mut self, n_bins: usize) {
        self.curve.settings.n_bins = n_bins;
        self.laurence_axis = None;
        self.curve.update_axis();
        self.is_valid = false;
    }

    /// Counts beyond [`max_cascades`] are lowered to it with a warning.
    pub fn set_n_casc(&mut self, n_casc: usize) {
        self.curve.settings.n_casc = n_casc;
        self.laurence_axis = None;
        self.curve.update_axis();
        self.is_valid = false;
    }

    pub fn set_method(&mut self, method: CorrelationMethod) {
        self.method = method;
        self.is_valid = false;
    }

    /// Select the correlation method by name.
    ///
    /// Unknown names fall back to Wahl with a warning. Returns the method that
    /// is now in use.
    pub fn set_correlation_method(&mut self, name: &str) -> CorrelationMethod {
        let method = name.parse().unwrap_or_else(|_| {
            warn!("Unknown correlation method {:?}, using {}", name, CorrelationMethod::Wahl);
            CorrelationMethod::Wahl
        });
        self.set_method(method);
        method
    }

    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    /// Correlate externally supplied times and weights.
    ///
    /// Both time arrays must be non-decreasing and share one clock.
    pub fn set_events(&mut self, t1: &[u64], w1: &[f64], t2: &[u64], w2: &[f64]) -> Result<(), Error> {
        let mut p1 = CorrelatorPhotonStream::new();
        let mut p2 = CorrelatorPhotonStream::new();
        p1.set_events(t1, w1)?;
        p2.set_events(t2, w2)?;
        self.p1 = p1;
        self.p2 = p2;
        self.micro_times = None;
        self.is_valid = false;
        Ok(())
    }

    /// Correlate the photons of two event streams, or of one stream with itself.
    ///
    /// Markers are dropped. With `make_fine` the micro times are folded into
    /// the time axis and the lags are counted in micro time channels.
    pub fn set_tttr(&mut self, first: &EventStream, second: Option<&EventStream>, make_fine: bool) {
        self.make_fine = make_fine;
        let micro1 = self.p1.set_tttr(first, make_fine);
        let micro2 = match second {
            Some(second) => self.p2.set_tttr(second, make_fine),
            None => {
                self.p2 = self.p1.clone();
                micro1.clone()
            }
        };
        debug!(
            "Correlator takes {} and {} photons (make_fine: {})",
            self.p1.len(),
            self.p2.len(),
            make_fine
        );
        self.micro_times = Some((micro1, micro2));
        self.is_valid = false;
    }

    /// Weight every photon by the filter value of its micro time channel.
    ///
    /// Photons whose micro time lies beyond the end of their filter get
    /// weight 0. Requires photons set by [`Correlator::set_tttr`].
    pub fn set_filter(&mut self, filter1: &[f64], filter2: &[f64]) -> Result<(), Error> {
        let (micro1, micro2) = self.micro_times.as_ref().ok_or(Error::MissingMicroTimes)?;
        self.p1.set_weights_from_filter(micro1, filter1)?;
        self.p2.set_weights_from_filter(micro2, filter2)?;
        self.is_valid = false;
        Ok(())
    }

    /// Lag edges used by the Laurence method instead of the cascaded axis.
    ///
    /// The edges must start at 0 and strictly increase. Changing `n_bins` or
    /// `n_casc` discards them.
    pub fn set_laurence_axis(&mut self, edges: &[u64]) -> Result<(), Error> {
        validate_axis(edges)?;
        self.laurence_axis = Some(edges.to_vec());
        self.is_valid = false;
        Ok(())
    }

    pub fn photon_streams(&self) -> (&CorrelatorPhotonStream, &CorrelatorPhotonStream) {
        (&self.p1, &self.p2)
    }

    /// Number of points on the current lag axis.
    pub fn n_correlation(&self) -> usize {
        match (&self.laurence_axis, self.method) {
            (Some(edges), CorrelationMethod::Laurence) => edges.len(),
            _ => self.curve.settings.n_bins * self.curve.settings.n_casc + 1,
        }
    }

    /// Recompute the curve from the photon streams currently set.
    pub fn run(&mut self) {
        match (&self.laurence_axis, self.method) {
            (Some(edges), CorrelationMethod::Laurence) => {
                if self.curve.set_x_axis(edges).is_err() {
                    self.curve.update_axis();
                }
            }
            _ => self.curve.update_axis(),
        }
        self.curve.settings.macro_time_duration = self.p1.time_axis_calibration;

        let n_bins = self.curve.settings.n_bins;
        let n_casc = self.curve.settings.n_casc;
        let CorrelatorCurve {
            x_axis,
            correlation,
            corr_normalized,
            ..
        } = &mut self.curve;
        let x_axis = &x_axis[..];

        match self.method {
            CorrelationMethod::Wahl => {
                let mut p1 = self.p1.clone();
                let mut p2 = self.p2.clone();
                wahl::ccf_wahl(n_bins, n_casc, x_axis, correlation, &mut p1, &mut p2);
                wahl::normalize_ccf_wahl(
                    n_bins,
                    (self.p1.sum_of_weights(), self.p1.time_span()),
                    (self.p2.sum_of_weights(), self.p2.time_span()),
                    x_axis,
                    correlation,
                    corr_normalized,
                );
            }
            CorrelationMethod::Felekyan => {
                felekyan::ccf_felekyan(x_axis, correlation, &self.p1, &self.p2);
                let max_time = self
                    .p1
                    .times
                    .last()
                    .copied()
                    .max(self.p2.times.last().copied())
                    .unwrap_or(0);
                felekyan::normalize_ccf_felekyan(
                    self.p1.sum_of_weights(),
                    self.p2.sum_of_weights(),
                    max_time,
                    x_axis,
                    correlation,
                    corr_normalized,
                );
            }
            CorrelationMethod::Laurence => {
                laurence::ccf_laurence(x_axis, correlation, &self.p1, &self.p2);
                laurence::normalize_ccf_laurence(
                    StreamExtent::of(&self.p1),
                    StreamExtent::of(&self.p2),
                    x_axis,
                    correlation,
                    corr_normalized,
                );
            }
        }
        debug!(
            "Correlated {} x {} photons with {} on {} lags",
            self.p1.len(),
            self.p2.len(),
            self.method,
            self.curve.len()
        );
        self.is_valid = true;
    }

    /// The correlation curve, recomputed first if any input changed.
    pub fn get_curve(&mut self) -> &CorrelatorCurve {
        if !self.is_valid {
            self.run();
        }
        &self.curve
    }
}
