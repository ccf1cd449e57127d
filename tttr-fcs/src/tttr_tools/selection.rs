//! Index selections over decoded event arrays.
//!
//! All selections are order preserving and never touch the arrays they scan.
//! Times are expected in arrival order. An event earlier than the one that
//! opened its window counts as zero time after it.

/// Parameters for [`select_by_count_rate`].
///
/// # Parameters
///    - window: Length of a counting window in macro time units
///    - max_photons: Runs with this many events or more in their window are rejected
///    - invert: Select the rejected runs instead
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CountRateParams {
    pub window: u64,
    pub max_photons: usize,
    pub invert: bool,
}

/// Parameters for [`ranges_by_time_window`].
///
/// # Parameters
///    - tw_min: Minimum span of a range in macro time units
///    - tw_max: Ranges spanning more than this are dropped
///    - n_ph_min: Ranges with fewer events are dropped
///    - n_ph_max: Ranges with more events are dropped
///
/// `None` leaves the corresponding bound unconstrained.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct TimeWindowParams {
    pub tw_min: u64,
    pub tw_max: Option<u64>,
    pub n_ph_min: Option<usize>,
    pub n_ph_max: Option<usize>,
}

/// Indices of the events whose channel is one of `wanted`.
pub fn select_by_channel(channels: &[i16], wanted: &[i16]) -> Vec<usize> {
    channels
        .iter()
        .enumerate()
        .filter(|(_, ch)| wanted.contains(ch))
        .map(|(i, _)| i)
        .collect()
}

/// Reject bursts of high count rate.
///
/// The scan is greedy and non-overlapping: a window opens at the first
/// unassigned event and takes every following event closer than `window` to
/// it. That run is kept when it holds fewer than `max_photons` events. The
/// next window opens at the first event after the run, so windows never slide
/// one event at a time.
pub fn select_by_count_rate(macro_times: &[u64], params: &CountRateParams) -> Vec<usize> {
    let n = macro_times.len();
    let mut selection = Vec::with_capacity(n);

    let mut begin = 0;
    while begin < n {
        let start = macro_times[begin];
        let mut end = begin;
        while end < n && macro_times[end].saturating_sub(start) < params.window {
            end += 1;
        }
        // a zero width window still has to consume its opening event
        let end = end.max(begin + 1);

        let accepted = (end - begin) < params.max_photons;
        if accepted != params.invert {
            selection.extend(begin..end);
        }
        begin = end;
    }
    selection
}

/// Split the stream into consecutive ranges spanning at least `tw_min`.
///
/// Each range `(begin, end)` is half open. It ends at the first event at least
/// `tw_min` after its first event, and that event opens the next range. The
/// span of a range is measured up to that closing event. A trailing run that
/// never reaches `tw_min` is not reported.
pub fn ranges_by_time_window(macro_times: &[u64], params: &TimeWindowParams) -> Vec<(usize, usize)> {
    let n = macro_times.len();
    let mut ranges = Vec::new();

    let mut begin = 0;
    while begin < n {
        let mut end = begin + 1;
        while end < n && macro_times[end].saturating_sub(macro_times[begin]) < params.tw_min {
            end += 1;
        }
        if end == n {
            break;
        }

        let span = macro_times[end].saturating_sub(macro_times[begin]);
        let n_ph = end - begin;
        let keep = params.tw_max.map_or(true, |tw_max| span <= tw_max)
            && params.n_ph_min.map_or(true, |min| n_ph >= min)
            && params.n_ph_max.map_or(true, |max| n_ph <= max);
        if keep {
            ranges.push((begin, end));
        }
        begin = end;
    }
    ranges
}
