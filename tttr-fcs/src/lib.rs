#[macro_use]
extern crate num_derive;
extern crate byteorder;

pub mod errors;
pub mod event_stream;
pub mod headers;
pub mod parsers;
pub mod tttr_tools;

use std::path::Path;

pub use event_stream::EventStream;
pub use headers::{ContainerType, HeaderCalibration, RecordFormat};
pub use tttr_tools::correlation::{
    CorrelationMethod, Correlator, CorrelatorCurve, CorrelatorPhotonStream, CorrelatorSettings,
};

/// What a decoded record represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum EventKind {
    Photon = 0,
    Marker = 1,
}

/// A single calibrated event.
///
/// `macro_time` is overflow corrected and counts sync periods (T3) or time
/// tags (T2). `micro_time` is always 0 for T2 formats and for markers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Event {
    pub macro_time: u64,
    pub micro_time: u32,
    pub channel: i16,
    pub kind: EventKind,
}

impl Event {
    #[inline]
    pub fn photon(macro_time: u64, micro_time: u32, channel: i16) -> Self {
        Self { macro_time, micro_time, channel, kind: EventKind::Photon }
    }

    #[inline]
    pub fn marker(macro_time: u64, channel: i16) -> Self {
        Self { macro_time, micro_time: 0, channel, kind: EventKind::Marker }
    }
}

/// The TTTRFile trait ensures that all files we support know where their
/// records start and how to calibrate them.
pub trait TTTRFile {
    fn path(&self) -> &Path;
    fn calibration(&self) -> Result<HeaderCalibration, errors::Error>;
    /// Byte offset of the first record.
    fn data_offset(&self) -> Result<u64, errors::Error>;
    /// Number of records announced by the header, if it announces one.
    fn number_of_records(&self) -> Result<Option<usize>, errors::Error>;
}
