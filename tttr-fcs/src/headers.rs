use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::Error;
use crate::parsers::{ptu::PTUFile, spc::SPCFile};
use crate::TTTRFile;

/// Bit layout of the raw records in a TTTR stream.
///
/// Every variant has its own decoder in `parsers::records`. The record width
/// and the overflow wraparound are fixed per variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RecordFormat {
    PicoHarpT2,
    PicoHarpT3,
    HydraHarpV1T2,
    HydraHarpV1T3,
    HydraHarpV2T2,
    HydraHarpV2T3,
    Spc130,
    Spc600_256,
    Spc600_4096,
}

impl RecordFormat {
    /// Number of bytes each record occupies on disk.
    pub fn record_bytes(&self) -> usize {
        match self {
            RecordFormat::Spc600_4096 => 6,
            _ => 4,
        }
    }

    /// Macro time units added to the clock for every overflow.
    pub fn wraparound(&self) -> u64 {
        use crate::parsers::records::*;
        match self {
            RecordFormat::PicoHarpT2 => PHT2_WRAPAROUND,
            RecordFormat::PicoHarpT3 => PHT3_WRAPAROUND,
            RecordFormat::HydraHarpV1T2 => HHT2_V1_WRAPAROUND,
            RecordFormat::HydraHarpV2T2 => HHT2_V2_WRAPAROUND,
            RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => HHT3_WRAPAROUND,
            RecordFormat::Spc130 => SPC130_WRAPAROUND,
            RecordFormat::Spc600_256 => SPC600_256_WRAPAROUND,
            RecordFormat::Spc600_4096 => SPC600_4096_WRAPAROUND,
        }
    }

    /// T2 records carry a single time tag and no micro time.
    pub fn is_t2(&self) -> bool {
        matches!(
            self,
            RecordFormat::PicoHarpT2 | RecordFormat::HydraHarpV1T2 | RecordFormat::HydraHarpV2T2
        )
    }

    /// Number of distinct values the micro time field can take.
    pub fn micro_time_range(&self) -> u32 {
        match self {
            RecordFormat::PicoHarpT2
            | RecordFormat::HydraHarpV1T2
            | RecordFormat::HydraHarpV2T2 => 1,
            RecordFormat::PicoHarpT3 => 1 << 12,
            RecordFormat::HydraHarpV1T3 | RecordFormat::HydraHarpV2T3 => 1 << 15,
            RecordFormat::Spc130 | RecordFormat::Spc600_4096 => 1 << 12,
            RecordFormat::Spc600_256 => 1 << 8,
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RecordFormat::PicoHarpT2 => "PicoHarp T2",
            RecordFormat::PicoHarpT3 => "PicoHarp T3",
            RecordFormat::HydraHarpV1T2 => "HydraHarp v1 T2",
            RecordFormat::HydraHarpV1T3 => "HydraHarp v1 T3",
            RecordFormat::HydraHarpV2T2 => "HydraHarp v2 T2",
            RecordFormat::HydraHarpV2T3 => "HydraHarp v2 T3",
            RecordFormat::Spc130 => "BH SPC-130",
            RecordFormat::Spc600_256 => "BH SPC-600 (256 ch)",
            RecordFormat::Spc600_4096 => "BH SPC-600 (4096 ch)",
        };
        write!(f, "{}", name)
    }
}

/// The container a TTTR stream is stored in. Detection is left to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContainerType {
    PTU,
    SPC130,
    SPC600_256,
    SPC600_4096,
}

impl FromStr for ContainerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ptu" => Ok(ContainerType::PTU),
            "spc130" | "spc-130" => Ok(ContainerType::SPC130),
            "spc600-256" | "spc600_256" => Ok(ContainerType::SPC600_256),
            "spc600-4096" | "spc600_4096" => Ok(ContainerType::SPC600_4096),
            other => Err(Error::InvalidHeader(format!("Unknown container type {}", other))),
        }
    }
}

/// The calibration a decoder needs from a file header.
///
/// Resolutions are in seconds. For T2 formats the micro time is unused and
/// `number_of_micro_time_channels` is 1.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeaderCalibration {
    pub macro_time_resolution: f64,
    pub micro_time_resolution: f64,
    pub record_format: RecordFormat,
    pub number_of_micro_time_channels: u32,
}

impl HeaderCalibration {
    /// Calibration derived from the two resolutions, the way PTU headers state it.
    pub fn new(record_format: RecordFormat, macro_time_resolution: f64, micro_time_resolution: f64) -> Self {
        let number_of_micro_time_channels = if record_format.is_t2() || micro_time_resolution <= 0.0 {
            1
        } else {
            ((macro_time_resolution / micro_time_resolution).round() as u32).max(1)
        };
        Self {
            macro_time_resolution,
            micro_time_resolution,
            record_format,
            number_of_micro_time_channels,
        }
    }
}

pub enum File {
    PTU(PTUFile),
    SPC(SPCFile),
}

impl File {
    /// Open `path` as a container of the given type and read its header.
    pub fn open<P: AsRef<Path>>(path: P, container: ContainerType) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        Ok(match container {
            ContainerType::PTU => File::PTU(PTUFile::new(path)?),
            ContainerType::SPC130 => File::SPC(SPCFile::new(path, RecordFormat::Spc130)?),
            ContainerType::SPC600_256 => File::SPC(SPCFile::new(path, RecordFormat::Spc600_256)?),
            ContainerType::SPC600_4096 => File::SPC(SPCFile::new(path, RecordFormat::Spc600_4096)?),
        })
    }

    pub fn as_tttr_file(&self) -> &dyn TTTRFile {
        match self {
            File::PTU(x) => x,
            File::SPC(x) => x,
        }
    }
}
