use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::Error;
use crate::headers::{HeaderCalibration, RecordFormat};
use crate::parsers::records::field;
use crate::TTTRFile;

/// Macro time clock in the first record is stored in units of 0.1 ns.
const SPC_CLOCK_UNIT: f64 = 1e-10;

/// Metadata for a Becker&Hickl SPC file.
///
/// SPC files have no tagged header. Their first record holds the macro time
/// clock in its low 24 bits; the micro time resolution lives in the separate
/// setup file, so it defaults to the macro resolution split over the ADC
/// channels unless the caller provides it.
pub struct SPCFile {
    pub path: PathBuf,
    pub format: RecordFormat,
    pub macro_time_clock: u64,
    micro_time_resolution: Option<f64>,
}

impl SPCFile {
    pub fn new(filename: PathBuf, format: RecordFormat) -> Result<Self, Error> {
        if !filename.exists() {
            return Err(Error::FileNotAvailable(filename.display().to_string()));
        }
        let mut buffered = BufReader::new(std::fs::File::open(&filename)?);
        let macro_time_clock = parse_spc_header(&mut buffered, format)?;
        Ok(Self {
            path: filename,
            format,
            macro_time_clock,
            micro_time_resolution: None,
        })
    }

    /// Use `resolution` seconds per micro time channel instead of the default.
    pub fn with_micro_time_resolution(mut self, resolution: f64) -> Self {
        self.micro_time_resolution = Some(resolution);
        self
    }
}

/// Read the header record and return the macro time clock in units of 0.1 ns.
pub fn parse_spc_header<R: Read>(reader: &mut R, format: RecordFormat) -> Result<u64, Error> {
    match format {
        RecordFormat::Spc130 | RecordFormat::Spc600_256 | RecordFormat::Spc600_4096 => {}
        other => {
            return Err(Error::InvalidHeader(format!(
                "{} records are not stored in SPC files",
                other
            )))
        }
    }
    let mut buffer = [0u8; 6];
    let n_bytes = format.record_bytes();
    reader.read_exact(&mut buffer[..n_bytes])?;
    let raw = match n_bytes {
        6 => LittleEndian::read_u48(&buffer),
        _ => LittleEndian::read_u32(&buffer) as u64,
    };
    let clock = field(raw, 0, 24);
    if clock == 0 {
        return Err(Error::InvalidHeader(String::from(
            "SPC header record holds a zero macro time clock",
        )));
    }
    Ok(clock)
}

impl TTTRFile for SPCFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn calibration(&self) -> Result<HeaderCalibration, Error> {
        let macro_time_resolution = self.macro_time_clock as f64 * SPC_CLOCK_UNIT;
        let number_of_micro_time_channels = self.format.micro_time_range();
        let micro_time_resolution = self
            .micro_time_resolution
            .unwrap_or(macro_time_resolution / number_of_micro_time_channels as f64);
        Ok(HeaderCalibration {
            macro_time_resolution,
            micro_time_resolution,
            record_format: self.format,
            number_of_micro_time_channels,
        })
    }

    fn data_offset(&self) -> Result<u64, Error> {
        Ok(self.format.record_bytes() as u64)
    }

    fn number_of_records(&self) -> Result<Option<usize>, Error> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_clock_from_first_record() {
        // 500 x 0.1 ns = 50 ns, plus routing bits above the clock
        let raw: u32 = (2 << 24) | 500;
        let bytes = raw.to_le_bytes();
        let clock = parse_spc_header(&mut &bytes[..], RecordFormat::Spc130).unwrap();
        assert_eq!(clock, 500);
    }

    #[test]
    fn zero_clock_is_invalid() {
        let bytes = [0u8; 6];
        let result = parse_spc_header(&mut &bytes[..], RecordFormat::Spc600_4096);
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn picoquant_formats_are_rejected() {
        let bytes = [1u8; 4];
        let result = parse_spc_header(&mut &bytes[..], RecordFormat::PicoHarpT3);
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }
}
