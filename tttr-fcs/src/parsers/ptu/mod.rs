pub mod header;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use num_traits::FromPrimitive;

use crate::errors::Error;
use crate::headers::{HeaderCalibration, RecordFormat};
use crate::TTTRFile;

pub type Header = HashMap<String, PTUTag>;

#[derive(Debug, Clone, PartialEq)]
pub enum PTUTag {
    Empty8,
    Bool8(bool),
    Int8(i64),
    BitSet64(i64),
    Color8(i64),
    Float8(f64),
    TDateTime(f64),
    Float8Array(Vec<f64>),
    AnsiString8(String),
    WideString(String),
    BinaryBlob(Vec<u8>),
}

#[derive(FromPrimitive, ToPrimitive, Debug, Copy, Clone, PartialEq)]
pub(crate) enum PTUTagType {
    Empty8 = 0xFFFF0008,
    Bool8 = 0x00000008,
    Int8 = 0x10000008,
    BitSet64 = 0x11000008,
    Color8 = 0x12000008,
    Float8 = 0x20000008,
    TDateTime = 0x21000008,
    Float8Array = 0x2001FFFF,
    AnsiString8 = 0x4001FFFF,
    WideString = 0x4002FFFF,
    BinaryBlob = 0xFFFFFFFF,
}

#[derive(FromPrimitive, ToPrimitive, Debug, Copy, Clone, PartialEq)]
enum RecType {
    PicoHarpT3 = 0x00010303, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $03 (T3), HW: $03 (PicoHarp)
    PicoHarpT2 = 0x00010203, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $02 (T2), HW: $03 (PicoHarp)
    HydraHarpT3 = 0x00010304, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $03 (T3), HW: $04 (HydraHarp)
    HydraHarpT2 = 0x00010204, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $02 (T2), HW: $04 (HydraHarp)
    HydraHarp2T3 = 0x01010304, // (SubID = $01 ,RecFmt: $01) (V2), T-Mode: $03 (T3), HW: $04 (HydraHarp)
    HydraHarp2T2 = 0x01010204, // (SubID = $01 ,RecFmt: $01) (V2), T-Mode: $02 (T2), HW: $04 (HydraHarp)
    TimeHarp260NT3 = 0x00010305, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $03 (T3), HW: $05 (TimeHarp260N)
    TimeHarp260NT2 = 0x00010205, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $02 (T2), HW: $05 (TimeHarp260N)
    TimeHarp260PT3 = 0x00010306, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $03 (T3), HW: $06 (TimeHarp260P)
    TimeHarp260PT2 = 0x00010206, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $02 (T2), HW: $06 (TimeHarp260P)
    MultiHarpT3 = 0x00010307, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $03 (T3), HW: $07 (MultiHarp)
    MultiHarpT2 = 0x00010207, // (SubID = $00 ,RecFmt: $01) (V1), T-Mode: $02 (T2), HW: $07 (MultiHarp)
}

impl RecType {
    fn record_format(self) -> RecordFormat {
        match self {
            RecType::PicoHarpT3 => RecordFormat::PicoHarpT3,
            RecType::PicoHarpT2 => RecordFormat::PicoHarpT2,
            RecType::HydraHarpT3 => RecordFormat::HydraHarpV1T3,
            RecType::HydraHarpT2 => RecordFormat::HydraHarpV1T2,
            RecType::HydraHarp2T3
            | RecType::TimeHarp260NT3
            | RecType::TimeHarp260PT3
            | RecType::MultiHarpT3 => RecordFormat::HydraHarpV2T3,
            RecType::HydraHarp2T2
            | RecType::TimeHarp260NT2
            | RecType::TimeHarp260PT2
            | RecType::MultiHarpT2 => RecordFormat::HydraHarpV2T2,
        }
    }
}

pub(crate) const PTU_MAGIC: &[u8; 8] = b"PQTTTR\0\0";
pub(crate) const TAG_TTTR_REC_TYPE: &str = "TTResultFormat_TTTRRecType";
pub(crate) const TAG_NUM_RECORDS: &str = "TTResult_NumberOfRecords"; // Number of TTTR Records in the File;
pub(crate) const TAG_GLOB_RES: &str = "MeasDesc_GlobalResolution"; // Global Resolution of TimeTag(T2) /NSync (T3)
pub(crate) const TAG_RES: &str = "MeasDesc_Resolution"; // Resolution for the Dtime (T3 Only)
pub(crate) const TAG_DATA_OFFSET: &str = "DataOffset";
pub(crate) const FILE_TAG_END: &str = "Header_End"; // Always appended as last tag (BLOCKEND)

/// Metadata for a PTU file from PicoQuant
pub struct PTUFile {
    pub path: PathBuf,
    pub header: Header,
}

impl PTUFile {
    /// Create a PTUFile from its filepath.
    ///
    /// If the file does not exist a FileNotAvailable error will be returned.
    pub fn new(filename: PathBuf) -> Result<Self, Error> {
        // check if file in path exists
        if filename.exists() {
            let header = self::header::read_ptu_header(&filename)?;
            Ok(Self {
                path: filename,
                header,
            })
        } else {
            let filename_string = filename.display().to_string();
            Err(Error::FileNotAvailable(filename_string))
        }
    }
}

use tttr_fcs_proc_macros::read_ptu_tag;

pub(crate) fn record_format(header: &Header) -> Result<RecordFormat, Error> {
    let code = read_ptu_tag!(header[TAG_TTTR_REC_TYPE] as Int8);
    let record_type: RecType =
        FromPrimitive::from_i64(code).ok_or(Error::UnsupportedRecordType(code))?;
    Ok(record_type.record_format())
}

pub(crate) fn calibration(header: &Header) -> Result<HeaderCalibration, Error> {
    let record_format = record_format(header)?;
    let macro_time_resolution = read_ptu_tag!(header[TAG_GLOB_RES] as Float8);
    let micro_time_resolution =
        read_ptu_tag!(optional header[TAG_RES] as Float8).unwrap_or(macro_time_resolution);
    if !(macro_time_resolution > 0.0) {
        return Err(Error::InvalidHeader(format!(
            "{} must be positive, found {}",
            TAG_GLOB_RES, macro_time_resolution
        )));
    }
    Ok(HeaderCalibration::new(
        record_format,
        macro_time_resolution,
        micro_time_resolution,
    ))
}

impl TTTRFile for PTUFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn calibration(&self) -> Result<HeaderCalibration, Error> {
        calibration(&self.header)
    }

    fn data_offset(&self) -> Result<u64, Error> {
        let header = &self.header;
        Ok(read_ptu_tag!(header[TAG_DATA_OFFSET] as Int8) as u64)
    }

    fn number_of_records(&self) -> Result<Option<usize>, Error> {
        let header = &self.header;
        Ok(read_ptu_tag!(optional header[TAG_NUM_RECORDS] as Int8).map(|n| n.max(0) as usize))
    }
}

impl std::fmt::Display for PTUFile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.header.keys().collect();
        keys.sort();
        let mut string = String::from("");
        for key in keys {
            string.push_str(&format!("{:<35}: {}\n", key, self.header[key]));
        }
        write!(f, "{}", string)
    }
}
