use std::io;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("File {0} does not exist.")]
    FileNotAvailable(String),
    #[error("IO error.")]
    IOError(#[from] io::Error),
    #[error("Header is missing {0}")]
    MissingTag(String),
    #[error("Header tag {0} does not hold the expected type.")]
    WrongTagType(String),
    #[error("{0}")]
    InvalidHeader(String),
    #[error("Wrong magic number, expected {expected:?} but found {found:?}.")]
    BadMagic { expected: Vec<u8>, found: Vec<u8> },
    #[error("Unsupported record type code {0:#010x}.")]
    UnsupportedRecordType(i64),
    #[error("Record stream ends with {0} dangling bytes.")]
    TruncatedRecord(usize),
    #[error("Selection of {requested} events exceeds the {available} events in the stream.")]
    SelectionTooLarge { requested: usize, available: usize },
    #[error("Selection index {index} is out of bounds for a stream of {len} events.")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Array length mismatch: {0} vs {1} entries.")]
    LengthMismatch(usize, usize),
    #[error("Times decrease at index {0}.")]
    UnsortedTimes(usize),
    #[error("Unknown correlation method {0}.")]
    UnknownCorrelationMethod(String),
    #[error("No micro times available, photons were not set from an event stream.")]
    MissingMicroTimes,
    #[error("{0}")]
    InvalidAxis(String),
}
