pub const BUFFER_SIZE: usize = 1024 * 16;

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::Error;
use crate::headers::RecordFormat;
use crate::parsers::records::{decode, DecoderState};
use crate::Event;

/// Streams decoded events out of any byte source.
///
/// Records are pulled from `source` in chunks of `chunk_records` and decoded
/// one by one. Overflow and rejected records advance the decoder state but
/// are not yielded. The chunk size only affects throughput.
pub struct RecordStream<R: Read> {
    source: R,
    format: RecordFormat,
    state: DecoderState,
    byte_buffer: Vec<u8>,
    records_in_buffer: usize,
    current_record: usize,
    record_count: usize,
    record_limit: Option<usize>,
    finished: bool,
}

impl<R: Read> RecordStream<R> {
    pub fn new(source: R, format: RecordFormat) -> Self {
        Self {
            source,
            format,
            state: DecoderState::new(),
            byte_buffer: vec![0; BUFFER_SIZE * format.record_bytes()],
            records_in_buffer: 0,
            current_record: 0,
            record_count: 0,
            record_limit: None,
            finished: false,
        }
    }

    /// Number of records read per chunk (at least one).
    pub fn with_chunk_records(mut self, chunk_records: usize) -> Self {
        self.byte_buffer = vec![0; chunk_records.max(1) * self.format.record_bytes()];
        self
    }

    /// Stop after `limit` records even if the source holds more bytes.
    pub fn with_record_limit(mut self, limit: Option<usize>) -> Self {
        self.record_limit = limit;
        self
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Raw records consumed so far, events and overflows alike.
    pub fn records_read(&self) -> usize {
        self.record_count
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    fn fill_buffer(&mut self) -> Result<usize, Error> {
        let record_bytes = self.format.record_bytes();
        let mut wanted = self.byte_buffer.len();
        if let Some(limit) = self.record_limit {
            let remaining = limit.saturating_sub(self.record_count);
            wanted = wanted.min(remaining * record_bytes);
        }

        let mut filled = 0;
        while filled < wanted {
            match self.source.read(&mut self.byte_buffer[filled..wanted]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled % record_bytes != 0 {
            return Err(Error::TruncatedRecord(filled % record_bytes));
        }
        Ok(filled / record_bytes)
    }

    #[inline(always)]
    fn next_raw(&mut self) -> Result<Option<u64>, Error> {
        if self.current_record == self.records_in_buffer {
            self.records_in_buffer = self.fill_buffer()?;
            self.current_record = 0;
            if self.records_in_buffer == 0 {
                return Ok(None);
            }
        }

        let record_bytes = self.format.record_bytes();
        let start = self.current_record * record_bytes;
        let bytes = &self.byte_buffer[start..start + record_bytes];
        let raw = match record_bytes {
            6 => LittleEndian::read_u48(bytes),
            _ => LittleEndian::read_u32(bytes) as u64,
        };
        self.current_record += 1;
        self.record_count += 1;
        Ok(Some(raw))
    }
}

impl<R: Read> Iterator for RecordStream<R> {
    type Item = Result<Event, Error>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.next_raw() {
                Ok(Some(raw)) => {
                    if let Some(event) = decode(self.format, raw, &mut self.state) {
                        return Some(Ok(event));
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::encoders::{encode_overflow, encode_photon, records_to_bytes};

    fn sample(format: RecordFormat) -> Vec<u8> {
        let records = vec![
            encode_photon(format, 10, 1, 0),
            encode_overflow(format, 1),
            encode_photon(format, 3, 2, 1),
            encode_photon(format, 4, 3, 0),
            encode_overflow(format, 1),
            encode_photon(format, 0, 4, 1),
        ];
        records_to_bytes(format, &records)
    }

    #[test]
    fn counts_records_and_events() {
        let bytes = sample(RecordFormat::PicoHarpT3);
        let mut stream = RecordStream::new(&bytes[..], RecordFormat::PicoHarpT3);
        let events: Vec<Event> = stream.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(stream.records_read(), 6);
        assert_eq!(stream.state().overflow_counter, 2);
    }

    #[test]
    fn chunk_size_does_not_change_events() {
        let format = RecordFormat::Spc600_4096;
        let bytes = sample(format);
        let reference: Vec<Event> = RecordStream::new(&bytes[..], format)
            .collect::<Result<_, _>>()
            .unwrap();
        for chunk in 1..8 {
            let events: Vec<Event> = RecordStream::new(&bytes[..], format)
                .with_chunk_records(chunk)
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(events, reference, "chunk of {} records", chunk);
        }
    }

    #[test]
    fn dangling_bytes_are_an_error() {
        let mut bytes = sample(RecordFormat::PicoHarpT2);
        bytes.push(0xAA);
        let result: Result<Vec<Event>, Error> =
            RecordStream::new(&bytes[..], RecordFormat::PicoHarpT2).collect();
        assert!(matches!(result, Err(Error::TruncatedRecord(1))));
    }

    #[test]
    fn record_limit_stops_early() {
        let mut bytes = sample(RecordFormat::PicoHarpT3);
        // trailing garbage after the announced records is never read
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut stream =
            RecordStream::new(&bytes[..], RecordFormat::PicoHarpT3).with_record_limit(Some(3));
        let events: Vec<Event> = stream.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(stream.records_read(), 3);
    }
}
