use std::collections::HashMap;
use std::fmt;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::str;

use num_traits::FromPrimitive;

use crate::errors::Error;
use crate::parsers::ptu::{Header, PTUTag, PTUTagType, FILE_TAG_END, PTU_MAGIC, TAG_DATA_OFFSET};

impl fmt::Display for PTUTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PTUTag::Empty8 => write!(f, ""),
            PTUTag::Bool8(x) => write!(f, "{}", x),
            PTUTag::Int8(x) => write!(f, "{}", x),
            PTUTag::BitSet64(x) => write!(f, "{}", x),
            PTUTag::Color8(x) => write!(f, "{}", x),
            PTUTag::Float8(x) => write!(f, "{}", x),
            PTUTag::TDateTime(x) => write!(f, "{}", x),
            PTUTag::Float8Array(x) => write!(f, "{:?}", x),
            PTUTag::AnsiString8(x) => write!(f, "{}", x),
            PTUTag::WideString(x) => write!(f, "{}", x),
            PTUTag::BinaryBlob(x) => write!(f, "{} bytes", x.len()),
        }
    }
}

fn read_wide_string(slice: &[u8]) -> Result<String, Error> {
    let iter = slice
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    std::char::decode_utf16(iter)
        .collect::<Result<String, _>>()
        .map_err(|_| Error::InvalidHeader(String::from("Invalid utf16 string in header.")))
}

pub(in super) fn read_ptu_header(filename: &Path) -> Result<Header, Error> {
    let mut buffered = BufReader::new(std::fs::File::open(filename)?);
    parse_ptu_header(&mut buffered)
}

/// Parse the magic number and the tag table of a PTU stream.
///
/// The byte offset right after `Header_End` is stored under `DataOffset`.
pub fn parse_ptu_header<R: Read + Seek>(buffered: &mut R) -> Result<Header, Error> {
    let mut header = HashMap::new();

    let mut magic: [u8; 8] = [0; 8];
    buffered.seek(SeekFrom::Start(0))?;
    buffered.read_exact(&mut magic)?;
    if &magic != PTU_MAGIC {
        return Err(Error::BadMagic {
            expected: PTU_MAGIC.to_vec(),
            found: magic.to_vec(),
        });
    }

    // 8 bytes of version string follow the magic number
    buffered.seek(SeekFrom::Start(16))?;
    let mut tagname_buffer: [u8; 32] = [0; 32];
    let mut index_buffer: [u8; 4] = [0; 4];
    let mut type_buffer: [u8; 4] = [0; 4];
    let mut value_buffer: [u8; 8] = [0; 8];

    loop {
        buffered.read_exact(&mut tagname_buffer)?;
        buffered.read_exact(&mut index_buffer)?;
        buffered.read_exact(&mut type_buffer)?;
        buffered.read_exact(&mut value_buffer)?;

        let (tag_name, _tag_idx, tag_type) = read_tag(tagname_buffer, index_buffer, type_buffer)?;

        if tag_name == *FILE_TAG_END {
            break;
        }

        let tag = process_tag(tag_type, value_buffer, buffered)?;
        header.insert(tag_name, tag);
    }

    let current_pos = buffered.seek(SeekFrom::Current(0))?;
    header.insert(String::from(TAG_DATA_OFFSET), PTUTag::Int8(current_pos as i64));
    Ok(header)
}

fn process_tag<R: Read>(
    tag_type: PTUTagType,
    value_buffer: [u8; 8],
    buffered: &mut R,
) -> Result<PTUTag, Error> {
    let tag = match tag_type {
        PTUTagType::Empty8 => PTUTag::Empty8,
        PTUTagType::Bool8 => {
            let bool_u64 = i64::from_le_bytes(value_buffer);
            PTUTag::Bool8(bool_u64 != 0)
        }
        PTUTagType::Int8 => PTUTag::Int8(i64::from_le_bytes(value_buffer)),
        PTUTagType::BitSet64 => PTUTag::BitSet64(i64::from_le_bytes(value_buffer)),
        PTUTagType::Color8 => PTUTag::Color8(i64::from_le_bytes(value_buffer)),
        PTUTagType::Float8 => PTUTag::Float8(f64::from_le_bytes(value_buffer)),
        PTUTagType::TDateTime => {
            let dtime_double = f64::from_le_bytes(value_buffer);
            let epoch_diff: f64 = 25569.;
            let secs_in_day: f64 = 86400.;
            let epoch_time = (dtime_double - epoch_diff) * secs_in_day;
            PTUTag::TDateTime(epoch_time) // Unix time
        }
        PTUTagType::Float8Array => {
            let n_bytes_array = u64::from_le_bytes(value_buffer);
            let float_count = n_bytes_array / 8;
            let mut float_array: Vec<f64> = Vec::with_capacity(float_count as usize);
            let mut float_buffer: [u8; 8] = [0; 8];
            for _ in 0..float_count {
                buffered.read_exact(&mut float_buffer)?;
                float_array.push(f64::from_le_bytes(float_buffer));
            }
            PTUTag::Float8Array(float_array)
        }
        PTUTagType::WideString => {
            let n_bytes = u64::from_le_bytes(value_buffer) as usize;
            let mut string_buffer: Vec<u8> = vec![0; n_bytes];
            buffered.read_exact(&mut string_buffer)?;
            let wide_string = read_wide_string(&string_buffer)?;
            PTUTag::WideString(wide_string.trim_matches(char::from(0)).to_string())
        }
        PTUTagType::BinaryBlob => {
            let n_bytes_blob = u64::from_le_bytes(value_buffer);
            let mut blob_buffer: Vec<u8> = vec![0; n_bytes_blob as usize];
            buffered.read_exact(&mut blob_buffer)?;
            PTUTag::BinaryBlob(blob_buffer)
        }
        PTUTagType::AnsiString8 => {
            let string_length = u64::from_le_bytes(value_buffer);
            let mut string_buffer: Vec<u8> = vec![0; string_length as usize];
            buffered.read_exact(&mut string_buffer)?;
            // Ansi strings are often Latin-1; keep whatever decodes.
            let value = String::from_utf8_lossy(&string_buffer);
            PTUTag::AnsiString8(value.trim_matches(char::from(0)).to_string())
        }
    };
    Ok(tag)
}

fn read_tag(
    tagname_buffer: [u8; 32],
    index_buffer: [u8; 4],
    type_buffer: [u8; 4],
) -> Result<(String, i32, PTUTagType), Error> {
    let tag_index = i32::from_le_bytes(index_buffer);

    let tag_name = str::from_utf8(&tagname_buffer)
        .ok()
        .ok_or_else(|| Error::InvalidHeader(String::from(
            "Invalid utf8 string in header.",
        )))?
        .trim_matches(char::from(0));
    let tag_name = if tag_index > -1 {
        format!("{}{}", tag_name, tag_index)
    } else {
        tag_name.to_string()
    };

    let tag_type = FromPrimitive::from_u32(u32::from_le_bytes(type_buffer))
        .ok_or_else(|| Error::InvalidHeader(String::from("Invalid PTUTag type")))?;

    Ok((tag_name, tag_index, tag_type))
}
