//! Reads the human-readable description of an ICC profile, for diagnostics only.
//! Supports the legacy ascii `desc` type and the localized unicode `mluc` type.

use std::io::Cursor;
use crate::error::*;
use crate::io::{FourCC, PsdReader};


const DESCRIPTION_TAG: FourCC = FourCC::new(b"desc");
const DESCRIPTION_TYPE: FourCC = FourCC::new(b"desc");
const LOCALIZED_TYPE: FourCC = FourCC::new(b"mluc");

const TAG_TABLE_OFFSET: usize = 128;
const ENGLISH: u16 = 0x656E;
const UNITED_STATES: u16 = 0x5553;


/// The description of the profile, or `None` if the profile has no readable description.
/// Malformed profiles never cause an error.
pub fn profile_name(profile: &[u8]) -> Option<String> {
    match read_description(profile) {
        Ok(name) => name,
        Err(error) => {
            log::warn!("icc profile description is not readable: {}", error);
            None
        }
    }
}

fn read_description(profile: &[u8]) -> Result<Option<String>> {
    if profile.len() < TAG_TABLE_OFFSET + 4 {
        return Ok(None);
    }

    let file_length = profile.len();
    let mut reader = PsdReader::new(Cursor::new(profile))?;
    reader.seek_to(TAG_TABLE_OFFSET)?;

    let tag_count = reader.read_u32()? as usize;
    if TAG_TABLE_OFFSET + 4 + tag_count.saturating_mul(12) > file_length {
        return Ok(None);
    }

    for _ in 0 .. tag_count {
        let signature = reader.read_four_cc()?;
        let offset = reader.read_u32()? as usize;
        let length = reader.read_u32()? as usize;

        if signature != DESCRIPTION_TAG || length < 12 {
            continue;
        }

        let tag_end = offset.checked_add(length).ok_or_else(|| Error::invalid("tag length"))?;
        if tag_end > file_length {
            return Ok(None);
        }

        reader.seek_to(offset)?;
        let tag_type = reader.read_four_cc()?;
        reader.skip(4)?; // reserved

        return match tag_type {
            DESCRIPTION_TYPE => read_ascii(&mut reader, length, tag_end),
            LOCALIZED_TYPE => read_localized(&mut reader, offset, tag_end),
            _ => Ok(None),
        };
    }

    Ok(None)
}

fn read_ascii(reader: &mut PsdReader<Cursor<&[u8]>>, tag_length: usize, tag_end: usize) -> Result<Option<String>> {
    if reader.position() + 4 > tag_end {
        return Ok(None);
    }

    // the count includes the terminating zero
    let count = reader.read_u32()? as usize;
    if count <= 1 || count > tag_length || count - 1 > tag_end - reader.position() {
        return Ok(None);
    }

    let bytes = reader.read_byte_vec(count - 1)?;
    let text: String = bytes.iter().map(|&byte| byte as char).collect();
    Ok(sanitize(&text))
}

fn read_localized(reader: &mut PsdReader<Cursor<&[u8]>>, tag_start: usize, tag_end: usize) -> Result<Option<String>> {
    if reader.position() + 8 > tag_end {
        return Ok(None);
    }

    let record_count = reader.read_u32()? as usize;
    let record_size = reader.read_u32()? as usize;

    if record_size < 12 {
        return Ok(None);
    }

    let records_start = reader.position();
    if records_start + record_count.saturating_mul(record_size) > tag_end {
        return Ok(None);
    }

    let mut fallback = None;

    for index in 0 .. record_count {
        reader.seek_to(records_start + index * record_size)?;

        let language = reader.read_u16()?;
        let country = reader.read_u16()?;
        let length = reader.read_u32()? as usize;
        let text_start = tag_start + reader.read_u32()? as usize;

        if text_start + length > tag_end {
            continue;
        }

        reader.seek_to(text_start)?;
        let units: Vec<u16> = reader.read_byte_vec(length)?
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        let text = match sanitize(&String::from_utf16_lossy(&units)) {
            Some(text) => text,
            None => continue,
        };

        if language == ENGLISH && country == UNITED_STATES {
            return Ok(Some(text));
        }

        fallback.get_or_insert(text);
    }

    Ok(fallback)
}

/// Remove padding and control characters. Empty names become `None`.
fn sanitize(text: &str) -> Option<String> {
    let text: String = text
        .trim_end_matches(|character| character == '\0' || character == '\u{FFFD}')
        .chars().filter(|character| !character.is_control())
        .collect();

    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}
