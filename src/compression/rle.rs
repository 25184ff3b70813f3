use super::*;
use lebe::prelude::*;

// packbits, as used by the composite image data:
// a table of packed byte counts per row and plane, followed by the packed rows of all planes

/// Packed rows longer than this are treated as corrupt.
pub const MAX_PACKED_ROW_LENGTH: usize = 16 * 1024 * 1024;


/// Read the packed byte count of every row of every channel.
/// Entries are two bytes wide in standard documents and four bytes wide in large documents.
pub fn read_row_lengths(
    reader: &mut PsdReader<impl Read + Seek>,
    version: Version, entry_count: usize, payload_length: usize,
) -> Result<Vec<usize>>
{
    let entry_size = if version.is_large() { 4 } else { 2 };
    let table_size = entry_count.checked_mul(entry_size)
        .ok_or_else(|| Error::invalid("row length table size"))?;

    if table_size > payload_length {
        return Err(Error::invalid("row length table exceeds the image data"));
    }

    let lengths: Vec<usize> = if version.is_large() {
        let mut entries = vec![0_i32; entry_count];
        reader.read_from_big_endian_into(entries.as_mut_slice())?;

        entries.into_iter()
            .map(|length| i32_to_usize(length, "negative packed row length"))
            .collect::<Result<_>>()?
    }
    else {
        let mut entries = vec![0_u16; entry_count];
        reader.read_from_big_endian_into(entries.as_mut_slice())?;
        entries.into_iter().map(usize::from).collect()
    };

    if let Some(&length) = lengths.iter().find(|&&length| length > MAX_PACKED_ROW_LENGTH) {
        return Err(Error::invalid(format!("packed row length {} is too large", length)));
    }

    Ok(lengths)
}

/// Check that the table and the packed rows exactly fill the payload.
pub fn validate_row_lengths(lengths: &[usize], version: Version, payload_length: usize) -> UnitResult {
    let entry_size = if version.is_large() { 4 } else { 2 };
    let packed: usize = lengths.iter().sum();

    if lengths.len() * entry_size + packed != payload_length {
        return Err(Error::invalid(format!(
            "packed rows need {} bytes, but the image data has {} bytes",
            lengths.len() * entry_size + packed, payload_length
        )));
    }

    Ok(())
}


/// Decodes packed rows one at a time.
/// Can jump to any row without decoding the rows in between.
#[derive(Debug)]
pub struct PackedRows {

    /// Absolute stream position of every packed row.
    offsets: Vec<usize>,
    lengths: Vec<usize>,

    packed: Vec<u8>,
    next_row: usize,
}

impl PackedRows {

    /// Read the row length table. The reader must be at the start of the payload.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>, header: &FileHeader, image_data: &ImageData) -> Result<Self> {
        let row_count = header.channel_count.checked_mul(header.height())
            .ok_or_else(|| Error::invalid("row count"))?;

        let lengths = read_row_lengths(reader, header.version, row_count, image_data.payload_length)?;

        let mut offsets = Vec::with_capacity(lengths.len());
        let mut offset = reader.position();

        for &length in &lengths {
            offsets.push(offset);
            offset += length;
        }

        Ok(PackedRows { offsets, lengths, packed: Vec::new(), next_row: 0 })
    }

    /// Continue at the specified row, counted across all planes.
    pub fn advance_to(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: usize) -> UnitResult {
        if row != self.next_row {
            let offset = *self.offsets.get(row).ok_or_else(|| Error::invalid("row index out of bounds"))?;
            reader.seek_to(offset)?;
            self.next_row = row;
        }

        Ok(())
    }

    /// Decode the next row.
    pub fn read_row(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: &mut [u8]) -> UnitResult {
        let length = *self.lengths.get(self.next_row)
            .ok_or_else(|| Error::invalid("more rows requested than the table contains"))?;

        self.packed.resize(length, 0);
        reader.read_exact_bytes(&mut self.packed)?;
        decompress_row(&self.packed, row)?;

        self.next_row += 1;
        Ok(())
    }
}


/// Unpack one row, which must exactly fill the target.
pub fn decompress_row(mut remaining: Bytes<'_>, target: &mut [u8]) -> UnitResult {
    let mut written = 0;

    while !remaining.is_empty() {
        let count = take_1(&mut remaining)? as i8 as i32;

        if count >= 0 {
            // take the next 'count + 1' bytes as-is
            let values = take_n(&mut remaining, count as usize + 1)?;
            let end = written + values.len();

            target.get_mut(written .. end).ok_or_else(|| Error::invalid("packed row exceeds the image width"))?
                .copy_from_slice(values);

            written = end;
        }
        else if count != -128 {
            // repeat the next value '1 - count' times
            let value = take_1(&mut remaining)?;
            let end = written + (1 - count) as usize;

            target.get_mut(written .. end).ok_or_else(|| Error::invalid("packed row exceeds the image width"))?
                .fill(value);

            written = end;
        }
    }

    if written != target.len() {
        return Err(Error::invalid("packed row is shorter than the image width"));
    }

    Ok(())
}

fn take_1(slice: &mut &[u8]) -> Result<u8> {
    if !slice.is_empty() {
        let result = slice[0];
        *slice = &slice[1..];
        Ok(result)

    } else {
        Err(Error::invalid("compressed data"))
    }
}

fn take_n<'s>(slice: &mut &'s [u8], n: usize) -> Result<&'s [u8]> {
    if n <= slice.len() {
        let (front, back) = slice.split_at(n);
        *slice = back;
        Ok(front)

    } else {
        Err(Error::invalid("compressed data"))
    }
}
