
// the zip variants compress all planes as one zlib stream,
// so rows can only be reached by inflating everything before them

use super::*;
use miniz_oxide::inflate::stream::{inflate, InflateState};
use miniz_oxide::{DataFormat, MZError, MZFlush, MZStatus};


/// Compressed bytes requested from the stream at once.
const INPUT_CHUNK_SIZE: usize = 64 * 1024;


/// Inflates rows one at a time from the payload.
pub struct InflateRows {
    state: Box<InflateState>,
    prediction: bool,

    input: Vec<u8>,
    input_start: usize,
    remaining_payload: usize,

    scratch: Vec<u8>,
    next_row: usize,
}

impl InflateRows {

    /// Start inflating. The reader must be at the start of the payload.
    pub fn new(image_data: &ImageData, row_width: usize, prediction: bool) -> Self {
        InflateRows {
            state: InflateState::new_boxed(DataFormat::Zlib),
            prediction,
            input: Vec::new(),
            input_start: 0,
            remaining_payload: image_data.payload_length,
            scratch: vec![0; row_width],
            next_row: 0,
        }
    }

    /// Continue at the specified row, counted across all planes.
    /// Rows in between are inflated and discarded.
    pub fn advance_to(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: usize) -> UnitResult {
        if row < self.next_row {
            return Err(Error::invalid("zip compressed rows cannot be read backwards"));
        }

        let mut scratch = std::mem::take(&mut self.scratch);
        let result = (self.next_row .. row).try_for_each(|_| self.read_row(reader, &mut scratch));
        self.scratch = scratch;
        result
    }

    /// Inflate the next row, undoing the prediction if required.
    pub fn read_row(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: &mut [u8]) -> UnitResult {
        let mut filled = 0;

        while filled < row.len() {
            if self.input_start == self.input.len() && self.remaining_payload > 0 {
                let chunk_size = self.remaining_payload.min(INPUT_CHUNK_SIZE);
                self.input.resize(chunk_size, 0);
                reader.read_exact_bytes(&mut self.input)?;

                self.input_start = 0;
                self.remaining_payload -= chunk_size;
            }

            let result = inflate(&mut self.state, &self.input[self.input_start ..], &mut row[filled ..], MZFlush::None);
            self.input_start += result.bytes_consumed;
            filled += result.bytes_written;

            let no_progress = result.bytes_consumed == 0 && result.bytes_written == 0;
            let input_exhausted = self.input_start == self.input.len() && self.remaining_payload == 0;

            match result.status {
                Ok(MZStatus::StreamEnd) => if filled < row.len() {
                    return Err(Error::invalid("zip data ends before the last row"));
                },

                Ok(MZStatus::Ok) | Err(MZError::Buf) => if no_progress {
                    if input_exhausted { return Err(Error::invalid("zip data ends before the last row")); }
                    if self.input_start < self.input.len() { return Err(Error::invalid("zlib-compressed data malformed")); }
                },

                _ => return Err(Error::invalid("zlib-compressed data malformed")),
            }
        }

        if self.prediction {
            undo_prediction(row);
        }

        self.next_row += 1;
        Ok(())
    }
}


/// Undo the horizontal delta filter of one row of 8 bit samples.
pub fn undo_prediction(row: &mut [u8]) {
    for index in 1 .. row.len() {
        row[index] = row[index].wrapping_add(row[index - 1]);
    }
}

/// Apply the horizontal delta filter to one row of 8 bit samples.
#[cfg(test)]
pub fn apply_prediction(row: &mut [u8]) {
    for index in (1 .. row.len()).rev() {
        row[index] = row[index].wrapping_sub(row[index - 1]);
    }
}
