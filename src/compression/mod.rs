//! Contains the compression tag definition
//! and methods to decompress the composite image data into planes.
//!
//! All methods deliver rows plane by plane, and each plane from top to bottom,
//! because that is the order in which the file stores them.


// private modules make non-breaking changes easier
mod rle;
mod zip;

pub use self::rle::MAX_PACKED_ROW_LENGTH;
pub use self::zip::undo_prediction;

use std::ops::Range;
use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::{PlaneImage, PlaneRole};
use crate::image::sink::{RowConsumer, PlaneImageSink};
use crate::io::*;
use crate::math::Vec2;
use crate::meta::{FileHeader, ImageData, Version};
use std::fmt;


/// A byte slice.
pub type Bytes<'s> = &'s [u8];


/// How the composite image data is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {

    /// Samples are stored as-is.
    Raw,

    /// Every row is packed with PackBits.
    /// A table of packed row lengths allows skipping rows without decoding them.
    RLE,

    /// All rows of all planes form one zlib stream.
    ZIP,

    /// Like `ZIP`, but each row was delta filtered horizontally before compression.
    ZIPPrediction,
}

impl Compression {

    /// Parse the compression tag in front of the image data.
    pub fn from_tag(tag: u16) -> Result<Self> {
        Ok(match tag {
            0 => Compression::Raw,
            1 => Compression::RLE,
            2 => Compression::ZIP,
            3 => Compression::ZIPPrediction,
            other => return Err(Error::unsupported(format!("compression tag {}", other))),
        })
    }

    /// Short user-facing name.
    pub fn name(self) -> &'static str {
        match self {
            Compression::Raw => "Raw",
            Compression::RLE => "RLE",
            Compression::ZIP => "ZIP",
            Compression::ZIPPrediction => "ZIP with prediction",
        }
    }

    /// Whether rows can be skipped without decoding them,
    /// which allows tiles to be filled in any band order.
    pub fn supports_row_skipping(self) -> bool {
        matches!(self, Compression::Raw | Compression::RLE)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} compression", self.name())
    }
}


/// Fail for bit depths that have no decoder.
pub fn check_depth(header: &FileHeader) -> UnitResult {
    match header.depth {
        8 => Ok(()),
        16 | 32 => Err(Error::unsupported(format!("decoding {} bit channels is not implemented", header.depth))),
        other => Err(Error::unsupported(format!("{} bit channels", other))),
    }
}


/// Decodes rows of the composite image data, one decompression method each.
/// Rows are addressed by their index across all planes: `plane * height + y`.
enum RowDecoder {
    Raw { payload_offset: usize, width: usize, next_row: usize },
    RLE(rle::PackedRows),
    ZIP(zip::InflateRows),
}

impl RowDecoder {

    /// Move to the start of the payload and prepare decoding.
    fn begin(reader: &mut PsdReader<impl Read + Seek>, header: &FileHeader, image_data: &ImageData) -> Result<Self> {
        check_depth(header)?;
        reader.seek_to(image_data.payload_offset)?;

        use self::Compression::*;
        Ok(match image_data.compression {
            Raw => RowDecoder::Raw { payload_offset: image_data.payload_offset, width: header.width(), next_row: 0 },
            RLE => RowDecoder::RLE(rle::PackedRows::read(reader, header, image_data)?),
            ZIP => RowDecoder::ZIP(zip::InflateRows::new(image_data, header.width(), false)),
            ZIPPrediction => RowDecoder::ZIP(zip::InflateRows::new(image_data, header.width(), true)),
        })
    }

    fn advance_to(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: usize) -> UnitResult {
        match self {
            RowDecoder::Raw { payload_offset, width, next_row } => {
                if row != *next_row {
                    reader.seek_to(*payload_offset + row * *width)?;
                    *next_row = row;
                }

                Ok(())
            },

            RowDecoder::RLE(rows) => rows.advance_to(reader, row),
            RowDecoder::ZIP(rows) => rows.advance_to(reader, row),
        }
    }

    fn read_row(&mut self, reader: &mut PsdReader<impl Read + Seek>, row: &mut [u8]) -> UnitResult {
        match self {
            RowDecoder::Raw { next_row, .. } => {
                reader.read_exact_bytes(row)?;
                *next_row += 1;
                Ok(())
            },

            RowDecoder::RLE(rows) => rows.read_row(reader, row),
            RowDecoder::ZIP(rows) => rows.read_row(reader, row),
        }
    }
}


/// Check the structure of the payload before decoding any pixels.
/// Only packed rows can be checked: their length table must exactly fill the payload.
pub fn validate_payload(reader: &mut PsdReader<impl Read + Seek>, header: &FileHeader, image_data: &ImageData) -> UnitResult {
    if image_data.compression != Compression::RLE {
        return Ok(());
    }

    reader.seek_to(image_data.payload_offset)?;

    let row_count = header.channel_count.checked_mul(header.height())
        .ok_or_else(|| Error::invalid("row count"))?;

    let lengths = rle::read_row_lengths(reader, header.version, row_count, image_data.payload_length)?;
    rle::validate_row_lengths(&lengths, header.version, image_data.payload_length)
}


/// Decode the specified rows of the first `plane_count` planes into the consumer.
/// Rows outside of `rows` are skipped, which does not require decoding them for raw and packed data.
pub fn decompress_rows(
    reader: &mut PsdReader<impl Read + Seek>,
    header: &FileHeader, image_data: &ImageData,
    plane_count: usize, rows: Range<usize>,
    consumer: &mut impl RowConsumer,
    cancel: &CancelToken,
) -> UnitResult
{
    decompress_bands(reader, header, image_data, plane_count, &[rows], consumer, cancel)
}

/// Decode several row ranges, one pass each, in the specified order.
/// The payload is prepared only once, so the row length table of packed data is read once.
pub fn decompress_bands(
    reader: &mut PsdReader<impl Read + Seek>,
    header: &FileHeader, image_data: &ImageData,
    plane_count: usize, bands: &[Range<usize>],
    consumer: &mut impl RowConsumer,
    cancel: &CancelToken,
) -> UnitResult
{
    let out_of_bounds = |rows: &Range<usize>| rows.end > header.height() || rows.start >= rows.end;
    if plane_count > header.channel_count || bands.iter().any(out_of_bounds) {
        return Err(Error::invalid("requested rows are out of bounds"));
    }

    let mut decoder = RowDecoder::begin(reader, header, image_data)?;
    let mut row = vec![0_u8; header.width()];

    for rows in bands {
        consumer.begin_pass(rows.clone())?;

        for plane_index in 0 .. plane_count {
            decoder.advance_to(reader, plane_index * header.height() + rows.start)?;

            for y in rows.clone() {
                cancel.check()?;
                decoder.read_row(reader, &mut row)?;
                consumer.consume_row(plane_index, y, &row)?;
            }
        }
    }

    Ok(())
}


/// Decode all planes with the specified roles at full resolution.
pub fn decompress_planes(
    reader: &mut PsdReader<impl Read + Seek>,
    header: &FileHeader, image_data: &ImageData,
    roles: &[PlaneRole], cancel: &CancelToken,
) -> Result<PlaneImage>
{
    let mut sink = PlaneImageSink::new(header.size, roles);
    decompress_rows(reader, header, image_data, roles.len(), 0 .. header.height(), &mut sink, cancel)?;
    Ok(sink.into_image())
}


/// For each target coordinate, the source coordinate of its nearest neighbour.
/// Never upsamples: the target must not be larger than the source.
pub fn nearest_indices(source_length: usize, target_length: usize) -> Vec<usize> {
    debug_assert!(target_length <= source_length);

    (0 .. target_length)
        .map(|index| (index as u64 * source_length as u64 / target_length as u64) as usize)
        .collect()
}

/// Decode all planes with the specified roles, downsampled to the target size.
/// Only rows that are sampled are written to the small planes,
/// no full resolution plane is allocated.
pub fn decompress_planes_scaled(
    reader: &mut PsdReader<impl Read + Seek>,
    header: &FileHeader, image_data: &ImageData,
    roles: &[PlaneRole], target_size: Vec2<usize>, cancel: &CancelToken,
) -> Result<PlaneImage>
{
    if target_size.area() == 0 || target_size.width() > header.width() || target_size.height() > header.height() {
        return Err(Error::invalid("scaled size must not exceed the image size"));
    }

    let x_indices = nearest_indices(header.width(), target_size.width());
    let y_indices = nearest_indices(header.height(), target_size.height());

    let mut decoder = RowDecoder::begin(reader, header, image_data)?;
    let mut image = PlaneImage::new(target_size, roles);
    let mut row = vec![0_u8; header.width()];

    for (plane_index, plane) in image.planes.iter_mut().enumerate() {
        for (target_y, &source_y) in y_indices.iter().enumerate() {
            cancel.check()?;

            decoder.advance_to(reader, plane_index * header.height() + source_y)?;
            decoder.read_row(reader, &mut row)?;

            let target_row = plane.row_mut(target_y);
            for (target, &source_x) in target_row.iter_mut().zip(&x_indices) {
                *target = row[source_x];
            }
        }
    }

    Ok(image)
}
