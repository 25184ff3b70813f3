//! Describes all meta data of a document:
//! the file header, the color mode data, the image resources,
//! the layer and mask summary, and where the composite image data starts.

pub mod resources;
pub mod layers;


use crate::io::*;
use crate::error::*;
use crate::math::Vec2;
use crate::compression::Compression;
use std::fmt;


/// The magic bytes at the start of every document.
pub const SIGNATURE: FourCC = FourCC::new(b"8BPS");

/// The documented maximum number of channels.
pub const MAX_CHANNELS: usize = 56;


/// Whether the document uses the standard layout or the large document layout
/// with wider length fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {

    /// Version 1, files with the `.psd` extension.
    Standard,

    /// Version 2, files with the `.psb` extension.
    /// Some lengths and the packed row table use wider fields.
    Large,
}

impl Version {

    /// Parse the version field. Only 1 and 2 exist.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Version::Standard),
            2 => Ok(Version::Large),
            other => Err(Error::unsupported(format!("document version {}", other))),
        }
    }

    /// Whether wide fields are used.
    pub fn is_large(self) -> bool {
        self == Version::Large
    }

    /// Read a section length, which is 4 bytes in standard documents and 8 bytes in large documents.
    pub(crate) fn read_length(self, reader: &mut PsdReader<impl Read + Seek>) -> Result<usize> {
        let length = match self {
            Version::Standard => reader.read_u32()? as u64,
            Version::Large => reader.read_u64()?,
        };

        u64_to_usize(length, "section length")
    }
}


/// How the channels of the composite image are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {

    /// One bit per pixel.
    Bitmap,

    /// Single gray channel.
    Grayscale,

    /// Palette indices, with the palette in the color mode data.
    Indexed,

    /// Red, green and blue channels.
    Rgb,

    /// Cyan, magenta, yellow and key channels, stored with inverted ink.
    Cmyk,

    /// Any number of spot channels.
    Multichannel,

    /// Gray channel with a duotone curve in the color mode data.
    Duotone,

    /// Lightness and two color-opponent channels.
    Lab,
}

impl ColorMode {

    /// Parse the color mode field.
    pub fn from_u16(value: u16) -> Result<Self> {
        Ok(match value {
            0 => ColorMode::Bitmap,
            1 => ColorMode::Grayscale,
            2 => ColorMode::Indexed,
            3 => ColorMode::Rgb,
            4 => ColorMode::Cmyk,
            7 => ColorMode::Multichannel,
            8 => ColorMode::Duotone,
            9 => ColorMode::Lab,
            other => return Err(Error::unsupported(format!("color mode {}", other))),
        })
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            ColorMode::Bitmap => "bitmap",
            ColorMode::Grayscale => "grayscale",
            ColorMode::Indexed => "indexed",
            ColorMode::Rgb => "rgb",
            ColorMode::Cmyk => "cmyk",
            ColorMode::Multichannel => "multichannel",
            ColorMode::Duotone => "duotone",
            ColorMode::Lab => "lab",
        })
    }
}


/// The fixed size header at the start of every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {

    /// Standard or large document.
    pub version: Version,

    /// Number of channels in the composite image, including alpha and spot channels.
    pub channel_count: usize,

    /// Width and height of the composite image, both at least one.
    pub size: Vec2<usize>,

    /// Bits per channel sample: 1, 8, 16 or 32.
    pub depth: u16,

    /// How the channels are to be interpreted.
    pub color_mode: ColorMode,
}

impl FileHeader {

    /// Number of bytes the header occupies at the start of the stream.
    pub const BYTE_SIZE: usize = 26;

    /// Read and validate the header.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>) -> Result<Self> {
        reader.expect_signature(SIGNATURE)?;

        let version = Version::from_u16(reader.read_u16()?)?;
        reader.skip(6)?; // reserved

        let channel_count = reader.read_u16()? as usize;
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(Error::invalid(format!(
                "channel count {} is not within 1 to {}", channel_count, MAX_CHANNELS
            )));
        }

        let height = reader.read_i32()?;
        let width = reader.read_i32()?;

        if width <= 0 || height <= 0 {
            return Err(Error::invalid(format!("image size {}x{}", width, height)));
        }

        let depth = reader.read_u16()?;
        let color_mode = ColorMode::from_u16(reader.read_u16()?)?;

        Ok(FileHeader {
            version, channel_count, depth, color_mode,
            size: Vec2(i32_to_usize(width, "width")?, i32_to_usize(height, "height")?),
        })
    }

    /// Width of the composite image.
    pub fn width(&self) -> usize { self.size.width() }

    /// Height of the composite image.
    pub fn height(&self) -> usize { self.size.height() }
}


/// The raw color mode data block.
/// Holds the palette of indexed documents and the curves of duotone documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorModeData {

    /// The raw bytes of the block, without the length prefix.
    pub bytes: Vec<u8>,
}

impl ColorModeData {

    /// Read the length-prefixed block.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>) -> Result<Self> {
        let length = reader.read_u32()? as usize;
        Ok(ColorModeData { bytes: reader.read_byte_vec(length)? })
    }
}


/// Where the composite pixel payload is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageData {

    /// How the payload is compressed.
    pub compression: Compression,

    /// Absolute position right after the compression tag.
    pub payload_offset: usize,

    /// Number of bytes from the payload offset to the end of the stream.
    pub payload_length: usize,
}

impl ImageData {

    /// Read the compression tag. The payload runs to the end of the stream,
    /// so the stream length must be known.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>) -> Result<Self> {
        let compression = Compression::from_tag(reader.read_u16()?)?;
        let payload_offset = reader.position();

        let stream_length = reader.stream_length()
            .ok_or_else(|| Error::unsupported("locating the image data requires a seekable stream"))?;

        Ok(ImageData {
            compression, payload_offset,
            payload_length: stream_length.saturating_sub(payload_offset),
        })
    }
}
