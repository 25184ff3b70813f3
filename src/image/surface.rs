//! Interleaved four byte per pixel output buffers.

use crate::error::*;
use crate::math::Vec2;


/// The byte order of one output pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {

    /// Blue, green, red, alpha. The native order of most display surfaces.
    Bgra8888,

    /// Red, green, blue, alpha.
    Rgba8888,
}

impl PixelFormat {

    /// Byte index of red and blue within a pixel.
    #[inline]
    pub(crate) fn red_blue_indices(self) -> (usize, usize) {
        match self {
            PixelFormat::Bgra8888 => (2, 0),
            PixelFormat::Rgba8888 => (0, 2),
        }
    }
}

/// Whether color samples are multiplied by alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaType {

    /// Color samples are independent of alpha.
    Straight,

    /// Color samples are `round(color * alpha / 255)`.
    Premultiplied,
}

/// Byte order and alpha convention of an output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {

    /// Byte order.
    pub pixel_format: PixelFormat,

    /// Alpha convention.
    pub alpha_type: AlphaType,
}

impl Default for SurfaceFormat {
    fn default() -> Self {
        SurfaceFormat { pixel_format: PixelFormat::Bgra8888, alpha_type: AlphaType::Premultiplied }
    }
}

impl SurfaceFormat {

    /// Create a surface format.
    pub fn new(pixel_format: PixelFormat, alpha_type: AlphaType) -> Self {
        SurfaceFormat { pixel_format, alpha_type }
    }
}


/// Bytes per output pixel.
pub const BYTES_PER_PIXEL: usize = 4;


/// An owned buffer of interleaved pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaSurface {

    /// Width and height in pixels.
    pub size: Vec2<usize>,

    /// Number of bytes between the starts of two rows. At least `width * 4`.
    pub stride: usize,

    /// Byte order and alpha convention of `data`.
    pub format: SurfaceFormat,

    /// The pixels, at least `stride * height` bytes.
    pub data: Vec<u8>,
}

impl RgbaSurface {

    /// Number of bytes a tightly packed surface of this size needs.
    /// Returns `None` on overflow.
    pub fn byte_size(size: Vec2<usize>) -> Option<u64> {
        (size.width() as u64)
            .checked_mul(BYTES_PER_PIXEL as u64)?
            .checked_mul(size.height() as u64)
    }

    /// Allocate a zeroed, tightly packed surface.
    pub fn new(size: Vec2<usize>, format: SurfaceFormat) -> Result<Self> {
        let byte_size = Self::byte_size(size).ok_or_else(|| Error::invalid("surface size"))?;
        let byte_size = u64_to_usize(byte_size, "surface size")?;

        Ok(RgbaSurface {
            size, format,
            stride: size.width() * BYTES_PER_PIXEL,
            data: vec![0; byte_size],
        })
    }

    /// The bytes of one row, without padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start .. start + self.size.width() * BYTES_PER_PIXEL]
    }

    /// The bytes of one row, for writing.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        let end = start + self.size.width() * BYTES_PER_PIXEL;
        &mut self.data[start .. end]
    }

    /// The four bytes of one pixel, in the byte order of this surface.
    pub fn pixel(&self, position: Vec2<usize>) -> [u8; 4] {
        let start = position.y() * self.stride + position.x() * BYTES_PER_PIXEL;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&self.data[start .. start + BYTES_PER_PIXEL]);
        pixel
    }

    /// One pixel as red, green, blue and alpha, regardless of the byte order.
    pub fn rgba(&self, position: Vec2<usize>) -> [u8; 4] {
        let pixel = self.pixel(position);
        let (red, blue) = self.format.pixel_format.red_blue_indices();
        [pixel[red], pixel[1], pixel[blue], pixel[3]]
    }
}

impl std::fmt::Debug for RgbaSurface {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RgbaSurface")
            .field("size", &self.size)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}
