//! One plane of palette indices, with optional alpha.

use crate::calibration::Sample;
use crate::calibration::luts::Calibration;
use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::{Plane, PlaneImage, PlaneRole};
use crate::image::surface::RgbaSurface;
use crate::math::Vec2;
use super::ColorContext;
use super::pixels::render_surface;


/// Number of palette entries.
pub const PALETTE_SIZE: usize = 256;

/// Byte length of a stored palette: all reds, then all greens, then all blues.
pub const PALETTE_BYTE_SIZE: usize = PALETTE_SIZE * 3;


/// The colors of an indexed image.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Box<[[u8; 3]; PALETTE_SIZE]>,
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Palette").finish_non_exhaustive()
    }
}

impl Palette {

    /// Parse a planar palette. Bytes after the first 768 are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PALETTE_BYTE_SIZE {
            return Err(Error::invalid(format!(
                "palette has {} bytes, expected at least {}", bytes.len(), PALETTE_BYTE_SIZE
            )));
        }

        let mut colors = Box::new([[0_u8; 3]; PALETTE_SIZE]);
        for (index, color) in colors.iter_mut().enumerate() {
            *color = [ bytes[index], bytes[PALETTE_SIZE + index], bytes[2 * PALETTE_SIZE + index] ];
        }

        Ok(Palette { colors })
    }

    /// The palette that replaces the document palette, or else the document palette.
    pub fn from_context(context: &ColorContext<'_>) -> Result<Self> {
        Self::from_bytes(context.palette.unwrap_or(context.color_mode_data))
    }

    /// The color at an index.
    #[inline]
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.colors[index as usize]
    }
}


/// Reads palette colors for calibration.
pub struct Sampler<'p> {
    indices: &'p Plane,
    palette: &'p Palette,
}

impl<'p> Sampler<'p> {
    pub fn new(planes: &'p PlaneImage, palette: &'p Palette) -> Result<Self> {
        Ok(Sampler { indices: planes.require(PlaneRole::Index)?, palette })
    }

    pub fn sample(&self, Vec2(x, y): Vec2<usize>) -> Sample {
        Sample::Rgb(self.palette.color(self.indices.row(y)[x]))
    }
}


/// Look up every index, and calibrate the colors like rgb.
pub fn render(planes: &PlaneImage, context: &ColorContext<'_>, calibration: &Calibration, cancel: &CancelToken) -> Result<RgbaSurface> {
    let palette = Palette::from_context(context)?;
    let indices = planes.require(PlaneRole::Index)?;
    let alpha = planes.plane(PlaneRole::Alpha);

    render_surface(planes.size, context.format, alpha, cancel, |x, y| {
        calibration.apply(palette.color(indices.row(y)[x]))
    })
}
