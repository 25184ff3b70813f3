//! Packs calibrated colors and alpha into the rows of an output surface.

use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::Plane;
use crate::image::surface::{AlphaType, RgbaSurface, SurfaceFormat, BYTES_PER_PIXEL};
use crate::math::Vec2;


/// Multiply a color sample by alpha, rounding to nearest.
#[inline]
pub fn premultiply(color: u8, alpha: u8) -> u8 {
    ((color as u32 * alpha as u32 + 127) / 255) as u8
}


/// Write one pixel in the byte order and alpha convention of the format.
#[inline]
fn write_pixel(target: &mut [u8], (red_index, blue_index): (usize, usize), premultiplied: bool, [red, green, blue]: [u8; 3], alpha: u8) {
    let (red, green, blue) = if premultiplied && alpha != 255 {
        (premultiply(red, alpha), premultiply(green, alpha), premultiply(blue, alpha))
    }
    else {
        (red, green, blue)
    };

    target[red_index] = red;
    target[1] = green;
    target[blue_index] = blue;
    target[3] = alpha;
}


/// Allocate a surface and fill it row by row.
/// `color` is called with `(x, y)` and returns the final rgb of that pixel.
/// Pixels without an alpha plane are opaque. Cancellation is checked before every row.
pub(crate) fn render_surface(
    size: Vec2<usize>, format: SurfaceFormat, alpha: Option<&Plane>,
    cancel: &CancelToken, mut color: impl FnMut(usize, usize) -> [u8; 3],
) -> Result<RgbaSurface>
{
    let mut surface = RgbaSurface::new(size, format)?;
    let indices = format.pixel_format.red_blue_indices();
    let premultiplied = format.alpha_type == AlphaType::Premultiplied;

    for y in 0 .. size.height() {
        cancel.check()?;

        let alpha_row = alpha.map(|plane| plane.row(y));
        let target_row = surface.row_mut(y);

        for (x, target) in target_row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            let alpha = alpha_row.map_or(255, |row| row[x]);
            write_pixel(target, indices, premultiplied, color(x, y), alpha);
        }
    }

    Ok(surface)
}
