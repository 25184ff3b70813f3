//! Red, green and blue planes, with optional alpha.

use crate::calibration::Sample;
use crate::calibration::luts::Calibration;
use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::{Plane, PlaneImage, PlaneRole};
use crate::image::surface::RgbaSurface;
use crate::math::Vec2;
use super::ColorContext;
use super::pixels::render_surface;


/// Reads raw rgb values for calibration.
pub struct Sampler<'p> {
    red: &'p Plane,
    green: &'p Plane,
    blue: &'p Plane,
}

impl<'p> Sampler<'p> {
    pub fn new(planes: &'p PlaneImage) -> Result<Self> {
        Ok(Sampler {
            red: planes.require(PlaneRole::Red)?,
            green: planes.require(PlaneRole::Green)?,
            blue: planes.require(PlaneRole::Blue)?,
        })
    }

    pub fn sample(&self, Vec2(x, y): Vec2<usize>) -> Sample {
        Sample::Rgb([ self.red.row(y)[x], self.green.row(y)[x], self.blue.row(y)[x] ])
    }
}


/// Interleave the planes, replacing every value through the calibration.
pub fn render(planes: &PlaneImage, context: &ColorContext<'_>, calibration: &Calibration, cancel: &CancelToken) -> Result<RgbaSurface> {
    let sampler = Sampler::new(planes)?;
    let alpha = planes.plane(PlaneRole::Alpha);

    render_surface(planes.size, context.format, alpha, cancel, |x, y| {
        let red = sampler.red.row(y)[x];
        let green = sampler.green.row(y)[x];
        let blue = sampler.blue.row(y)[x];
        calibration.apply([red, green, blue])
    })
}
