//! Cyan, magenta, yellow and key planes, with optional alpha.
//! Samples are stored inverted: zero means full ink.

use crate::calibration::Sample;
use crate::calibration::luts::Calibration;
use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::{Plane, PlaneImage, PlaneRole};
use crate::image::surface::RgbaSurface;
use crate::math::Vec2;
use super::{CmykTuning, ColorContext};
use super::pixels::render_surface;


/// The uncalibrated conversion of stored cmyk values:
/// each color channel is the remaining light of its ink multiplied by the remaining light of the key.
#[inline]
pub fn baseline([cyan, magenta, yellow, key]: [u8; 4]) -> [u8; 3] {
    let channel = |stored: u8| ((stored as u32 * key as u32 + 127) / 255) as u8;
    [channel(cyan), channel(magenta), channel(yellow)]
}

/// `round(pow(i / 255, gamma) * 255)` for every byte.
pub fn gamma_curve(gamma: f32) -> [u8; 256] {
    let mut curve = [0_u8; 256];

    for (index, value) in curve.iter_mut().enumerate() {
        let normalized = (index as f32 / 255.0).powf(gamma);
        *value = (normalized * 255.0 + 0.5).clamp(0.0, 255.0) as u8;
    }

    curve
}

/// Apply the gamma curve, then shift near-neutral colors.
#[inline]
fn tune(rgb: [u8; 3], curve: &[u8; 256], tuning: &CmykTuning) -> [u8; 3] {
    let rgb = rgb.map(|value| curve[value as usize]);

    let max = rgb.iter().copied().max().unwrap_or(0);
    let min = rgb.iter().copied().min().unwrap_or(0);

    if max - min > tuning.neutral_threshold {
        return rgb;
    }

    let mut shifted = rgb;
    for (value, &offset) in shifted.iter_mut().zip(&tuning.neutral_offsets) {
        *value = (*value as i16 + offset).clamp(0, 255) as u8;
    }

    shifted
}


/// Reads stored cmyk values and their baseline conversion for calibration.
pub struct Sampler<'p> {
    cyan: &'p Plane,
    magenta: &'p Plane,
    yellow: &'p Plane,
    key: &'p Plane,
}

impl<'p> Sampler<'p> {
    pub fn new(planes: &'p PlaneImage) -> Result<Self> {
        Ok(Sampler {
            cyan: planes.require(PlaneRole::Cyan)?,
            magenta: planes.require(PlaneRole::Magenta)?,
            yellow: planes.require(PlaneRole::Yellow)?,
            key: planes.require(PlaneRole::Key)?,
        })
    }

    #[inline]
    fn stored(&self, x: usize, y: usize) -> [u8; 4] {
        [ self.cyan.row(y)[x], self.magenta.row(y)[x], self.yellow.row(y)[x], self.key.row(y)[x] ]
    }

    pub fn sample(&self, Vec2(x, y): Vec2<usize>) -> Sample {
        let stored = self.stored(x, y);
        Sample::Cmyk { stored, baseline: baseline(stored) }
    }
}


/// Convert to rgb. Calibration tables are indexed by the baseline conversion.
/// Without calibration, the tuning corrections apply instead.
pub fn render(planes: &PlaneImage, context: &ColorContext<'_>, calibration: &Calibration, cancel: &CancelToken) -> Result<RgbaSurface> {
    let sampler = Sampler::new(planes)?;
    let alpha = planes.plane(PlaneRole::Alpha);

    let tuning = context.cmyk;
    let heuristic = tuning.enabled && (!context.prefer_color_management || calibration.is_identity());
    let curve = gamma_curve(tuning.gamma);

    render_surface(planes.size, context.format, alpha, cancel, |x, y| {
        let rgb = baseline(sampler.stored(x, y));
        if heuristic { tune(rgb, &curve, &tuning) } else { calibration.apply(rgb) }
    })
}
