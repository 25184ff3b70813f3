//! Converts decoded planes of each color mode to interleaved output pixels.

pub mod pixels;
pub mod rgb;
pub mod cmyk;
pub mod indexed;

use crate::calibration::{CalibrationProvider, CalibrationRequest, ResolvedCalibration};
use crate::calibration::luts::Calibration;
use crate::cancel::CancelToken;
use crate::error::*;
use crate::image::PlaneImage;
use crate::image::surface::{RgbaSurface, SurfaceFormat};
use crate::meta::ColorMode;


/// Corrections applied to uncalibrated CMYK output,
/// which compensate for the naive conversion looking dull and slightly green.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CmykTuning {

    /// Without this, uncalibrated CMYK output is the plain conversion.
    pub enabled: bool,

    /// Exponent applied to every normalized output channel.
    pub gamma: f32,

    /// Colors whose largest and smallest channel differ by at most this amount
    /// are considered neutral, and get `neutral_offsets` added.
    pub neutral_threshold: u8,

    /// Added to red, green and blue of neutral colors, clamped to the byte range.
    pub neutral_offsets: [i16; 3],
}

impl Default for CmykTuning {
    fn default() -> Self {
        CmykTuning { enabled: true, gamma: 0.95, neutral_threshold: 20, neutral_offsets: [8, -6, 0] }
    }
}

impl CmykTuning {

    /// No corrections.
    pub fn disabled() -> Self {
        CmykTuning { enabled: false, ..Self::default() }
    }
}


/// Everything the processors need besides the planes.
#[derive(Debug, Clone, Copy)]
pub struct ColorContext<'c> {

    /// Byte order and alpha convention of the output.
    pub format: SurfaceFormat,

    /// Whether to calibrate with a color profile.
    pub prefer_color_management: bool,

    /// Raw bytes of the profile embedded in the document.
    pub embedded_profile: Option<&'c [u8]>,

    /// A palette that replaces the one from the document.
    pub palette: Option<&'c [u8]>,

    /// The color mode data section of the document.
    pub color_mode_data: &'c [u8],

    /// Corrections for uncalibrated CMYK.
    pub cmyk: CmykTuning,
}

impl<'c> ColorContext<'c> {

    /// A context without profile, palette, or color management.
    pub fn new(format: SurfaceFormat) -> Self {
        ColorContext {
            format,
            prefer_color_management: false,
            embedded_profile: None,
            palette: None,
            color_mode_data: &[],
            cmyk: CmykTuning::default(),
        }
    }

    fn calibration_request(&self, color_mode: ColorMode) -> CalibrationRequest<'c> {
        CalibrationRequest {
            color_mode,
            embedded_profile: self.embedded_profile,
            prefer_color_management: self.prefer_color_management,
        }
    }
}


/// The conversion for one color mode.
/// Modes without a conversion are kept explicitly, so that decoding them fails
/// with an error that says so, instead of guessing colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProcessor {
    Rgb,
    Cmyk,
    Indexed,
    Unsupported(ColorMode),
}

impl ColorProcessor {

    /// Select the processor for a color mode.
    pub fn for_mode(color_mode: ColorMode) -> Self {
        match color_mode {
            ColorMode::Rgb => ColorProcessor::Rgb,
            ColorMode::Cmyk => ColorProcessor::Cmyk,
            ColorMode::Indexed => ColorProcessor::Indexed,

            ColorMode::Bitmap | ColorMode::Grayscale | ColorMode::Duotone
            | ColorMode::Multichannel | ColorMode::Lab => ColorProcessor::Unsupported(color_mode),
        }
    }

    /// Fail for modes and depths without a conversion.
    pub fn check_supported(&self, depth: u16) -> UnitResult {
        if let ColorProcessor::Unsupported(mode) = self {
            return Err(Error::unsupported(format!("{} color mode", mode)));
        }

        if depth != 8 {
            return Err(Error::unsupported(format!("converting {} bit channels", depth)));
        }

        Ok(())
    }

    /// Find or build the calibration for these planes.
    /// The planes are sampled only if no tables for the profile are cached yet.
    pub fn calibrate(
        &self, planes: &PlaneImage, context: &ColorContext<'_>,
        provider: &CalibrationProvider, cancel: &CancelToken,
    ) -> Result<ResolvedCalibration>
    {
        self.check_supported(planes.depth)?;

        match self {
            ColorProcessor::Rgb => {
                let sampler = rgb::Sampler::new(planes)?;
                provider.resolve(&context.calibration_request(ColorMode::Rgb), planes.size, &|position| sampler.sample(position), cancel)
            },

            ColorProcessor::Cmyk => {
                let sampler = cmyk::Sampler::new(planes)?;
                provider.resolve(&context.calibration_request(ColorMode::Cmyk), planes.size, &|position| sampler.sample(position), cancel)
            },

            ColorProcessor::Indexed => {
                let palette = indexed::Palette::from_context(context)?;
                let sampler = indexed::Sampler::new(planes, &palette)?;
                provider.resolve(&context.calibration_request(ColorMode::Indexed), planes.size, &|position| sampler.sample(position), cancel)
            },

            ColorProcessor::Unsupported(mode) => Err(Error::unsupported(format!("{} color mode", mode))),
        }
    }

    /// Convert the planes with a calibration that was resolved before.
    pub fn render(
        &self, planes: &PlaneImage, context: &ColorContext<'_>,
        calibration: &Calibration, cancel: &CancelToken,
    ) -> Result<RgbaSurface>
    {
        self.check_supported(planes.depth)?;

        match self {
            ColorProcessor::Rgb => rgb::render(planes, context, calibration, cancel),
            ColorProcessor::Cmyk => cmyk::render(planes, context, calibration, cancel),
            ColorProcessor::Indexed => indexed::render(planes, context, calibration, cancel),
            ColorProcessor::Unsupported(mode) => Err(Error::unsupported(format!("{} color mode", mode))),
        }
    }

    /// Calibrate and convert the planes.
    /// Also returns the name of the profile that was applied, if any.
    pub fn process(
        &self, planes: &PlaneImage, context: &ColorContext<'_>,
        provider: &CalibrationProvider, cancel: &CancelToken,
    ) -> Result<(RgbaSurface, Option<String>)>
    {
        let resolved = self.calibrate(planes, context, provider, cancel)?;
        let surface = self.render(planes, context, &resolved.calibration, cancel)?;
        Ok((surface, resolved.profile_name))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::image::PlaneRole;
    use crate::math::Vec2;

    #[test]
    fn dispatch_by_mode(){
        assert_eq!(ColorProcessor::for_mode(ColorMode::Cmyk), ColorProcessor::Cmyk);
        assert_eq!(ColorProcessor::for_mode(ColorMode::Lab), ColorProcessor::Unsupported(ColorMode::Lab));
    }

    #[test]
    fn unsupported_modes_and_depths(){
        let planes = PlaneImage::new(Vec2(1, 1), &[PlaneRole::Gray]);
        let context = ColorContext::new(SurfaceFormat::default());
        let provider = CalibrationProvider::default();
        let cancel = CancelToken::new();

        let result = ColorProcessor::for_mode(ColorMode::Grayscale).process(&planes, &context, &provider, &cancel);
        assert!(matches!(result, Err(Error::NotSupported(_))));

        let mut planes = PlaneImage::new(Vec2(1, 1), &[PlaneRole::Red, PlaneRole::Green, PlaneRole::Blue]);
        planes.depth = 16;
        let result = ColorProcessor::Rgb.process(&planes, &context, &provider, &cancel);
        assert!(matches!(result, Err(Error::NotSupported(_))));
    }
}
