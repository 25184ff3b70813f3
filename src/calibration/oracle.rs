//! The full color transform that calibration tables are sampled from.

use std::path::Path;
use crate::error::*;
use crate::meta::ColorMode;


/// Where a color profile comes from.
#[derive(Debug, Clone, Copy)]
pub enum ProfileSource<'p> {

    /// Raw profile bytes embedded in the document.
    Embedded(&'p [u8]),

    /// A profile file installed on this system.
    File(&'p Path),
}


/// Converts single samples of a source color space to 8 bit sRGB.
pub trait ColorOracle: Send + Sync {

    /// Convert one sample. `source` holds three values for rgb and four for cmyk,
    /// in the channel order of the profile.
    fn convert(&self, source: &[u8]) -> Result<[u8; 3]>;
}

/// Creates oracles from profiles. Tests substitute their own implementation.
pub trait OracleFactory: Send + Sync {

    /// Create an oracle that converts samples of `color_mode` through the profile.
    fn create(&self, profile: ProfileSource<'_>, color_mode: ColorMode) -> Result<Box<dyn ColorOracle>>;
}


/// Creates oracles backed by `moxcms`, converting with the relative colorimetric intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoxcmsOracles;

type Conversion = Box<dyn Fn(&[u8], &mut [u8]) -> std::result::Result<(), moxcms::CmsError> + Send + Sync>;

struct MoxcmsOracle {
    conversion: Conversion,
    channel_count: usize,
}

fn cms_error(error: moxcms::CmsError) -> Error {
    Error::invalid(format!("icc profile: {:?}", error))
}

impl OracleFactory for MoxcmsOracles {
    fn create(&self, profile: ProfileSource<'_>, color_mode: ColorMode) -> Result<Box<dyn ColorOracle>> {
        let profile = match profile {
            ProfileSource::Embedded(bytes) => moxcms::ColorProfile::new_from_slice(bytes).map_err(cms_error)?,
            ProfileSource::File(path) => moxcms::ColorProfile::new_from_slice(&std::fs::read(path)?).map_err(cms_error)?,
        };

        let (layout, channel_count) = match color_mode {
            ColorMode::Cmyk => (moxcms::Layout::Rgba, 4),
            ColorMode::Rgb | ColorMode::Indexed => (moxcms::Layout::Rgb, 3),
            other => return Err(Error::unsupported(format!("calibrating {} color mode", other))),
        };

        let options = moxcms::TransformOptions {
            rendering_intent: moxcms::RenderingIntent::RelativeColorimetric,
            ..Default::default()
        };

        let transform = profile
            .create_transform_8bit(layout, &moxcms::ColorProfile::new_srgb(), moxcms::Layout::Rgb, options)
            .map_err(cms_error)?;

        let conversion: Conversion = Box::new(move |source: &[u8], target: &mut [u8]| transform.transform(source, target));
        Ok(Box::new(MoxcmsOracle { conversion, channel_count }))
    }
}

impl ColorOracle for MoxcmsOracle {
    fn convert(&self, source: &[u8]) -> Result<[u8; 3]> {
        if source.len() != self.channel_count {
            return Err(Error::invalid("sample does not match the profile channel count"));
        }

        let mut target = [0_u8; 3];
        (self.conversion)(source, &mut target).map_err(cms_error)?;
        Ok(target)
    }
}
