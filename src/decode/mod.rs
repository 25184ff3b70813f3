//! Wires the sections of a document, the decompressors and the color processors together.
//! Full decode, downsampled preview decode, and tiled decode (see `tiles`).

pub mod tiles;

use std::sync::Arc;
use crate::calibration::CalibrationProvider;
use crate::calibration::profile_name::profile_name;
use crate::cancel::CancelToken;
use crate::color::{CmykTuning, ColorContext, ColorProcessor};
use crate::compression::{self, Compression};
use crate::document::Document;
use crate::error::*;
use crate::image::{composite_roles, PlaneRoles};
use crate::image::sink::{PlaneImageSink, Progress};
use crate::image::surface::{RgbaSurface, SurfaceFormat};
use crate::io::{PsdReader, Read, Seek};
use crate::math::Vec2;


/// Configures decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {

    /// Byte order and alpha convention of the output surfaces.
    pub format: SurfaceFormat,

    /// Calibrate colors with the embedded or system profile.
    pub prefer_color_management: bool,

    /// Fail with `Error::TooLarge` instead of allocating a bigger output surface.
    pub max_surface_bytes: Option<u64>,

    /// Check the packed row table before decoding any pixels.
    pub validate_payload: bool,

    /// Palette for indexed documents, replacing the document palette.
    pub palette: Option<Vec<u8>>,

    /// Corrections for uncalibrated CMYK.
    pub cmyk: CmykTuning,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            format: SurfaceFormat::default(),
            prefer_color_management: true,
            max_surface_bytes: None,
            validate_payload: true,
            palette: None,
            cmyk: CmykTuning::default(),
        }
    }
}

impl DecodeOptions {

    /// Output surfaces in this format.
    pub fn with_format(self, format: SurfaceFormat) -> Self {
        DecodeOptions { format, ..self }
    }

    /// Enable or disable calibration.
    pub fn with_color_management(self, prefer_color_management: bool) -> Self {
        DecodeOptions { prefer_color_management, ..self }
    }

    /// Limit the size of the output surface.
    pub fn with_max_surface_bytes(self, max_surface_bytes: u64) -> Self {
        DecodeOptions { max_surface_bytes: Some(max_surface_bytes), ..self }
    }

    /// Enable or disable the upfront payload check.
    pub fn with_payload_validation(self, validate_payload: bool) -> Self {
        DecodeOptions { validate_payload, ..self }
    }

    /// Replace the palette of indexed documents.
    pub fn with_palette(self, palette: Vec<u8>) -> Self {
        DecodeOptions { palette: Some(palette), ..self }
    }

    /// Configure the uncalibrated CMYK corrections.
    pub fn with_cmyk_tuning(self, cmyk: CmykTuning) -> Self {
        DecodeOptions { cmyk, ..self }
    }

    /// Fail if a surface of this size exceeds the configured limit.
    pub fn check_surface_size(&self, size: Vec2<usize>) -> UnitResult {
        let required = RgbaSurface::byte_size(size).unwrap_or(u64::MAX);

        match self.max_surface_bytes {
            Some(limit) if required > limit => Err(Error::TooLarge { required, limit }),
            _ => Ok(()),
        }
    }
}


/// Facts about a decode, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeMetadata {

    /// How the composite payload is compressed.
    pub compression: Compression,

    /// Description of the profile embedded in the document, if it has a readable one.
    pub embedded_profile_name: Option<String>,

    /// Name of the profile that colors were calibrated with, if any.
    pub effective_profile_name: Option<String>,
}

impl DecodeMetadata {

    /// Display name of the compression, for example `ZIP with prediction`.
    pub fn compression_name(&self) -> &'static str {
        self.compression.name()
    }
}


/// A decoded surface and what was learned while decoding it.
#[derive(Debug, Clone)]
pub struct DecodedImage {

    /// The pixels.
    pub surface: RgbaSurface,

    /// Compression and profile names.
    pub metadata: DecodeMetadata,
}


/// The largest size with the aspect ratio of `source` that fits into `max`.
/// Never larger than `source`, and never smaller than one pixel.
pub fn preview_size(source: Vec2<usize>, max: Vec2<usize>) -> Vec2<usize> {
    let scale = (max.width() as f64 / source.width().max(1) as f64)
        .min(max.height() as f64 / source.height().max(1) as f64)
        .min(1.0);

    let scaled = |length: usize| ((length as f64 * scale).floor() as usize).clamp(1, length.max(1));
    Vec2(scaled(source.width()), scaled(source.height()))
}


/// Decodes composite images with fixed options.
/// Cheap to clone, and clones share the calibration cache.
#[derive(Debug, Clone)]
pub struct CompositeDecoder {
    options: DecodeOptions,
    calibration: Arc<CalibrationProvider>,
}

impl Default for CompositeDecoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl CompositeDecoder {

    /// A decoder with its own calibration cache.
    pub fn new(options: DecodeOptions) -> Self {
        Self::with_calibration(options, Arc::new(CalibrationProvider::default()))
    }

    /// A decoder that shares a calibration cache with other decoders.
    pub fn with_calibration(options: DecodeOptions, calibration: Arc<CalibrationProvider>) -> Self {
        CompositeDecoder { options, calibration }
    }

    /// The options of this decoder.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// The calibration provider of this decoder.
    pub fn calibration(&self) -> &Arc<CalibrationProvider> {
        &self.calibration
    }

    /// The color context for this document, borrowing the profile and palette.
    pub(crate) fn color_context<'c>(&'c self, document: &'c Document, profile: Option<&'c [u8]>, format: SurfaceFormat) -> ColorContext<'c> {
        ColorContext {
            format,
            prefer_color_management: self.options.prefer_color_management,
            embedded_profile: profile,
            palette: self.options.palette.as_deref(),
            color_mode_data: &document.color_mode_data.bytes,
            cmyk: self.options.cmyk,
        }
    }

    /// Check everything that can be checked without decoding pixels,
    /// and return the processor and the planes to decode.
    pub(crate) fn prepare(&self, reader: &mut PsdReader<impl Read + Seek>, document: &Document) -> Result<(ColorProcessor, PlaneRoles)> {
        let header = &document.header;

        let processor = ColorProcessor::for_mode(header.color_mode);
        processor.check_supported(header.depth)?;
        compression::check_depth(header)?;

        let roles = composite_roles(header)?;

        if self.options.validate_payload {
            compression::validate_payload(reader, header, &document.image_data)
                .map_err(|error| error.context("image data", document.image_data.payload_offset))?;
        }

        Ok((processor, roles))
    }

    /// Read the embedded profile, and its description.
    pub(crate) fn embedded_profile(&self, reader: &mut PsdReader<impl Read + Seek>, document: &Document) -> Result<(Option<Vec<u8>>, Option<String>)> {
        let profile = document.embedded_profile(reader)?;
        let name = profile.as_deref().and_then(profile_name);
        Ok((profile, name))
    }

    /// Decode the full resolution composite image.
    /// `progress` is called after each decompressed row with the number of rows done and the total.
    pub fn decode(
        &self, reader: &mut PsdReader<impl Read + Seek>, document: &Document,
        cancel: &CancelToken, progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<DecodedImage>
    {
        let header = &document.header;
        self.options.check_surface_size(header.size)?;

        let (processor, roles) = self.prepare(reader, document)?;
        let (profile, embedded_profile_name) = self.embedded_profile(reader, document)?;

        log::debug!(
            "decoding {}x{} {} image with {}",
            header.width(), header.height(), header.color_mode, document.image_data.compression
        );

        let image_data = &document.image_data;
        let rows = 0 .. header.height();
        let sink = PlaneImageSink::new(header.size, &roles);

        let planes = match progress {
            Some(callback) => {
                let mut sink = Progress::new(sink, roles.len() * header.height(), callback);
                compression::decompress_rows(reader, header, image_data, roles.len(), rows, &mut sink, cancel)?;
                sink.into_inner().into_image()
            },

            None => {
                let mut sink = sink;
                compression::decompress_rows(reader, header, image_data, roles.len(), rows, &mut sink, cancel)?;
                sink.into_image()
            },
        };

        let context = self.color_context(document, profile.as_deref(), self.options.format);
        let (surface, effective_profile_name) = processor.process(&planes, &context, &self.calibration, cancel)?;

        Ok(DecodedImage {
            surface,
            metadata: DecodeMetadata { compression: image_data.compression, embedded_profile_name, effective_profile_name },
        })
    }

    /// Decode a downsampled image that fits into `max_size`, using nearest neighbour sampling.
    /// Images smaller than `max_size` are decoded at their own size.
    pub fn decode_preview(
        &self, reader: &mut PsdReader<impl Read + Seek>, document: &Document,
        max_size: Vec2<usize>, cancel: &CancelToken,
    ) -> Result<DecodedImage>
    {
        let header = &document.header;
        let target_size = preview_size(header.size, max_size);
        self.options.check_surface_size(target_size)?;

        let (processor, roles) = self.prepare(reader, document)?;
        let (profile, embedded_profile_name) = self.embedded_profile(reader, document)?;

        log::debug!(
            "decoding {}x{} preview of {}x{} image",
            target_size.width(), target_size.height(), header.width(), header.height()
        );

        let image_data = &document.image_data;
        let planes = compression::decompress_planes_scaled(reader, header, image_data, &roles, target_size, cancel)?;

        let context = self.color_context(document, profile.as_deref(), self.options.format);
        let (surface, effective_profile_name) = processor.process(&planes, &context, &self.calibration, cancel)?;

        Ok(DecodedImage {
            surface,
            metadata: DecodeMetadata { compression: image_data.compression, embedded_profile_name, effective_profile_name },
        })
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn preview_keeps_aspect_and_never_upsamples(){
        assert_eq!(preview_size(Vec2(4000, 2000), Vec2(400, 400)), Vec2(400, 200));
        assert_eq!(preview_size(Vec2(2000, 4000), Vec2(400, 400)), Vec2(200, 400));
        assert_eq!(preview_size(Vec2(100, 50), Vec2(400, 400)), Vec2(100, 50));
        assert_eq!(preview_size(Vec2(10000, 1), Vec2(100, 100)), Vec2(100, 1));
        assert_eq!(preview_size(Vec2(300, 200), Vec2(0, 0)), Vec2(1, 1));
    }

    #[test]
    fn surface_limit(){
        let options = DecodeOptions::default().with_max_surface_bytes(400);
        assert!(options.check_surface_size(Vec2(10, 10)).is_ok());

        match options.check_surface_size(Vec2(10, 11)) {
            Err(Error::TooLarge { required, limit }) => assert_eq!((required, limit), (440, 400)),
            other => panic!("unexpected result {:?}", other),
        }

        assert!(DecodeOptions::default().check_surface_size(Vec2(100_000, 100_000)).is_ok());
    }

    #[test]
    fn builders(){
        let options = DecodeOptions::default()
            .with_color_management(false)
            .with_payload_validation(false)
            .with_palette(vec![0; 768])
            .with_cmyk_tuning(CmykTuning::disabled());

        assert!(!options.prefer_color_management);
        assert!(!options.validate_payload);
        assert_eq!(options.palette.as_ref().map(Vec::len), Some(768));
        assert!(!options.cmyk.enabled);
        assert_eq!(options.format, SurfaceFormat::default());
    }
}
