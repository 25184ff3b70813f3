//! The sections of a document, read in file order,
//! and the entry points for decoding its composite image.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::decode::{CompositeDecoder, DecodeMetadata, DecodedImage};
use crate::decode::tiles::TileEdge;
use crate::error::*;
use crate::image::surface::RgbaSurface;
use crate::image::tiled::{TileInfo, TiledImage};
use crate::io::{PsdReader, Read, Seek};
use crate::math::Vec2;
use crate::meta::{ColorModeData, FileHeader, ImageData};
use crate::meta::layers::LayerAndMaskInfo;
use crate::meta::resources::ImageResources;


/// The layout of a whole document.
/// Section contents other than the color mode data are not loaded,
/// only their positions are recorded, so a document is small even for huge files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {

    /// Size, depth and color mode.
    pub header: FileHeader,

    /// The palette of indexed documents.
    pub color_mode_data: ColorModeData,

    /// Locations of all resource blocks.
    pub resources: ImageResources,

    /// Summary of the layer section, which is skipped when decoding the composite.
    pub layers: LayerAndMaskInfo,

    /// Compression and location of the composite image.
    pub image_data: ImageData,
}

impl Document {

    /// Read only the header, which is enough to identify the format and the image size.
    /// Works on any stream, seekable or not.
    pub fn read_header(read: impl Read) -> Result<FileHeader> {
        let mut reader = PsdReader::sequential(read);
        FileHeader::read(&mut reader).map_err(|error| error.context("header", 0))
    }

    /// Read all sections, leaving the reader at the start of the composite payload.
    /// Every section is checked against the bounds of the stream.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>) -> Result<Self> {
        let header = FileHeader::read(reader)
            .map_err(|error| error.context("header", 0))?;

        let position = reader.position();
        let color_mode_data = ColorModeData::read(reader)
            .map_err(|error| error.context("color mode data", position))?;

        let position = reader.position();
        let resources = ImageResources::read(reader)
            .map_err(|error| error.context("image resources", position))?;

        let position = reader.position();
        let layers = LayerAndMaskInfo::read(reader, header.version)
            .map_err(|error| error.context("layer and mask information", position))?;

        let position = reader.position();
        let image_data = ImageData::read(reader)
            .map_err(|error| error.context("image data", position))?;

        log::debug!(
            "read {}x{} {} document with {} channels, {} resources, {}",
            header.width(), header.height(), header.color_mode, header.channel_count,
            resources.blocks.len(), image_data.compression
        );

        Ok(Document { header, color_mode_data, resources, layers, image_data })
    }

    /// Open a file and read its sections.
    /// Returns the reader too, because decoding needs the stream again.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, PsdReader<BufReader<File>>)> {
        let file = BufReader::new(File::open(path)?);
        let mut reader = PsdReader::new(file)?;
        let document = Self::read(&mut reader)?;
        Ok((document, reader))
    }

    /// The raw bytes of the embedded ICC profile. Empty profiles count as absent.
    pub fn embedded_profile(&self, reader: &mut PsdReader<impl Read + Seek>) -> Result<Option<Vec<u8>>> {
        match self.resources.icc_profile() {
            Some(block) if block.data_length > 0 => Ok(Some(block.read_bytes(reader)?)),
            _ => Ok(None),
        }
    }

    /// Decode the full resolution composite image.
    pub fn decode(&self, reader: &mut PsdReader<impl Read + Seek>, decoder: &CompositeDecoder, cancel: &CancelToken) -> Result<DecodedImage> {
        decoder.decode(reader, self, cancel, None)
    }

    /// Decode a downsampled composite image that fits into `max_size`.
    pub fn decode_preview(
        &self, reader: &mut PsdReader<impl Read + Seek>, decoder: &CompositeDecoder,
        max_size: Vec2<usize>, cancel: &CancelToken,
    ) -> Result<DecodedImage>
    {
        decoder.decode_preview(reader, self, max_size, cancel)
    }

    /// An empty tiled image for the composite image.
    pub fn create_tiled(&self, decoder: &CompositeDecoder, edge: TileEdge) -> Result<TiledImage> {
        decoder.create_tiled(self, edge)
    }

    /// Decode all tiles of a tiled image created by `create_tiled`.
    pub fn fill_tiles(
        &self, reader: &mut PsdReader<impl Read + Seek>, decoder: &CompositeDecoder,
        tiled: &mut TiledImage, band_order: Option<&[usize]>,
        cancel: &CancelToken, on_tile_ready: &mut dyn FnMut(TileInfo, &RgbaSurface),
    ) -> Result<DecodeMetadata>
    {
        decoder.fill_tiles(reader, self, tiled, band_order, cancel, on_tile_ready)
    }
}
