//! Tiled decoding of large composite images.
//!
//! Rows are decompressed band by band and distributed into the tiles they cross.
//! As soon as all planes of a tile are complete, the tile is converted
//! and handed to the caller, so that partial results can be shown.

use std::ops::Range;
use crate::calibration::ResolvedCalibration;
use crate::cancel::CancelToken;
use crate::compression;
use crate::document::Document;
use crate::error::*;
use crate::image::PlaneImage;
use crate::image::sink::TileRowSink;
use crate::image::surface::{RgbaSurface, BYTES_PER_PIXEL};
use crate::image::tiled::{TileInfo, TileLayout, TiledImage};
use crate::io::{PsdReader, Read, Seek};
use crate::math::Vec2;
use super::{CompositeDecoder, DecodeMetadata};


/// Tiles are never smaller than this, except at the image edges.
pub const MIN_TILE_EDGE: usize = 256;

/// Tiles are never larger than this.
pub const MAX_TILE_EDGE: usize = 4096;

/// Tile edges are multiples of this.
pub const TILE_EDGE_ALIGNMENT: usize = 64;

/// Memory budget per tile surface if no edge length is requested.
pub const DEFAULT_MAX_TILE_BYTES: u64 = 4 * 1024 * 1024;


/// How the tile edge length is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEdge {

    /// Use approximately this edge length.
    Hint(usize),

    /// Use the largest edge whose tile surface fits into this many bytes.
    MaxBytes(u64),
}

impl Default for TileEdge {
    fn default() -> Self {
        TileEdge::MaxBytes(DEFAULT_MAX_TILE_BYTES)
    }
}

impl TileEdge {

    /// The square tile edge length, clamped and aligned.
    pub fn edge_length(self) -> usize {
        let requested = match self {
            TileEdge::Hint(edge) => edge,
            TileEdge::MaxBytes(bytes) => ((bytes / BYTES_PER_PIXEL as u64) as f64).sqrt().floor() as usize,
        };

        let clamped = requested.clamp(MIN_TILE_EDGE, MAX_TILE_EDGE);
        clamped - clamped % TILE_EDGE_ALIGNMENT
    }
}


/// Remove duplicates and out of range bands from a caller order,
/// then append the missing bands in ascending order.
pub fn normalize_band_order(order: &[usize], band_count: usize) -> Vec<usize> {
    let mut visited = vec![false; band_count];
    let mut normalized = Vec::with_capacity(band_count);

    let all_bands = order.iter().copied().chain(0 .. band_count);

    for band in all_bands {
        if band < band_count && !visited[band] {
            visited[band] = true;
            normalized.push(band);
        }
    }

    normalized
}

/// The middle band, then alternating the bands above and below it.
pub fn center_out_order(band_count: usize) -> Vec<usize> {
    let middle = band_count / 2;
    let mut order = Vec::with_capacity(band_count);

    if band_count > 0 {
        order.push(middle);
    }

    for distance in 1 ..= band_count {
        if let Some(above) = middle.checked_sub(distance) { order.push(above); }
        if middle + distance < band_count { order.push(middle + distance); }
    }

    order
}


impl CompositeDecoder {

    /// An empty tiled image for the document, in the output format of this decoder.
    pub fn create_tiled(&self, document: &Document, edge: TileEdge) -> Result<TiledImage> {
        let edge = edge.edge_length();
        let layout = TileLayout::new(document.header.size, Vec2(edge, edge))?;

        log::debug!(
            "dividing {}x{} image into {}x{} tiles of {} pixels",
            layout.image_size.width(), layout.image_size.height(),
            layout.tile_count.width(), layout.tile_count.height(), edge
        );

        Ok(TiledImage::new(layout, self.options.format))
    }

    /// Decode all tiles of the tiled image, storing each one as soon as it is complete,
    /// and then calling `on_tile_ready` with it.
    ///
    /// Bands are decoded in `band_order`, or center-out without an order.
    /// Zip compressed data cannot skip rows, so it is always decoded in a single pass from top to bottom.
    /// The calibration is resolved from the first completed tile.
    pub fn fill_tiles(
        &self, reader: &mut PsdReader<impl Read + Seek>, document: &Document,
        tiled: &mut TiledImage, band_order: Option<&[usize]>,
        cancel: &CancelToken, on_tile_ready: &mut dyn FnMut(TileInfo, &RgbaSurface),
    ) -> Result<DecodeMetadata>
    {
        let header = &document.header;
        let layout = tiled.layout;

        if layout.image_size != header.size {
            return Err(Error::invalid("tiled image does not match the document size"));
        }

        let (processor, roles) = self.prepare(reader, document)?;
        let (profile, embedded_profile_name) = self.embedded_profile(reader, document)?;
        let context = self.color_context(document, profile.as_deref(), tiled.format);

        let bands: Vec<Range<usize>> = if document.image_data.compression.supports_row_skipping() {
            let order = match band_order {
                Some(order) => normalize_band_order(order, layout.band_count()),
                None => center_out_order(layout.band_count()),
            };

            order.into_iter().map(|band| layout.band_rows(band)).collect()
        }
        else {
            vec![0 .. header.height()]
        };

        let mut resolved: Option<ResolvedCalibration> = None;

        let on_tile = |info: TileInfo, planes: PlaneImage| -> UnitResult {
            let calibration = match resolved.take() {
                Some(calibration) => calibration,
                None => processor.calibrate(&planes, &context, &self.calibration, cancel)?,
            };

            let surface = processor.render(&planes, &context, &calibration.calibration, cancel);
            resolved = Some(calibration);

            let surface = surface?;
            drop(planes);

            tiled.set_tile(info.index, surface)?;
            log::trace!("tile {:?} decoded", info.index);

            if let Some(surface) = tiled.tile(info.index) {
                on_tile_ready(info, surface);
            }

            Ok(())
        };

        let mut sink = TileRowSink::new(layout, &roles, on_tile);
        compression::decompress_bands(reader, header, &document.image_data, roles.len(), &bands, &mut sink, cancel)?;
        drop(sink);

        if !tiled.is_complete() {
            return Err(Error::invalid("not all tiles were decoded"));
        }

        Ok(DecodeMetadata {
            compression: document.image_data.compression,
            embedded_profile_name,
            effective_profile_name: resolved.and_then(|resolved| resolved.profile_name),
        })
    }
}
