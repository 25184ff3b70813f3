//! Show a preview first, then decode the full resolution tiles in the background.
//! Requires the `rayon` feature.

use std::sync::Arc;
use crate::cancel::CancelToken;
use crate::decode::{CompositeDecoder, DecodeMetadata, DecodedImage};
use crate::decode::tiles::TileEdge;
use crate::document::Document;
use crate::error::*;
use crate::image::surface::RgbaSurface;
use crate::image::tiled::{TileInfo, TiledImage};
use crate::io::{PsdReader, Read, Seek};
use crate::math::Vec2;
use crate::schedule::TileScheduler;


/// Receives the results of a progressive load.
/// All methods except `on_ready` are called on a background thread.
pub trait ProgressiveEvents: Send + 'static {

    /// The first image to show. Called before `load` returns.
    /// If `is_final` is set, the image is the full resolution image and no tiles follow.
    fn on_ready(&mut self, image: DecodedImage, is_final: bool);

    /// A full resolution tile was decoded.
    fn on_tile(&mut self, info: TileInfo, surface: &RgbaSurface) {
        let _ = (info, surface);
    }

    /// All tiles were decoded, or decoding failed or was cancelled.
    /// Called exactly once for every load that started tiling.
    fn on_complete(&mut self, result: Result<(TiledImage, DecodeMetadata)>);
}


/// Configures when and how documents are decoded progressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressiveSettings {

    /// Bounds of the preview image.
    pub preview_size: Vec2<usize>,

    /// Documents whose full resolution surface needs at most this many bytes
    /// are decoded at once, without preview or tiles.
    pub full_decode_threshold: u64,

    /// Edge length of the tiles.
    pub tile_edge: TileEdge,
}

impl Default for ProgressiveSettings {
    fn default() -> Self {
        ProgressiveSettings {
            preview_size: Vec2(1024, 1024),
            full_decode_threshold: 64 * 1024 * 1024,
            tile_edge: TileEdge::default(),
        }
    }
}


/// What a load is doing after `load` has returned.
#[derive(Debug, Clone)]
pub enum Loading {

    /// The full image was already delivered to `on_ready`.
    Complete,

    /// Tiles are being decoded in the background.
    /// Moving the focus of the scheduler before the worker starts changes the band order.
    Tiling { scheduler: Arc<TileScheduler> },
}


/// Decodes previews on the calling thread and tiles on a thread pool.
#[derive(Debug)]
pub struct ProgressiveLoader {
    decoder: CompositeDecoder,
    settings: ProgressiveSettings,
    pool: rayon_core::ThreadPool,
}

impl ProgressiveLoader {

    /// Create the background threads.
    pub fn new(decoder: CompositeDecoder, settings: ProgressiveSettings) -> Result<Self> {
        let pool = rayon_core::ThreadPoolBuilder::new()
            .thread_name(|index| format!("PSD Tile Decoder Thread #{}", index))
            .build()
            .map_err(|error| Error::unsupported(format!("background decoding threads: {}", error)))?;

        Ok(ProgressiveLoader { decoder, settings, pool })
    }

    /// The decoder used for previews and tiles.
    pub fn decoder(&self) -> &CompositeDecoder {
        &self.decoder
    }

    /// Read the document from a stream opened by `open` and deliver a first image.
    /// Large documents are then decoded tile by tile from a second stream, also opened by `open`,
    /// because the stream of the first decode cannot be shared with the background thread.
    ///
    /// Errors before the first image are returned, errors of the background decode go to `on_complete`.
    pub fn load<R, O, E>(&self, open: O, mut events: E, cancel: CancelToken) -> Result<Loading>
        where R: Read + Seek + 'static, O: Fn() -> Result<R> + Send + 'static, E: ProgressiveEvents
    {
        let mut reader = PsdReader::new(open()?)?;
        let document = Document::read(&mut reader)?;

        let full_size = RgbaSurface::byte_size(document.header.size).unwrap_or(u64::MAX);
        if full_size <= self.settings.full_decode_threshold {
            let image = self.decoder.decode(&mut reader, &document, &cancel, None)?;
            events.on_ready(image, true);
            return Ok(Loading::Complete);
        }

        let preview = self.decoder.decode_preview(&mut reader, &document, self.settings.preview_size, &cancel)?;
        drop(reader);

        events.on_ready(preview, false);

        let tiled = self.decoder.create_tiled(&document, self.settings.tile_edge)?;
        let scheduler = Arc::new(TileScheduler::new(tiled.layout));
        let worker_scheduler = scheduler.clone();
        let decoder = self.decoder.clone();

        self.pool.spawn(move || {
            let mut tiled = tiled;

            let result = fill_in_background(&decoder, &document, &open, &mut tiled, &worker_scheduler, &cancel, &mut events);

            match &result {
                Err(Error::Aborted) => log::debug!("tile decoding cancelled"),
                Err(error) => log::debug!("tile decoding failed: {}", error),
                Ok(_) => log::debug!("all {} tiles decoded", tiled.layout.len()),
            }

            events.on_complete(result.map(|metadata| (tiled, metadata)));
        });

        Ok(Loading::Tiling { scheduler })
    }
}

fn fill_in_background<R: Read + Seek>(
    decoder: &CompositeDecoder, document: &Document,
    open: &dyn Fn() -> Result<R>, tiled: &mut TiledImage,
    scheduler: &TileScheduler, cancel: &CancelToken,
    events: &mut impl ProgressiveEvents,
) -> Result<DecodeMetadata>
{
    cancel.check()?;

    let mut reader = PsdReader::new(open()?)?;
    let band_order = scheduler.band_order();

    decoder.fill_tiles(&mut reader, document, tiled, Some(&band_order), cancel, &mut |info, surface| {
        events.on_tile(info, surface)
    })
}
