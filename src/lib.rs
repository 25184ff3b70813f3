//! Decode the flattened composite image of PSD and PSB documents.
//!
//! Reads the sections of a document, decompresses the composite planes
//! (raw, PackBits, zip, or zip with prediction), and converts RGB, CMYK and indexed colors
//! into interleaved 8 bit pixels, optionally calibrated through the embedded ICC profile.
//! Images can be decoded at full resolution, as a downsampled preview, or tile by tile.

#![forbid(unsafe_code)]


pub mod io;
pub mod math;
pub mod error;
pub mod cancel;
pub mod meta;
pub mod document;
pub mod compression;
pub mod image;
pub mod color;
pub mod calibration;
pub mod decode;
pub mod schedule;

#[cfg(feature = "rayon")]
pub mod progressive;


pub mod prelude {

    // main exports
    pub use crate::document::Document;
    pub use crate::decode::{CompositeDecoder, DecodeOptions, DecodeMetadata, DecodedImage};
    pub use crate::decode::tiles::TileEdge;
    pub use crate::cancel::CancelToken;
    pub use crate::io::PsdReader;

    // core data types
    pub use crate::image::surface::{RgbaSurface, SurfaceFormat, PixelFormat, AlphaType};
    pub use crate::image::tiled::{TiledImage, TileInfo, TileLayout};
    pub use crate::calibration::{CalibrationProvider, CalibrationSettings, PolarityMode};
    pub use crate::color::CmykTuning;
    pub use crate::schedule::TileScheduler;
    pub use crate::math::{Vec2, Rect};

    // secondary data types
    pub use crate::meta;
    pub use crate::error;
    pub use crate::error::{Error, Result};
}
