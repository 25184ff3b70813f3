//! A composite image divided into a grid of independently decoded tiles.

use std::ops::Range;
use crate::error::*;
use crate::math::{Vec2, Rect, RoundingMode};
use super::surface::{RgbaSurface, SurfaceFormat, BYTES_PER_PIXEL};


/// How an image is divided into tiles.
/// Tiles at the right and bottom edge may be smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileLayout {

    /// Size of the full image.
    pub image_size: Vec2<usize>,

    /// Size of every tile that is not at the right or bottom edge.
    pub tile_size: Vec2<usize>,

    /// Number of tiles horizontally and vertically.
    pub tile_count: Vec2<usize>,
}

/// Position and size of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileInfo {

    /// Column and row of the tile in the grid.
    pub index: Vec2<usize>,

    /// Pixel rectangle of the tile in the full image.
    pub bounds: Rect,
}

impl TileLayout {

    /// Divide the image into tiles of the specified size.
    pub fn new(image_size: Vec2<usize>, tile_size: Vec2<usize>) -> Result<Self> {
        if image_size.area() == 0 || tile_size.area() == 0 {
            return Err(Error::invalid("tile layout with empty size"));
        }

        let tile_count = Vec2(
            RoundingMode::Up.divide(image_size.width(), tile_size.width()),
            RoundingMode::Up.divide(image_size.height(), tile_size.height()),
        );

        Ok(TileLayout { image_size, tile_size, tile_count })
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tile_count.area()
    }

    /// Whether the layout has no tiles, which cannot happen for valid layouts.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the grid position belongs to a tile of this layout.
    pub fn contains(&self, index: Vec2<usize>) -> bool {
        index.x() < self.tile_count.width() && index.y() < self.tile_count.height()
    }

    /// Linear index of a tile, row by row.
    pub fn linear_index(&self, index: Vec2<usize>) -> Option<usize> {
        if self.contains(index) { Some(index.y() * self.tile_count.width() + index.x()) }
        else { None }
    }

    /// Position and size of the tile at the specified grid position.
    pub fn tile(&self, index: Vec2<usize>) -> Option<TileInfo> {
        if self.contains(index) { Some(self.tile_unchecked(index)) }
        else { None }
    }

    /// Position and size of the tile at the specified linear index.
    pub fn tile_at(&self, linear_index: usize) -> Option<TileInfo> {
        let columns = self.tile_count.width();
        self.tile(Vec2(linear_index % columns, linear_index / columns))
    }

    fn tile_unchecked(&self, index: Vec2<usize>) -> TileInfo {
        let position = Vec2(index.x() * self.tile_size.width(), index.y() * self.tile_size.height());
        let size = Vec2(
            self.tile_size.width().min(self.image_size.width() - position.x()),
            self.tile_size.height().min(self.image_size.height() - position.y()),
        );

        TileInfo { index, bounds: Rect { position, size } }
    }

    /// All tiles, row by row.
    pub fn tiles(&self) -> impl Iterator<Item = TileInfo> + '_ {
        let columns = self.tile_count.width();
        (0 .. self.len()).map(move |index| self.tile_unchecked(Vec2(index % columns, index / columns)))
    }

    /// All tiles that share at least one pixel with the rectangle.
    pub fn tiles_in_rect(&self, rect: Rect) -> impl Iterator<Item = TileInfo> + '_ {
        self.tiles().filter(move |tile| tile.bounds.intersects(rect))
    }

    /// Number of tile rows.
    pub fn band_count(&self) -> usize {
        self.tile_count.height()
    }

    /// The image rows covered by one tile row.
    pub fn band_rows(&self, band: usize) -> Range<usize> {
        let start = band * self.tile_size.height();
        start .. (start + self.tile_size.height()).min(self.image_size.height())
    }
}


/// A tiled composite image, where each tile is decoded independently.
/// Tiles that were not decoded yet are `None`.
#[derive(Debug, Clone)]
pub struct TiledImage {

    /// How the image is divided.
    pub layout: TileLayout,

    /// Format of every tile surface.
    pub format: SurfaceFormat,

    tiles: Vec<Option<RgbaSurface>>,
}

impl TiledImage {

    /// A tiled image without any decoded tiles.
    pub fn new(layout: TileLayout, format: SurfaceFormat) -> Self {
        TiledImage { layout, format, tiles: vec![None; layout.len()] }
    }

    /// Size of the full image.
    pub fn size(&self) -> Vec2<usize> {
        self.layout.image_size
    }

    /// The decoded surface of a tile, if available.
    pub fn tile(&self, index: Vec2<usize>) -> Option<&RgbaSurface> {
        self.tiles.get(self.layout.linear_index(index)?)?.as_ref()
    }

    /// Replace a tile surface, returning the previous one.
    pub fn set_tile(&mut self, index: Vec2<usize>, surface: RgbaSurface) -> Result<Option<RgbaSurface>> {
        let (info, linear_index) = match (self.layout.tile(index), self.layout.linear_index(index)) {
            (Some(info), Some(linear_index)) => (info, linear_index),
            _ => return Err(Error::invalid("tile index outside of the tile grid")),
        };

        if surface.size != info.bounds.size || surface.format != self.format {
            return Err(Error::invalid("tile surface does not match the tile layout"));
        }

        Ok(self.tiles[linear_index].replace(surface))
    }

    /// Remove a tile surface from the image.
    pub fn take_tile(&mut self, index: Vec2<usize>) -> Option<RgbaSurface> {
        let linear_index = self.layout.linear_index(index)?;
        self.tiles.get_mut(linear_index)?.take()
    }

    /// Number of tiles that are decoded.
    pub fn decoded_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_some()).count()
    }

    /// Whether every tile is decoded.
    pub fn is_complete(&self) -> bool {
        self.decoded_count() == self.layout.len()
    }

    /// Copy all tiles into one contiguous surface.
    /// Pixels of missing tiles are transparent black.
    pub fn to_surface(&self) -> Result<RgbaSurface> {
        let mut surface = RgbaSurface::new(self.size(), self.format)?;

        for info in self.layout.tiles() {
            let tile = match self.tile(info.index) { Some(tile) => tile, None => continue };
            let start = info.bounds.position.x() * BYTES_PER_PIXEL;
            let end = start + info.bounds.size.width() * BYTES_PER_PIXEL;

            for y in 0 .. info.bounds.size.height() {
                let target = surface.row_mut(info.bounds.position.y() + y);
                target[start .. end].copy_from_slice(tile.row(y));
            }
        }

        Ok(surface)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn edge_tiles_are_smaller(){
        let layout = TileLayout::new(Vec2(1000, 600), Vec2(256, 256)).unwrap();
        assert_eq!(layout.tile_count, Vec2(4, 3));
        assert_eq!(layout.len(), 12);

        let corner = layout.tile(Vec2(3, 2)).unwrap();
        assert_eq!(corner.bounds, Rect::new((768, 512), (232, 88)));
        assert_eq!(layout.band_rows(2), 512 .. 600);
        assert_eq!(layout.tile_at(5).unwrap().index, Vec2(1, 1));
    }

    #[test]
    fn tiles_in_viewport(){
        let layout = TileLayout::new(Vec2(1024, 1024), Vec2(256, 256)).unwrap();
        let visible: Vec<Vec2<usize>> = layout.tiles_in_rect(Rect::new((300, 10), (300, 250)))
            .map(|tile| tile.index).collect();

        assert_eq!(visible, vec![ Vec2(1, 0), Vec2(2, 0), Vec2(1, 1), Vec2(2, 1) ]);
    }

    #[test]
    fn replacing_a_tile_returns_the_previous_surface(){
        let layout = TileLayout::new(Vec2(300, 300), Vec2(256, 256)).unwrap();
        let mut image = TiledImage::new(layout, SurfaceFormat::default());

        let surface = RgbaSurface::new(Vec2(44, 256), SurfaceFormat::default()).unwrap();
        assert!(image.set_tile(Vec2(1, 0), surface.clone()).unwrap().is_none());
        assert!(image.set_tile(Vec2(1, 0), surface).unwrap().is_some());
        assert_eq!(image.decoded_count(), 1);
        assert!(!image.is_complete());

        let wrong_size = RgbaSurface::new(Vec2(256, 256), SurfaceFormat::default()).unwrap();
        assert!(image.set_tile(Vec2(1, 0), wrong_size).is_err());
    }

    #[test]
    fn grid_positions_outside_the_layout(){
        let layout = TileLayout::new(Vec2(512, 512), Vec2(256, 256)).unwrap();
        assert_eq!(layout.tile(Vec2(2, 0)), None);
        assert_eq!(layout.tile(Vec2(0, 2)), None);
        assert_eq!(layout.tile_at(4), None);
        assert_eq!(layout.linear_index(Vec2(2, 0)), None);
        assert_eq!(layout.linear_index(Vec2(1, 1)), Some(3));

        let mut image = TiledImage::new(layout, SurfaceFormat::default());
        let surface = RgbaSurface::new(Vec2(256, 256), SurfaceFormat::default()).unwrap();
        image.set_tile(Vec2(0, 1), surface.clone()).unwrap();

        // must not alias the first tile of the next row
        assert!(matches!(image.set_tile(Vec2(3, 0), surface.clone()), Err(Error::Invalid(_))));
        assert!(matches!(image.set_tile(Vec2(0, 5), surface), Err(Error::Invalid(_))));
        assert!(image.tile(Vec2(2, 0)).is_none());
        assert!(image.take_tile(Vec2(2, 0)).is_none());
        assert!(image.tile(Vec2(0, 1)).is_some());
        assert_eq!(image.decoded_count(), 1);
    }
}
