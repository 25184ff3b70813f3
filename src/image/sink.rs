//! Receivers of decompressed rows.
//! The decompressors deliver rows plane by plane, each plane from top to bottom.

use std::ops::Range;
use crate::error::*;
use crate::math::Vec2;
use super::{PlaneImage, PlaneRole, PlaneRoles};
use super::tiled::{TileInfo, TileLayout};


/// Receives full-width rows of decompressed samples.
pub trait RowConsumer {

    /// Called before the rows of a band are delivered.
    /// Each plane will then deliver the rows in `rows`, in ascending order.
    fn begin_pass(&mut self, rows: Range<usize>) -> UnitResult {
        let _ = rows;
        Ok(())
    }

    /// Receive one row of the plane at `plane_index`.
    fn consume_row(&mut self, plane_index: usize, y: usize, row: &[u8]) -> UnitResult;
}


/// Collects rows into a full-size planar image.
#[derive(Debug)]
pub struct PlaneImageSink {
    image: PlaneImage,
}

impl PlaneImageSink {

    /// Allocate planes for the specified roles.
    pub fn new(size: Vec2<usize>, roles: &[PlaneRole]) -> Self {
        PlaneImageSink { image: PlaneImage::new(size, roles) }
    }

    /// The collected image.
    pub fn into_image(self) -> PlaneImage {
        self.image
    }
}

impl RowConsumer for PlaneImageSink {
    fn consume_row(&mut self, plane_index: usize, y: usize, row: &[u8]) -> UnitResult {
        let plane = self.image.planes.get_mut(plane_index)
            .ok_or_else(|| Error::invalid("row for an unknown plane"))?;

        let width = self.image.size.width();
        plane.row_mut(y)[.. width].copy_from_slice(&row[.. width]);
        Ok(())
    }
}


/// Reports the number of delivered rows to a callback, then forwards them.
pub struct Progress<'f, C> {
    inner: C,
    delivered: usize,
    total: usize,
    callback: &'f mut dyn FnMut(usize, usize),
}

impl<'f, C: RowConsumer> Progress<'f, C> {

    /// Wrap a consumer. `total` is the number of rows all planes will deliver together.
    pub fn new(inner: C, total: usize, callback: &'f mut dyn FnMut(usize, usize)) -> Self {
        Progress { inner, total, callback, delivered: 0 }
    }

    /// The wrapped consumer.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: RowConsumer> RowConsumer for Progress<'_, C> {
    fn begin_pass(&mut self, rows: Range<usize>) -> UnitResult {
        self.inner.begin_pass(rows)
    }

    fn consume_row(&mut self, plane_index: usize, y: usize, row: &[u8]) -> UnitResult {
        self.inner.consume_row(plane_index, y, row)?;
        self.delivered += 1;
        (self.callback)(self.delivered, self.total);
        Ok(())
    }
}


/// Which row the tile sink accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {

    /// No pass has been started.
    Idle,

    /// The next row must be exactly this one.
    Expecting { plane: usize, y: usize },

    /// Every plane of the current pass was delivered.
    PassComplete,
}


/// Splits full-width rows into the planar buffers of the tiles they cross.
/// Once the last row of the last plane of a tile arrives,
/// the planes of that tile are handed to a callback and released.
///
/// Rows must arrive plane-major and ascending within the rows of each pass,
/// anything else is rejected as invalid.
pub struct TileRowSink<F> {
    layout: TileLayout,
    roles: PlaneRoles,
    pending: Vec<Option<PlaneImage>>,
    pass: Range<usize>,
    delivery: Delivery,
    on_tile: F,
}

impl<F> TileRowSink<F> where F: FnMut(TileInfo, PlaneImage) -> UnitResult {

    /// Create a sink that calls `on_tile` with the planes of every completed tile.
    pub fn new(layout: TileLayout, roles: &[PlaneRole], on_tile: F) -> Self {
        TileRowSink {
            layout,
            roles: PlaneRoles::from_slice(roles),
            pending: vec![None; layout.len()],
            pass: 0 .. 0,
            delivery: Delivery::Idle,
            on_tile,
        }
    }

    /// Number of tiles that have received rows but are not complete yet.
    pub fn pending_tiles(&self) -> usize {
        self.pending.iter().filter(|tile| tile.is_some()).count()
    }

    fn advance(&mut self, plane_index: usize, y: usize) {
        self.delivery = if y + 1 < self.pass.end {
            Delivery::Expecting { plane: plane_index, y: y + 1 }
        }
        else if plane_index + 1 < self.roles.len() {
            Delivery::Expecting { plane: plane_index + 1, y: self.pass.start }
        }
        else {
            Delivery::PassComplete
        };
    }
}

impl<F> RowConsumer for TileRowSink<F> where F: FnMut(TileInfo, PlaneImage) -> UnitResult {
    fn begin_pass(&mut self, rows: Range<usize>) -> UnitResult {
        if self.delivery != Delivery::Idle && self.delivery != Delivery::PassComplete {
            return Err(Error::invalid("tile pass started before the previous pass was complete"));
        }

        if rows.start >= rows.end || rows.end > self.layout.image_size.height() {
            return Err(Error::invalid("tile pass rows out of bounds"));
        }

        self.delivery = Delivery::Expecting { plane: 0, y: rows.start };
        self.pass = rows;
        Ok(())
    }

    fn consume_row(&mut self, plane_index: usize, y: usize, row: &[u8]) -> UnitResult {
        match self.delivery {
            Delivery::Expecting { plane, y: expected_y } if plane == plane_index && expected_y == y => {},

            Delivery::Expecting { plane, y: expected_y } => return Err(Error::invalid(format!(
                "row {} of plane {} was delivered, expected row {} of plane {}",
                y, plane_index, expected_y, plane
            ))),

            _ => return Err(Error::invalid("row delivered outside of a tile pass")),
        }

        let width = self.layout.image_size.width();
        if row.len() < width {
            return Err(Error::invalid("row is narrower than the image"));
        }

        let tile_y = y / self.layout.tile_size.height();
        let last_plane = plane_index + 1 == self.roles.len();

        for tile_x in 0 .. self.layout.tile_count.width() {
            let index = Vec2(tile_x, tile_y);
            let (info, linear_index) = match (self.layout.tile(index), self.layout.linear_index(index)) {
                (Some(info), Some(linear_index)) => (info, linear_index),
                _ => return Err(Error::invalid("row is outside of the tile grid")),
            };

            let local_y = y - info.bounds.position.y();

            let roles = &self.roles;
            let tile = self.pending[linear_index]
                .get_or_insert_with(|| PlaneImage::new(info.bounds.size, roles));

            let start = info.bounds.position.x();
            let end = start + info.bounds.size.width();
            tile.planes[plane_index].row_mut(local_y).copy_from_slice(&row[start .. end]);

            if last_plane && local_y + 1 == info.bounds.size.height() {
                if let Some(planes) = self.pending[linear_index].take() {
                    (self.on_tile)(info, planes)?;
                }
            }
        }

        self.advance(plane_index, y);
        Ok(())
    }
}
