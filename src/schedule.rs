//! Decides in which order the bands of a tiled image are decoded,
//! so that tiles near the visible region are completed first.

use std::sync::Mutex;
use crate::image::tiled::TileLayout;
use crate::math::{Rect, Vec2};


/// Orders tiles by their distance to a focus rectangle.
/// The focus may be moved from another thread while a decode is running.
#[derive(Debug)]
pub struct TileScheduler {
    layout: TileLayout,
    focus: Mutex<Option<Rect>>,
}

impl TileScheduler {

    /// A scheduler that focuses the image center until `set_focus` is called.
    pub fn new(layout: TileLayout) -> Self {
        TileScheduler { layout, focus: Mutex::new(None) }
    }

    /// The tile layout that is scheduled.
    pub fn layout(&self) -> TileLayout {
        self.layout
    }

    /// Move the focus to a region of the full image, usually the visible viewport.
    pub fn set_focus(&self, focus: Rect) {
        match self.focus.lock() {
            Ok(mut current) => *current = Some(focus),
            Err(poisoned) => *poisoned.into_inner() = Some(focus),
        }
    }

    /// The current focus, which is the whole image if none was set.
    pub fn focus(&self) -> Rect {
        let focus = match self.focus.lock() {
            Ok(focus) => *focus,
            Err(poisoned) => *poisoned.into_inner(),
        };

        focus.unwrap_or_else(|| Rect::new(Vec2(0, 0), self.layout.image_size))
    }

    /// The tile that contains the center of the focus.
    pub fn focus_tile(&self) -> Vec2<usize> {
        let center = self.focus().center();
        let layout = &self.layout;

        Vec2(
            (center.x() / layout.tile_size.width()).min(layout.tile_count.width() - 1),
            (center.y() / layout.tile_size.height()).min(layout.tile_count.height() - 1),
        )
    }

    /// Every band exactly once, in the order a spiral around the focus tile first reaches them.
    pub fn band_order(&self) -> Vec<usize> {
        let band_count = self.layout.band_count();
        let mut seen = vec![false; band_count];
        let mut order = Vec::with_capacity(band_count);

        walk_spiral(self.focus_tile(), self.layout.tile_count, |tile| {
            if !seen[tile.y()] {
                seen[tile.y()] = true;
                order.push(tile.y());
            }

            order.len() < band_count
        });

        order
    }

    /// Every tile exactly once, in spiral order around the focus tile.
    pub fn spiral_order(&self) -> Vec<Vec2<usize>> {
        let tile_count = self.layout.len();
        let mut order = Vec::with_capacity(tile_count);

        walk_spiral(self.focus_tile(), self.layout.tile_count, |tile| {
            order.push(tile);
            order.len() < tile_count
        });

        order
    }
}


/// Visit the grid positions of a square spiral that starts at `start`
/// and moves right, down, left, up, with the step length growing every two turns.
/// Positions outside the grid are skipped. Stops when `visit` returns false
/// or when the spiral has left the grid on all sides.
fn walk_spiral(start: Vec2<usize>, grid: Vec2<usize>, mut visit: impl FnMut(Vec2<usize>) -> bool) {
    const DIRECTIONS: [(isize, isize); 4] = [ (1, 0), (0, 1), (-1, 0), (0, -1) ];

    let inside = |x: isize, y: isize| x >= 0 && y >= 0 && (x as usize) < grid.width() && (y as usize) < grid.height();

    let (mut x, mut y) = (start.x() as isize, start.y() as isize);
    if inside(x, y) && !visit(Vec2(x as usize, y as usize)) {
        return;
    }

    let max_step = 2 * grid.width().max(grid.height()) + 1;
    let mut direction = 0;

    for step in 1 ..= max_step {
        for _ in 0 .. 2 {
            let (dx, dy) = DIRECTIONS[direction % 4];
            direction += 1;

            for _ in 0 .. step {
                x += dx;
                y += dy;

                if inside(x, y) && !visit(Vec2(x as usize, y as usize)) {
                    return;
                }
            }
        }
    }
}
