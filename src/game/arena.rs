use std::collections::HashSet;

use super::state::Point;

/// Wall cells around a `width` x `height` grid
///
/// Both horizontal edges are laid across x and both vertical edges across y,
/// so each corner is produced twice and collapses in the set.
pub fn create_rect(width: usize, height: usize) -> HashSet<Point> {
    let (w, h) = (width as i32, height as i32);
    let mut blocks = HashSet::with_capacity(2 * (width + height));

    for x in 0..w {
        blocks.insert(Point::new(x, 0));
        blocks.insert(Point::new(x, h - 1));
    }

    for y in 0..h {
        blocks.insert(Point::new(0, y));
        blocks.insert(Point::new(w - 1, y));
    }

    blocks
}

/// True for cells strictly inside the wall of a `width` x `height` grid
pub fn is_interior(p: Point, width: usize, height: usize) -> bool {
    p.x() >= 1 && p.y() >= 1 && p.x() <= width as i32 - 2 && p.y() <= height as i32 - 2
}
