//! Grid coordinates, rectangles and the Chebyshev distance metric.
//!
//! The whole simulation measures distance as `max(|dcol|, |drow|)`: sight
//! disks, settlement windows, adjacency for attacks and the pathfinding
//! heuristic all share [`Coord::distance`].

use serde::{Deserialize, Serialize};

/// A tile coordinate. Columns grow east, rows grow south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column (x).
    pub col: i32,
    /// Row (y).
    pub row: i32,
}

/// 4-connected neighbor offsets: north, east, south, west.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

impl Coord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Offset this coordinate.
    #[must_use]
    pub const fn offset(self, dcol: i32, drow: i32) -> Self {
        Self::new(self.col + dcol, self.row + drow)
    }

    /// Chebyshev distance: `max(|dcol|, |drow|)`.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        self.col.abs_diff(other.col).max(self.row.abs_diff(other.row))
    }

    /// True when `other` is at Chebyshev distance exactly 1.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }

    /// The four orthogonal neighbors in N, E, S, W order (unclipped).
    #[must_use]
    pub fn neighbors(self) -> [Self; 4] {
        NEIGHBOR_OFFSETS.map(|(dc, dr)| self.offset(dc, dr))
    }

    /// All coordinates of the square of the given radius, in row-major order.
    pub fn square(self, radius: u32) -> impl Iterator<Item = Coord> {
        let r = radius as i32;
        (-r..=r).flat_map(move |dr| (-r..=r).map(move |dc| self.offset(dc, dr)))
    }

    /// The perimeter of the square at Chebyshev radius `radius`.
    ///
    /// Ring 0 is the coordinate itself. Larger rings are walked as: top row
    /// left to right, right column top to bottom, bottom row right to left,
    /// left column bottom to top. Every coordinate appears once.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Coord> {
        if radius == 0 {
            return vec![self];
        }
        let r = radius as i32;
        let mut out = Vec::with_capacity(8 * radius as usize);
        for dc in -r..=r {
            out.push(self.offset(dc, -r));
        }
        for dr in (-r + 1)..=r {
            out.push(self.offset(r, dr));
        }
        for dc in (-r..r).rev() {
            out.push(self.offset(dc, r));
        }
        for dr in ((-r + 1)..r).rev() {
            out.push(self.offset(-r, dr));
        }
        out
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// An inclusive rectangle of tiles. Used for map bounds and scout zones.
///
/// A rectangle with `min > max` on either axis is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left column (inclusive).
    pub min_col: i32,
    /// Top row (inclusive).
    pub min_row: i32,
    /// Right column (inclusive).
    pub max_col: i32,
    /// Bottom row (inclusive).
    pub max_row: i32,
}

impl Rect {
    /// Create a rectangle from inclusive corners.
    #[must_use]
    pub const fn new(min_col: i32, min_row: i32, max_col: i32, max_row: i32) -> Self {
        Self {
            min_col,
            min_row,
            max_col,
            max_row,
        }
    }

    /// Full map bounds for a `width x height` map.
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32 - 1, height as i32 - 1)
    }

    /// Width in tiles (0 when empty).
    #[must_use]
    pub fn width(&self) -> u32 {
        if self.max_col < self.min_col {
            0
        } else {
            (self.max_col - self.min_col + 1) as u32
        }
    }

    /// Height in tiles (0 when empty).
    #[must_use]
    pub fn height(&self) -> u32 {
        if self.max_row < self.min_row {
            0
        } else {
            (self.max_row - self.min_row + 1) as u32
        }
    }

    /// Number of tiles covered.
    #[must_use]
    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    /// True when the rectangle covers no tile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Check if a coordinate lies inside.
    #[must_use]
    pub fn contains(&self, c: Coord) -> bool {
        c.col >= self.min_col && c.col <= self.max_col && c.row >= self.min_row && c.row <= self.max_row
    }

    /// True when the two rectangles share no tile.
    #[must_use]
    pub fn is_disjoint(&self, other: &Rect) -> bool {
        self.is_empty()
            || other.is_empty()
            || self.max_col < other.min_col
            || other.max_col < self.min_col
            || self.max_row < other.min_row
            || other.max_row < self.min_row
    }

    /// Largest Chebyshev distance from `origin` to any corner.
    ///
    /// Ring expansion past this radius cannot hit the rectangle.
    #[must_use]
    pub fn max_distance_from(&self, origin: Coord) -> u32 {
        [
            Coord::new(self.min_col, self.min_row),
            Coord::new(self.max_col, self.min_row),
            Coord::new(self.min_col, self.max_row),
            Coord::new(self.max_col, self.max_row),
        ]
        .into_iter()
        .map(|corner| origin.distance(corner))
        .max()
        .unwrap_or(0)
    }

    /// Center tile (rounded toward the top-left).
    #[must_use]
    pub fn center(&self) -> Coord {
        Coord::new(
            self.min_col + (self.max_col - self.min_col) / 2,
            self.min_row + (self.max_row - self.min_row) / 2,
        )
    }

    /// Iterate all coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Coord> {
        let Rect {
            min_col,
            min_row,
            max_col,
            max_row,
        } = *self;
        (min_row..=max_row).flat_map(move |row| (min_col..=max_col).map(move |col| Coord::new(col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_distance() {
        let a = Coord::new(0, 0);
        assert_eq!(a.distance(Coord::new(5, 5)), 5);
        assert_eq!(a.distance(Coord::new(3, 7)), 7);
        assert_eq!(a.distance(a), 0);
        assert_eq!(Coord::new(10, 10).distance(Coord::new(10, 13)), 3);
    }

    #[test]
    fn test_neighbors_are_orthogonal() {
        let n = Coord::new(2, 2).neighbors();
        assert_eq!(n, [Coord::new(2, 1), Coord::new(3, 2), Coord::new(2, 3), Coord::new(1, 2)]);
    }

    #[test]
    fn test_ring_order_and_size() {
        let origin = Coord::new(0, 0);
        assert_eq!(origin.ring(0), vec![origin]);

        let ring = origin.ring(1);
        assert_eq!(ring.len(), 8);
        assert_eq!(ring[0], Coord::new(-1, -1));
        assert_eq!(ring[2], Coord::new(1, -1));
        assert_eq!(ring[4], Coord::new(1, 1));
        assert_eq!(ring[6], Coord::new(-1, 1));
        assert_eq!(ring[7], Coord::new(-1, 0));

        let ring3 = origin.ring(3);
        assert_eq!(ring3.len(), 24);
        assert!(ring3.iter().all(|c| origin.distance(*c) == 3));
        let mut dedup = ring3.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 24);
    }

    #[test]
    fn test_square_is_row_major() {
        let sq: Vec<_> = Coord::new(5, 5).square(1).collect();
        assert_eq!(sq.len(), 9);
        assert_eq!(sq[0], Coord::new(4, 4));
        assert_eq!(sq[1], Coord::new(5, 4));
        assert_eq!(sq[8], Coord::new(6, 6));
    }

    #[test]
    fn test_rect_geometry() {
        let r = Rect::from_size(40, 20);
        assert_eq!(r.width(), 40);
        assert_eq!(r.height(), 20);
        assert_eq!(r.area(), 800);
        assert!(r.contains(Coord::new(39, 19)));
        assert!(!r.contains(Coord::new(40, 0)));
        assert_eq!(r.max_distance_from(Coord::new(0, 0)), 39);

        let empty = Rect::new(5, 0, 4, 9);
        assert!(empty.is_empty());
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_rect_disjoint() {
        let a = Rect::new(0, 0, 9, 39);
        let b = Rect::new(10, 0, 19, 39);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&Rect::new(9, 0, 12, 3)));
    }
}
