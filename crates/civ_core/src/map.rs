//! Tiles and the world map.
//!
//! [`TileLookup`] is the boundary the AI queries go through; [`GameMap`] is
//! the in-process implementation.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::{Coord, Rect};

/// Terrain classification for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open fertile land.
    #[default]
    Grassland,
    /// Balanced open land.
    Plains,
    /// Arid land.
    Desert,
    /// Cold land.
    Tundra,
    /// Wooded land, slow to cross.
    Forest,
    /// Rough elevated land, slow to cross.
    Hills,
    /// Very rough land, slow to cross and never settled.
    Mountain,
    /// Wetland, slow to cross.
    Swamp,
    /// Dense tropical growth, slow to cross.
    Jungle,
    /// Deep water.
    Ocean,
    /// Inland water.
    Lake,
}

impl TerrainKind {
    /// All terrain kinds, in declaration order.
    pub const ALL: [TerrainKind; 11] = [
        Self::Grassland,
        Self::Plains,
        Self::Desert,
        Self::Tundra,
        Self::Forest,
        Self::Hills,
        Self::Mountain,
        Self::Swamp,
        Self::Jungle,
        Self::Ocean,
        Self::Lake,
    ];

    /// True for ocean and lake tiles.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Ocean | Self::Lake)
    }

    /// Single-character glyph for ASCII dumps.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Grassland => '.',
            Self::Plains => ',',
            Self::Desert => ':',
            Self::Tundra => '_',
            Self::Forest => 'f',
            Self::Hills => 'h',
            Self::Mountain => '^',
            Self::Swamp => 's',
            Self::Jungle => 'j',
            Self::Ocean => '~',
            Self::Lake => '-',
        }
    }
}

/// Special resource on a tile. Any resource doubles the tile's base yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Food bonus on open land.
    Wheat,
    /// Grazing bonus.
    Horses,
    /// Precious metal.
    Gold,
    /// Sea food.
    Fish,
    /// Forest game.
    Game,
}

/// Worker-built tile improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Improvement {
    /// +1 food.
    Irrigation,
    /// +1 shield.
    Mine,
    /// +1 trade.
    Road,
}

/// A single map tile. The coordinate is fixed; resource and improvement can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Tile position.
    pub coord: Coord,
    /// Terrain type.
    pub terrain: TerrainKind,
    /// Optional special resource.
    pub resource: Option<Resource>,
    /// Optional improvement.
    pub improvement: Option<Improvement>,
}

impl Tile {
    /// A bare tile of the given terrain.
    #[must_use]
    pub const fn new(coord: Coord, terrain: TerrainKind) -> Self {
        Self {
            coord,
            terrain,
            resource: None,
            improvement: None,
        }
    }
}

/// Read access to map tiles.
pub trait TileLookup {
    /// Tile at `coord`, or `None` when off the map.
    fn tile(&self, coord: Coord) -> Option<&Tile>;

    /// Map bounds.
    fn bounds(&self) -> Rect;
}

/// Rectangular tile map stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl GameMap {
    /// Create a map filled with one terrain.
    ///
    /// Fails for a zero-sized map: nothing downstream can run without tiles.
    pub fn filled(width: u32, height: u32, terrain: TerrainKind) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::MissingMap(format!(
                "map must have positive size, got {width}x{height}"
            )));
        }
        let tiles = Rect::from_size(width, height)
            .iter()
            .map(|c| Tile::new(c, terrain))
            .collect();
        Ok(Self { width, height, tiles })
    }

    /// Build a map from rows of terrain (row 0 first).
    ///
    /// All rows must have the same, non-zero length.
    pub fn from_rows(rows: &[Vec<TerrainKind>]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len() as u32);
        if width == 0 || height == 0 {
            return Err(GameError::MissingMap("empty terrain rows".into()));
        }
        if rows.iter().any(|r| r.len() as u32 != width) {
            return Err(GameError::InvalidConfig("ragged terrain rows".into()));
        }
        let tiles = rows
            .iter()
            .enumerate()
            .flat_map(|(row, kinds)| {
                kinds
                    .iter()
                    .enumerate()
                    .map(move |(col, &kind)| Tile::new(Coord::new(col as i32, row as i32), kind))
            })
            .collect();
        Ok(Self { width, height, tiles })
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of tiles.
    #[must_use]
    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    #[inline]
    fn index(&self, c: Coord) -> Option<usize> {
        if c.col < 0 || c.row < 0 || c.col as u32 >= self.width || c.row as u32 >= self.height {
            None
        } else {
            Some(c.row as usize * self.width as usize + c.col as usize)
        }
    }

    /// Mutable tile access.
    pub fn tile_mut(&mut self, c: Coord) -> Option<&mut Tile> {
        let idx = self.index(c)?;
        self.tiles.get_mut(idx)
    }

    /// Set terrain at a coordinate. Returns `false` when out of bounds.
    pub fn set_terrain(&mut self, c: Coord, terrain: TerrainKind) -> bool {
        match self.tile_mut(c) {
            Some(tile) => {
                tile.terrain = terrain;
                true
            }
            None => false,
        }
    }

    /// Set or clear a resource. Returns `false` when out of bounds.
    pub fn set_resource(&mut self, c: Coord, resource: Option<Resource>) -> bool {
        match self.tile_mut(c) {
            Some(tile) => {
                tile.resource = resource;
                true
            }
            None => false,
        }
    }

    /// Terrain at a coordinate.
    #[must_use]
    pub fn terrain(&self, c: Coord) -> Option<TerrainKind> {
        self.tile(c).map(|t| t.terrain)
    }

    /// True when the tile or any of its 8 neighbors is water.
    #[must_use]
    pub fn has_water_access(&self, c: Coord) -> bool {
        c.square(1)
            .filter_map(|n| self.terrain(n))
            .any(TerrainKind::is_water)
    }

    /// Iterate all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }
}

impl TileLookup for GameMap {
    fn tile(&self, coord: Coord) -> Option<&Tile> {
        self.index(coord).and_then(|i| self.tiles.get(i))
    }

    fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}
