//! Procedural map generation.
//!
//! Generates playable maps with:
//! - An ocean border around a land mass
//! - Forest, hill, mountain and lake features
//! - Bonus resources
//! - Spawn points with a clear start area per civilization
//!
//! Generation is a pure function of the configuration: the same seed
//! always produces the same map.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::{Coord, Rect};
use crate::map::{GameMap, Resource, TerrainKind, TileLookup};

/// Radius around a spawn point kept free of features.
pub const SPAWN_SAFE_RADIUS: u32 = 2;

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapGenConfig {
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Random seed for deterministic generation.
    pub seed: u64,
    /// Feature density (0.0 = open plains, 1.0 = very rugged).
    pub feature_density: f32,
    /// Resource density multiplier.
    pub resource_density: f32,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            seed: 12345,
            feature_density: 0.3,
            resource_density: 1.0,
        }
    }
}

impl MapGenConfig {
    /// Default settings at the given size.
    #[must_use]
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set feature density.
    #[must_use]
    pub fn with_feature_density(mut self, density: f32) -> Self {
        self.feature_density = density.clamp(0.0, 1.0);
        self
    }
}

/// Generated map data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMap {
    /// Configuration used.
    pub config: MapGenConfig,
    /// The terrain.
    pub map: GameMap,
    /// One start tile per civilization, in slot order.
    pub spawn_points: Vec<Coord>,
}

/// Simple deterministic RNG for map generation.
struct MapRng {
    state: u64,
}

impl MapRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(0x5_DEEC_E66D).wrapping_add(11);
        // Low bits of the LCG cycle quickly
        self.state >> 16
    }

    fn next_f32(&mut self) -> f32 {
        (self.next() % 10000) as f32 / 10000.0
    }

    fn next_range(&mut self, min: i32, max: i32) -> i32 {
        let range = (max - min) as u64;
        if range == 0 {
            return min;
        }
        min + (self.next() % range) as i32
    }
}

/// Generate a map for `civ_count` civilizations.
///
/// Fails when the map is too small to hold a border plus one start area
/// per civilization.
pub fn generate_map(config: &MapGenConfig, civ_count: usize) -> Result<GeneratedMap> {
    if civ_count == 0 {
        return Err(GameError::InvalidConfig("map generation needs at least one civilization".into()));
    }
    if config.width < 8 || config.height < 8 {
        return Err(GameError::InvalidConfig(format!(
            "map {}x{} is too small, need at least 8x8",
            config.width, config.height
        )));
    }
    let interior_width = config.width - 2;
    if (interior_width as usize) < civ_count * 3 {
        return Err(GameError::InvalidConfig(format!(
            "map width {} cannot fit {civ_count} civilizations",
            config.width
        )));
    }

    let mut rng = MapRng::new(config.seed);
    let mut map = GameMap::filled(config.width, config.height, TerrainKind::Grassland)?;
    let bounds = map.bounds();
    let interior = Rect::new(1, 1, config.width as i32 - 2, config.height as i32 - 2);

    for c in bounds.iter() {
        let terrain = if interior.contains(c) {
            base_terrain(&mut rng, c.row, config.height)
        } else {
            TerrainKind::Ocean
        };
        map.set_terrain(c, terrain);
    }

    // Spawn points first so the safe zones stay clear
    let spawn_points = generate_spawn_points(interior, civ_count, &mut rng);
    let is_safe = |c: Coord| spawn_points.iter().any(|s| s.distance(c) <= SPAWN_SAFE_RADIUS);

    generate_features(config, interior, &mut map, &mut rng, &is_safe);

    for spawn in &spawn_points {
        for c in spawn.square(1) {
            if interior.contains(c) {
                map.set_terrain(c, TerrainKind::Grassland);
            }
        }
    }

    generate_resources(config, &mut map, &mut rng, &spawn_points);

    tracing::debug!(
        width = config.width,
        height = config.height,
        seed = config.seed,
        civs = civ_count,
        "map generated"
    );

    Ok(GeneratedMap {
        config: config.clone(),
        map,
        spawn_points,
    })
}

/// Latitude-flavoured open terrain.
fn base_terrain(rng: &mut MapRng, row: i32, height: u32) -> TerrainKind {
    let edge = row.min(height as i32 - 1 - row);
    if edge <= 1 && rng.next_f32() < 0.6 {
        return TerrainKind::Tundra;
    }
    let roll = rng.next_f32();
    if roll < 0.5 {
        TerrainKind::Grassland
    } else if roll < 0.85 {
        TerrainKind::Plains
    } else if roll < 0.95 {
        TerrainKind::Desert
    } else {
        TerrainKind::Swamp
    }
}

/// One start tile per civilization: the interior is split into vertical
/// strips and each civilization starts near the middle of its strip.
fn generate_spawn_points(interior: Rect, count: usize, rng: &mut MapRng) -> Vec<Coord> {
    let strip = interior.width() / count as u32;
    let mid_row = interior.min_row + interior.height() as i32 / 2;
    let jitter = (interior.height() as i32 / 4).max(1);
    (0..count)
        .map(|i| {
            let col = interior.min_col + (strip * i as u32 + strip / 2) as i32;
            let row = mid_row + rng.next_range(-jitter, jitter + 1);
            Coord::new(col, row.clamp(interior.min_row + 1, interior.max_row - 1))
        })
        .collect()
}

fn generate_features(
    config: &MapGenConfig,
    interior: Rect,
    map: &mut GameMap,
    rng: &mut MapRng,
    is_safe: &dyn Fn(Coord) -> bool,
) {
    let target = interior.area() as f32 * config.feature_density * 0.12;
    let num_features = target.round() as u32;

    for _ in 0..num_features {
        let origin = Coord::new(
            rng.next_range(interior.min_col, interior.max_col + 1),
            rng.next_range(interior.min_row, interior.max_row + 1),
        );
        if is_safe(origin) {
            continue;
        }

        let mut paint = |c: Coord, terrain: TerrainKind| {
            if interior.contains(c) && !is_safe(c) {
                map.set_terrain(c, terrain);
            }
        };

        match rng.next() % 5 {
            0 | 1 => {
                // Forest patch
                let size = rng.next_range(2, 4);
                let terrain = if origin.row > interior.center().row && rng.next() % 3 == 0 {
                    TerrainKind::Jungle
                } else {
                    TerrainKind::Forest
                };
                for dy in 0..size {
                    for dx in 0..size {
                        paint(origin.offset(dx, dy), terrain);
                    }
                }
            }
            2 => {
                // Hills
                let size = rng.next_range(1, 3);
                for dy in 0..size {
                    for dx in 0..size {
                        paint(origin.offset(dx, dy), TerrainKind::Hills);
                    }
                }
            }
            3 => {
                // Mountain ridge with a pass
                let horizontal = rng.next() % 2 == 0;
                let length = rng.next_range(3, 6);
                let gap = rng.next_range(1, length - 1);
                for i in 0..length {
                    let c = if horizontal { origin.offset(i, 0) } else { origin.offset(0, i) };
                    let terrain = if i == gap { TerrainKind::Hills } else { TerrainKind::Mountain };
                    paint(c, terrain);
                }
            }
            _ => {
                // Lake
                paint(origin, TerrainKind::Lake);
                if rng.next() % 2 == 0 {
                    paint(origin.offset(1, 0), TerrainKind::Lake);
                }
            }
        }
    }
}

fn generate_resources(config: &MapGenConfig, map: &mut GameMap, rng: &mut MapRng, spawn_points: &[Coord]) {
    let chance = 0.06 * config.resource_density;
    let coords: Vec<Coord> = map.bounds().iter().collect();
    for c in coords {
        if spawn_points.contains(&c) || rng.next_f32() >= chance {
            continue;
        }
        let Some(terrain) = map.terrain(c) else {
            continue;
        };
        let resource = match terrain {
            TerrainKind::Grassland | TerrainKind::Plains => {
                if rng.next() % 3 == 0 {
                    Some(Resource::Horses)
                } else {
                    Some(Resource::Wheat)
                }
            }
            TerrainKind::Hills | TerrainKind::Mountain | TerrainKind::Desert => Some(Resource::Gold),
            TerrainKind::Forest | TerrainKind::Jungle => Some(Resource::Game),
            TerrainKind::Ocean | TerrainKind::Lake => Some(Resource::Fish),
            TerrainKind::Tundra | TerrainKind::Swamp => None,
        };
        map.set_resource(c, resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let config = MapGenConfig::sized(24, 18).with_seed(42);
        let a = generate_map(&config, 2).unwrap();
        let b = generate_map(&config, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds() {
        let a = generate_map(&MapGenConfig::sized(30, 30).with_seed(1), 2).unwrap();
        let b = generate_map(&MapGenConfig::sized(30, 30).with_seed(2), 2).unwrap();
        assert_ne!(a.map, b.map);
    }

    #[test]
    fn test_default_config() {
        let config = MapGenConfig::default();
        assert_eq!((config.width, config.height), (20, 20));
        assert!(config.feature_density > 0.0);
    }

    #[test]
    fn test_border_is_ocean() {
        let generated = generate_map(&MapGenConfig::default(), 2).unwrap();
        let map = &generated.map;
        for c in map.bounds().iter() {
            let on_edge = c.col == 0 || c.row == 0 || c.col == 19 || c.row == 19;
            if on_edge {
                assert_eq!(map.terrain(c), Some(TerrainKind::Ocean), "{c:?}");
            }
        }
    }

    #[test]
    fn test_spawn_areas_are_clear_land() {
        for seed in 0..20 {
            let generated = generate_map(&MapGenConfig::sized(32, 20).with_seed(seed).with_feature_density(1.0), 3).unwrap();
            assert_eq!(generated.spawn_points.len(), 3);
            for spawn in &generated.spawn_points {
                for c in spawn.square(1) {
                    assert_eq!(generated.map.terrain(c), Some(TerrainKind::Grassland), "seed {seed} at {c:?}");
                }
            }
            let [a, b, c] = [generated.spawn_points[0], generated.spawn_points[1], generated.spawn_points[2]];
            assert!(a.distance(b) >= 3 && b.distance(c) >= 3);
        }
    }

    #[test]
    fn test_rejects_tiny_maps() {
        assert!(generate_map(&MapGenConfig::sized(5, 5), 2).is_err());
        assert!(generate_map(&MapGenConfig::sized(10, 10), 4).is_err());
        assert!(generate_map(&MapGenConfig::default(), 0).is_err());
    }
}
