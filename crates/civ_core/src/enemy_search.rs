//! Enemy discovery under fog of war.
//!
//! [`find_nearest_enemy`] walks square rings outward from the origin and
//! only looks at tiles the caller reports as visible. Cities outrank units.
//! Once a city is known, the scan stops as soon as it reaches past radius
//! [`CITY_SHORT_CIRCUIT_RADIUS`]: a city that far out is close enough and
//! a marginally nearer one is not worth the extra rings.

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::grid::{Coord, Rect};
use crate::world::{EntityRef, OccupantLookup};

/// Past this radius an already found city ends the scan.
pub const CITY_SHORT_CIRCUIT_RADIUS: u32 = 5;

/// What was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// A city.
    City,
    /// A unit.
    Unit,
}

impl std::fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::City => "city",
            Self::Unit => "unit",
        })
    }
}

/// A located enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySighting {
    /// Tile.
    pub coord: Coord,
    /// Chebyshev distance from the search origin.
    pub distance: u32,
    /// City or unit.
    pub kind: EnemyKind,
    /// Entity found.
    pub id: EntityRef,
    /// Its owner.
    pub owner: CivId,
}

fn city_sighting<O: OccupantLookup>(occupants: &O, origin: Coord, c: Coord, me: CivId) -> Option<EnemySighting> {
    occupants
        .city_at(c)
        .filter(|(owner, _)| *owner != me)
        .map(|(owner, id)| EnemySighting {
            coord: c,
            distance: origin.distance(c),
            kind: EnemyKind::City,
            id: EntityRef::City(id),
            owner,
        })
}

/// Nearest visible enemy of `me` around `origin` on a map covering
/// `bounds`. See [`find_nearest_enemy_in_zone`].
pub fn find_nearest_enemy<O, V>(
    origin: Coord,
    bounds: Rect,
    occupants: &O,
    is_visible: V,
    me: CivId,
    max_radius: Option<u32>,
) -> Option<EnemySighting>
where
    O: OccupantLookup,
    V: Fn(Coord) -> bool,
{
    find_nearest_enemy_in_zone(origin, bounds, bounds, occupants, is_visible, me, max_radius)
}

/// Nearest visible enemy of `me` around `origin`, looking only inside
/// `zone` (clipped to `map`).
///
/// Rings are walked in the order of [`Coord::ring`]. The scan gives up
/// after inspecting more than half of the tiles of the whole `map`, and
/// never looks past `max_radius` when one is given. Returns the first
/// city found, else the first unit found.
pub fn find_nearest_enemy_in_zone<O, V>(
    origin: Coord,
    map: Rect,
    zone: Rect,
    occupants: &O,
    is_visible: V,
    me: CivId,
    max_radius: Option<u32>,
) -> Option<EnemySighting>
where
    O: OccupantLookup,
    V: Fn(Coord) -> bool,
{
    let cap = map.area() / 2;
    let mut reach = zone.max_distance_from(origin);
    if let Some(limit) = max_radius {
        reach = reach.min(limit);
    }

    let mut inspected = 0u32;
    let mut city: Option<EnemySighting> = None;
    let mut unit: Option<EnemySighting> = None;

    'rings: for radius in 0..=reach {
        for c in origin.ring(radius) {
            if !zone.contains(c) || !map.contains(c) {
                continue;
            }
            inspected += 1;
            if inspected > cap {
                break 'rings;
            }
            if city.is_some() && radius > CITY_SHORT_CIRCUIT_RADIUS {
                break 'rings;
            }
            if !is_visible(c) {
                continue;
            }

            if let Some(found) = city_sighting(occupants, origin, c, me) {
                if city.is_none() {
                    city = Some(found);
                }
                if radius > CITY_SHORT_CIRCUIT_RADIUS {
                    break 'rings;
                }
            } else if unit.is_none() {
                unit = occupants.foreign_unit_at(c, me).map(|(owner, id)| EnemySighting {
                    coord: c,
                    distance: radius,
                    kind: EnemyKind::Unit,
                    id: EntityRef::Unit(id),
                    owner,
                });
            }
        }
    }

    city.or(unit)
}

/// Every visible enemy within `radius`, cities first, then nearest first.
///
/// Ties keep row-major scan order.
pub fn find_all_enemies_in_radius<O, V>(
    origin: Coord,
    bounds: Rect,
    occupants: &O,
    is_visible: V,
    me: CivId,
    radius: u32,
) -> Vec<EnemySighting>
where
    O: OccupantLookup,
    V: Fn(Coord) -> bool,
{
    let mut found = Vec::new();
    for c in origin.square(radius) {
        if !bounds.contains(c) || !is_visible(c) {
            continue;
        }
        if let Some(city) = city_sighting(occupants, origin, c, me) {
            found.push(city);
        }
        for (owner, id) in occupants.foreign_units_at(c, me) {
            found.push(EnemySighting {
                coord: c,
                distance: origin.distance(c),
                kind: EnemyKind::Unit,
                id: EntityRef::Unit(id),
                owner,
            });
        }
    }
    found.sort_by_key(|s| (s.kind, s.distance));
    found
}

/// Split a `width x height` map into `n` disjoint scout zones.
///
/// With `n <= width` the map is cut into vertical strips
/// `ceil(width / n)` wide; otherwise into a `g x g` grid of cells with
/// `g = ceil(sqrt(n))`, keeping the first `n` in row-major order. Zones
/// past the map edge come back empty. Always returns exactly `n` zones.
#[must_use]
pub fn calculate_scout_zones(n: u32, width: u32, height: u32) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }
    let clip = |min_col: u32, min_row: u32, w: u32, h: u32| {
        let max_col = (min_col + w).min(width) as i32 - 1;
        let max_row = (min_row + h).min(height) as i32 - 1;
        Rect::new(min_col as i32, min_row as i32, max_col, max_row)
    };

    if n <= width {
        let strip = width.div_ceil(n);
        return (0..n).map(|i| clip(i * strip, 0, strip, height)).collect();
    }

    let mut side = 1u32;
    while side * side < n {
        side += 1;
    }
    let cell_w = width.div_ceil(side);
    let cell_h = height.div_ceil(side);
    (0..side)
        .flat_map(|r| (0..side).map(move |c| (c, r)))
        .take(n as usize)
        .map(|(c, r)| clip(c * cell_w, r * cell_h, cell_w, cell_h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;
    use crate::rules::Rules;
    use crate::unit::{Unit, UnitKind};
    use crate::world::World;

    fn unit(world: &mut World, civ: u8, c: Coord) {
        let rules = Rules::default();
        world.insert_unit(Unit::from_rule(CivId(civ), UnitKind::Warrior, c, rules.unit(UnitKind::Warrior)));
    }

    #[test]
    fn test_city_found_in_sight() {
        let mut world = World::new();
        world.insert_city(City::new(CivId(1), "Thebes", Coord::new(10, 13)));

        let found = find_nearest_enemy(Coord::new(10, 10), Rect::from_size(20, 20), &world, |_| true, CivId(0), None);
        let found = found.expect("city should be found");
        assert_eq!(found.coord, Coord::new(10, 13));
        assert_eq!(found.distance, 3);
        assert_eq!(found.kind, EnemyKind::City);
        assert_eq!(found.owner, CivId(1));
    }

    #[test]
    fn test_invisible_enemies_are_ignored() {
        let mut world = World::new();
        world.insert_city(City::new(CivId(1), "Thebes", Coord::new(10, 13)));
        let found = find_nearest_enemy(
            Coord::new(10, 10),
            Rect::from_size(20, 20),
            &world,
            |c: Coord| c.row < 12,
            CivId(0),
            None,
        );
        assert!(found.is_none());
    }

    #[test]
    fn test_city_outranks_nearer_unit() {
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(10, 11));
        world.insert_city(City::new(CivId(1), "Thebes", Coord::new(10, 14)));
        let found = find_nearest_enemy(Coord::new(10, 10), Rect::from_size(20, 20), &world, |_| true, CivId(0), None);
        assert_eq!(found.map(|f| f.kind), Some(EnemyKind::City));
    }

    #[test]
    fn test_own_entities_are_not_enemies() {
        let mut world = World::new();
        unit(&mut world, 0, Coord::new(11, 10));
        world.insert_city(City::new(CivId(0), "Ur", Coord::new(12, 12)));
        let found = find_nearest_enemy(Coord::new(10, 10), Rect::from_size(20, 20), &world, |_| true, CivId(0), None);
        assert!(found.is_none());
    }

    #[test]
    fn test_max_radius_is_respected() {
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(10, 16));
        let bounds = Rect::from_size(20, 20);
        assert!(find_nearest_enemy(Coord::new(10, 10), bounds, &world, |_| true, CivId(0), Some(5)).is_none());
        assert!(find_nearest_enemy(Coord::new(10, 10), bounds, &world, |_| true, CivId(0), Some(6)).is_some());
    }

    #[test]
    fn test_far_city_ends_scan_at_first_hit() {
        // Two cities on ring 7: the one visited first in ring order wins
        let mut world = World::new();
        world.insert_city(City::new(CivId(1), "A", Coord::new(3, 3)));
        world.insert_city(City::new(CivId(2), "B", Coord::new(17, 17)));
        let found = find_nearest_enemy(Coord::new(10, 10), Rect::from_size(40, 40), &world, |_| true, CivId(0), None);
        assert_eq!(found.map(|f| f.coord), Some(Coord::new(3, 3)));
    }

    #[test]
    fn test_zone_bounds_restrict_search() {
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(25, 10));
        let zone = Rect::new(0, 0, 19, 39);
        assert!(find_nearest_enemy(Coord::new(10, 10), zone, &world, |_| true, CivId(0), None).is_none());
    }

    #[test]
    fn test_scan_cap_counts_the_whole_map() {
        // A 4-wide strip of a 40x40 map: the enemy sits past half the
        // strip's tiles but well inside half the map's
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(1, 30));
        let map = Rect::from_size(40, 40);
        let zone = Rect::new(0, 0, 3, 39);
        assert!(find_nearest_enemy(Coord::new(1, 1), zone, &world, |_| true, CivId(0), None).is_none());

        let found = find_nearest_enemy_in_zone(Coord::new(1, 1), map, zone, &world, |_| true, CivId(0), None);
        assert_eq!(found.map(|f| (f.coord, f.distance)), Some((Coord::new(1, 30), 29)));
    }

    #[test]
    fn test_zone_clipped_to_map() {
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(12, 2));
        let map = Rect::from_size(10, 10);
        let zone = Rect::new(5, 0, 14, 9);
        assert!(find_nearest_enemy_in_zone(Coord::new(6, 2), map, zone, &world, |_| true, CivId(0), None).is_none());
    }

    #[test]
    fn test_all_enemies_sorted_city_first() {
        let mut world = World::new();
        unit(&mut world, 1, Coord::new(5, 6));
        unit(&mut world, 1, Coord::new(5, 8));
        world.insert_city(City::new(CivId(1), "Thebes", Coord::new(8, 5)));
        let all = find_all_enemies_in_radius(Coord::new(5, 5), Rect::from_size(20, 20), &world, |_| true, CivId(0), 4);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].kind, EnemyKind::City);
        assert_eq!(all[1].coord, Coord::new(5, 6));
        assert_eq!(all[2].coord, Coord::new(5, 8));
    }

    #[test]
    fn test_scout_zones_as_strips() {
        let zones = calculate_scout_zones(4, 40, 40);
        assert_eq!(
            zones,
            vec![
                Rect::new(0, 0, 9, 39),
                Rect::new(10, 0, 19, 39),
                Rect::new(20, 0, 29, 39),
                Rect::new(30, 0, 39, 39),
            ]
        );
    }

    #[test]
    fn test_scout_zones_as_grid() {
        let zones = calculate_scout_zones(5, 4, 9);
        assert_eq!(zones.len(), 5);
        // 3x3 grid of 2x3 cells clipped to the 4-wide map
        assert_eq!(zones[0], Rect::new(0, 0, 1, 2));
        assert_eq!(zones[1], Rect::new(2, 0, 3, 2));
        assert!(zones[2].is_empty());
        assert_eq!(zones[3], Rect::new(0, 3, 1, 5));
        for (i, a) in zones.iter().enumerate() {
            for b in &zones[i + 1..] {
                assert!(a.is_disjoint(b));
            }
        }
    }

    #[test]
    fn test_scout_zones_edge_cases() {
        assert!(calculate_scout_zones(0, 10, 10).is_empty());
        let zones = calculate_scout_zones(3, 4, 4);
        assert_eq!(zones[0], Rect::new(0, 0, 1, 3));
        assert_eq!(zones[1], Rect::new(2, 0, 3, 3));
        assert!(zones[2].is_empty());
    }
}
