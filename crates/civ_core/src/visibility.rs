//! Per-civilization fog of war and enemy intel.
//!
//! Each civilization owns a [`VisibilityStore`]: a `visible` bitmap that is
//! rebuilt on every pass, a monotonic `explored` bitmap, the intel table of
//! enemy sightings and its scout zones. [`FogOfWar`] holds the stores and
//! the debug `reveal_all` switch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::enemy_search::EnemyKind;
use crate::grid::{Coord, Rect};
use crate::unit::UnitId;
use crate::world::{EntityRef, World};

/// Fixed-size bit grid in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitGrid {
    width: u32,
    height: u32,
    words: Vec<u64>,
}

impl BitGrid {
    /// All-clear grid.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let bits = width as usize * height as usize;
        Self {
            width,
            height,
            words: vec![0; bits.div_ceil(64)],
        }
    }

    fn index(&self, c: Coord) -> Option<usize> {
        if c.col < 0 || c.row < 0 || c.col as u32 >= self.width || c.row as u32 >= self.height {
            None
        } else {
            Some(c.row as usize * self.width as usize + c.col as usize)
        }
    }

    /// Read a bit; out-of-range coordinates read as clear.
    #[must_use]
    pub fn get(&self, c: Coord) -> bool {
        self.index(c)
            .is_some_and(|i| self.words[i / 64] & (1 << (i % 64)) != 0)
    }

    /// Set a bit; out-of-range coordinates are ignored.
    pub fn set(&mut self, c: Coord) {
        if let Some(i) = self.index(c) {
            self.words[i / 64] |= 1 << (i % 64);
        }
    }

    /// Clear every bit.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }
}

/// A remembered enemy sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelRecord {
    /// Where it was seen.
    pub coord: Coord,
    /// City or unit.
    pub kind: EnemyKind,
    /// Which entity.
    pub id: EntityRef,
    /// Round of first sighting.
    pub discovered_round: u32,
    /// Round of latest sighting.
    pub last_seen_round: u32,
}

/// One observation to merge into the intel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Where it was seen.
    pub coord: Coord,
    /// City or unit.
    pub kind: EnemyKind,
    /// Which entity.
    pub id: EntityRef,
}

/// Result of [`FogOfWar::record_enemy_location`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelUpdate {
    /// The entity was not known before.
    Inserted,
    /// The entity was known; its sighting was refreshed.
    Refreshed,
}

/// What one civilization knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityStore {
    visible: BitGrid,
    explored: BitGrid,
    enemy_intel: BTreeMap<CivId, Vec<IntelRecord>>,
    scout_zones: Vec<Rect>,
    zone_assignments: BTreeMap<UnitId, usize>,
    zones_valid: bool,
}

impl VisibilityStore {
    /// Empty store for a map of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            visible: BitGrid::new(width, height),
            explored: BitGrid::new(width, height),
            enemy_intel: BTreeMap::new(),
            scout_zones: Vec::new(),
            zone_assignments: BTreeMap::new(),
            zones_valid: false,
        }
    }

    /// Number of tiles ever seen.
    #[must_use]
    pub fn explored_count(&self) -> u32 {
        self.explored.count()
    }

    /// Number of tiles currently seen.
    #[must_use]
    pub fn visible_count(&self) -> u32 {
        self.visible.count()
    }

    fn reveal_disk(&mut self, center: Coord, radius: u32) {
        for c in center.square(radius) {
            self.visible.set(c);
            self.explored.set(c);
        }
    }
}

/// Visibility stores for every civilization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogOfWar {
    width: u32,
    height: u32,
    stores: BTreeMap<CivId, VisibilityStore>,
    reveal_all: bool,
}

impl FogOfWar {
    /// Create empty stores for `civs` on a `width x height` map.
    #[must_use]
    pub fn new(width: u32, height: u32, civs: impl IntoIterator<Item = CivId>) -> Self {
        Self {
            width,
            height,
            stores: civs
                .into_iter()
                .map(|civ| (civ, VisibilityStore::new(width, height)))
                .collect(),
            reveal_all: false,
        }
    }

    /// Debug switch: when on, every in-bounds tile reads as visible and explored.
    ///
    /// The bitmaps are left untouched.
    pub fn set_reveal_all(&mut self, reveal_all: bool) {
        self.reveal_all = reveal_all;
    }

    /// Whether the debug reveal is on.
    #[must_use]
    pub const fn reveal_all(&self) -> bool {
        self.reveal_all
    }

    /// Store for a civilization.
    #[must_use]
    pub fn store(&self, civ: CivId) -> Option<&VisibilityStore> {
        self.stores.get(&civ)
    }

    fn in_bounds(&self, c: Coord) -> bool {
        Rect::from_size(self.width, self.height).contains(c)
    }

    /// Rebuild `visible` for `civ` from its units and cities.
    ///
    /// Each unit reveals a disk of its sight radius, each city one of
    /// `city_sight`. Revealed tiles are also marked explored.
    pub fn recompute(&mut self, civ: CivId, world: &World, city_sight: u32) {
        let Some(store) = self.stores.get_mut(&civ) else {
            return;
        };
        store.visible.clear();
        for unit in world.units_of(civ) {
            store.reveal_disk(unit.coord, unit.sight.max(1));
        }
        for city in world.cities_of(civ) {
            store.reveal_disk(city.coord, city_sight);
        }
    }

    /// Is the tile currently seen by `civ`.
    #[must_use]
    pub fn is_visible(&self, civ: CivId, c: Coord) -> bool {
        if self.reveal_all {
            return self.in_bounds(c);
        }
        self.stores.get(&civ).is_some_and(|s| s.visible.get(c))
    }

    /// Has the tile ever been seen by `civ`.
    #[must_use]
    pub fn is_explored(&self, civ: CivId, c: Coord) -> bool {
        if self.reveal_all {
            return self.in_bounds(c);
        }
        self.stores.get(&civ).is_some_and(|s| s.explored.get(c))
    }

    /// Merge a sighting of `enemy` into `civ`'s intel.
    ///
    /// A known entity only has its position and `last_seen_round`
    /// refreshed. Otherwise any older record of the same kind on the same
    /// tile belongs to something that is gone and is dropped before the
    /// new record is inserted.
    pub fn record_enemy_location(
        &mut self,
        civ: CivId,
        enemy: CivId,
        observation: Observation,
        round: u32,
    ) -> IntelUpdate {
        let Some(store) = self.stores.get_mut(&civ) else {
            return IntelUpdate::Inserted;
        };
        let records = store.enemy_intel.entry(enemy).or_default();

        if let Some(known) = records.iter_mut().find(|r| r.id == observation.id) {
            known.coord = observation.coord;
            known.last_seen_round = round;
            return IntelUpdate::Refreshed;
        }

        records.retain(|r| !(r.coord == observation.coord && r.kind == observation.kind));
        records.push(IntelRecord {
            coord: observation.coord,
            kind: observation.kind,
            id: observation.id,
            discovered_round: round,
            last_seen_round: round,
        });
        IntelUpdate::Inserted
    }

    /// Intel `civ` holds about `enemy`, in insertion order.
    #[must_use]
    pub fn known_enemy_locations(&self, civ: CivId, enemy: CivId) -> &[IntelRecord] {
        self.stores
            .get(&civ)
            .and_then(|s| s.enemy_intel.get(&enemy))
            .map_or(&[], Vec::as_slice)
    }

    /// Every intel record of `civ` with the enemy it belongs to.
    pub fn all_intel(&self, civ: CivId) -> impl Iterator<Item = (CivId, &IntelRecord)> {
        self.stores
            .get(&civ)
            .into_iter()
            .flat_map(|s| s.enemy_intel.iter())
            .flat_map(|(enemy, records)| records.iter().map(move |r| (*enemy, r)))
    }

    /// Records not refreshed for more than `older_than` rounds.
    #[must_use]
    pub fn stale_targets(&self, civ: CivId, current_round: u32, older_than: u32) -> Vec<(CivId, IntelRecord)> {
        self.all_intel(civ)
            .filter(|(_, r)| current_round.saturating_sub(r.last_seen_round) > older_than)
            .map(|(enemy, r)| (enemy, *r))
            .collect()
    }

    /// Forget intel about a city or unit that no longer exists.
    pub fn forget_entity(&mut self, id: EntityRef) {
        for store in self.stores.values_mut() {
            for records in store.enemy_intel.values_mut() {
                records.retain(|r| r.id != id);
            }
        }
    }

    /// Scout zones of `civ` if they are current.
    #[must_use]
    pub fn scout_zones(&self, civ: CivId) -> Option<&[Rect]> {
        self.stores
            .get(&civ)
            .filter(|s| s.zones_valid)
            .map(|s| s.scout_zones.as_slice())
    }

    /// Zone assigned to a scout, if zones are current and it has one.
    #[must_use]
    pub fn zone_for(&self, civ: CivId, scout: UnitId) -> Option<Rect> {
        let store = self.stores.get(&civ).filter(|s| s.zones_valid)?;
        let idx = *store.zone_assignments.get(&scout)?;
        store.scout_zones.get(idx).copied()
    }

    /// Replace `civ`'s zones; `scouts[i]` is assigned `zones[i]`.
    pub fn assign_scout_zones(&mut self, civ: CivId, zones: Vec<Rect>, scouts: &[UnitId]) {
        if let Some(store) = self.stores.get_mut(&civ) {
            store.zone_assignments = scouts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i < zones.len())
                .map(|(i, id)| (*id, i))
                .collect();
            store.scout_zones = zones;
            store.zones_valid = true;
        }
    }

    /// Mark `civ`'s zones as needing a full recompute.
    pub fn invalidate_scout_zones(&mut self, civ: CivId) {
        if let Some(store) = self.stores.get_mut(&civ) {
            store.zones_valid = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::{City, CityId};
    use crate::rules::Rules;
    use crate::unit::{Unit, UnitKind};

    fn scout_at(world: &mut World, civ: u8, c: Coord) -> UnitId {
        let rules = Rules::default();
        world.insert_unit(Unit::from_rule(CivId(civ), UnitKind::Scout, c, rules.unit(UnitKind::Scout)))
    }

    #[test]
    fn test_bitgrid() {
        let mut g = BitGrid::new(10, 10);
        g.set(Coord::new(9, 9));
        g.set(Coord::new(-1, 0));
        assert!(g.get(Coord::new(9, 9)));
        assert!(!g.get(Coord::new(0, 0)));
        assert_eq!(g.count(), 1);
        g.clear();
        assert_eq!(g.count(), 0);
    }

    #[test]
    fn test_recompute_reveals_sight_disk() {
        let mut world = World::new();
        scout_at(&mut world, 0, Coord::new(10, 10));
        let mut fog = FogOfWar::new(20, 20, [CivId(0), CivId(1)]);
        fog.recompute(CivId(0), &world, 2);

        assert!(fog.is_visible(CivId(0), Coord::new(12, 12)));
        assert!(fog.is_visible(CivId(0), Coord::new(8, 10)));
        assert!(!fog.is_visible(CivId(0), Coord::new(13, 10)));
        assert!(!fog.is_visible(CivId(1), Coord::new(10, 10)));
        assert_eq!(fog.store(CivId(0)).map(VisibilityStore::visible_count), Some(25));
    }

    #[test]
    fn test_explored_is_monotonic() {
        let mut world = World::new();
        let id = scout_at(&mut world, 0, Coord::new(2, 2));
        let mut fog = FogOfWar::new(20, 20, [CivId(0)]);
        fog.recompute(CivId(0), &world, 2);

        if let Some(u) = world.unit_mut(id) {
            u.coord = Coord::new(15, 15);
        }
        fog.recompute(CivId(0), &world, 2);

        assert!(!fog.is_visible(CivId(0), Coord::new(2, 2)));
        assert!(fog.is_explored(CivId(0), Coord::new(2, 2)));
        assert!(fog.is_visible(CivId(0), Coord::new(15, 15)));
    }

    #[test]
    fn test_city_sight() {
        let mut world = World::new();
        world.insert_city(City::new(CivId(0), "Ur", Coord::new(5, 5)));
        let mut fog = FogOfWar::new(20, 20, [CivId(0)]);
        fog.recompute(CivId(0), &world, 2);
        assert!(fog.is_visible(CivId(0), Coord::new(7, 3)));
        assert!(!fog.is_visible(CivId(0), Coord::new(8, 5)));
    }

    #[test]
    fn test_reveal_all_leaves_bitmaps_alone() {
        let mut fog = FogOfWar::new(4, 4, [CivId(0)]);
        fog.set_reveal_all(true);
        assert!(fog.is_visible(CivId(0), Coord::new(3, 3)));
        assert!(fog.is_explored(CivId(0), Coord::new(0, 0)));
        assert!(!fog.is_visible(CivId(0), Coord::new(4, 0)));
        assert_eq!(fog.store(CivId(0)).map(VisibilityStore::explored_count), Some(0));
    }

    #[test]
    fn test_intel_upsert() {
        let mut fog = FogOfWar::new(20, 20, [CivId(0)]);
        let city = Observation {
            coord: Coord::new(3, 3),
            kind: EnemyKind::City,
            id: EntityRef::City(CityId(7)),
        };

        assert_eq!(fog.record_enemy_location(CivId(0), CivId(1), city, 1), IntelUpdate::Inserted);
        assert_eq!(fog.record_enemy_location(CivId(0), CivId(1), city, 4), IntelUpdate::Refreshed);

        let known = fog.known_enemy_locations(CivId(0), CivId(1));
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].discovered_round, 1);
        assert_eq!(known[0].last_seen_round, 4);
    }

    #[test]
    fn test_intel_replaces_gone_entity_on_same_tile() {
        let mut fog = FogOfWar::new(20, 20, [CivId(0)]);
        let old = Observation {
            coord: Coord::new(3, 3),
            kind: EnemyKind::Unit,
            id: EntityRef::Unit(UnitId(1)),
        };
        let new = Observation {
            id: EntityRef::Unit(UnitId(2)),
            ..old
        };
        fog.record_enemy_location(CivId(0), CivId(1), old, 1);
        assert_eq!(fog.record_enemy_location(CivId(0), CivId(1), new, 2), IntelUpdate::Inserted);

        let known = fog.known_enemy_locations(CivId(0), CivId(1));
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].id, EntityRef::Unit(UnitId(2)));
    }

    #[test]
    fn test_stale_targets() {
        let mut fog = FogOfWar::new(20, 20, [CivId(0)]);
        let obs = |col, id| Observation {
            coord: Coord::new(col, 0),
            kind: EnemyKind::City,
            id: EntityRef::City(CityId(id)),
        };
        fog.record_enemy_location(CivId(0), CivId(1), obs(1, 1), 2);
        fog.record_enemy_location(CivId(0), CivId(2), obs(5, 2), 9);

        let stale = fog.stale_targets(CivId(0), 10, 5);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, CivId(1));
    }

    #[test]
    fn test_zone_assignment_and_invalidation() {
        let mut fog = FogOfWar::new(40, 40, [CivId(0)]);
        assert!(fog.scout_zones(CivId(0)).is_none());

        let zones = vec![Rect::new(0, 0, 19, 39), Rect::new(20, 0, 39, 39)];
        fog.assign_scout_zones(CivId(0), zones, &[UnitId(4), UnitId(9)]);
        assert_eq!(fog.zone_for(CivId(0), UnitId(9)), Some(Rect::new(20, 0, 39, 39)));

        fog.invalidate_scout_zones(CivId(0));
        assert!(fog.zone_for(CivId(0), UnitId(9)).is_none());
    }
}
