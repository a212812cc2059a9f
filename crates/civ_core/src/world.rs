//! Unit and city storage.
//!
//! Uses a `HashMap` for O(1) lookup by id, with deterministic iteration
//! via sorted keys whenever the simulation walks the collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::city::{City, CityId};
use crate::civilization::CivId;
use crate::grid::Coord;
use crate::unit::{Unit, UnitId, UnitKind};

/// Owner and id of something standing on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// A unit.
    Unit(UnitId),
    /// A city.
    City(CityId),
}

/// Lookup of enemy-relevant occupants by position.
///
/// Implemented by [`World`]; the enemy searcher and settlement evaluator
/// only depend on this view.
pub trait OccupantLookup {
    /// The city on a tile, with its owner.
    fn city_at(&self, coord: Coord) -> Option<(CivId, CityId)>;

    /// Active units on a tile not owned by `viewer`, sorted by id.
    fn foreign_units_at(&self, coord: Coord, viewer: CivId) -> Vec<(CivId, UnitId)>;

    /// The first active unit on a tile not owned by `viewer`, with its owner.
    fn foreign_unit_at(&self, coord: Coord, viewer: CivId) -> Option<(CivId, UnitId)> {
        self.foreign_units_at(coord, viewer).into_iter().next()
    }

    /// All cities as `(owner, coord)` pairs.
    fn city_positions(&self) -> Vec<(CivId, Coord)>;
}

/// Storage for all units and cities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    units: HashMap<UnitId, Unit>,
    cities: HashMap<CityId, City>,
    next_unit_id: u32,
    next_city_id: u32,
}

impl World {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            cities: HashMap::new(),
            next_unit_id: 1,
            next_city_id: 1,
        }
    }

    /// Insert a unit, assigning and returning its id.
    pub fn insert_unit(&mut self, mut unit: Unit) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable unit by id.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Insert a city, assigning and returning its id.
    pub fn insert_city(&mut self, mut city: City) -> CityId {
        let id = CityId(self.next_city_id);
        self.next_city_id += 1;
        city.id = id;
        self.cities.insert(id, city);
        id
    }

    /// Get a city by id.
    #[must_use]
    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(&id)
    }

    /// Get a mutable city by id.
    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(&id)
    }

    /// Number of units (including defeated ones awaiting purge).
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Number of cities.
    #[must_use]
    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// Sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_unit_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted city ids for deterministic iteration.
    #[must_use]
    pub fn sorted_city_ids(&self) -> Vec<CityId> {
        let mut ids: Vec<_> = self.cities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Active units of a civilization, sorted by id.
    #[must_use]
    pub fn units_of(&self, civ: CivId) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self
            .units
            .values()
            .filter(|u| u.owner == civ && u.is_active())
            .collect();
        units.sort_unstable_by_key(|u| u.id);
        units
    }

    /// Ids of active units of a civilization, sorted.
    #[must_use]
    pub fn unit_ids_of(&self, civ: CivId) -> Vec<UnitId> {
        self.units_of(civ).into_iter().map(|u| u.id).collect()
    }

    /// Count active units of a kind owned by a civilization.
    #[must_use]
    pub fn count_units(&self, civ: CivId, kind: UnitKind) -> usize {
        self.units
            .values()
            .filter(|u| u.owner == civ && u.kind == kind && u.is_active())
            .count()
    }

    /// Active units on a tile, sorted by id.
    #[must_use]
    pub fn units_at(&self, coord: Coord) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self
            .units
            .values()
            .filter(|u| u.coord == coord && u.is_active())
            .collect();
        units.sort_unstable_by_key(|u| u.id);
        units
    }

    /// Cities of a civilization, sorted by id.
    #[must_use]
    pub fn cities_of(&self, civ: CivId) -> Vec<&City> {
        let mut cities: Vec<&City> = self.cities.values().filter(|c| c.owner == civ).collect();
        cities.sort_unstable_by_key(|c| c.id);
        cities
    }

    /// All cities, sorted by id.
    #[must_use]
    pub fn cities(&self) -> Vec<&City> {
        let mut cities: Vec<&City> = self.cities.values().collect();
        cities.sort_unstable_by_key(|c| c.id);
        cities
    }

    /// The city standing on a tile.
    #[must_use]
    pub fn city_on(&self, coord: Coord) -> Option<&City> {
        self.cities.values().find(|c| c.coord == coord)
    }

    /// Ids of units flagged as defeated.
    #[must_use]
    pub fn defeated_unit_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self
            .units
            .values()
            .filter(|u| !u.is_active())
            .map(|u| u.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate mutably over all units (not in deterministic order).
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl OccupantLookup for World {
    fn city_at(&self, coord: Coord) -> Option<(CivId, CityId)> {
        self.city_on(coord).map(|c| (c.owner, c.id))
    }

    fn foreign_units_at(&self, coord: Coord, viewer: CivId) -> Vec<(CivId, UnitId)> {
        self.units_at(coord)
            .into_iter()
            .filter(|u| u.owner != viewer)
            .map(|u| (u.owner, u.id))
            .collect()
    }

    fn city_positions(&self) -> Vec<(CivId, Coord)> {
        self.cities().into_iter().map(|c| (c.owner, c.coord)).collect()
    }
}
