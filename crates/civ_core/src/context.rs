//! The simulation context.
//!
//! Every component receives the context explicitly; there is no global
//! lookup. Helpers here keep the derived state in sync: spawning or
//! removing units refreshes visibility and scout zones and emits events.

use crate::ai::memory::AiMemory;
use crate::city::{City, CityId};
use crate::civilization::{CivId, Civilization};
use crate::enemy_search::calculate_scout_zones;
use crate::error::{GameError, Result};
use crate::events::{EventBus, GameEvent};
use crate::grid::{Coord, Rect};
use crate::map::{GameMap, TileLookup};
use crate::rules::Rules;
use crate::turn::{TurnState, TurnTicket};
use crate::unit::{Unit, UnitId, UnitKind};
use crate::visibility::FogOfWar;
use crate::world::{EntityRef, World};

/// All mutable simulation state.
#[derive(Debug)]
pub struct SimulationContext {
    /// Terrain.
    pub map: GameMap,
    /// Balance tables.
    pub rules: Rules,
    /// Units and cities.
    pub world: World,
    /// Player slots, indexed by `CivId`.
    pub civs: Vec<Civilization>,
    /// Per-civilization visibility.
    pub fog: FogOfWar,
    /// Whose turn, which phase.
    pub turn: TurnState,
    /// Event fan-out.
    pub events: EventBus,
    /// AI per-unit memory.
    pub ai_memory: AiMemory,
}

impl SimulationContext {
    /// Build a context.
    ///
    /// Civilizations must be numbered `0..n` in order, and there must be at
    /// least one.
    pub fn new(map: GameMap, rules: Rules, civs: Vec<Civilization>) -> Result<Self> {
        if civs.is_empty() {
            return Err(GameError::InvalidConfig("at least one civilization is required".into()));
        }
        if let Some((i, civ)) = civs.iter().enumerate().find(|(i, c)| usize::from(c.id.0) != *i) {
            return Err(GameError::InvalidConfig(format!(
                "civilization at slot {i} has id {}",
                civ.id
            )));
        }
        rules.validate()?;

        let fog = FogOfWar::new(map.width(), map.height(), civs.iter().map(|c| c.id));
        let turn = TurnState::new(civs[0].id);
        Ok(Self {
            map,
            rules,
            world: World::new(),
            civs,
            fog,
            turn,
            events: EventBus::new(),
            ai_memory: AiMemory::new(),
        })
    }

    /// Map bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.map.bounds()
    }

    /// A civilization by id.
    #[must_use]
    pub fn civ(&self, id: CivId) -> Option<&Civilization> {
        self.civs.get(usize::from(id.0))
    }

    /// A civilization by id, mutably.
    pub fn civ_mut(&mut self, id: CivId) -> Option<&mut Civilization> {
        self.civs.get_mut(usize::from(id.0))
    }

    /// Living civilizations in rotation order.
    #[must_use]
    pub fn living_civs(&self) -> Vec<CivId> {
        self.civs.iter().filter(|c| c.is_alive).map(|c| c.id).collect()
    }

    /// True when `civ` exists and is driven by the AI.
    #[must_use]
    pub fn is_ai(&self, civ: CivId) -> bool {
        self.civ(civ).is_some_and(|c| !c.is_human)
    }

    /// Does the ticket still belong to the active turn.
    #[must_use]
    pub fn accepts(&self, ticket: TurnTicket) -> bool {
        self.turn.accepts(ticket)
    }

    /// Place a new unit and refresh its owner's view. A new scout marks
    /// the owner's scout zones stale.
    pub fn spawn_unit(&mut self, owner: CivId, kind: UnitKind, at: Coord) -> UnitId {
        let unit = Unit::from_rule(owner, kind, at, self.rules.unit(kind));
        let id = self.world.insert_unit(unit);
        self.events.emit(GameEvent::UnitCreated {
            unit: id,
            civ: owner,
            kind,
            at,
        });
        if kind == UnitKind::Scout {
            self.fog.invalidate_scout_zones(owner);
        }
        self.refresh_visibility(owner);
        id
    }

    /// Take a unit off the map (consumption or purge).
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.world.remove_unit(id)?;
        self.ai_memory.forget(id);
        self.fog.forget_entity(EntityRef::Unit(id));
        self.events.emit(GameEvent::UnitDestroyed {
            unit: id,
            civ: unit.owner,
        });
        if unit.kind == UnitKind::Scout {
            self.fog.invalidate_scout_zones(unit.owner);
        }
        self.refresh_visibility(unit.owner);
        Some(unit)
    }

    /// Remove every unit flagged as defeated. Returns how many went.
    pub fn purge_defeated(&mut self) -> usize {
        let ids = self.world.defeated_unit_ids();
        for id in &ids {
            self.remove_unit(*id);
        }
        ids.len()
    }

    /// Found a city without any checks. Used by setup and by the found action.
    pub fn place_city(&mut self, owner: CivId, at: Coord) -> CityId {
        let count = self.world.cities_of(owner).len();
        let name = match self.civ(owner) {
            Some(civ) if count == 0 => civ.name.clone(),
            Some(civ) => format!("{} {}", civ.name, count + 1),
            None => format!("City {}", self.world.city_count() + 1),
        };
        let id = self.world.insert_city(City::new(owner, name.clone(), at));
        tracing::info!(civ = %owner, city = %id, at = %at, name = %name, "city founded");
        self.events.emit(GameEvent::CityFounded {
            city: id,
            civ: owner,
            at,
            name,
        });
        self.refresh_visibility(owner);
        id
    }

    /// Rebuild `civ`'s visible tiles.
    pub fn refresh_visibility(&mut self, civ: CivId) {
        self.fog.recompute(civ, &self.world, self.rules.city_sight);
    }

    /// Recompute and reassign `civ`'s scout zones from scratch.
    pub fn refresh_scout_zones(&mut self, civ: CivId) {
        let scouts: Vec<UnitId> = self
            .world
            .units_of(civ)
            .into_iter()
            .filter(|u| u.kind == UnitKind::Scout)
            .map(|u| u.id)
            .collect();
        let zones = calculate_scout_zones(scouts.len() as u32, self.map.width(), self.map.height());
        self.fog.assign_scout_zones(civ, zones, &scouts);
    }

    /// Is `c` visible to `civ` (honours the debug reveal).
    #[must_use]
    pub fn is_visible(&self, civ: CivId, c: Coord) -> bool {
        self.fog.is_visible(civ, c)
    }

    /// Has `civ` ever seen `c` (honours the debug reveal).
    #[must_use]
    pub fn is_explored(&self, civ: CivId, c: Coord) -> bool {
        self.fog.is_explored(civ, c)
    }
}
