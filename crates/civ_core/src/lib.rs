//! # Civ Core
//!
//! Deterministic turn-based civilization simulation core.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO beyond the explicit RON loaders
//! - No system randomness (map generation is seeded)
//!
//! Front ends observe the game through the typed [`events`] stream and
//! drive it through [`game::Game`].
//!
//! ## Crate Structure
//!
//! - [`grid`] / [`pathfinding`] - Coordinates, rectangles and A*
//! - [`map`] / [`map_generation`] - Tiles and seeded map generation
//! - [`rules`] - Terrain and unit balance tables
//! - [`world`] - Unit and city store
//! - [`visibility`] - Per-civilization fog of war, intel and scout zones
//! - [`enemy_search`] / [`settlement`] - Spatial queries used by the AI
//! - [`ai`] - Per-unit decision engine, run as a resumable task
//! - [`scheduler`] - Turn and phase state machine with the AI timeout
//! - [`production`] / [`economy`] / [`victory`] - End-of-turn collaborators
//! - [`game`] - Facade tying it all together

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod actions;
pub mod ai;
pub mod calendar;
pub mod city;
pub mod civilization;
pub mod clock;
pub mod combat;
pub mod config;
pub mod context;
pub mod economy;
pub mod enemy_search;
pub mod error;
pub mod events;
pub mod game;
pub mod grid;
pub mod map;
pub mod map_generation;
pub mod math;
pub mod pathfinding;
pub mod production;
pub mod rules;
pub mod scheduler;
pub mod settlement;
pub mod turn;
pub mod unit;
pub mod victory;
pub mod visibility;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::actions::MoveOutcome;
    pub use crate::city::{City, CityId};
    pub use crate::civilization::{CivId, Civilization};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::{CivSlot, GameConfig};
    pub use crate::context::SimulationContext;
    pub use crate::enemy_search::{find_nearest_enemy, EnemyKind, EnemySighting};
    pub use crate::error::{ActionError, GameError, MoveError, Result};
    pub use crate::events::{EventListener, GameEvent};
    pub use crate::game::Game;
    pub use crate::grid::{Coord, Rect};
    pub use crate::map::{GameMap, TerrainKind, TileLookup};
    pub use crate::map_generation::MapGenConfig;
    pub use crate::rules::Rules;
    pub use crate::scheduler::{SchedulerConfig, TurnScheduler, UpdateOutcome};
    pub use crate::turn::{Phase, TurnTicket};
    pub use crate::unit::{Unit, UnitId, UnitKind};
    pub use crate::victory::{NoVictory, StandardVictory, VictoryEvaluator};
}
