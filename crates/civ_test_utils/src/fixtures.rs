//! Test fixtures and helpers.
//!
//! Pre-built maps, contexts and games for consistent testing.

use civ_core::civilization::{CivId, Civilization};
use civ_core::clock::ManualClock;
use civ_core::config::{CivSlot, GameConfig};
use civ_core::context::SimulationContext;
use civ_core::game::Game;
use civ_core::grid::Coord;
use civ_core::map::{GameMap, TerrainKind};
use civ_core::production::StandardProduction;
use civ_core::rules::Rules;
use civ_core::scheduler::{SchedulerConfig, TurnScheduler};
use civ_core::unit::{UnitId, UnitKind};
use civ_core::victory::NoVictory;

/// Parse a map from glyph rows (`.` grassland, `~` ocean, `^` mountain, ...).
///
/// # Panics
///
/// Panics on an unknown glyph or ragged rows.
#[must_use]
pub fn map_from_ascii(rows: &[&str]) -> GameMap {
    let rows: Vec<Vec<TerrainKind>> = rows
        .iter()
        .map(|row| {
            row.chars()
                .map(|ch| {
                    TerrainKind::ALL
                        .into_iter()
                        .find(|t| t.glyph() == ch)
                        .unwrap_or_else(|| panic!("unknown terrain glyph {ch:?}"))
                })
                .collect()
        })
        .collect();
    GameMap::from_rows(&rows).expect("valid terrain rows")
}

/// Civilizations numbered `0..n`; `true` marks a human slot.
#[must_use]
pub fn civilizations(humans: &[bool]) -> Vec<Civilization> {
    const NAMES: [&str; 4] = ["Rome", "Carthage", "Egypt", "Greece"];
    humans
        .iter()
        .enumerate()
        .map(|(i, human)| {
            let name = NAMES.get(i).map_or_else(|| format!("Civ {i}"), |n| (*n).to_string());
            Civilization::new(CivId(i as u8), name, *human)
        })
        .collect()
}

/// Context over `map` with default rules.
///
/// # Panics
///
/// Panics if `humans` is empty.
#[must_use]
pub fn context_with_map(map: GameMap, humans: &[bool]) -> SimulationContext {
    SimulationContext::new(map, Rules::default(), civilizations(humans)).expect("valid context")
}

/// Context over an all-grassland map.
#[must_use]
pub fn flat_context(width: u32, height: u32, humans: &[bool]) -> SimulationContext {
    let map = GameMap::filled(width, height, TerrainKind::Grassland).expect("positive map size");
    context_with_map(map, humans)
}

/// Place a unit at `(col, row)`.
pub fn spawn(ctx: &mut SimulationContext, civ: u8, kind: UnitKind, col: i32, row: i32) -> UnitId {
    ctx.spawn_unit(CivId(civ), kind, Coord::new(col, row))
}

/// Scheduler driven by `clock` that never ends the game on its own.
#[must_use]
pub fn manual_scheduler(clock: ManualClock) -> TurnScheduler {
    manual_scheduler_with(clock, SchedulerConfig::default())
}

/// Like [`manual_scheduler`] with explicit tuning.
#[must_use]
pub fn manual_scheduler_with(clock: ManualClock, config: SchedulerConfig) -> TurnScheduler {
    TurnScheduler::new(
        config,
        Box::new(clock),
        Box::new(StandardProduction::default()),
        Box::new(NoVictory),
    )
}

/// Generated AI-only game on a manual clock with no victory condition.
///
/// # Panics
///
/// Panics if the map cannot hold `civs` civilizations.
#[must_use]
pub fn ai_game(civs: usize, width: u32, height: u32, seed: u64) -> Game {
    game_from_config(&GameConfig::ai_only(civs, width, height, seed))
}

/// Generated game with the given slots.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn game_with_slots(slots: Vec<CivSlot>, width: u32, height: u32, seed: u64) -> Game {
    let mut config = GameConfig::ai_only(slots.len(), width, height, seed);
    config.civs = slots;
    game_from_config(&config)
}

/// Generated game from a config on a manual clock with no victory condition.
///
/// # Panics
///
/// Panics if the configuration is invalid.
#[must_use]
pub fn game_from_config(config: &GameConfig) -> Game {
    Game::new_generated_with(config, Box::new(ManualClock::new()), Box::new(NoVictory)).expect("valid game config")
}
