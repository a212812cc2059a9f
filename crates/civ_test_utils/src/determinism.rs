//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a game produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Headless batches, replays and regression tests all assume that a game
//! is a pure function of its configuration. Sources of non-determinism
//! include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The core always iterates units and cities in sorted id order.
//!
//! - **Floating-point scoring**: settlement scores use fixed-point
//!   arithmetic via [`civ_core::math::Fixed`].
//!
//! - **System randomness**: map generation uses a seeded generator.
//!
//! - **Wall-clock time**: the AI timeout reads an injected
//!   [`civ_core::clock::Clock`]; tests use a manual clock that never fires.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual queries (pathfinding, search, scoring)
//! 2. **Property tests**: random inputs must still produce valid outputs
//! 3. **Integration tests**: full games are reproducible
//! 4. **Parallel tests**: running N games on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use civ_core::game::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic game).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the game was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Game is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..steps {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Play the same game twice for `rounds` rounds and compare final hashes.
///
/// # Panics
///
/// Panics if the game fails to advance.
pub fn verify_game_determinism<F>(setup_fn: F, rounds: u64) -> DeterminismResult
where
    F: Fn() -> Game,
{
    verify_determinism(
        2,
        rounds,
        &setup_fn,
        |game| {
            game.run_rounds(1).expect("game advances");
        },
        Game::state_hash,
    )
}

/// Play the same game on `num_games` threads and collect the final hashes.
///
/// Each game is built on its own thread, so the game itself never crosses
/// a thread boundary.
///
/// # Panics
///
/// Panics if a game fails to advance or a worker thread panics.
pub fn run_parallel_games<F>(setup_fn: F, num_games: usize, rounds: u32) -> DeterminismResult
where
    F: Fn() -> Game + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    game.run_rounds(rounds).expect("game advances");
                    game.state_hash()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("game thread panicked")).collect()
    });
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        steps: u64::from(rounds),
    }
}

/// Play two copies of a game round by round and report the first round
/// after which their hashes differ.
///
/// # Returns
///
/// `None` if the games stay identical, `Some(round)` otherwise.
///
/// # Panics
///
/// Panics if a game fails to advance.
pub fn find_first_divergence<F>(setup_fn: F, rounds: u32) -> Option<u32>
where
    F: Fn() -> Game,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for round in 1..=rounds {
        a.run_rounds(1).expect("game advances");
        b.run_rounds(1).expect("game advances");
        if a.state_hash() != b.state_hash() {
            return Some(round);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for grid and map inputs.
pub mod strategies {
    use civ_core::grid::{Coord, Rect};
    use civ_core::map::{GameMap, TerrainKind};
    use civ_core::unit::UnitKind;
    use proptest::prelude::*;

    /// A coordinate inside a `width x height` map.
    pub fn arb_coord(width: u32, height: u32) -> impl Strategy<Value = Coord> {
        (0..width as i32, 0..height as i32).prop_map(|(col, row)| Coord::new(col, row))
    }

    /// A non-empty rectangle inside a `width x height` map.
    pub fn arb_rect(width: u32, height: u32) -> impl Strategy<Value = Rect> {
        (arb_coord(width, height), arb_coord(width, height)).prop_map(|(a, b)| {
            Rect::new(a.col.min(b.col), a.row.min(b.row), a.col.max(b.col), a.row.max(b.row))
        })
    }

    /// Any terrain kind.
    pub fn arb_terrain() -> impl Strategy<Value = TerrainKind> {
        proptest::sample::select(TerrainKind::ALL.to_vec())
    }

    /// Mostly open land with some water and mountains.
    pub fn arb_land_terrain() -> impl Strategy<Value = TerrainKind> {
        prop_oneof![
            6 => Just(TerrainKind::Grassland),
            3 => Just(TerrainKind::Plains),
            2 => Just(TerrainKind::Forest),
            2 => Just(TerrainKind::Hills),
            1 => Just(TerrainKind::Mountain),
            1 => Just(TerrainKind::Ocean),
        ]
    }

    /// A random `width x height` map.
    pub fn arb_map(width: u32, height: u32) -> impl Strategy<Value = GameMap> {
        proptest::collection::vec(
            proptest::collection::vec(arb_land_terrain(), width as usize),
            height as usize,
        )
        .prop_map(|rows| GameMap::from_rows(&rows).expect("rows are rectangular"))
    }

    /// Any unit archetype.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::ALL.to_vec())
    }

    /// A map generation seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ai_game;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);
        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_divergence() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let calls = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || calls.fetch_add(1, Ordering::SeqCst),
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_generated_game_is_deterministic() {
        verify_game_determinism(|| ai_game(2, 20, 20, 7), 5).assert_deterministic();
    }

    #[test]
    fn test_parallel_games_match() {
        run_parallel_games(|| ai_game(2, 20, 20, 11), 4, 4).assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(|| ai_game(3, 24, 20, 3), 5), None);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&(1, "a")), compute_hash(&(1, "a")));
        assert_ne!(compute_hash(&1), compute_hash(&2));
    }
}
