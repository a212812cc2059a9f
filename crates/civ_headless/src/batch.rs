//! Batch game runner for AI self-play.
//!
//! Runs many seeds of one scenario in parallel using rayon. Each game is
//! built and played on a single worker thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, GameMetrics};
use crate::runner::GameRunner;
use crate::scenario::Scenario;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run; its seed is replaced per game.
    pub scenario: Scenario,
    /// Number of games to run.
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default).
    pub parallel_games: u32,
    /// Seed of the first game; game `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Output directory for results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::duel(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario.
    #[must_use]
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Cap the number of worker threads.
    #[must_use]
    pub const fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_games = threads;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual game metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Games that failed to run.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Progress tracking for batch runs.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total games.
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create a new progress tracker.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished game and return the new count.
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current completion count.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.current() as f64 / self.total.max(1) as f64 * 100.0
    }

    /// Estimated time remaining.
    #[must_use]
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }
        let per_game = self.start_time.elapsed().as_secs_f64() / completed as f64;
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_game * remaining as f64)
    }
}

fn play(config: &BatchConfig, index: u32, progress: &BatchProgress) -> Result<GameMetrics, BatchError> {
    let seed = config.seed_start + u64::from(index);
    let scenario = config.scenario.clone().with_seed(seed);
    let game_id = format!("{}-{index:04}", scenario.name);
    let result = GameRunner::new(scenario).with_game_id(game_id).run();

    let done = progress.record_completion();
    debug!(
        done,
        total = progress.total,
        percent = format!("{:.1}", progress.percentage()),
        eta_secs = progress.eta().as_secs(),
        "batch progress"
    );

    result.map_err(|e| {
        warn!(game = index, seed, error = %e, "game failed");
        BatchError {
            game_index: index,
            seed,
            message: e.to_string(),
        }
    })
}

/// Run every game of the batch and summarize them.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);
    info!(
        scenario = %config.scenario.name,
        games = config.game_count,
        parallel = config.parallel_games,
        seed_start = config.seed_start,
        "batch started"
    );

    let run_all = || -> Vec<Result<GameMetrics, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| play(&config, i, &progress))
            .collect()
    };
    let outcomes = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "could not build thread pool, using the global one");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(metrics) => games.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        completed = games.len(),
        failed = errors.len(),
        duration_secs = format!("{duration_seconds:.1}"),
        "batch finished"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Play the same seed `runs` times and compare the final state hashes.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> bool {
    let scenario = scenario.clone().with_seed(seed);
    let mut first: Option<u64> = None;
    for run in 0..runs {
        let hash = match GameRunner::new(scenario.clone()).run() {
            Ok(metrics) => metrics.final_state_hash,
            Err(e) => {
                warn!(run, error = %e, "verification run failed");
                return false;
            }
        };
        match first {
            None => first = Some(hash),
            Some(expected) if expected != hash => {
                warn!(run, expected, actual = hash, "state hash diverged");
                return false;
            }
            Some(_) => {}
        }
    }
    true
}
