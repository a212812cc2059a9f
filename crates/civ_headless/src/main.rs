//! Headless civilization game runner.
//!
//! Plays scenarios without a front end. Designed for AI self-play, CI
//! determinism checks and balance batches.
//!
//! # Usage
//!
//! ```bash
//! # Play one game and print its metrics as JSON
//! cargo run -p civ_headless -- run --scenario duel --seed 7
//!
//! # Watch the map every 10 rounds
//! cargo run -p civ_headless -- run --scenario four_way --ascii-every 10
//!
//! # Run a batch of seeds
//! cargo run -p civ_headless -- batch --scenario duel --count 500 --output results/
//!
//! # Show what civilization 1 knows after 30 rounds
//! cargo run -p civ_headless -- ascii --scenario duel --rounds 30 --viewer 1
//! ```
//!
//! Metrics and maps go to stdout, logs to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use civ_core::civilization::CivId;
use civ_headless::{
    ascii_visualizer::{render_ascii, AsciiConfig},
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::GameRunner,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "civ_headless")]
#[command(about = "Headless civilization game runner for AI self-play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single game
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Map seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Round cap (defaults to the scenario's)
        #[arg(short, long)]
        rounds: Option<u32>,

        /// Print the map every N rounds (0 = never)
        #[arg(long, default_value = "0")]
        ascii_every: u32,

        /// Write metrics JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of games for balance testing
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Seed of the first game
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Round cap (defaults to the scenario's)
        #[arg(short, long)]
        rounds: Option<u32>,
    },

    /// Play some rounds and print the map
    Ascii {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Map seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Rounds to play before rendering
        #[arg(short, long, default_value = "20")]
        rounds: u32,

        /// Render only what this civilization has seen
        #[arg(long)]
        viewer: Option<u8>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// List the built-in scenarios
    Scenarios,
}

fn main() {
    let cli = Cli::parse();

    // stdout carries metrics and maps
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            rounds,
            ascii_every,
            output,
        }) => cmd_run(&scenario, seed, rounds, ascii_every, output),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            rounds,
        }) => cmd_batch(&scenario, count, parallel, output, seed, rounds),
        Some(Commands::Ascii {
            scenario,
            seed,
            rounds,
            viewer,
            no_color,
        }) => cmd_ascii(&scenario, seed, rounds, viewer, no_color),
        Some(Commands::Verify { scenario, seed, runs }) => cmd_verify(&scenario, seed, runs),
        Some(Commands::Scenarios) => cmd_scenarios(),
        None => cmd_run("duel", None, None, 0, None),
    }
}

/// Resolve a scenario or exit.
fn load_scenario(name: &str, seed: Option<u64>, rounds: Option<u32>) -> Scenario {
    let mut scenario = match Scenario::resolve(name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {e}");
            std::process::exit(1);
        }
    };
    if let Some(seed) = seed {
        scenario = scenario.with_seed(seed);
    }
    if let Some(rounds) = rounds {
        scenario = scenario.with_max_rounds(rounds);
    }
    scenario
}

/// Play a single game
fn cmd_run(scenario: &str, seed: Option<u64>, rounds: Option<u32>, ascii_every: u32, output: Option<PathBuf>) {
    let scenario = load_scenario(scenario, seed, rounds);
    tracing::info!(scenario = %scenario.name, seed = scenario.seed(), "Starting game");

    let ascii = AsciiConfig {
        use_color: true,
        ..AsciiConfig::plain()
    };
    let runner = GameRunner::new(scenario);
    let result = runner.run_with(|game| {
        if ascii_every > 0 && game.round() % ascii_every == 0 {
            eprintln!("{}", render_ascii(game, &ascii));
        }
    });
    let metrics = match result {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Game failed: {e}");
            std::process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&metrics) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Failed to serialize metrics: {e}");
            std::process::exit(1);
        }
    };
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("Failed to write metrics: {e}");
                std::process::exit(1);
            }
            eprintln!("Metrics saved to: {}", path.display());
        }
        None => println!("{json}"),
    }

    eprintln!(
        "Rounds: {}  Winner: {}  Hash: {:016x}",
        metrics.rounds_played,
        metrics.winner.as_deref().unwrap_or("none"),
        metrics.final_state_hash
    );
}

/// Run a batch of games
fn cmd_batch(scenario: &str, count: u32, parallel: u32, output: PathBuf, seed: u64, rounds: Option<u32>) {
    let scenario = load_scenario(scenario, None, rounds);
    let num_cpus = std::thread::available_parallelism().map_or(1, |p| p.get());
    tracing::info!(
        scenario = %scenario.name,
        count,
        parallel,
        seed,
        max_rounds = scenario.max_rounds,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!("FATAL: Cannot create output directory '{}': {e}", output.display());
        std::process::exit(1);
    }

    let config = BatchConfig::new(scenario, count)
        .with_output(output.clone())
        .with_seed(seed)
        .with_parallelism(parallel);
    let results = run_batch(config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} games/sec",
        results.games.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!("Average rounds: {:.1}", results.summary.avg_rounds);
    eprintln!("Unfinished: {}", results.summary.unfinished);
    eprintln!("Forced AI turns: {}", results.summary.forced_turns);
    eprintln!("\nWin Rates:");
    for (civ, rate) in &results.summary.win_rates {
        eprintln!("  {civ}: {:.1}%", rate * 100.0);
    }
    eprintln!("\nAverage Cities:");
    for (civ, cities) in &results.summary.avg_cities {
        eprintln!("  {civ}: {cities:.1}");
    }

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!("  Game {} (seed {}): {}", error.game_index, error.seed, error.message);
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Play some rounds and print the map
fn cmd_ascii(scenario: &str, seed: Option<u64>, rounds: u32, viewer: Option<u8>, no_color: bool) {
    let scenario = load_scenario(scenario, seed, None);
    let runner = GameRunner::new(scenario);
    let mut game = match runner.build_game() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to build game: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = game.run_rounds(rounds) {
        eprintln!("Game failed: {e}");
        std::process::exit(1);
    }

    let viewer = viewer.map(CivId);
    if let Some(civ) = viewer {
        if game.context().civ(civ).is_none() {
            eprintln!("No civilization {civ} in this scenario");
            std::process::exit(1);
        }
    }
    let config = AsciiConfig {
        viewer,
        show_legend: true,
        use_color: !no_color,
    };
    println!("{}", render_ascii(&game, &config));
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario, None, None);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    if verify_determinism(&scenario, seed, runs) {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// List the built-in scenarios
fn cmd_scenarios() {
    for name in Scenario::BUILTIN {
        if let Some(scenario) = Scenario::builtin(name) {
            let map = &scenario.game.map;
            println!(
                "{name:<10} {} civs, {}x{}, {} rounds  {}",
                scenario.game.civs.len(),
                map.width,
                map.height,
                scenario.max_rounds,
                scenario.description
            );
        }
    }
}
