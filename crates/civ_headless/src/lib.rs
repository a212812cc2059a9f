//! Headless game runner for AI self-play and CI verification.
//!
//! Plays scenarios with every civilization under AI control (human slots
//! are passed without orders), folds the event stream into metrics and
//! prints the map as ASCII. This enables:
//!
//! - **AI testing**: long self-play runs without a front end
//! - **CI verification**: the same seed must always end in the same state
//! - **Balance review**: batch statistics over many seeds
//!
//! # Example
//!
//! ```bash
//! # Play the built-in duel and print the metrics
//! cargo run -p civ_headless -- run --scenario duel
//!
//! # 200 seeds of a four-way game in parallel
//! cargo run -p civ_headless -- batch --scenario four_way --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p civ_headless -- verify --scenario duel --seed 12345 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii_visualizer;
pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use ascii_visualizer::{render_ascii, render_context, AsciiConfig};
pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector};
pub use runner::GameRunner;
pub use scenario::{Scenario, ScenarioError};
