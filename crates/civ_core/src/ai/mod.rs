//! AI decision engine.
//!
//! The AI is reactive: every iteration it looks at one unit, picks a target
//! from scratch ([`targeting`]), and commits at most one action
//! ([`executor`]). [`task::AiTurnTask`] drives that loop for a whole turn
//! as a resumable step function polled by the scheduler. The only state
//! carried between iterations lives in [`memory::AiMemory`].

pub mod executor;
pub mod memory;
pub mod targeting;
pub mod task;

use serde::{Deserialize, Serialize};

use crate::events::TargetReason;
use crate::grid::Coord;

pub use memory::AiMemory;
pub use targeting::decide;
pub use task::{AiError, AiLimits, AiStep, AiTurnTask};

/// What the AI wants one unit to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Head for (or attack) a tile.
    MoveToward {
        /// Target tile.
        target: Coord,
        /// Why this tile.
        reason: TargetReason,
    },
    /// Found a city where the unit stands.
    Found,
    /// Dig in where the unit stands.
    Fortify,
    /// Nothing useful to do this turn.
    Skip,
}
