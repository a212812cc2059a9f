//! One AI turn as a resumable step function.
//!
//! The scheduler owns the task and calls [`AiTurnTask::step`] until it
//! reports [`AiStep::Done`]; each step handles one decision for one unit,
//! so observers see intermediate state between steps. The task holds the
//! ticket of the turn it was created for and refuses to act once that turn
//! is over.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::{self, MoveOutcome};
use crate::ai::executor::step_toward;
use crate::ai::targeting::decide;
use crate::ai::Decision;
use crate::civilization::CivId;
use crate::context::SimulationContext;
use crate::error::{ActionError, MoveError};
use crate::turn::TurnTicket;
use crate::unit::{UnitId, UnitRole};

/// Per-unit bounds on the decision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiLimits {
    /// Hard cap on decisions per unit per turn.
    pub max_iterations_per_unit: u32,
    /// Iterations with unchanged moves before the unit is skipped.
    pub stuck_threshold: u32,
}

impl Default for AiLimits {
    fn default() -> Self {
        Self {
            max_iterations_per_unit: 12,
            stuck_threshold: 3,
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStep {
    /// More work remains.
    Continue,
    /// Every unit is done.
    Done,
}

/// Ways an AI task can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiError {
    /// The turn this task was created for is over.
    #[error("turn of civilization {civ} is no longer active")]
    Stale {
        /// Civilization the task played for.
        civ: CivId,
    },
    /// Internal inconsistency while deciding or acting.
    #[error("ai fault: {0}")]
    Fault(String),
}

#[derive(Debug, Clone, Copy)]
struct UnitProgress {
    unit: UnitId,
    iterations: u32,
    unchanged: u32,
    last_moves: u32,
}

/// Drives every unit of one civilization through its turn.
#[derive(Debug, Clone)]
pub struct AiTurnTask {
    ticket: TurnTicket,
    limits: AiLimits,
    pending: VecDeque<UnitId>,
    current: Option<UnitProgress>,
    steps: u64,
}

impl AiTurnTask {
    /// Snapshot the civilization's units for the turn `ticket` belongs to.
    #[must_use]
    pub fn new(ctx: &SimulationContext, ticket: TurnTicket, limits: AiLimits) -> Self {
        Self {
            ticket,
            limits,
            pending: ctx.world.unit_ids_of(ticket.civ).into(),
            current: None,
            steps: 0,
        }
    }

    /// Ticket the task acts under.
    #[must_use]
    pub const fn ticket(&self) -> TurnTicket {
        self.ticket
    }

    /// Steps taken so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Units still waiting for their first decision.
    #[must_use]
    pub fn pending_units(&self) -> usize {
        self.pending.len() + usize::from(self.current.is_some())
    }

    /// Make one decision for one unit.
    pub fn step(&mut self, ctx: &mut SimulationContext) -> Result<AiStep, AiError> {
        if !ctx.accepts(self.ticket) {
            return Err(AiError::Stale { civ: self.ticket.civ });
        }
        self.steps += 1;

        let Some(mut progress) = self.current.take().or_else(|| self.next_unit(ctx)) else {
            return Ok(AiStep::Done);
        };

        if progress.iterations >= self.limits.max_iterations_per_unit {
            tracing::debug!(unit = %progress.unit, "iteration cap reached");
            self.finish_unit(ctx, progress.unit)?;
            return Ok(AiStep::Continue);
        }
        progress.iterations += 1;

        let unit = progress.unit;
        match decide(ctx, self.ticket, unit) {
            Decision::MoveToward { target, .. } => match step_toward(ctx, self.ticket, unit, target) {
                Ok(MoveOutcome::CombatDefeat) => return Ok(AiStep::Continue),
                Ok(_) => {}
                Err(MoveError::StaleTurn) => return Err(AiError::Stale { civ: self.ticket.civ }),
                Err(err) => tracing::trace!(unit = %unit, target = %target, error = %err, "move failed"),
            },
            Decision::Found => {
                check_action(self.ticket, actions::found_city(ctx, self.ticket, unit).map(|_| ()))?;
                return Ok(AiStep::Continue);
            }
            Decision::Fortify => {
                check_action(self.ticket, actions::fortify_unit(ctx, self.ticket, unit))?;
                return Ok(AiStep::Continue);
            }
            Decision::Skip => {
                self.finish_unit(ctx, unit)?;
                return Ok(AiStep::Continue);
            }
        }

        let moves = match ctx.world.unit(unit) {
            Some(u) if u.is_active() => u.moves_remaining,
            _ => return Ok(AiStep::Continue),
        };
        if moves == 0 {
            return Ok(AiStep::Continue);
        }
        if moves == progress.last_moves {
            progress.unchanged += 1;
            if progress.unchanged >= self.limits.stuck_threshold {
                tracing::debug!(unit = %unit, "unit stuck, skipping");
                self.finish_unit(ctx, unit)?;
                return Ok(AiStep::Continue);
            }
        } else {
            progress.unchanged = 0;
            progress.last_moves = moves;
        }
        self.current = Some(progress);
        Ok(AiStep::Continue)
    }

    /// Next unit that still has something to do.
    fn next_unit(&mut self, ctx: &SimulationContext) -> Option<UnitProgress> {
        while let Some(id) = self.pending.pop_front() {
            let Some(unit) = ctx.world.unit(id) else {
                continue;
            };
            let status = unit.status;
            // Scouts only dig in to hand over a report
            let dug_in = status.fortified && unit.kind.role() != UnitRole::Scout;
            if !unit.is_active() || unit.moves_remaining == 0 || dug_in || status.sleeping || status.skipped {
                continue;
            }
            return Some(UnitProgress {
                unit: id,
                iterations: 0,
                unchanged: 0,
                last_moves: unit.moves_remaining,
            });
        }
        None
    }

    fn finish_unit(&mut self, ctx: &mut SimulationContext, unit: UnitId) -> Result<(), AiError> {
        check_action(self.ticket, actions::skip_unit(ctx, self.ticket, unit))
    }
}

/// Stale rejections end the task; other rejections just end the unit.
fn check_action(ticket: TurnTicket, result: Result<(), ActionError>) -> Result<(), AiError> {
    match result {
        Err(ActionError::StaleTurn) => Err(AiError::Stale { civ: ticket.civ }),
        Err(err) => {
            tracing::trace!(civ = %ticket.civ, error = %err, "ai action rejected");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}
