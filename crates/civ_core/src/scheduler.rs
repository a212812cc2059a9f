//! Turn and phase scheduler.
//!
//! The scheduler decides whose turn it is and walks that turn through
//! `Start -> UnitMovement -> CityProduction -> Research -> End`. For AI
//! civilizations it owns the [`AiTurnTask`] and polls it from
//! [`TurnScheduler::update`], cutting the turn short when the task runs
//! past its wall-clock budget or fails. Forward progress never depends on
//! the AI behaving.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::{AiError, AiLimits, AiStep, AiTurnTask};
use crate::civilization::CivId;
use crate::clock::{Clock, SystemClock};
use crate::context::SimulationContext;
use crate::economy;
use crate::error::{GameError, Result};
use crate::events::{ForcedReason, GameEvent};
use crate::production::{ProductionSystem, StandardProduction};
use crate::turn::Phase;
use crate::victory::{StandardVictory, VictoryEvaluator};

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock budget of one AI turn.
    pub ai_turn_timeout_ms: u64,
    /// AI steps taken per [`TurnScheduler::update`] call.
    pub ai_steps_per_update: u32,
    /// Hard cap on decisions per unit per turn.
    pub max_iterations_per_unit: u32,
    /// Iterations with unchanged moves before a unit is skipped.
    pub stuck_threshold: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let limits = AiLimits::default();
        Self {
            ai_turn_timeout_ms: 30_000,
            ai_steps_per_update: 64,
            max_iterations_per_unit: limits.max_iterations_per_unit,
            stuck_threshold: limits.stuck_threshold,
        }
    }
}

impl SchedulerConfig {
    /// AI timeout as a duration.
    #[must_use]
    pub const fn ai_turn_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_turn_timeout_ms)
    }

    /// Per-unit limits for the AI task.
    #[must_use]
    pub const fn ai_limits(&self) -> AiLimits {
        AiLimits {
            max_iterations_per_unit: self.max_iterations_per_unit,
            stuck_threshold: self.stuck_threshold,
        }
    }

    /// Reject settings that would stall the game.
    pub fn validate(&self) -> Result<()> {
        if self.ai_steps_per_update == 0 {
            return Err(GameError::InvalidConfig("ai_steps_per_update must be positive".into()));
        }
        if self.max_iterations_per_unit == 0 || self.stuck_threshold == 0 {
            return Err(GameError::InvalidConfig("ai iteration limits must be positive".into()));
        }
        Ok(())
    }
}

/// What one [`TurnScheduler::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No AI task was running.
    Idle,
    /// The AI task made progress and is still running.
    Working,
    /// The AI turn finished normally and the next turn started.
    TurnCompleted,
    /// The AI turn was cut short.
    Forced(ForcedReason),
    /// The game is over.
    Halted,
}

struct RunningTask {
    task: AiTurnTask,
    started: Duration,
}

/// Owns turn order, the AI task and the end-of-turn collaborators.
pub struct TurnScheduler {
    config: SchedulerConfig,
    clock: Box<dyn Clock>,
    production: Box<dyn ProductionSystem>,
    victory: Box<dyn VictoryEvaluator>,
    ai_task: Option<RunningTask>,
    halted: bool,
}

impl std::fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("config", &self.config)
            .field("ai_running", &self.ai_task.is_some())
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl TurnScheduler {
    /// Scheduler with explicit collaborators.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        clock: Box<dyn Clock>,
        production: Box<dyn ProductionSystem>,
        victory: Box<dyn VictoryEvaluator>,
    ) -> Self {
        Self {
            config,
            clock,
            production,
            victory,
            ai_task: None,
            halted: false,
        }
    }

    /// Wall clock, standard production, elimination victory.
    #[must_use]
    pub fn with_defaults(config: SchedulerConfig) -> Self {
        Self::new(
            config,
            Box::new(SystemClock::new()),
            Box::new(StandardProduction::default()),
            Box::new(StandardVictory::default()),
        )
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Has the victory evaluator ended the game.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Is an AI turn in progress.
    #[must_use]
    pub const fn ai_running(&self) -> bool {
        self.ai_task.is_some()
    }

    /// Begin `civ`'s turn.
    ///
    /// Resets its units' moves and its view. AI civilizations move straight
    /// on to unit movement; humans wait for [`Self::register_human_ready`].
    pub fn start_turn(&mut self, ctx: &mut SimulationContext, civ: CivId) -> Result<()> {
        if self.halted {
            return Ok(());
        }
        let is_ai = !ctx.civ(civ).ok_or(GameError::UnknownCivilization(civ))?.is_human;

        self.ai_task = None;
        ctx.turn.active_civ = civ;
        ctx.turn.phase = Phase::Start;
        ctx.turn.bump_epoch();
        for unit in ctx.world.units_mut().filter(|u| u.owner == civ) {
            unit.reset_for_turn();
        }
        ctx.refresh_visibility(civ);

        tracing::debug!(civ = %civ, round = ctx.turn.round, year = ctx.turn.year, "turn start");
        ctx.events.emit(GameEvent::TurnStart {
            civ,
            round: ctx.turn.round,
            year: ctx.turn.year,
        });

        if is_ai {
            self.next_phase(ctx);
        }
        Ok(())
    }

    /// A human player finished looking at the start of their turn.
    ///
    /// Returns `false` when `civ` is not the active human in `Start`.
    pub fn register_human_ready(&mut self, ctx: &mut SimulationContext, civ: CivId) -> bool {
        let is_human = ctx.civ(civ).is_some_and(|c| c.is_human);
        if self.halted || !is_human || ctx.turn.active_civ != civ || ctx.turn.phase != Phase::Start {
            return false;
        }
        self.next_phase(ctx);
        true
    }

    /// Advance one phase. No-op at `End`.
    ///
    /// Entering unit movement for an AI civilization launches its task.
    pub fn next_phase(&mut self, ctx: &mut SimulationContext) {
        let from = ctx.turn.phase;
        let Some(to) = from.next() else {
            return;
        };
        let civ = ctx.turn.active_civ;
        ctx.turn.phase = to;
        tracing::debug!(civ = %civ, from = %from, to = %to, "phase change");
        ctx.events.emit(GameEvent::PhaseChange { civ, from, to });

        if to == Phase::UnitMovement && ctx.is_ai(civ) {
            let task = AiTurnTask::new(ctx, ctx.turn.ticket(), self.config.ai_limits());
            self.ai_task = Some(RunningTask {
                task,
                started: self.clock.elapsed(),
            });
        }
    }

    /// Finish the active turn: run end-of-turn processing and hand over to
    /// the next living civilization.
    pub fn advance_turn(&mut self, ctx: &mut SimulationContext) -> Result<()> {
        if self.halted {
            return Ok(());
        }
        self.ai_task = None;
        while ctx.turn.phase != Phase::End {
            self.next_phase(ctx);
        }
        // Entering movement on the way may have launched a task
        self.ai_task = None;

        let civ = ctx.turn.active_civ;
        self.process_end(ctx, civ);

        let halt = self.victory.evaluate_end_of_turn(ctx);
        ctx.events.emit(GameEvent::TurnProcessed {
            civ,
            round: ctx.turn.round,
        });
        if halt {
            self.halt(ctx);
            return Ok(());
        }

        let Some((next, wrapped)) = next_in_rotation(ctx, civ) else {
            self.halt(ctx);
            return Ok(());
        };
        if wrapped {
            ctx.turn.advance_round();
            tracing::info!(round = ctx.turn.round, year = ctx.turn.year, "round advanced");
            ctx.events.emit(GameEvent::RoundAdvanced {
                round: ctx.turn.round,
                year: ctx.turn.year,
            });
        }
        self.start_turn(ctx, next)
    }

    /// End-phase processing in its fixed order.
    fn process_end(&mut self, ctx: &mut SimulationContext, civ: CivId) {
        economy::refresh_city_yields(ctx, civ);
        self.production.materialize_purchases(ctx, civ);
        self.production.advance(ctx, civ);
        economy::accrue_city_growth(ctx, civ);
        economy::accrue_civ_resources(ctx, civ);
        let purged = ctx.purge_defeated();
        if purged > 0 {
            tracing::debug!(civ = %civ, purged, "defeated units removed");
        }

        #[cfg(feature = "debug-validation")]
        validate_moves(ctx, civ);
    }

    fn halt(&mut self, ctx: &mut SimulationContext) {
        self.halted = true;
        self.ai_task = None;
        tracing::info!(round = ctx.turn.round, "game halted");
        ctx.events.emit(GameEvent::GameHalted { round: ctx.turn.round });
    }

    /// Drive the running AI task.
    ///
    /// Checks the timeout before every step; a task that errors or panics
    /// is treated like one that timed out.
    pub fn update(&mut self, ctx: &mut SimulationContext) -> Result<UpdateOutcome> {
        if self.halted {
            return Ok(UpdateOutcome::Halted);
        }
        if self.ai_task.is_none() {
            return Ok(UpdateOutcome::Idle);
        }

        for _ in 0..self.config.ai_steps_per_update {
            if self.timed_out() {
                return self.force_terminate(ctx, ForcedReason::Timeout);
            }
            let Some(running) = self.ai_task.as_mut() else {
                return Ok(UpdateOutcome::Idle);
            };
            let result = catch_unwind(AssertUnwindSafe(|| running.task.step(ctx)));
            #[cfg(feature = "debug-validation")]
            validate_moves(ctx, ctx.turn.active_civ);
            match result {
                Ok(Ok(AiStep::Continue)) => {}
                Ok(Ok(AiStep::Done)) => {
                    self.ai_task = None;
                    self.advance_turn(ctx)?;
                    return Ok(self.settled(UpdateOutcome::TurnCompleted));
                }
                Ok(Err(AiError::Stale { civ })) => {
                    tracing::debug!(civ = %civ, "dropping stale ai task");
                    self.ai_task = None;
                    return Ok(UpdateOutcome::Idle);
                }
                Ok(Err(err)) => {
                    tracing::error!(civ = %ctx.turn.active_civ, error = %err, "ai task failed");
                    return self.force_terminate(ctx, ForcedReason::Fault);
                }
                Err(payload) => {
                    tracing::error!(civ = %ctx.turn.active_civ, panic = panic_message(&*payload), "ai task panicked");
                    return self.force_terminate(ctx, ForcedReason::Fault);
                }
            }
        }
        Ok(UpdateOutcome::Working)
    }

    fn timed_out(&self) -> bool {
        self.ai_task
            .as_ref()
            .is_some_and(|r| self.clock.elapsed().saturating_sub(r.started) >= self.config.ai_turn_timeout())
    }

    fn settled(&self, outcome: UpdateOutcome) -> UpdateOutcome {
        if self.halted {
            UpdateOutcome::Halted
        } else {
            outcome
        }
    }

    /// Cut the active AI turn short: no moves left for anyone, outstanding
    /// tickets invalidated, then the normal end of turn.
    fn force_terminate(&mut self, ctx: &mut SimulationContext, reason: ForcedReason) -> Result<UpdateOutcome> {
        let civ = ctx.turn.active_civ;
        self.ai_task = None;
        tracing::warn!(civ = %civ, reason = ?reason, round = ctx.turn.round, "ai turn forced to end");
        for unit in ctx.world.units_mut().filter(|u| u.owner == civ) {
            unit.moves_remaining = 0;
        }
        ctx.turn.bump_epoch();
        ctx.events.emit(GameEvent::AiTurnForced { civ, reason });
        self.advance_turn(ctx)?;
        Ok(self.settled(UpdateOutcome::Forced(reason)))
    }
}

/// Next living civilization after `current` by id, and whether the
/// rotation wrapped past the end.
fn next_in_rotation(ctx: &SimulationContext, current: CivId) -> Option<(CivId, bool)> {
    let living = ctx.living_civs();
    if let Some(next) = living.iter().find(|c| **c > current) {
        return Some((*next, false));
    }
    living.first().map(|first| (*first, true))
}

/// Panics when a unit of `civ` holds more moves than its maximum.
#[cfg(any(test, feature = "debug-validation"))]
fn validate_moves(ctx: &SimulationContext, civ: CivId) {
    for unit in ctx.world.units_of(civ) {
        assert!(
            unit.moves_remaining <= unit.max_moves,
            "{} has {} of {} moves",
            unit.id,
            unit.moves_remaining,
            unit.max_moves
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
