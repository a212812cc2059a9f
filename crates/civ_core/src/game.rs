//! Game facade.
//!
//! [`Game`] owns the simulation context and the turn scheduler and is the
//! entry point for front ends: it exposes the turn API, the query
//! accessors, the orders a human player may give, and a driver loop for
//! AI-only play.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::actions::{self, MoveOutcome};
use crate::city::CityId;
use crate::civilization::CivId;
use crate::clock::{Clock, SystemClock};
use crate::config::GameConfig;
use crate::context::SimulationContext;
use crate::economy::{self, ResearchError};
use crate::error::{ActionError, MoveError, Result};
use crate::events::{EventListener, ListenerId};
use crate::grid::Coord;
use crate::map_generation::generate_map;
use crate::production::{self, ProductionError, StandardProduction};
use crate::scheduler::{TurnScheduler, UpdateOutcome};
use crate::turn::{Phase, TurnTicket};
use crate::unit::UnitId;
use crate::victory::{StandardVictory, VictoryEvaluator};
use crate::visibility::IntelRecord;

/// Phases in which a human may give unit orders.
const UNIT_PHASES: &[Phase] = &[Phase::UnitMovement];
/// Phases in which a human may manage cities.
const CITY_PHASES: &[Phase] = &[Phase::UnitMovement, Phase::CityProduction];

/// A running game.
#[derive(Debug)]
pub struct Game {
    ctx: SimulationContext,
    scheduler: TurnScheduler,
    started: bool,
}

impl Game {
    /// Wrap an already prepared context.
    #[must_use]
    pub fn new(ctx: SimulationContext, scheduler: TurnScheduler) -> Self {
        Self {
            ctx,
            scheduler,
            started: false,
        }
    }

    /// Generate a map from `config` and place every civilization's starting
    /// units on its spawn point. Uses the wall clock and elimination victory.
    pub fn new_generated(config: &GameConfig) -> Result<Self> {
        Self::new_generated_with(config, Box::new(SystemClock::new()), Box::new(StandardVictory::default()))
    }

    /// Like [`Self::new_generated`] with an explicit clock and victory rule.
    pub fn new_generated_with(
        config: &GameConfig,
        clock: Box<dyn Clock>,
        victory: Box<dyn VictoryEvaluator>,
    ) -> Result<Self> {
        config.validate()?;
        let generated = generate_map(&config.map, config.civs.len())?;
        let mut ctx = SimulationContext::new(generated.map, config.rules.clone(), config.civilizations())?;
        ctx.fog.set_reveal_all(config.reveal_all);

        for (civ, spawn) in config.civilizations().iter().zip(&generated.spawn_points) {
            for kind in &config.starting_units {
                ctx.spawn_unit(civ.id, *kind, *spawn);
            }
        }
        tracing::info!(
            civs = config.civs.len(),
            width = config.map.width,
            height = config.map.height,
            seed = config.map.seed,
            "game created"
        );

        let scheduler = TurnScheduler::new(
            config.scheduler,
            clock,
            Box::new(StandardProduction::default()),
            victory,
        );
        Ok(Self::new(ctx, scheduler))
    }

    /// Begin the first turn.
    pub fn start(&mut self) -> Result<()> {
        self.started = true;
        let first = self.ctx.living_civs().first().copied().unwrap_or(self.ctx.turn.active_civ);
        self.scheduler.start_turn(&mut self.ctx, first)
    }

    /// Begin `civ`'s turn.
    pub fn start_turn(&mut self, civ: CivId) -> Result<()> {
        self.started = true;
        self.scheduler.start_turn(&mut self.ctx, civ)
    }

    /// A human finished the start of their turn.
    pub fn register_human_ready(&mut self, civ: CivId) -> bool {
        self.scheduler.register_human_ready(&mut self.ctx, civ)
    }

    /// Advance one phase.
    pub fn next_phase(&mut self) {
        self.scheduler.next_phase(&mut self.ctx);
    }

    /// End the active turn.
    pub fn advance_turn(&mut self) -> Result<()> {
        self.scheduler.advance_turn(&mut self.ctx)
    }

    /// Pump the AI driver once.
    pub fn update(&mut self) -> Result<UpdateOutcome> {
        self.scheduler.update(&mut self.ctx)
    }

    /// Play `rounds` full rounds (or until the game halts). Human turns are
    /// passed without orders. Returns the rounds actually completed.
    pub fn run_rounds(&mut self, rounds: u32) -> Result<u32> {
        if !self.started {
            self.start()?;
        }
        let from = self.ctx.turn.round;
        let target = from.saturating_add(rounds);
        while self.ctx.turn.round < target && !self.scheduler.is_halted() {
            if self.scheduler.ai_running() {
                self.scheduler.update(&mut self.ctx)?;
                continue;
            }
            let active = self.ctx.turn.active_civ;
            if !self.ctx.is_ai(active) && self.ctx.turn.phase == Phase::Start {
                self.scheduler.register_human_ready(&mut self.ctx, active);
            }
            self.scheduler.advance_turn(&mut self.ctx)?;
        }
        Ok(self.ctx.turn.round - from)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.ctx.turn.phase
    }

    /// Civilization whose turn it is.
    #[must_use]
    pub const fn active_civ(&self) -> CivId {
        self.ctx.turn.active_civ
    }

    /// Completed rounds.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.ctx.turn.round
    }

    /// Current year (negative is BC).
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.ctx.turn.year
    }

    /// Has the game ended.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.scheduler.is_halted()
    }

    /// What `civ` remembers about `enemy`.
    #[must_use]
    pub fn known_enemy_locations(&self, civ: CivId, enemy: CivId) -> &[IntelRecord] {
        self.ctx.fog.known_enemy_locations(civ, enemy)
    }

    /// Subscribe to the event stream.
    pub fn subscribe<L>(&mut self, listener: L) -> ListenerId
    where
        L: EventListener + 'static,
    {
        self.ctx.events.subscribe(listener)
    }

    /// Stop receiving events.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.ctx.events.unsubscribe(id)
    }

    /// Read-only simulation state.
    #[must_use]
    pub const fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    /// Mutable simulation state, for setup and debugging.
    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }

    /// The scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Ticket for orders from the active human player. `None` during AI
    /// turns and in the `Start` and `End` phases.
    #[must_use]
    pub fn human_ticket(&self) -> Option<TurnTicket> {
        self.order_ticket(&[Phase::UnitMovement, Phase::CityProduction, Phase::Research])
    }

    fn order_ticket(&self, phases: &[Phase]) -> Option<TurnTicket> {
        let civ = self.ctx.turn.active_civ;
        let open = !self.scheduler.is_halted() && !self.ctx.is_ai(civ) && phases.contains(&self.ctx.turn.phase);
        open.then(|| self.ctx.turn.ticket())
    }

    /// Move (or attack with) one of the active human player's units.
    pub fn move_unit(&mut self, unit: UnitId, target: Coord) -> std::result::Result<MoveOutcome, MoveError> {
        let ticket = self.order_ticket(UNIT_PHASES).ok_or(MoveError::CannotMove)?;
        actions::move_unit(&mut self.ctx, ticket, unit, target)
    }

    /// Found a city with one of the active human player's settlers.
    pub fn found_city(&mut self, unit: UnitId) -> std::result::Result<CityId, ActionError> {
        let ticket = self.order_ticket(UNIT_PHASES).ok_or(ActionError::NotOwner)?;
        actions::found_city(&mut self.ctx, ticket, unit)
    }

    /// Fortify one of the active human player's units.
    pub fn fortify_unit(&mut self, unit: UnitId) -> std::result::Result<(), ActionError> {
        let ticket = self.order_ticket(UNIT_PHASES).ok_or(ActionError::NotOwner)?;
        actions::fortify_unit(&mut self.ctx, ticket, unit)
    }

    /// Queue a unit in one of the active human player's cities.
    pub fn enqueue_production(
        &mut self,
        city: CityId,
        kind: crate::unit::UnitKind,
    ) -> std::result::Result<(), ProductionError> {
        let ticket = self.order_ticket(CITY_PHASES).ok_or(ProductionError::NotOwner)?;
        production::enqueue(&mut self.ctx, ticket, city, kind)
    }

    /// Buy the current production of a city. Returns the price.
    pub fn purchase(&mut self, city: CityId) -> std::result::Result<u32, ProductionError> {
        let ticket = self.order_ticket(CITY_PHASES).ok_or(ProductionError::NotOwner)?;
        production::purchase(&mut self.ctx, ticket, city)
    }

    /// Choose the active human player's research.
    pub fn set_research(&mut self, tech: &str) -> std::result::Result<(), ResearchError> {
        let ticket = self.human_ticket().ok_or(ResearchError::StaleTurn)?;
        economy::set_research(&mut self.ctx, ticket, tech)
    }

    /// Hash of the deterministic game state, for replay and determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let turn = &self.ctx.turn;
        turn.round.hash(&mut hasher);
        turn.year.hash(&mut hasher);
        turn.active_civ.hash(&mut hasher);
        turn.phase.name().hash(&mut hasher);

        for civ in &self.ctx.civs {
            civ.id.hash(&mut hasher);
            civ.is_alive.hash(&mut hasher);
            civ.resources.gold.hash(&mut hasher);
            civ.research_progress.hash(&mut hasher);
            civ.technologies.hash(&mut hasher);
        }

        let ids = self.ctx.world.sorted_unit_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.ctx.world.unit(id) {
                id.hash(&mut hasher);
                unit.owner.hash(&mut hasher);
                unit.kind.hash(&mut hasher);
                unit.coord.hash(&mut hasher);
                unit.moves_remaining.hash(&mut hasher);
                unit.health.hash(&mut hasher);
                unit.status.fortified.hash(&mut hasher);
            }
        }

        let ids = self.ctx.world.sorted_city_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(city) = self.ctx.world.city(id) {
                id.hash(&mut hasher);
                city.owner.hash(&mut hasher);
                city.coord.hash(&mut hasher);
                city.population.hash(&mut hasher);
                city.progress.food.hash(&mut hasher);
                city.progress.shields.hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}
