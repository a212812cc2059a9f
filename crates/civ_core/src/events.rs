//! Typed event stream for observers.
//!
//! The simulation never calls into a UI. Everything an observer may want
//! to animate or log is published as a [`GameEvent`] through the
//! [`EventBus`] owned by the simulation context.

use serde::{Deserialize, Serialize};

use crate::city::CityId;
use crate::civilization::CivId;
use crate::enemy_search::EnemyKind;
use crate::grid::Coord;
use crate::turn::Phase;
use crate::unit::{UnitId, UnitKind};

/// Why the AI highlighted a target tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetReason {
    /// Settler heading to a settlement site.
    Settle,
    /// Military unit marching on an enemy city.
    EnemyCity,
    /// Unit following a rally order from its city.
    Rally,
    /// Military unit falling back to an own city with enemies nearby.
    Defend,
    /// Scout sweeping its zone.
    Explore,
    /// Scout returning home after a discovery.
    ReturnHome,
    /// Fallback wandering.
    Wander,
}

/// Why an AI turn was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForcedReason {
    /// The task exceeded the wall-clock budget.
    Timeout,
    /// The task returned an error or panicked.
    Fault,
}

/// Everything the simulation announces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A civilization's turn began.
    TurnStart {
        /// Active civilization.
        civ: CivId,
        /// Current round.
        round: u32,
        /// Current year (negative is BC).
        year: i32,
    },
    /// The active turn moved to another phase.
    PhaseChange {
        /// Active civilization.
        civ: CivId,
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
    },
    /// A unit changed tile.
    UnitMoved {
        /// Unit.
        unit: UnitId,
        /// Owner.
        civ: CivId,
        /// Origin tile.
        from: Coord,
        /// Destination tile.
        to: Coord,
        /// Movement points left after the move.
        moves_remaining: u32,
    },
    /// An attack succeeded; the defender is destroyed.
    CombatVictory {
        /// Attacking unit.
        attacker: UnitId,
        /// Defending unit.
        defender: UnitId,
        /// Attacker's owner.
        attacker_civ: CivId,
        /// Defender's owner.
        defender_civ: CivId,
        /// Contested tile.
        at: Coord,
    },
    /// An attack failed; the attacker is destroyed.
    CombatDefeat {
        /// Attacking unit.
        attacker: UnitId,
        /// Defending unit.
        defender: UnitId,
        /// Attacker's owner.
        attacker_civ: CivId,
        /// Defender's owner.
        defender_civ: CivId,
        /// Contested tile.
        at: Coord,
    },
    /// A settler founded a city.
    CityFounded {
        /// New city.
        city: CityId,
        /// Owner.
        civ: CivId,
        /// City tile.
        at: Coord,
        /// City name.
        name: String,
    },
    /// End-of-turn processing finished for a civilization.
    TurnProcessed {
        /// Civilization whose turn ended.
        civ: CivId,
        /// Round the turn belonged to.
        round: u32,
    },
    /// The AI picked a target for a unit.
    AiTargetHighlight {
        /// Unit.
        unit: UnitId,
        /// Owner.
        civ: CivId,
        /// Target tile.
        target: Coord,
        /// What the target is for.
        reason: TargetReason,
    },
    /// A unit appeared on the map.
    UnitCreated {
        /// Unit.
        unit: UnitId,
        /// Owner.
        civ: CivId,
        /// Archetype.
        kind: UnitKind,
        /// Spawn tile.
        at: Coord,
    },
    /// A unit left the map (defeat purge or consumption).
    UnitDestroyed {
        /// Unit.
        unit: UnitId,
        /// Owner.
        civ: CivId,
    },
    /// A unit dug in.
    UnitFortified {
        /// Unit.
        unit: UnitId,
        /// Owner.
        civ: CivId,
    },
    /// A city finished a production item.
    ProductionCompleted {
        /// Producing city.
        city: CityId,
        /// Unit created.
        unit: UnitId,
        /// Archetype created.
        kind: UnitKind,
    },
    /// A city changed size.
    CityGrew {
        /// City.
        city: CityId,
        /// New population.
        population: u32,
    },
    /// A civilization learned a technology.
    TechDiscovered {
        /// Civilization.
        civ: CivId,
        /// Technology id.
        tech: String,
    },
    /// A scout found an enemy it had no intel on.
    EnemyDiscovered {
        /// Discovering civilization.
        civ: CivId,
        /// Owner of what was found.
        enemy: CivId,
        /// Where it was found.
        at: Coord,
        /// City or unit.
        kind: EnemyKind,
    },
    /// The scheduler cut an AI turn short.
    AiTurnForced {
        /// Civilization whose turn was cut.
        civ: CivId,
        /// Timeout or fault.
        reason: ForcedReason,
    },
    /// Every living civilization has moved; a new round started.
    RoundAdvanced {
        /// New round number.
        round: u32,
        /// New year.
        year: i32,
    },
    /// A civilization lost its last unit and city.
    CivEliminated {
        /// Eliminated civilization.
        civ: CivId,
    },
    /// The victory evaluator stopped the game.
    GameHalted {
        /// Round at which the game stopped.
        round: u32,
    },
}

impl GameEvent {
    /// Stable upper-case name of the event kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TurnStart { .. } => "TURN_START",
            Self::PhaseChange { .. } => "PHASE_CHANGE",
            Self::UnitMoved { .. } => "UNIT_MOVED",
            Self::CombatVictory { .. } => "COMBAT_VICTORY",
            Self::CombatDefeat { .. } => "COMBAT_DEFEAT",
            Self::CityFounded { .. } => "CITY_FOUNDED",
            Self::TurnProcessed { .. } => "TURN_PROCESSED",
            Self::AiTargetHighlight { .. } => "AI_TARGET_HIGHLIGHT",
            Self::UnitCreated { .. } => "UNIT_CREATED",
            Self::UnitDestroyed { .. } => "UNIT_DESTROYED",
            Self::UnitFortified { .. } => "UNIT_FORTIFIED",
            Self::ProductionCompleted { .. } => "PRODUCTION_COMPLETED",
            Self::CityGrew { .. } => "CITY_GREW",
            Self::TechDiscovered { .. } => "TECH_DISCOVERED",
            Self::EnemyDiscovered { .. } => "ENEMY_DISCOVERED",
            Self::AiTurnForced { .. } => "AI_TURN_FORCED",
            Self::RoundAdvanced { .. } => "ROUND_ADVANCED",
            Self::CivEliminated { .. } => "CIV_ELIMINATED",
            Self::GameHalted { .. } => "GAME_HALTED",
        }
    }
}

/// Receives events as they are emitted.
pub trait EventListener {
    /// Called once per event, in emission order.
    fn on_event(&mut self, event: &GameEvent);
}

impl<F> EventListener for F
where
    F: FnMut(&GameEvent),
{
    fn on_event(&mut self, event: &GameEvent) {
        self(event);
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

/// Fan-out of events to listeners, plus an optional in-memory log.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Box<dyn EventListener>)>,
    next_listener: u32,
    log: Vec<GameEvent>,
    recording: bool,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("logged", &self.log.len())
            .field("recording", &self.recording)
            .finish()
    }
}

impl EventBus {
    /// Create a bus that records nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe<L>(&mut self, listener: L) -> ListenerId
    where
        L: EventListener + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Keep emitted events in the log until drained.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.log.clear();
        }
    }

    /// Deliver an event to every listener.
    pub fn emit(&mut self, event: GameEvent) {
        tracing::trace!(event = event.name(), "emit");
        for (_, listener) in &mut self.listeners {
            listener.on_event(&event);
        }
        if self.recording {
            self.log.push(event);
        }
    }

    /// Take the recorded events.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.log)
    }

    /// Recorded events not yet drained.
    #[must_use]
    pub fn recorded(&self) -> &[GameEvent] {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_closure_listeners_see_every_event() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new();
        bus.subscribe(move |e: &GameEvent| sink.borrow_mut().push(e.name()));
        bus.emit(GameEvent::TurnStart {
            civ: CivId(0),
            round: 0,
            year: -4000,
        });
        bus.emit(GameEvent::GameHalted { round: 3 });

        assert_eq!(*seen.borrow(), vec!["TURN_START", "GAME_HALTED"]);
    }

    #[test]
    fn test_recording_and_drain() {
        let mut bus = EventBus::new();
        bus.emit(GameEvent::CivEliminated { civ: CivId(1) });
        assert!(bus.recorded().is_empty());

        bus.set_recording(true);
        bus.emit(GameEvent::CivEliminated { civ: CivId(1) });
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.recorded().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let mut bus = EventBus::new();
        let id = bus.subscribe(move |_: &GameEvent| *c.borrow_mut() += 1);
        bus.emit(GameEvent::GameHalted { round: 1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GameEvent::GameHalted { round: 2 });
        assert_eq!(*count.borrow(), 1);
    }
}
