//! Agent loops.
//!
//! Each racer runs its own [`AgentLoop`] on its own thread. One iteration
//! ([`AgentLoop::tick`]) never sleeps and is fully deterministic given the
//! board state and the loop's RNG; [`AgentLoop::run`] adds pacing on top.
//!
//! A tick does all its board work inside one guard scope:
//!
//! 1. skip the tick while incapacitated
//! 2. claim a tick from the shared budget
//! 3. choose and attempt the base move
//! 4. resolve the ability
//! 5. check for a win
//!
//! Events are emitted after the guard is released.

use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, AbilityContext};
use crate::agent_kind::{AgentId, AgentKind};
use crate::board::{RaceBoard, StepOutcome};
use crate::config::RaceConfig;
use crate::policy::MovementPolicy;
use crate::snapshot::{AbilityEvent, EventSink, RaceEvent};
use crate::termination::{StopReason, Termination};

/// Where a loop stands after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    /// Took its turn and keeps racing.
    Active,
    /// Frozen; skipped this tick.
    Incapacitated,
    /// The race is over for this loop.
    Finished,
}

/// What one tick did.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    /// State after the tick.
    pub state: AgentState,
    /// Base move outcome, if a move was attempted.
    pub base: Option<StepOutcome>,
    /// Triggered ability, if any.
    pub ability: Option<AbilityEvent>,
    /// True for the tick that recorded the win.
    pub won: bool,
}

impl TickReport {
    const fn idle(state: AgentState) -> Self {
        Self {
            state,
            base: None,
            ability: None,
            won: false,
        }
    }
}

/// Sleep settings for [`AgentLoop::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after an active tick.
    pub tick_delay: Duration,
    /// Longest uninterrupted sleep.
    pub poll_interval: Duration,
}

impl Pacing {
    /// Pacing from a race configuration.
    #[must_use]
    pub fn from_config(config: &RaceConfig) -> Self {
        Self {
            tick_delay: config.tick_delay(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// One racer's control loop.
#[derive(Debug)]
pub struct AgentLoop<'a> {
    id: AgentId,
    ability: Ability,
    policy: MovementPolicy,
    rng: ChaCha8Rng,
    board: &'a RaceBoard,
    termination: &'a Termination,
    sink: EventSink,
    pacing: Pacing,
    ticks: u64,
}

impl<'a> AgentLoop<'a> {
    /// Build the loop for agent `id` from a race configuration.
    #[must_use]
    pub fn new(
        id: AgentId,
        config: &RaceConfig,
        board: &'a RaceBoard,
        termination: &'a Termination,
        sink: EventSink,
    ) -> Self {
        Self {
            id,
            ability: Ability::for_kind(id.kind(), &config.abilities),
            policy: config.policy(),
            rng: ChaCha8Rng::seed_from_u64(config.agent_seed(id.index())),
            board,
            termination,
            sink,
            pacing: Pacing::from_config(config),
            ticks: 0,
        }
    }

    /// Agent driven by this loop.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Kind of the driven agent.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.id.kind()
    }

    /// Active ticks taken so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one iteration at `now` without sleeping.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        if self.termination.should_stop() {
            return TickReport::idle(AgentState::Finished);
        }

        let emit = self.sink.is_enabled();
        let mut board = self.board.lock();

        if board.is_frozen(self.id, now) {
            return TickReport::idle(AgentState::Incapacitated);
        }
        if !self.termination.consume_tick() {
            return TickReport::idle(AgentState::Finished);
        }
        self.ticks += 1;

        let goal = board.grid().goal();
        let delta = self.policy.decide(board.position(self.id), goal, &mut self.rng);
        let base = board.step(self.id, delta);
        let base_view = (emit && base.moved()).then(|| board.snapshot_at(now));

        let ctx = AbilityContext {
            agent: self.id,
            delta,
            base,
            now,
        };
        let ability = self.ability.resolve(&mut board, ctx, &mut self.rng);
        let ability_view = (emit && ability.is_some()).then(|| board.snapshot_at(now));

        // A loop still inside its tick when the race stops must not claim the win.
        let won = !self.termination.is_stopped() && board.check_and_record_win(self.id);
        let position = board.position(self.id);
        drop(board);

        if let Some(view) = base_view {
            self.sink.emit(RaceEvent::Frame { agent: self.id, view });
        }
        if let Some(event) = ability {
            tracing::debug!(agent = %self.id, ability = self.ability.name(), "{event}");
            if let Some(view) = ability_view {
                self.sink.emit(RaceEvent::Ability { event, view });
            }
        } else if let Some(left) = self.ability.cooldown_remaining(now) {
            tracing::trace!(
                agent = %self.id,
                ability = self.ability.name(),
                remaining_ms = left.as_millis() as u64,
                "Ability cooling down"
            );
        }

        if won {
            self.termination.finish(StopReason::Winner(self.id));
            tracing::info!(agent = %self.id, %position, ticks = self.ticks, "Reached the finish");
            return TickReport {
                state: AgentState::Finished,
                base: Some(base),
                ability,
                won,
            };
        }

        TickReport {
            state: AgentState::Active,
            base: Some(base),
            ability,
            won,
        }
    }

    /// Tick until the race stops, pausing between iterations.
    ///
    /// Active ticks are followed by the configured tick delay; while frozen
    /// the loop re-checks at its kind's cadence. Every pause is cut into
    /// poll-interval slices so a stop request is seen promptly.
    pub fn run(mut self) -> AgentState {
        tracing::debug!(agent = %self.id, "Agent loop started");
        loop {
            let report = self.tick(Instant::now());
            match report.state {
                AgentState::Finished => break,
                AgentState::Active => self.pause(self.pacing.tick_delay),
                AgentState::Incapacitated => self.pause(self.kind().cadence()),
            }
        }
        tracing::debug!(agent = %self.id, ticks = self.ticks, "Agent loop stopped");
        AgentState::Finished
    }

    fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            thread::yield_now();
            return;
        }
        let deadline = Instant::now() + duration;
        loop {
            if self.termination.should_stop() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(self.pacing.poll_interval));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbilityTuning;
    use crate::grid::{Grid, Position};
    use crate::snapshot::AbilityAction;
    use crate::termination::CancelToken;

    const RR: AgentId = AgentId::new(0);
    const COYOTE: AgentId = AgentId::new(1);

    fn config() -> RaceConfig {
        RaceConfig {
            goal_bias: 1.0,
            tick_delay_ms: 0,
            abilities: AbilityTuning::never(),
            ..RaceConfig::default()
        }
    }

    #[test]
    fn test_tick_moves_towards_goal() {
        let board = RaceBoard::new(Grid::open(5, 20).unwrap(), &[Position::new(2, 3)]).unwrap();
        let term = Termination::new(100, CancelToken::new());
        let mut agent = AgentLoop::new(RR, &config(), &board, &term, EventSink::disabled());

        let report = agent.tick(Instant::now());
        assert_eq!(report.state, AgentState::Active);
        assert!(report.base.is_some_and(|b| b.moved()));
        assert_eq!(board.position(RR), Position::new(2, 4));
        assert_eq!(agent.ticks(), 1);
    }

    #[test]
    fn test_frozen_agent_does_not_move_or_spend_budget() {
        let board = RaceBoard::new(
            Grid::open(5, 20).unwrap(),
            &[Position::new(2, 3), Position::new(0, 0)],
        )
        .unwrap();
        let term = Termination::new(100, CancelToken::new());
        let now = Instant::now();
        board.freeze(RR, now, Duration::from_millis(500));
        let mut agent = AgentLoop::new(RR, &config(), &board, &term, EventSink::disabled());

        let report = agent.tick(now);
        assert_eq!(report.state, AgentState::Incapacitated);
        assert_eq!(board.position(RR), Position::new(2, 3));
        assert_eq!(term.ticks_used(), 0);

        let report = agent.tick(now + Duration::from_millis(500));
        assert_eq!(report.state, AgentState::Active);
        assert_eq!(board.position(RR), Position::new(2, 4));
    }

    #[test]
    fn test_winning_tick_stops_race() {
        let board = RaceBoard::new(
            Grid::open(5, 20).unwrap(),
            &[Position::new(2, 17), Position::new(0, 0)],
        )
        .unwrap();
        let term = Termination::new(100, CancelToken::new());
        let (sink, rx) = EventSink::channel();
        let mut agent = AgentLoop::new(RR, &config(), &board, &term, sink);

        let report = agent.tick(Instant::now());
        assert!(report.won);
        assert_eq!(report.state, AgentState::Finished);
        assert_eq!(board.winner(), Some(RR));
        assert_eq!(term.reason(), Some(StopReason::Winner(RR)));
        assert!(matches!(rx.try_recv(), Ok(RaceEvent::Frame { agent: RR, .. })));

        let mut other = AgentLoop::new(COYOTE, &config(), &board, &term, EventSink::disabled());
        assert_eq!(other.tick(Instant::now()).state, AgentState::Finished);
        assert_eq!(board.position(COYOTE), Position::new(0, 0));
    }

    #[test]
    fn test_budget_stops_loop() {
        let board = RaceBoard::new(Grid::open(5, 20).unwrap(), &[Position::new(0, 0)]).unwrap();
        let term = Termination::new(2, CancelToken::new());
        let cfg = RaceConfig {
            goal_bias: 0.0,
            ..config()
        };
        let mut agent = AgentLoop::new(RR, &cfg, &board, &term, EventSink::disabled());

        let now = Instant::now();
        assert_eq!(agent.tick(now).state, AgentState::Active);
        assert_eq!(agent.tick(now).state, AgentState::Active);
        assert_eq!(agent.tick(now).state, AgentState::Finished);
        assert_eq!(term.reason(), Some(StopReason::BudgetExhausted));
        assert_eq!(agent.ticks(), 2);
    }

    #[test]
    fn test_blocked_coyote_jumps_on_its_tick() {
        let grid = Grid::open(5, 20).unwrap().with_walls(&[Position::new(2, 6)]);
        let board = RaceBoard::new(grid, &[Position::new(0, 0), Position::new(2, 5)]).unwrap();
        let term = Termination::new(100, CancelToken::new());
        let cfg = RaceConfig {
            abilities: AbilityTuning {
                jump_chance: 1.0,
                ..AbilityTuning::never()
            },
            ..config()
        };
        let (sink, rx) = EventSink::channel();
        let mut coyote = AgentLoop::new(COYOTE, &cfg, &board, &term, sink);

        let report = coyote.tick(Instant::now());

        assert_eq!(report.state, AgentState::Active);
        assert!(report.base.is_some_and(|b| !b.moved()));
        let event = report.ability.expect("jump event");
        assert_eq!(
            event.action,
            AbilityAction::Jump {
                from: Position::new(2, 5),
                to: Position::new(2, 7),
            }
        );
        assert_eq!(board.position(COYOTE), Position::new(2, 7));
        assert_eq!(board.steps(COYOTE), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(RaceEvent::Ability { event, view }) if event.agent == COYOTE && view.total_steps == 1
        ));
    }

    #[test]
    fn test_shooter_tick_reports_cooldown() {
        let board = RaceBoard::new(
            Grid::open(5, 20).unwrap(),
            &[Position::new(0, 0), Position::new(4, 0), Position::new(2, 3)],
        )
        .unwrap();
        let term = Termination::new(100, CancelToken::new());
        let cfg = RaceConfig {
            abilities: AbilityTuning {
                shoot_chance: 1.0,
                ..AbilityTuning::never()
            },
            ..config()
        };
        let sam_id = AgentId::new(2);
        let mut sam = AgentLoop::new(sam_id, &cfg, &board, &term, EventSink::disabled());
        let now = Instant::now();

        assert!(sam.tick(now).ability.is_some());
        let retry = sam.tick(now + Duration::from_millis(10));
        assert!(retry.ability.is_none());
        assert!(sam.ability.cooldown_remaining(now + Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_cancel_ends_run() {
        let board = RaceBoard::new(Grid::open(5, 20).unwrap(), &[Position::new(0, 0)]).unwrap();
        let cancel = CancelToken::new();
        let term = Termination::new(u64::MAX, cancel.clone());
        let cfg = RaceConfig {
            goal_bias: 0.0,
            tick_delay_ms: 5,
            ..config()
        };

        let state = thread::scope(|s| {
            let handle = s.spawn(|| AgentLoop::new(RR, &cfg, &board, &term, EventSink::disabled()).run());
            thread::sleep(Duration::from_millis(30));
            cancel.cancel();
            handle.join().unwrap()
        });
        assert_eq!(state, AgentState::Finished);
        assert_eq!(term.reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_same_seed_same_first_moves() {
        let run = || {
            let board =
                RaceBoard::new(Grid::open(5, 20).unwrap(), &[Position::new(2, 2)]).unwrap();
            let term = Termination::new(100, CancelToken::new());
            let cfg = RaceConfig {
                goal_bias: 0.5,
                ..config()
            };
            let mut agent = AgentLoop::new(RR, &cfg, &board, &term, EventSink::disabled());
            let now = Instant::now();
            (0..10)
                .map(|_| {
                    agent.tick(now);
                    board.position(RR)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
