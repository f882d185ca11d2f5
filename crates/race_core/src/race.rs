//! Race setup and orchestration.
//!
//! [`Race`] owns the board, spawns one scoped thread per agent and waits
//! for every loop to stop. The outcome comes from the board: the recorded
//! winner if there is one, otherwise the reason the race was stopped.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentLoop, AgentState};
use crate::agent_kind::{AgentId, AgentKind};
use crate::board::RaceBoard;
use crate::config::RaceConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::snapshot::{BoardView, EventSink, RaceEvent};
use crate::termination::{CancelToken, StopReason, Termination};

/// How the race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceOutcome {
    /// An agent reached the goal or the finish column.
    Winner(AgentId),
    /// The race stopped without a winner.
    NoWinner(StopReason),
}

impl RaceOutcome {
    /// Winning agent, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<AgentId> {
        match self {
            Self::Winner(agent) => Some(*agent),
            Self::NoWinner(_) => None,
        }
    }
}

/// Per-agent result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent id.
    pub id: AgentId,
    /// Agent kind.
    pub kind: AgentKind,
    /// Accepted moves.
    pub steps: u64,
}

/// Everything a caller needs after the race.
#[derive(Debug, Clone)]
pub struct RaceSummary {
    /// How the race ended.
    pub outcome: RaceOutcome,
    /// Per-agent step counts in roster order.
    pub agents: Vec<AgentSummary>,
    /// Accepted moves across all agents.
    pub total_steps: u64,
    /// Budget ticks consumed.
    pub ticks_used: u64,
    /// Wall-clock duration.
    pub elapsed: Duration,
    /// Board after every loop stopped.
    pub final_view: BoardView,
}

impl RaceSummary {
    /// Winning agent, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<AgentId> {
        self.outcome.winner()
    }

    /// Step count of the winner.
    #[must_use]
    pub fn winner_steps(&self) -> Option<u64> {
        let winner = self.winner()?;
        self.agents.iter().find(|a| a.id == winner).map(|a| a.steps)
    }
}

/// A prepared race.
#[derive(Debug)]
pub struct Race {
    config: RaceConfig,
    board: RaceBoard,
}

impl Race {
    /// Generate terrain and starting cells from `config.seed`.
    ///
    /// The configuration is clamped first.
    pub fn new(config: RaceConfig) -> Result<Self> {
        let config = config.clamped();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::generate(config.rows, config.cols, &mut rng)?;
        tracing::debug!(
            rows = config.rows,
            cols = config.cols,
            walls = grid.wall_count(),
            goal = %grid.goal(),
            "Generated grid"
        );
        let board = RaceBoard::with_random_starts(grid, config.agents, &mut rng)?;
        Ok(Self { config, board })
    }

    /// Race on a prepared board. The configuration's agent count is ignored.
    #[must_use]
    pub fn with_board(config: RaceConfig, board: RaceBoard) -> Self {
        Self {
            config: config.clamped(),
            board,
        }
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// The shared board.
    #[must_use]
    pub const fn board(&self) -> &RaceBoard {
        &self.board
    }

    /// Run every agent on its own thread until the race stops.
    ///
    /// Emits [`RaceEvent::Started`] before the first tick and
    /// [`RaceEvent::Finished`] after the last loop has exited.
    pub fn run(self, sink: EventSink, cancel: CancelToken) -> RaceSummary {
        let started = Instant::now();
        let termination = Termination::new(self.config.max_steps, cancel);
        let count = self.board.agent_count();

        tracing::info!(
            agents = count,
            seed = self.config.seed,
            budget = self.config.max_steps,
            "Race starting"
        );
        sink.emit(RaceEvent::Started {
            view: self.board.snapshot(),
        });

        let term = &termination;
        thread::scope(|s| {
            let handles: Vec<_> = AgentId::roster(count)
                .map(|id| {
                    let agent = AgentLoop::new(id, &self.config, &self.board, term, sink.clone());
                    (id, s.spawn(move || run_guarded(id, term, || agent.run())))
                })
                .collect();

            for (id, handle) in handles {
                match handle.join() {
                    Ok(AgentState::Finished) => {}
                    Ok(state) => tracing::warn!(agent = %id, ?state, "Agent loop exited early"),
                    Err(_) => tracing::debug!(agent = %id, "Joined panicked agent loop"),
                }
            }
        });

        let summary = self.summarize(&termination, started.elapsed());
        tracing::info!(
            outcome = ?summary.outcome,
            total_steps = summary.total_steps,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Race finished"
        );
        sink.emit(RaceEvent::Finished(Box::new(summary.clone())));
        summary
    }

    fn summarize(&self, termination: &Termination, elapsed: Duration) -> RaceSummary {
        let board = self.board.lock();
        let outcome = match board.winner() {
            Some(agent) => RaceOutcome::Winner(agent),
            None => RaceOutcome::NoWinner(match termination.reason() {
                Some(StopReason::Winner(_)) | None => StopReason::Cancelled,
                Some(reason) => reason,
            }),
        };
        let agents = AgentId::roster(board.agent_count())
            .map(|id| AgentSummary {
                id,
                kind: id.kind(),
                steps: board.steps(id),
            })
            .collect();

        RaceSummary {
            outcome,
            agents,
            total_steps: board.total_steps(),
            ticks_used: termination.ticks_used(),
            elapsed,
            final_view: board.snapshot(),
        }
    }
}

/// Run an agent body, cancelling the race as soon as it panics.
///
/// The panic is resumed afterwards so the join still observes it.
fn run_guarded<F>(id: AgentId, termination: &Termination, body: F) -> AgentState
where
    F: FnOnce() -> AgentState,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(state) => state,
        Err(payload) => {
            tracing::error!(agent = %id, "Agent loop panicked");
            termination.finish(StopReason::Cancelled);
            panic::resume_unwind(payload)
        }
    }
}
