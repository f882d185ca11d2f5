//! Shared race state.
//!
//! All mutable race data lives in one [`BoardState`] behind one mutex in
//! [`RaceBoard`]. Every agent loop reads positions, validates a candidate
//! cell against current occupancy and commits the move inside a single
//! guard scope, so two agents can never race into the same cell and two
//! agents can never both record a win.
//!
//! # Locking
//!
//! The convenience methods on [`RaceBoard`] each take the lock for exactly
//! one operation. Multi-step sequences (decide, move, ability, win check)
//! go through [`RaceBoard::lock`] and run on the returned guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::agent_kind::{AgentId, MAX_AGENTS};
use crate::error::{RaceError, Result};
use crate::grid::{Displacement, Grid, Position};
use crate::snapshot::{AgentView, BoardView};

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Destination is off the board.
    OutOfBounds,
    /// Destination is a wall.
    Wall,
    /// Destination is at or beyond the finish boundary.
    PastFinish,
    /// Another agent stands there.
    Occupied(AgentId),
}

/// Result of a single move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The move was committed.
    Moved {
        /// Cell before the move.
        from: Position,
        /// Cell after the move.
        to: Position,
    },
    /// The move was rejected and nothing changed.
    Blocked {
        /// Cell the agent stays on.
        from: Position,
        /// Rejected destination.
        target: Position,
        /// Why it was rejected.
        reason: BlockReason,
    },
}

impl StepOutcome {
    /// Returns true if the move was committed.
    #[must_use]
    pub const fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct AgentSlot {
    position: Position,
    steps: u64,
    frozen_until: Option<Instant>,
}

/// Mutable race data. Only reachable through a [`RaceBoard`] guard.
#[derive(Debug)]
pub struct BoardState {
    grid: Arc<Grid>,
    agents: Vec<AgentSlot>,
    total_steps: u64,
    winner: Option<AgentId>,
}

impl BoardState {
    /// The static terrain.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of agents on the board.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Current cell of an agent.
    #[must_use]
    pub fn position(&self, agent: AgentId) -> Position {
        self.agents[agent.index()].position
    }

    /// Accepted moves of an agent.
    #[must_use]
    pub fn steps(&self, agent: AgentId) -> u64 {
        self.agents[agent.index()].steps
    }

    /// Accepted moves across all agents.
    #[must_use]
    pub const fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Recorded winner, if any.
    #[must_use]
    pub const fn winner(&self) -> Option<AgentId> {
        self.winner
    }

    /// Instant at which an agent's incapacitation ends.
    #[must_use]
    pub fn frozen_until(&self, agent: AgentId) -> Option<Instant> {
        self.agents[agent.index()].frozen_until
    }

    /// Check a destination for `agent` against terrain and occupancy.
    pub fn validate(&self, agent: AgentId, dest: Position) -> std::result::Result<(), BlockReason> {
        let grid = &self.grid;
        if !grid.in_bounds(dest.row, dest.col) {
            return Err(BlockReason::OutOfBounds);
        }
        if !grid.before_finish(dest.col) {
            return Err(BlockReason::PastFinish);
        }
        if !grid.cell_kind(dest).is_open() {
            return Err(BlockReason::Wall);
        }
        if let Some(other) = self.occupant_other_than(agent, dest) {
            return Err(BlockReason::Occupied(other));
        }
        Ok(())
    }

    /// Move `agent` to `dest` if the cell is legal and free.
    ///
    /// On success the agent's step count grows by one.
    pub fn try_move(&mut self, agent: AgentId, dest: Position) -> bool {
        self.move_to(agent, dest).moved()
    }

    /// Move `agent` by `delta`, reading its current cell under the same guard.
    pub fn step(&mut self, agent: AgentId, delta: Displacement) -> StepOutcome {
        let from = self.position(agent);
        self.move_to(agent, from.offset(delta, 1))
    }

    /// Like [`Self::try_move`], reporting the rejection reason.
    pub fn move_to(&mut self, agent: AgentId, dest: Position) -> StepOutcome {
        let from = self.position(agent);
        match self.validate(agent, dest) {
            Ok(()) => {
                let slot = &mut self.agents[agent.index()];
                slot.position = dest;
                slot.steps += 1;
                self.total_steps += 1;
                StepOutcome::Moved { from, to: dest }
            }
            Err(reason) => StepOutcome::Blocked {
                from,
                target: dest,
                reason,
            },
        }
    }

    /// Returns true iff `now` is before the agent's incapacitation deadline.
    #[must_use]
    pub fn is_frozen(&self, agent: AgentId, now: Instant) -> bool {
        self.frozen_until(agent).is_some_and(|until| now < until)
    }

    /// Incapacitate `target` until `now + duration`.
    pub fn freeze(&mut self, target: AgentId, now: Instant, duration: Duration) {
        self.agents[target.index()].frozen_until = Some(now + duration);
    }

    /// Nearest other agent that is not currently frozen.
    ///
    /// Distance is Manhattan; ties go to the lowest index.
    #[must_use]
    pub fn nearest_unfrozen(&self, from: AgentId, now: Instant) -> Option<(AgentId, u32)> {
        let origin = self.position(from);
        AgentId::roster(self.agents.len())
            .filter(|&other| other != from && !self.is_frozen(other, now))
            .map(|other| (other, origin.manhattan(self.position(other))))
            .min_by_key(|&(other, distance)| (distance, other))
    }

    /// Record `agent` as winner if it stands on a winning cell.
    ///
    /// Returns true only for the single call that sets the winner.
    pub fn check_and_record_win(&mut self, agent: AgentId) -> bool {
        if self.winner.is_some() {
            return false;
        }
        if self.grid.is_winning(self.position(agent)) {
            self.winner = Some(agent);
            return true;
        }
        false
    }

    /// Consistent copy of the board.
    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> BoardView {
        let agents = AgentId::roster(self.agents.len())
            .map(|id| AgentView {
                id,
                kind: id.kind(),
                position: self.position(id),
                steps: self.steps(id),
                frozen: self.is_frozen(id, now),
            })
            .collect();
        BoardView {
            grid: Arc::clone(&self.grid),
            agents,
            total_steps: self.total_steps,
        }
    }

    /// Consistent copy of the board, frozen flags evaluated now.
    #[must_use]
    pub fn snapshot(&self) -> BoardView {
        self.snapshot_at(Instant::now())
    }

    fn occupant_other_than(&self, agent: AgentId, pos: Position) -> Option<AgentId> {
        AgentId::roster(self.agents.len())
            .find(|&other| other != agent && self.position(other) == pos)
    }
}

/// The single synchronization boundary around [`BoardState`].
#[derive(Debug)]
pub struct RaceBoard {
    state: Mutex<BoardState>,
}

impl RaceBoard {
    /// Create a board with agents on explicit starting cells.
    ///
    /// Agent `i` gets `starts[i]`. Every start must be standable, distinct
    /// and off the goal.
    pub fn new(grid: Grid, starts: &[Position]) -> Result<Self> {
        if starts.is_empty() || starts.len() > MAX_AGENTS {
            return Err(RaceError::InvalidAgentCount(starts.len()));
        }

        for (i, &pos) in starts.iter().enumerate() {
            let reject = |reason| RaceError::InvalidPlacement {
                agent: i,
                row: pos.row,
                col: pos.col,
                reason,
            };
            if !grid.is_standable(pos) {
                return Err(reject("not a standable cell"));
            }
            if grid.is_goal(pos) {
                return Err(reject("on the goal"));
            }
            if starts[..i].contains(&pos) {
                return Err(reject("already taken"));
            }
        }

        Ok(Self::from_parts(grid, starts))
    }

    /// Create a board with `count` agents on random free cells.
    ///
    /// Starts are drawn from every row and columns `0..=cols-3`, skipping
    /// walls, the goal and cells already taken.
    pub fn with_random_starts<R: Rng + ?Sized>(grid: Grid, count: usize, rng: &mut R) -> Result<Self> {
        if count == 0 || count > MAX_AGENTS {
            return Err(RaceError::InvalidAgentCount(count));
        }

        let max_attempts = grid.rows() * grid.cols() * 16;
        let mut starts: Vec<Position> = Vec::with_capacity(count);
        for agent in 0..count {
            let pos = (0..max_attempts)
                .map(|_| {
                    Position::new(
                        rng.gen_range(0..grid.rows() as i32),
                        rng.gen_range(0..=grid.spawn_col_limit()),
                    )
                })
                .find(|&pos| grid.is_standable(pos) && !grid.is_goal(pos) && !starts.contains(&pos))
                .ok_or(RaceError::NoFreeCell(agent))?;
            starts.push(pos);
        }

        tracing::debug!(?starts, "Placed agents");
        Ok(Self::from_parts(grid, &starts))
    }

    fn from_parts(grid: Grid, starts: &[Position]) -> Self {
        let agents = starts
            .iter()
            .map(|&position| AgentSlot {
                position,
                steps: 0,
                frozen_until: None,
            })
            .collect();
        Self {
            state: Mutex::new(BoardState {
                grid: Arc::new(grid),
                agents,
                total_steps: 0,
                winner: None,
            }),
        }
    }

    /// Take the board lock.
    ///
    /// A poisoned lock is recovered: moves are validated before any field
    /// is written, so a panicking holder cannot leave a half-applied move.
    pub fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`BoardState::try_move`].
    pub fn try_move(&self, agent: AgentId, dest: Position) -> bool {
        self.lock().try_move(agent, dest)
    }

    /// See [`BoardState::is_frozen`].
    pub fn is_frozen(&self, agent: AgentId, now: Instant) -> bool {
        self.lock().is_frozen(agent, now)
    }

    /// See [`BoardState::freeze`].
    pub fn freeze(&self, target: AgentId, now: Instant, duration: Duration) {
        self.lock().freeze(target, now, duration);
    }

    /// See [`BoardState::snapshot`].
    pub fn snapshot(&self) -> BoardView {
        self.lock().snapshot()
    }

    /// See [`BoardState::check_and_record_win`].
    pub fn check_and_record_win(&self, agent: AgentId) -> bool {
        self.lock().check_and_record_win(agent)
    }

    /// Recorded winner, if any.
    pub fn winner(&self) -> Option<AgentId> {
        self.lock().winner()
    }

    /// Current cell of an agent.
    pub fn position(&self, agent: AgentId) -> Position {
        self.lock().position(agent)
    }

    /// Accepted moves of an agent.
    pub fn steps(&self, agent: AgentId) -> u64 {
        self.lock().steps(agent)
    }

    /// Number of agents on the board.
    pub fn agent_count(&self) -> usize {
        self.lock().agent_count()
    }
}
