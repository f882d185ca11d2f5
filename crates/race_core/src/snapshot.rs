//! Board snapshots and the event stream consumed by renderers.
//!
//! Every state-changing tick produces a [`RaceEvent`]. Snapshots are always
//! taken while holding the board lock, so a [`BoardView`] never shows a
//! half-applied move.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent_kind::{AgentId, AgentKind};
use crate::grid::{CellKind, Grid, Position};
use crate::race::RaceSummary;

/// Glyph for open terrain.
pub const OPEN_GLYPH: char = '.';
/// Glyph for walls.
pub const WALL_GLYPH: char = '#';
/// Glyph for the finish boundary column.
pub const FINISH_GLYPH: char = '|';
/// Glyph for the goal cell.
pub const GOAL_GLYPH: char = 'F';

/// One agent as seen in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    /// Agent id.
    pub id: AgentId,
    /// Agent kind.
    pub kind: AgentKind,
    /// Current cell.
    pub position: Position,
    /// Accepted moves so far.
    pub steps: u64,
    /// Whether the agent was incapacitated when the snapshot was taken.
    pub frozen: bool,
}

/// A consistent copy of the board for rendering.
#[derive(Debug, Clone)]
pub struct BoardView {
    /// Shared immutable terrain.
    pub grid: Arc<Grid>,
    /// All agents in roster order.
    pub agents: Vec<AgentView>,
    /// Accepted moves across all agents.
    pub total_steps: u64,
}

impl BoardView {
    /// Agent standing on `pos`, if any.
    #[must_use]
    pub fn occupant(&self, pos: Position) -> Option<&AgentView> {
        self.agents.iter().find(|a| a.position == pos)
    }

    /// Glyph to draw at a cell. Agents cover the goal and terrain.
    #[must_use]
    pub fn glyph_at(&self, pos: Position) -> char {
        if let Some(agent) = self.occupant(pos) {
            return agent.kind.glyph();
        }
        if self.grid.is_goal(pos) {
            return GOAL_GLYPH;
        }
        if pos.col == self.grid.finish_col() {
            return FINISH_GLYPH;
        }
        match self.grid.cell_kind(pos) {
            CellKind::Open => OPEN_GLYPH,
            CellKind::Wall => WALL_GLYPH,
        }
    }

    /// The whole board as one string per row.
    #[must_use]
    pub fn glyph_rows(&self) -> Vec<String> {
        (0..self.grid.rows() as i32)
            .map(|row| {
                (0..self.grid.cols() as i32)
                    .map(|col| self.glyph_at(Position::new(row, col)))
                    .collect()
            })
            .collect()
    }
}

/// What an ability did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityAction {
    /// Jumped two cells over an obstruction.
    Jump {
        /// Cell before the jump.
        from: Position,
        /// Landing cell.
        to: Position,
    },
    /// Took an extra step after moving.
    Burst {
        /// Cell before the extra step.
        from: Position,
        /// Cell after the extra step.
        to: Position,
    },
    /// Froze another agent.
    Shoot {
        /// Freeze duration in milliseconds.
        freeze_ms: u64,
        /// Manhattan distance to the target when shot.
        distance: u32,
    },
}

/// Structured record of a triggered ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityEvent {
    /// Acting agent.
    pub agent: AgentId,
    /// Acting agent's kind.
    pub kind: AgentKind,
    /// What happened.
    pub action: AbilityAction,
    /// Affected agent, for targeted abilities.
    pub target: Option<AgentId>,
}

impl fmt::Display for AbilityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.action, self.target) {
            (AbilityAction::Jump { to, .. }, _) => write!(f, "[Update] {} jumps to {}", self.kind, to),
            (AbilityAction::Burst { to, .. }, _) => {
                write!(f, "[Update] {} bursts ahead to {}", self.kind, to)
            }
            (AbilityAction::Shoot { freeze_ms, .. }, Some(target)) => write!(
                f,
                "[Update] {} shoots {} - frozen for {} ms",
                self.kind,
                target.kind(),
                freeze_ms
            ),
            (AbilityAction::Shoot { freeze_ms, .. }, None) => {
                write!(f, "[Update] {} fires ({} ms freeze)", self.kind, freeze_ms)
            }
        }
    }
}

/// Event pushed to the external renderer.
#[derive(Debug, Clone)]
pub enum RaceEvent {
    /// Initial board before any agent starts.
    Started {
        /// Starting snapshot.
        view: BoardView,
    },
    /// A tick changed the board.
    Frame {
        /// Agent whose tick produced the frame.
        agent: AgentId,
        /// Snapshot after the tick.
        view: BoardView,
    },
    /// An ability changed the board.
    Ability {
        /// What happened.
        event: AbilityEvent,
        /// Snapshot right after the ability resolved.
        view: BoardView,
    },
    /// All loops have stopped.
    Finished(Box<RaceSummary>),
}

/// Sending side of the event stream.
///
/// A disabled sink drops every event, which is what batch runs use.
/// Send failures (receiver gone) are ignored; the race does not depend on
/// anyone listening.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<RaceEvent>>,
}

impl EventSink {
    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: Sender<RaceEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Create a sink together with its receiver.
    #[must_use]
    pub fn channel() -> (Self, Receiver<RaceEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    /// A sink that discards all events.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Whether anyone may be listening. Used to skip building snapshots.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Push an event.
    pub fn emit(&self, event: RaceEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> BoardView {
        let grid = Grid::open(5, 20)
            .unwrap()
            .with_walls(&[Position::new(0, 3)]);
        BoardView {
            grid: Arc::new(grid),
            agents: vec![AgentView {
                id: AgentId::new(0),
                kind: AgentKind::RoadRunner,
                position: Position::new(1, 1),
                steps: 4,
                frozen: false,
            }],
            total_steps: 4,
        }
    }

    #[test]
    fn test_glyph_rows() {
        let rows = view().glyph_rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "...#...............|");
        assert_eq!(rows[1], ".R.................|");
        assert_eq!(rows[2], "..................F|");
    }

    #[test]
    fn test_occupant_lookup() {
        let view = view();
        assert!(view.occupant(Position::new(1, 1)).is_some());
        assert!(view.occupant(Position::new(1, 2)).is_none());
    }

    #[test]
    fn test_event_display() {
        let shot = AbilityEvent {
            agent: AgentId::new(2),
            kind: AgentKind::YosemiteSam,
            action: AbilityAction::Shoot {
                freeze_ms: 1000,
                distance: 3,
            },
            target: Some(AgentId::new(0)),
        };
        assert_eq!(
            shot.to_string(),
            "[Update] YosemiteSam shoots RoadRunner - frozen for 1000 ms"
        );

        let jump = AbilityEvent {
            agent: AgentId::new(1),
            kind: AgentKind::Coyote,
            action: AbilityAction::Jump {
                from: Position::new(2, 5),
                to: Position::new(2, 7),
            },
            target: None,
        };
        assert_eq!(jump.to_string(), "[Update] Coyote jumps to (2,7)");
    }

    #[test]
    fn test_disabled_sink_drops_events() {
        let sink = EventSink::disabled();
        assert!(!sink.is_enabled());
        sink.emit(RaceEvent::Started { view: view() });
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(RaceEvent::Started { view: view() });
    }
}
