//! # Race Core
//!
//! Concurrent grid race between three racers with special abilities.
//!
//! This crate contains **only** the race itself:
//! - No rendering
//! - No terminal or file IO apart from loading a config file
//! - All randomness comes from seeded ChaCha streams
//!
//! Each racer runs on its own thread and mutates the shared board under a
//! single lock, so the board invariants hold at every observable instant:
//! at most one agent per cell, no agent on a wall or past the finish
//! boundary, and exactly one recorded winner at most.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Terrain, positions and displacements
//! - [`board`] - The shared, lock-protected race state
//! - [`policy`] - Goal-biased movement choice
//! - [`ability`] - Burst, jump and shoot, plus the shot cooldown
//! - [`agent`] - Per-racer control loop
//! - [`termination`] - Stop flag, stop reason and step budget
//! - [`race`] - Setup, threads and the final summary
//! - [`snapshot`] - Board views and the renderer event stream

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ability;
pub mod agent;
pub mod agent_kind;
pub mod board;
pub mod config;
pub mod error;
pub mod grid;
pub mod policy;
pub mod race;
pub mod snapshot;
pub mod termination;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ability::{Ability, Cooldown};
    pub use crate::agent::{AgentLoop, AgentState};
    pub use crate::agent_kind::{AgentId, AgentKind, MAX_AGENTS};
    pub use crate::board::{BlockReason, BoardState, RaceBoard, StepOutcome};
    pub use crate::config::{AbilityTuning, RaceConfig};
    pub use crate::error::{RaceError, Result};
    pub use crate::grid::{CellKind, Displacement, Grid, Position};
    pub use crate::policy::MovementPolicy;
    pub use crate::race::{AgentSummary, Race, RaceOutcome, RaceSummary};
    pub use crate::snapshot::{AbilityAction, AbilityEvent, AgentView, BoardView, EventSink, RaceEvent};
    pub use crate::termination::{CancelToken, StopReason, Termination};
}
