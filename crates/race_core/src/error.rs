//! Error types for the race core.

use thiserror::Error;

use crate::grid::{MIN_COLS, MIN_ROWS};

/// Result type alias using [`RaceError`].
pub type Result<T> = std::result::Result<T, RaceError>;

/// Top-level error type for race setup failures.
///
/// Gameplay outcomes such as rejected moves or abilities without a target
/// are never errors; they are reported through return values.
#[derive(Debug, Error)]
pub enum RaceError {
    /// Grid dimensions below the playable minimum.
    #[error("Invalid grid dimensions {rows}x{cols}: need at least {}x{}", MIN_ROWS, MIN_COLS)]
    InvalidDimensions {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },

    /// Agent count outside the supported range.
    #[error("Invalid agent count {0}: expected 1 to 3")]
    InvalidAgentCount(usize),

    /// A starting position is not a legal cell for an agent.
    #[error("Invalid start for agent {agent} at ({row}, {col}): {reason}")]
    InvalidPlacement {
        /// Agent index.
        agent: usize,
        /// Row of the rejected cell.
        row: i32,
        /// Column of the rejected cell.
        col: i32,
        /// Why the cell was rejected.
        reason: &'static str,
    },

    /// Not enough free cells to place every agent.
    #[error("No free start cell left for agent {0}")]
    NoFreeCell(usize),

    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a RON configuration.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}
