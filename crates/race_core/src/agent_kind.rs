//! Agent identity: numeric ids and the fixed roster of racer kinds.
//!
//! Racers are assigned kinds by index: the first agent is always the
//! RoadRunner, the second the Coyote, the third YosemiteSam. Each kind has
//! its own glyph, pacing cadence and special ability.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of racers on one board.
pub const MAX_AGENTS: usize = 3;

/// Index of an agent on the board.
///
/// # Example
///
/// ```
/// use race_core::agent_kind::{AgentId, AgentKind};
///
/// let id = AgentId::new(1);
/// assert_eq!(id.index(), 1);
/// assert_eq!(id.kind(), AgentKind::Coyote);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(u8);

impl AgentId {
    /// Create an agent id from a roster index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Roster index as `usize` for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Kind assigned to this roster slot.
    #[must_use]
    pub const fn kind(self) -> AgentKind {
        AgentKind::for_index(self.index())
    }

    /// Iterate over the first `count` agent ids.
    pub fn roster(count: usize) -> impl Iterator<Item = Self> {
        (0..count.min(MAX_AGENTS)).map(|i| Self(i as u8))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().name())
    }
}

/// Racer kinds, each with a distinct cadence and ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    /// Fastest racer; may take an extra step after moving.
    RoadRunner,
    /// May jump over whatever blocks its path.
    Coyote,
    /// May shoot and freeze the nearest rival.
    YosemiteSam,
}

impl AgentKind {
    /// All kinds in roster order.
    pub const ALL: [Self; MAX_AGENTS] = [Self::RoadRunner, Self::Coyote, Self::YosemiteSam];

    /// Kind for a roster index; indices past the roster wrap around.
    #[must_use]
    pub const fn for_index(index: usize) -> Self {
        Self::ALL[index % MAX_AGENTS]
    }

    /// Board glyph.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::RoadRunner => 'R',
            Self::Coyote => 'C',
            Self::YosemiteSam => 'Y',
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RoadRunner => "RoadRunner",
            Self::Coyote => "Coyote",
            Self::YosemiteSam => "YosemiteSam",
        }
    }

    /// Re-poll interval while incapacitated.
    #[must_use]
    pub const fn cadence(self) -> Duration {
        match self {
            Self::RoadRunner => Duration::from_millis(35),
            Self::Coyote => Duration::from_millis(60),
            Self::YosemiteSam => Duration::from_millis(75),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
