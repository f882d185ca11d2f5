//! Race configuration.
//!
//! [`RaceConfig`] is plain serde data so it can come from RON files, CLI
//! flags or code. The core assumes already-clamped values; callers run
//! [`RaceConfig::clamped`] on anything user-supplied.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent_kind::MAX_AGENTS;
use crate::error::{RaceError, Result};
use crate::grid::{MIN_COLS, MIN_ROWS};
use crate::policy::{MovementPolicy, DEFAULT_GOAL_BIAS};

/// Smallest accepted step budget.
pub const MIN_STEP_BUDGET: u64 = 100;

/// Tunables for the per-kind abilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityTuning {
    /// RoadRunner: chance of an extra step after a successful move.
    pub burst_chance: f64,
    /// Coyote: chance of jumping when the base move is blocked.
    pub jump_chance: f64,
    /// YosemiteSam: chance of shooting when off cooldown.
    pub shoot_chance: f64,
    /// YosemiteSam: time between shots, in milliseconds.
    pub shoot_cooldown_ms: u64,
    /// How long a shot target stays frozen, in milliseconds.
    pub freeze_ms: u64,
}

impl Default for AbilityTuning {
    fn default() -> Self {
        Self {
            burst_chance: 0.15,
            jump_chance: 0.25,
            shoot_chance: 0.15,
            shoot_cooldown_ms: 1500,
            freeze_ms: 1000,
        }
    }
}

impl AbilityTuning {
    /// Shot cooldown as a duration.
    #[must_use]
    pub const fn shoot_cooldown(&self) -> Duration {
        Duration::from_millis(self.shoot_cooldown_ms)
    }

    /// Freeze length as a duration.
    #[must_use]
    pub const fn freeze(&self) -> Duration {
        Duration::from_millis(self.freeze_ms)
    }

    /// Every ability always triggers. Handy for scripted scenarios.
    #[must_use]
    pub fn always() -> Self {
        Self {
            burst_chance: 1.0,
            jump_chance: 1.0,
            shoot_chance: 1.0,
            ..Self::default()
        }
    }

    /// No ability ever triggers.
    #[must_use]
    pub fn never() -> Self {
        Self {
            burst_chance: 0.0,
            jump_chance: 0.0,
            shoot_chance: 0.0,
            ..Self::default()
        }
    }
}

/// Full race configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Grid rows (at least 5).
    pub rows: usize,
    /// Grid columns (at least 20).
    pub cols: usize,
    /// Number of racers (1 to 3).
    pub agents: usize,
    /// Seed for terrain, start cells and per-agent draws.
    pub seed: u64,
    /// Pause after every tick, in milliseconds.
    pub tick_delay_ms: u64,
    /// Longest uninterrupted sleep, in milliseconds.
    ///
    /// Bounds how late a loop notices a stop request or the end of an
    /// incapacitation; smaller values react faster and wake more often.
    pub poll_interval_ms: u64,
    /// Active ticks across all agents before the race is called off.
    pub max_steps: u64,
    /// Probability of a goal-directed base move.
    pub goal_bias: f64,
    /// Ability tunables.
    pub abilities: AbilityTuning,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            rows: 18,
            cols: 36,
            agents: MAX_AGENTS,
            seed: 12345,
            tick_delay_ms: 120,
            poll_interval_ms: 10,
            max_steps: 10_000,
            goal_bias: DEFAULT_GOAL_BIAS,
            abilities: AbilityTuning::default(),
        }
    }
}

impl RaceConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| RaceError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    /// Parse a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the per-tick delay.
    #[must_use]
    pub const fn with_tick_delay_ms(mut self, delay_ms: u64) -> Self {
        self.tick_delay_ms = delay_ms;
        self
    }

    /// Clamp every value into its valid range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.rows = self.rows.max(MIN_ROWS);
        self.cols = self.cols.max(MIN_COLS);
        self.agents = self.agents.clamp(1, MAX_AGENTS);
        self.max_steps = self.max_steps.max(MIN_STEP_BUDGET);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self.goal_bias = clamp_probability(self.goal_bias);

        let tuning = &mut self.abilities;
        tuning.burst_chance = clamp_probability(tuning.burst_chance);
        tuning.jump_chance = clamp_probability(tuning.jump_chance);
        tuning.shoot_chance = clamp_probability(tuning.shoot_chance);
        self
    }

    /// Pause after every tick.
    #[must_use]
    pub const fn tick_delay(&self) -> Duration {
        Duration::from_millis(self.tick_delay_ms)
    }

    /// Longest uninterrupted sleep.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Movement policy for base moves.
    #[must_use]
    pub fn policy(&self) -> MovementPolicy {
        MovementPolicy::new(self.goal_bias)
    }

    /// Seed for one agent's private RNG.
    #[must_use]
    pub const fn agent_seed(&self, index: usize) -> u64 {
        self.seed.wrapping_add(777 * (index as u64 + 1))
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
