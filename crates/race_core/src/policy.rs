//! Goal-biased movement policy.
//!
//! The policy is a pure function of the current position, the goal and
//! the random draws it consumes. Given the same RNG state it always picks
//! the same displacement, which keeps single-agent behavior reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::{Displacement, Position};

/// Default probability of stepping towards the goal.
pub const DEFAULT_GOAL_BIAS: f64 = 0.70;

/// Chooses one unit displacement per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementPolicy {
    /// Probability in `[0, 1]` of taking a goal-directed step.
    pub goal_bias: f64,
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self {
            goal_bias: DEFAULT_GOAL_BIAS,
        }
    }
}

impl MovementPolicy {
    /// Create a policy with the given goal bias.
    #[must_use]
    pub fn new(goal_bias: f64) -> Self {
        Self {
            goal_bias: goal_bias.clamp(0.0, 1.0),
        }
    }

    /// Pick the displacement for a base move.
    ///
    /// With probability `goal_bias` the step follows an axis on which the
    /// goal still differs; otherwise, or when already on the goal, one of
    /// the five uniform options is drawn.
    pub fn decide<R: Rng + ?Sized>(&self, from: Position, goal: Position, rng: &mut R) -> Displacement {
        if rng.gen::<f64>() < self.goal_bias {
            if let Some(step) = goal_step(from, goal, rng) {
                return step;
            }
        }
        uniform_step(rng)
    }
}

/// Always-biased displacement, used for extra moves.
///
/// Falls back to the uniform choice when already on the goal.
pub fn toward_goal<R: Rng + ?Sized>(from: Position, goal: Position, rng: &mut R) -> Displacement {
    goal_step(from, goal, rng).unwrap_or_else(|| uniform_step(rng))
}

/// Uniform choice among up, down, left, right and stay.
pub fn uniform_step<R: Rng + ?Sized>(rng: &mut R) -> Displacement {
    Displacement::ALL[rng.gen_range(0..Displacement::ALL.len())]
}

/// Single-axis step towards the goal, or `None` when already there.
///
/// When both axes still differ the axis is chosen by a fair coin.
fn goal_step<R: Rng + ?Sized>(from: Position, goal: Position, rng: &mut R) -> Option<Displacement> {
    let row = (goal.row - from.row).signum();
    let col = (goal.col - from.col).signum();

    match (row != 0, col != 0) {
        (false, false) => None,
        (true, false) => Some(Displacement { row, col: 0 }),
        (false, true) => Some(Displacement { row: 0, col }),
        (true, true) => {
            if rng.gen_bool(0.5) {
                Some(Displacement { row, col: 0 })
            } else {
                Some(Displacement { row: 0, col })
            }
        }
    }
}
