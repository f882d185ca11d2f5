//! Per-kind special abilities.
//!
//! Each racer kind carries exactly one [`Ability`]. Abilities run after
//! the base move, on the same board guard, so they see and mutate the same
//! consistent state as the move they follow.
//!
//! | Kind        | Ability               | Trigger                          |
//! |-------------|-----------------------|----------------------------------|
//! | RoadRunner  | [`Ability::Burst`]    | base move accepted               |
//! | Coyote      | [`Ability::Jump`]     | base move blocked                |
//! | YosemiteSam | [`Ability::Shoot`]    | off cooldown, any move outcome   |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::agent_kind::{AgentId, AgentKind};
use crate::board::{BoardState, StepOutcome};
use crate::config::AbilityTuning;
use crate::grid::Displacement;
use crate::policy;
use crate::snapshot::{AbilityAction, AbilityEvent};

/// Time-gated flag that clears itself once its deadline passes.
///
/// The deadline is stored as nanoseconds since the cooldown's creation in
/// one atomic, so reads and re-arming never block and no timer thread is
/// needed: the flag is simply re-evaluated against the clock on every read.
#[derive(Debug)]
pub struct Cooldown {
    epoch: Instant,
    /// Deadline in nanoseconds since `epoch`; zero means never engaged.
    ready_at: AtomicU64,
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new()
    }
}

impl Cooldown {
    /// Create an idle cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self::with_epoch(Instant::now())
    }

    /// Create an idle cooldown measuring time from `epoch`.
    ///
    /// Instants passed to the other methods should not precede `epoch`.
    #[must_use]
    pub const fn with_epoch(epoch: Instant) -> Self {
        Self {
            epoch,
            ready_at: AtomicU64::new(0),
        }
    }

    fn nanos(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.epoch).as_nanos()).unwrap_or(u64::MAX)
    }

    /// Returns true while the cooldown is running at `now`.
    #[must_use]
    pub fn is_active(&self, now: Instant) -> bool {
        self.nanos(now) < self.ready_at.load(Ordering::Acquire)
    }

    /// Time left until the cooldown clears.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        let ready_at = self.ready_at.load(Ordering::Acquire);
        Duration::from_nanos(ready_at.saturating_sub(self.nanos(now)))
    }

    /// Start the cooldown for `period` unless it is already running.
    ///
    /// Returns false, leaving the deadline untouched, when still active.
    pub fn try_engage(&self, now: Instant, period: Duration) -> bool {
        let now_ns = self.nanos(now);
        let period_ns = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
        let mut current = self.ready_at.load(Ordering::Acquire);
        loop {
            if now_ns < current {
                return false;
            }
            match self.ready_at.compare_exchange_weak(
                current,
                now_ns.saturating_add(period_ns),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Inputs an ability sees after the base move.
#[derive(Debug, Clone, Copy)]
pub struct AbilityContext {
    /// Acting agent.
    pub agent: AgentId,
    /// Displacement the base move attempted.
    pub delta: Displacement,
    /// What happened to the base move.
    pub base: StepOutcome,
    /// Clock reading for this tick.
    pub now: Instant,
}

/// The special behavior of one racer.
#[derive(Debug)]
pub enum Ability {
    /// Extra goal-directed step after an accepted base move.
    Burst {
        /// Trigger probability.
        chance: f64,
    },
    /// Two-cell jump in the intended direction after a blocked base move.
    Jump {
        /// Trigger probability.
        chance: f64,
    },
    /// Freeze the nearest unfrozen rival, then wait out a cooldown.
    Shoot {
        /// Trigger probability while off cooldown.
        chance: f64,
        /// How long the target stays frozen.
        freeze: Duration,
        /// Time between shots.
        period: Duration,
        /// Shot cooldown.
        cooldown: Cooldown,
    },
}

impl Ability {
    /// Ability carried by a racer kind.
    #[must_use]
    pub fn for_kind(kind: AgentKind, tuning: &AbilityTuning) -> Self {
        match kind {
            AgentKind::RoadRunner => Self::Burst {
                chance: tuning.burst_chance,
            },
            AgentKind::Coyote => Self::Jump {
                chance: tuning.jump_chance,
            },
            AgentKind::YosemiteSam => Self::Shoot {
                chance: tuning.shoot_chance,
                freeze: tuning.freeze(),
                period: tuning.shoot_cooldown(),
                cooldown: Cooldown::new(),
            },
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Burst { .. } => "burst",
            Self::Jump { .. } => "jump",
            Self::Shoot { .. } => "shoot",
        }
    }

    /// Time left on a running cooldown, `None` when the ability is ready.
    #[must_use]
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        match self {
            Self::Shoot { cooldown, .. } if cooldown.is_active(now) => Some(cooldown.remaining(now)),
            _ => None,
        }
    }

    /// Run the ability on the locked board.
    ///
    /// Returns an event when the board changed. Failed attempts (no valid
    /// landing cell, no eligible target, lost draw) change nothing.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        board: &mut BoardState,
        ctx: AbilityContext,
        rng: &mut R,
    ) -> Option<AbilityEvent> {
        let agent = ctx.agent;
        let event = |action, target| AbilityEvent {
            agent,
            kind: agent.kind(),
            action,
            target,
        };

        match self {
            Self::Burst { chance } => {
                if !ctx.base.moved() || !roll(rng, *chance) {
                    return None;
                }
                let goal = board.grid().goal();
                let delta = policy::toward_goal(board.position(agent), goal, rng);
                match board.step(agent, delta) {
                    StepOutcome::Moved { from, to } => {
                        Some(event(AbilityAction::Burst { from, to }, None))
                    }
                    StepOutcome::Blocked { .. } => None,
                }
            }
            Self::Jump { chance } => {
                let StepOutcome::Blocked { from, .. } = ctx.base else {
                    return None;
                };
                if ctx.delta.is_stay() || !roll(rng, *chance) {
                    return None;
                }
                match board.move_to(agent, from.offset(ctx.delta, 2)) {
                    StepOutcome::Moved { from, to } => {
                        Some(event(AbilityAction::Jump { from, to }, None))
                    }
                    StepOutcome::Blocked { .. } => None,
                }
            }
            Self::Shoot {
                chance,
                freeze,
                period,
                cooldown,
            } => {
                if cooldown.is_active(ctx.now) || !roll(rng, *chance) {
                    return None;
                }
                let (target, distance) = board.nearest_unfrozen(agent, ctx.now)?;
                if !cooldown.try_engage(ctx.now, *period) {
                    return None;
                }
                board.freeze(target, ctx.now, *freeze);
                Some(event(
                    AbilityAction::Shoot {
                        freeze_ms: u64::try_from(freeze.as_millis()).unwrap_or(u64::MAX),
                        distance,
                    },
                    Some(target),
                ))
            }
        }
    }
}

fn roll<R: Rng + ?Sized>(rng: &mut R, chance: f64) -> bool {
    rng.gen::<f64>() < chance
}
