//! Race termination.
//!
//! A race ends for one of three reasons, whichever comes first:
//! - an agent records the win
//! - the external [`CancelToken`] is tripped
//! - the shared step budget runs out
//!
//! Agent loops never block on each other; they poll
//! [`Termination::should_stop`] at the top of every iteration and between
//! sleep slices.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::agent_kind::AgentId;

/// External stop request, shared between the race and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untripped token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop to stop at its next iteration boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once [`Self::cancel`] was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Why the race stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// An agent reached the goal or the finish column.
    Winner(AgentId),
    /// The cancel token was tripped.
    Cancelled,
    /// The step budget ran out without a winner.
    BudgetExhausted,
}

/// Shared stop flag, stop reason and step budget.
#[derive(Debug)]
pub struct Termination {
    stop: AtomicBool,
    reason: OnceLock<StopReason>,
    ticks: AtomicU64,
    budget: u64,
    cancel: CancelToken,
}

impl Termination {
    /// Create a coordinator allowing `budget` active ticks in total.
    #[must_use]
    pub fn new(budget: u64, cancel: CancelToken) -> Self {
        Self {
            stop: AtomicBool::new(false),
            reason: OnceLock::new(),
            ticks: AtomicU64::new(0),
            budget,
            cancel,
        }
    }

    /// Stop the race. Only the first reason sticks.
    ///
    /// Returns true for the call that actually stopped the race.
    pub fn finish(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.stop.store(true, Ordering::Release);
        if first {
            match reason {
                StopReason::Winner(agent) => tracing::info!(%agent, "Race won"),
                StopReason::Cancelled => tracing::warn!("Race cancelled"),
                StopReason::BudgetExhausted => {
                    tracing::info!(budget = self.budget, "Step budget exhausted")
                }
            }
        }
        first
    }

    /// Whether the stop flag is already set. Does not look at the cancel token.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Poll for a stop request, converting a tripped cancel token into a stop.
    pub fn should_stop(&self) -> bool {
        if self.is_stopped() {
            return true;
        }
        if self.cancel.is_cancelled() {
            self.finish(StopReason::Cancelled);
            return true;
        }
        false
    }

    /// Claim one tick from the budget.
    ///
    /// Returns false, and stops the race, once the budget is spent.
    pub fn consume_tick(&self) -> bool {
        let used = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        if used > self.budget {
            self.finish(StopReason::BudgetExhausted);
            return false;
        }
        true
    }

    /// Ticks claimed so far, capped at the budget.
    #[must_use]
    pub fn ticks_used(&self) -> u64 {
        self.ticks.load(Ordering::Acquire).min(self.budget)
    }

    /// Configured budget.
    #[must_use]
    pub const fn budget(&self) -> u64 {
        self.budget
    }

    /// Recorded stop reason.
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }
}
