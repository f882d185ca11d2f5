//! Determinism testing utilities.
//!
//! Threaded races interleave agents in whatever order the scheduler picks,
//! so full races are not reproducible. What is reproducible is everything
//! below the scheduler:
//!
//! - terrain and start cells for a given seed
//! - one agent's decisions given its seed and the board it sees
//! - any fixed interleaving of ticks under a virtual clock
//!
//! [`replay_round_robin`] drives every agent from one thread in roster
//! order with a virtual clock, which pins the interleaving down and lets
//! tests compare whole runs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use race_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of rounds replayed.
    pub rounds: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic replay).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that all runs matched.
    ///
    /// # Panics
    ///
    /// Panics with the diverging hashes if any run differed.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "Replay is non-deterministic after {} rounds: {} unique hashes {:?}",
            self.rounds,
            self.unique_hashes().len(),
            self.unique_hashes()
        );
    }
}

/// Final state of a round-robin replay.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Board after the last round.
    pub view: BoardView,
    /// Recorded winner, if any.
    pub winner: Option<AgentId>,
    /// Rounds actually played before every loop finished.
    pub rounds: u64,
}

impl Replay {
    /// Hash of positions, step counts and the winner.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let agents: Vec<_> = self
            .view
            .agents
            .iter()
            .map(|a| (a.id, a.position, a.steps))
            .collect();
        compute_hash(&(agents, self.view.total_steps, self.winner))
    }
}

/// Virtual time between replay rounds.
pub const ROUND_DURATION: Duration = Duration::from_millis(50);

/// Tick every agent once per round, in roster order, from the calling thread.
///
/// Round `n` runs at `start + n * ROUND_DURATION`, so freezes and cooldowns
/// expire on the virtual clock. Stops early once every loop is finished.
pub fn replay_round_robin(board: &RaceBoard, config: &RaceConfig, rounds: u64) -> Replay {
    let termination = Termination::new(config.max_steps, CancelToken::new());
    let mut loops: Vec<AgentLoop<'_>> = AgentId::roster(board.agent_count())
        .map(|id| AgentLoop::new(id, config, board, &termination, EventSink::disabled()))
        .collect();

    let start = Instant::now();
    let mut played = 0;
    for round in 0..rounds {
        let now = start + ROUND_DURATION * round as u32;
        let finished = loops
            .iter_mut()
            .map(|agent| agent.tick(now).state)
            .filter(|&state| state == AgentState::Finished)
            .count();
        played = round + 1;
        if finished == loops.len() {
            break;
        }
    }

    Replay {
        view: board.snapshot(),
        winner: board.winner(),
        rounds: played,
    }
}

/// Replay the same setup several times and compare final hashes.
///
/// # Example
///
/// ```
/// use race_test_utils::determinism::verify_replay_determinism;
/// use race_test_utils::fixtures::{fast_config, open_board};
///
/// let result = verify_replay_determinism(3, 200, || open_board(&[(2, 0), (0, 0)]), &fast_config());
/// result.assert_deterministic();
/// ```
pub fn verify_replay_determinism<Setup>(
    runs: usize,
    rounds: u64,
    setup: Setup,
    config: &RaceConfig,
) -> DeterminismResult
where
    Setup: Fn() -> RaceBoard,
{
    let hashes: Vec<u64> = (0..runs)
        .map(|_| replay_round_robin(&setup(), config, rounds).state_hash())
        .collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        rounds,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for race inputs.
pub mod strategies {
    use proptest::prelude::*;
    use race_core::prelude::*;

    /// Any cell on a `rows` x `cols` grid.
    pub fn arb_position(rows: i32, cols: i32) -> impl Strategy<Value = Position> {
        (0..rows, 0..cols).prop_map(|(r, c)| Position::new(r, c))
    }

    /// One of the five unit displacements.
    pub fn arb_displacement() -> impl Strategy<Value = Displacement> {
        prop::sample::select(Displacement::ALL.to_vec())
    }

    /// Up to `max` wall cells on the smallest grid, left of the spawn limit.
    pub fn arb_walls(max: usize) -> impl Strategy<Value = Vec<Position>> {
        proptest::collection::vec(arb_position(5, 18), 0..max)
    }

    /// Scripted moves for up to three agents.
    pub fn arb_move_script(max_len: usize) -> impl Strategy<Value = Vec<(u8, Displacement)>> {
        proptest::collection::vec((0u8..3, arb_displacement()), 0..max_len)
    }

    /// Small unpaced configurations with varying seeds and shapes.
    pub fn arb_config() -> impl Strategy<Value = RaceConfig> {
        (any::<u64>(), 5usize..12, 20usize..40, 1usize..=3, 0.0f64..=1.0).prop_map(
            |(seed, rows, cols, agents, goal_bias)| RaceConfig {
                rows,
                cols,
                agents,
                seed,
                goal_bias,
                tick_delay_ms: 0,
                max_steps: 2_000,
                ..RaceConfig::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assert_board_invariants, fast_config, open_board, open_grid, plain_config};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_single_agent_replay_is_deterministic() {
        let result = verify_replay_determinism(4, 500, || open_board(&[(2, 0)]), &plain_config());
        result.assert_deterministic();
    }

    #[test]
    fn test_three_agent_replay_is_deterministic() {
        let config = RaceConfig {
            abilities: AbilityTuning::always(),
            ..fast_config()
        };
        let result =
            verify_replay_determinism(3, 500, || open_board(&[(0, 0), (2, 0), (4, 0)]), &config);
        result.assert_deterministic();
    }

    #[test]
    fn test_replay_finds_a_winner() {
        let replay = replay_round_robin(&open_board(&[(2, 0)]), &plain_config(), 10_000);
        assert_eq!(replay.winner, Some(AgentId::new(0)));
        assert_board_invariants(&replay.view);
    }

    proptest! {
        /// Policy output is always one of the five unit displacements.
        #[test]
        fn prop_policy_steps_are_unit(
            seed in any::<u64>(),
            bias in 0.0f64..=1.0,
            from in strategies::arb_position(18, 36),
            goal in strategies::arb_position(18, 36),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let step = MovementPolicy::new(bias).decide(from, goal, &mut rng);
            prop_assert!(Displacement::ALL.contains(&step));
            prop_assert!(step.row.abs() + step.col.abs() <= 1);
        }

        /// Scripted moves never break board invariants, and steps count
        /// exactly the accepted moves.
        #[test]
        fn prop_scripted_moves_keep_invariants(
            walls in strategies::arb_walls(20),
            script in strategies::arb_move_script(200),
        ) {
            let starts = [Position::new(0, 0), Position::new(2, 0), Position::new(4, 0)];
            let walls: Vec<_> = walls.into_iter().filter(|w| !starts.contains(w)).collect();
            let board = RaceBoard::new(open_grid().with_walls(&walls), &starts).unwrap();

            let mut accepted = [0u64; 3];
            for (agent, delta) in script {
                let id = AgentId::new(agent);
                if board.lock().step(id, delta).moved() {
                    accepted[id.index()] += 1;
                }
                assert_board_invariants(&board.snapshot());
            }

            let view = board.snapshot();
            for agent in &view.agents {
                prop_assert_eq!(agent.steps, accepted[agent.id.index()]);
            }
        }

        /// Seeded setup is reproducible and always legal.
        #[test]
        fn prop_seeded_setup_is_reproducible(config in strategies::arb_config()) {
            let a = Race::new(config.clone()).unwrap().board().snapshot();
            let b = Race::new(config).unwrap().board().snapshot();
            prop_assert_eq!(&a.agents, &b.agents);
            prop_assert_eq!(&a.grid, &b.grid);
            assert_board_invariants(&a);
        }

        /// Round-robin replays keep every invariant and are repeatable.
        #[test]
        fn prop_replays_keep_invariants(config in strategies::arb_config()) {
            let setup = || {
                let race = Race::new(config.clone()).unwrap();
                let view = race.board().snapshot();
                let starts: Vec<_> = view.agents.iter().map(|a| a.position).collect();
                RaceBoard::new((*view.grid).clone(), &starts).unwrap()
            };

            let replay = replay_round_robin(&setup(), &config, 300);
            assert_board_invariants(&replay.view);
            if let Some(winner) = replay.winner {
                let pos = replay.view.agents[winner.index()].position;
                prop_assert!(replay.view.grid.is_winning(pos));
            }

            verify_replay_determinism(2, 300, setup, &config).assert_deterministic();
        }
    }
}
