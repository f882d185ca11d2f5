//! Property tests for grid generation, goal steering and win recording.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use race_core::policy::toward_goal;
use race_core::prelude::*;
use race_test_utils::determinism::strategies;

proptest! {
    /// Generated walls stay left of the spawn limit and never cover the goal.
    #[test]
    fn prop_generated_walls_stay_in_the_spawn_area(
        seed in any::<u64>(),
        rows in 5usize..25,
        cols in 20usize..50,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = Grid::generate(rows, cols, &mut rng).unwrap();

        prop_assert!(grid.cell_kind(grid.goal()).is_open());
        prop_assert!(grid.wall_count() <= rows * cols / 30);
        for row in 0..rows as i32 {
            for col in grid.spawn_col_limit() + 1..cols as i32 {
                prop_assert!(grid.cell_kind(Position::new(row, col)).is_open());
            }
        }
    }

    /// An extra move off the goal always closes the Manhattan distance by one.
    #[test]
    fn prop_toward_goal_closes_distance(
        seed in any::<u64>(),
        from in strategies::arb_position(18, 36),
        goal in strategies::arb_position(18, 36),
    ) {
        prop_assume!(from != goal);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let next = from.offset(toward_goal(from, goal, &mut rng), 1);
        prop_assert_eq!(next.manhattan(goal) + 1, from.manhattan(goal));
    }

    /// Only one agent can ever be recorded as the winner.
    #[test]
    fn prop_first_win_sticks(order in Just(vec![0u8, 1, 2]).prop_shuffle()) {
        let grid = Grid::open(5, 20).unwrap();
        let starts = [Position::new(0, 18), Position::new(2, 18), Position::new(4, 18)];
        let board = RaceBoard::new(grid, &starts).unwrap();

        let first = AgentId::new(order[0]);
        prop_assert!(board.check_and_record_win(first));
        for &other in &order[1..] {
            prop_assert!(!board.check_and_record_win(AgentId::new(other)));
        }
        prop_assert_eq!(board.winner(), Some(first));
    }

    /// The nearest unfrozen rival is never the shooter and never frozen.
    #[test]
    fn prop_nearest_unfrozen_skips_frozen(
        frozen_mask in 0u8..8,
        cols in proptest::collection::vec(0i32..15, 3),
    ) {
        let starts: Vec<Position> = cols
            .iter()
            .enumerate()
            .map(|(row, &col)| Position::new(row as i32, col))
            .collect();
        let board = RaceBoard::new(Grid::open(5, 20).unwrap(), &starts).unwrap();
        let now = Instant::now();
        for id in AgentId::roster(3) {
            if frozen_mask & (1 << id.index()) != 0 {
                board.freeze(id, now, Duration::from_secs(60));
            }
        }

        let shooter = AgentId::new(2);
        let state = board.lock();
        match state.nearest_unfrozen(shooter, now) {
            Some((target, distance)) => {
                prop_assert_ne!(target, shooter);
                prop_assert!(!state.is_frozen(target, now));
                prop_assert_eq!(distance, state.position(shooter).manhattan(state.position(target)));
            }
            None => {
                prop_assert!(state.is_frozen(AgentId::new(0), now));
                prop_assert!(state.is_frozen(AgentId::new(1), now));
            }
        }
    }
}
