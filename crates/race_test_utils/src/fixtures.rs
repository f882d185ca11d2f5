//! Test fixtures and helpers.
//!
//! Pre-built grids, boards and configurations for consistent testing,
//! plus [`assert_board_invariants`] for checking any snapshot.

use std::collections::HashSet;

use race_core::prelude::*;

/// Smallest legal grid: 5x20, no walls, goal at (2,18), finish column 19.
#[must_use]
pub fn open_grid() -> Grid {
    Grid::open(5, 20).expect("5x20 is a legal grid")
}

/// [`open_grid`] with walls on the given cells.
#[must_use]
pub fn walled_grid(walls: &[(i32, i32)]) -> Grid {
    let walls: Vec<Position> = walls.iter().map(|&(r, c)| Position::new(r, c)).collect();
    open_grid().with_walls(&walls)
}

/// Board on `grid` with agents on the given cells, in roster order.
#[must_use]
pub fn board_on(grid: Grid, starts: &[(i32, i32)]) -> RaceBoard {
    let starts: Vec<Position> = starts.iter().map(|&(r, c)| Position::new(r, c)).collect();
    RaceBoard::new(grid, &starts).expect("fixture starts must be legal")
}

/// Board on [`open_grid`] with agents on the given cells.
#[must_use]
pub fn open_board(starts: &[(i32, i32)]) -> RaceBoard {
    board_on(open_grid(), starts)
}

/// Unpaced configuration for races that should finish quickly.
#[must_use]
pub fn fast_config() -> RaceConfig {
    RaceConfig {
        tick_delay_ms: 0,
        poll_interval_ms: 1,
        ..RaceConfig::default()
    }
}

/// Unpaced configuration with abilities disabled.
#[must_use]
pub fn plain_config() -> RaceConfig {
    RaceConfig {
        abilities: AbilityTuning::never(),
        ..fast_config()
    }
}

/// Panic if a snapshot breaks a board invariant.
///
/// Checked:
/// - every agent is in bounds, on an open cell and left of the finish column
/// - no two agents share a cell
/// - per-agent steps add up to the total
pub fn assert_board_invariants(view: &BoardView) {
    let grid = &view.grid;
    let mut seen = HashSet::new();

    for agent in &view.agents {
        let pos = agent.position;
        assert!(
            grid.in_bounds(pos.row, pos.col),
            "{} out of bounds at {pos}",
            agent.kind
        );
        assert!(
            grid.before_finish(pos.col),
            "{} past the finish at {pos}",
            agent.kind
        );
        assert!(
            grid.cell_kind(pos).is_open(),
            "{} on a wall at {pos}",
            agent.kind
        );
        assert!(seen.insert(pos), "two agents share {pos}");
    }

    let steps: u64 = view.agents.iter().map(|a| a.steps).sum();
    assert_eq!(steps, view.total_steps, "step totals disagree");
}

/// Panic unless the summary's winner really stands on a winning cell.
pub fn assert_winner_consistent(summary: &RaceSummary) {
    if let Some(winner) = summary.winner() {
        let view = &summary.final_view;
        let agent = view
            .agents
            .iter()
            .find(|a| a.id == winner)
            .expect("winner is on the board");
        assert!(
            view.grid.is_winning(agent.position),
            "{winner} recorded as winner at non-winning cell {}",
            agent.position
        );
        assert!(agent.steps >= 1, "winner never moved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_board_is_valid() {
        let board = board_on(walled_grid(&[(0, 5)]), &[(2, 0), (3, 0)]);
        assert_board_invariants(&board.snapshot());
        assert_eq!(board.agent_count(), 2);
    }

    #[test]
    #[should_panic(expected = "step totals disagree")]
    fn test_invariant_check_catches_bad_totals() {
        let mut view = open_board(&[(2, 0)]).snapshot();
        view.total_steps = 5;
        assert_board_invariants(&view);
    }

    #[test]
    #[should_panic(expected = "two agents share")]
    fn test_invariant_check_catches_shared_cell() {
        let mut view = open_board(&[(2, 0), (3, 0)]).snapshot();
        view.agents[1].position = Position::new(2, 0);
        assert_board_invariants(&view);
    }
}
