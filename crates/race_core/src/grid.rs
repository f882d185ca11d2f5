//! Static race terrain.
//!
//! The grid is built once during setup and never mutated afterwards:
//! - Open and wall cells in row-major order
//! - A single goal cell
//! - A finish boundary column no agent may enter
//!
//! Positions use signed coordinates so that candidate moves which fall off
//! the board can be represented and rejected instead of wrapping around.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RaceError, Result};

/// Smallest supported row count.
pub const MIN_ROWS: usize = 5;

/// Smallest supported column count.
pub const MIN_COLS: usize = 20;

/// One wall is sprinkled per this many cells.
pub const WALL_DENSITY_DIVISOR: usize = 30;

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Row index, growing downwards.
    pub row: i32,
    /// Column index, growing towards the finish.
    pub col: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Position reached by applying `delta` `times` times.
    #[must_use]
    pub const fn offset(self, delta: Displacement, times: i32) -> Self {
        Self {
            row: self.row + delta.row * times,
            col: self.col + delta.col * times,
        }
    }

    /// Manhattan distance to another position.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// A unit step (or no step) on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Displacement {
    /// Row change in `-1..=1`.
    pub row: i32,
    /// Column change in `-1..=1`.
    pub col: i32,
}

impl Displacement {
    /// One row up.
    pub const UP: Self = Self { row: -1, col: 0 };
    /// One row down.
    pub const DOWN: Self = Self { row: 1, col: 0 };
    /// One column left.
    pub const LEFT: Self = Self { row: 0, col: -1 };
    /// One column right.
    pub const RIGHT: Self = Self { row: 0, col: 1 };
    /// No movement.
    pub const STAY: Self = Self { row: 0, col: 0 };

    /// The five choices of the uniform fallback, in draw order.
    pub const ALL: [Self; 5] = [Self::UP, Self::DOWN, Self::LEFT, Self::RIGHT, Self::STAY];

    /// Returns true for the stay displacement.
    #[must_use]
    pub const fn is_stay(self) -> bool {
        self.row == 0 && self.col == 0
    }
}

/// Terrain kind of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    /// Walkable cell.
    #[default]
    Open,
    /// Impassable cell.
    Wall,
}

impl CellKind {
    /// Returns true if agents may stand on this cell.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Immutable race terrain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Cell data stored in row-major order.
    cells: Vec<CellKind>,
    goal: Position,
    finish_col: i32,
}

impl Grid {
    /// Create an all-open grid with the default goal and finish boundary.
    ///
    /// The goal sits in the middle row, two columns before the right edge;
    /// the finish boundary is the last column.
    pub fn open(rows: usize, cols: usize) -> Result<Self> {
        if rows < MIN_ROWS || cols < MIN_COLS {
            return Err(RaceError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![CellKind::Open; rows * cols],
            goal: Position::new((rows / 2) as i32, cols as i32 - 2),
            finish_col: cols as i32 - 1,
        })
    }

    /// Create a grid with a seeded sprinkle of walls.
    ///
    /// Draws `rows * cols / 30` wall cells in columns `0..=cols-3`. A draw
    /// landing on the goal is repeated; repeated cells are not.
    pub fn generate<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Self> {
        let mut grid = Self::open(rows, cols)?;
        let wall_count = rows * cols / WALL_DENSITY_DIVISOR;
        let max_col = grid.spawn_col_limit();

        let mut placed = 0;
        while placed < wall_count {
            let pos = Position::new(
                rng.gen_range(0..rows as i32),
                rng.gen_range(0..=max_col),
            );
            if pos == grid.goal {
                continue;
            }
            let idx = grid.index(pos);
            grid.cells[idx] = CellKind::Wall;
            placed += 1;
        }

        tracing::debug!(rows, cols, walls = wall_count, "Generated race grid");
        Ok(grid)
    }

    /// Mark the given cells as walls. Out-of-bounds cells and the goal are ignored.
    #[must_use]
    pub fn with_walls(mut self, walls: &[Position]) -> Self {
        for &pos in walls {
            if self.in_bounds(pos.row, pos.col) && pos != self.goal {
                let idx = self.index(pos);
                self.cells[idx] = CellKind::Wall;
            }
        }
        self
    }

    /// Move the goal cell, clearing any wall under it.
    ///
    /// Positions outside the board are ignored.
    #[must_use]
    pub fn with_goal(mut self, goal: Position) -> Self {
        if self.in_bounds(goal.row, goal.col) {
            let idx = self.index(goal);
            self.cells[idx] = CellKind::Open;
            self.goal = goal;
        }
        self
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// The goal cell.
    #[must_use]
    pub const fn goal(&self) -> Position {
        self.goal
    }

    /// The finish boundary column.
    #[must_use]
    pub const fn finish_col(&self) -> i32 {
        self.finish_col
    }

    /// Largest column used for walls and starting positions.
    #[must_use]
    pub const fn spawn_col_limit(&self) -> i32 {
        self.cols as i32 - 3
    }

    /// Returns true if the coordinate lies on the board.
    #[must_use]
    pub const fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && (row as usize) < self.rows && col >= 0 && (col as usize) < self.cols
    }

    /// Terrain at `pos`. Cells off the board read as walls.
    #[must_use]
    pub fn cell_kind(&self, pos: Position) -> CellKind {
        if self.in_bounds(pos.row, pos.col) {
            self.cells[self.index(pos)]
        } else {
            CellKind::Wall
        }
    }

    /// Returns true if `pos` is the goal cell.
    #[must_use]
    pub fn is_goal(&self, pos: Position) -> bool {
        pos == self.goal
    }

    /// Returns true iff `col` lies strictly before the finish boundary.
    #[must_use]
    pub const fn before_finish(&self, col: i32) -> bool {
        col < self.finish_col
    }

    /// Returns true if an agent may stand on `pos`, ignoring other agents.
    #[must_use]
    pub fn is_standable(&self, pos: Position) -> bool {
        self.in_bounds(pos.row, pos.col)
            && self.before_finish(pos.col)
            && self.cell_kind(pos).is_open()
    }

    /// Returns true if `pos` satisfies either win condition.
    ///
    /// Reaching the goal and reaching the column just before the finish
    /// boundary are independent triggers.
    #[must_use]
    pub fn is_winning(&self, pos: Position) -> bool {
        self.is_goal(pos) || pos.col >= self.finish_col - 1
    }

    /// Number of wall cells.
    #[must_use]
    pub fn wall_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_open()).count()
    }

    /// Raw terrain in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[CellKind] {
        &self.cells
    }

    fn index(&self, pos: Position) -> usize {
        pos.row as usize * self.cols + pos.col as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rejects_small_dimensions() {
        assert!(matches!(
            Grid::open(4, 20),
            Err(RaceError::InvalidDimensions { rows: 4, cols: 20 })
        ));
        assert!(Grid::open(5, 19).is_err());
        assert!(Grid::open(5, 20).is_ok());
    }

    #[test]
    fn test_default_goal_and_finish() {
        let grid = Grid::open(5, 20).unwrap();
        assert_eq!(grid.goal(), Position::new(2, 18));
        assert_eq!(grid.finish_col(), 19);
        assert!(grid.before_finish(18));
        assert!(!grid.before_finish(19));
    }

    #[test]
    fn test_bounds_and_standable() {
        let grid = Grid::open(5, 20).unwrap().with_walls(&[Position::new(1, 1)]);
        assert!(grid.in_bounds(0, 0));
        assert!(!grid.in_bounds(-1, 0));
        assert!(!grid.in_bounds(5, 0));
        assert!(!grid.in_bounds(0, 20));

        assert!(grid.is_standable(Position::new(0, 0)));
        assert!(!grid.is_standable(Position::new(1, 1)));
        assert!(!grid.is_standable(Position::new(0, 19)));
        assert_eq!(grid.cell_kind(Position::new(-3, 2)), CellKind::Wall);
    }

    #[test]
    fn test_with_walls_never_covers_goal() {
        let grid = Grid::open(5, 20).unwrap();
        let goal = grid.goal();
        let grid = grid.with_walls(&[goal, Position::new(40, 40)]);
        assert_eq!(grid.cell_kind(goal), CellKind::Open);
        assert_eq!(grid.wall_count(), 0);
    }

    #[test]
    fn test_win_conditions_are_independent() {
        let grid = Grid::open(5, 20).unwrap().with_goal(Position::new(0, 5));
        assert!(grid.is_winning(Position::new(0, 5)));
        assert!(grid.is_winning(Position::new(3, 18)));
        assert!(!grid.is_winning(Position::new(3, 17)));
    }

    #[test]
    fn test_generate_is_seeded() {
        let a = Grid::generate(18, 36, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = Grid::generate(18, 36, &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_wall_layout() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let grid = Grid::generate(18, 36, &mut rng).unwrap();

        assert!(grid.wall_count() > 0);
        assert!(grid.wall_count() <= 18 * 36 / WALL_DENSITY_DIVISOR);
        assert_eq!(grid.cell_kind(grid.goal()), CellKind::Open);
        for row in 0..18 {
            for col in (grid.spawn_col_limit() + 1)..36 {
                assert_eq!(grid.cell_kind(Position::new(row, col)), CellKind::Open);
            }
        }
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(Position::new(0, 0).manhattan(Position::new(3, -4)), 7);
        assert_eq!(
            Position::new(2, 2).offset(Displacement::RIGHT, 2),
            Position::new(2, 4)
        );
    }
}
