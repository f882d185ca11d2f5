//! Headless terminal front end for the grid race.
//!
//! This crate wraps [`race_core`] for terminal use:
//!
//! - **Live runs**: frames and ability lines printed as the race unfolds
//! - **Batch runs**: many seeded races in parallel, aggregated into win rates
//! - **Scenarios**: named race setups as RON files or built-in presets
//!
//! # Output
//!
//! - **stdout**: board frames, ability lines, final summary
//! - **stderr**: logs (human-readable)
//! - **stdin**: `q` or `quit` cancels a live run
//!
//! # Example
//!
//! ```bash
//! # Run the classic three-racer race
//! cargo run -p race_headless
//!
//! # A short race on the smallest board with a fixed seed
//! cargo run -p race_headless -- run --scenario sprint --seed 42
//!
//! # 500 unpaced races in parallel
//! cargo run -p race_headless -- batch --count 500 --output results/
//! ```

pub mod ascii_visualizer;
pub mod batch;
pub mod runner;
pub mod scenario;

pub use ascii_visualizer::{render_frame, render_summary, AsciiConfig};
pub use batch::{run_batch, BatchConfig, BatchResults};
pub use runner::{HeadlessRunner, RunnerConfig, RunnerError};
pub use scenario::{Scenario, ScenarioError};
