//! Batch race runner.
//!
//! Runs many seeded races in parallel using rayon, with pacing turned off,
//! and aggregates who wins how often.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use race_core::prelude::{
    AgentId, AgentKind, CancelToken, EventSink, Race, RaceConfig, RaceOutcome, RaceSummary,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ascii_visualizer::describe_stop;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name, for reporting
    pub scenario: String,
    /// Race settings shared by every race; the seed is replaced per race
    pub race: RaceConfig,
    /// Number of races to run
    pub race_count: u32,
    /// Maximum parallel races (0 = use rayon default)
    pub parallel_races: u32,
    /// Seed of the first race; race `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "classic".to_string(),
            race: RaceConfig::default(),
            race_count: 100,
            parallel_races: 0,
            seed_start: 0,
            output_dir: PathBuf::from("results"),
        }
    }
}

impl BatchConfig {
    /// Create config for a race setup
    pub fn new(scenario: &str, race: RaceConfig, race_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            race,
            race_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }
}

/// Result of one race in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    /// Seed used
    pub seed: u64,
    /// Winner kind, if any
    pub winner: Option<AgentKind>,
    /// Why the race stopped without a winner
    pub stop_reason: Option<String>,
    /// Per-agent steps in roster order
    pub steps: Vec<u64>,
    /// Budget ticks consumed
    pub ticks_used: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl RaceRecord {
    fn from_summary(seed: u64, summary: &RaceSummary) -> Self {
        let stop_reason = match summary.outcome {
            RaceOutcome::Winner(_) => None,
            RaceOutcome::NoWinner(reason) => Some(describe_stop(reason).to_string()),
        };
        Self {
            seed,
            winner: summary.winner().map(AgentId::kind),
            stop_reason,
            steps: summary.agents.iter().map(|a| a.steps).collect(),
            ticks_used: summary.ticks_used,
            duration_ms: summary.elapsed.as_millis() as u64,
        }
    }
}

/// Aggregate statistics over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Races that completed
    pub total_races: u32,
    /// Wins per kind name
    pub wins: BTreeMap<String, u32>,
    /// Win rate per kind name, over all races
    pub win_rates: BTreeMap<String, f64>,
    /// Races that ended without a winner
    pub no_winner: u32,
    /// Average step count of the winner, over races with a winner
    pub avg_winner_steps: f64,
    /// Average budget ticks per race
    pub avg_ticks: f64,
}

impl BatchSummary {
    /// Aggregate race records
    pub fn from_records(records: &[RaceRecord]) -> Self {
        let total = records.len() as u32;
        let mut wins: BTreeMap<String, u32> = BTreeMap::new();
        let mut winner_steps = 0u64;

        for record in records {
            if let Some(kind) = record.winner {
                *wins.entry(kind.name().to_string()).or_insert(0) += 1;
                let index = AgentKind::ALL.iter().position(|k| *k == kind).unwrap_or(0);
                winner_steps += record.steps.get(index).copied().unwrap_or(0);
            }
        }

        let won: u32 = wins.values().sum();
        let win_rates = wins
            .iter()
            .map(|(k, v)| (k.clone(), f64::from(*v) / f64::from(total.max(1))))
            .collect();
        let ticks: u64 = records.iter().map(|r| r.ticks_used).sum();

        Self {
            total_races: total,
            wins,
            win_rates,
            no_winner: total - won,
            avg_winner_steps: winner_steps as f64 / f64::from(won.max(1)),
            avg_ticks: ticks as f64 / f64::from(total.max(1)),
        }
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual race records, in seed order
    pub races: Vec<RaceRecord>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Race index
    pub race_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total races
    pub total: u32,
    /// Completed races
    completed: AtomicU32,
    /// Start time
    pub start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed race, returning the new count
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }
}

/// Run one unpaced race with the given seed.
pub fn run_single_race(race: &RaceConfig, seed: u64) -> race_core::error::Result<RaceRecord> {
    let config = RaceConfig {
        seed,
        tick_delay_ms: 0,
        ..race.clone()
    };
    let summary = Race::new(config)?.run(EventSink::disabled(), CancelToken::new());
    Ok(RaceRecord::from_summary(seed, &summary))
}

/// Run a batch of races
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.race_count);

    info!(
        "Starting batch run: {} races of '{}'",
        config.race_count, config.scenario
    );

    let run = || -> Vec<Result<RaceRecord, BatchError>> {
        (0..config.race_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                match run_single_race(&config.race, seed) {
                    Ok(record) => {
                        let completed = progress.record_completion();
                        if completed % 10 == 0 {
                            debug!(
                                "Progress: {}/{} ({:.0}%)",
                                completed,
                                config.race_count,
                                progress.percentage()
                            );
                        }
                        Ok(record)
                    }
                    Err(e) => {
                        warn!("Race {} failed: {}", i, e);
                        Err(BatchError {
                            race_index: i,
                            seed,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    };

    // A dedicated pool keeps the global one untouched.
    let results = if config.parallel_races > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_races as usize)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using global pool", e);
                run()
            }
        }
    } else {
        run()
    };

    let (races, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let races: Vec<RaceRecord> = races.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_records(&races);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} races in {:.1}s ({:.1} races/sec)",
        races.len(),
        duration_seconds,
        races.len() as f64 / duration_seconds.max(0.001)
    );

    BatchResults {
        config,
        races,
        summary,
        duration_seconds,
        errors,
    }
}
