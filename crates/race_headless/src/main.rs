//! Headless grid race runner.
//!
//! Runs the race in a terminal, prints every frame and ability, and ends
//! with a summary. Also runs seeded batches for win-rate statistics.
//!
//! # Usage
//!
//! ```bash
//! # Live race with the default settings (same as `run`)
//! cargo run -p race_headless
//!
//! # Pick a preset or a RON scenario file and override single values
//! cargo run -p race_headless -- run --scenario sprint --seed 7 --delay-ms 50
//!
//! # Run a batch of unpaced races
//! cargo run -p race_headless -- batch --scenario classic --count 1000 --output results/
//!
//! # Print the effective configuration as RON
//! cargo run -p race_headless -- show-config --scenario duel
//! ```
//!
//! Type `q` and Enter, or press Ctrl-C, while a race is running to stop it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use race_core::config::RaceConfig;
use race_headless::{
    ascii_visualizer::AsciiConfig,
    batch::{run_batch, BatchConfig},
    runner::{HeadlessRunner, RunnerConfig},
    scenario::{LoadedConfig, Scenario},
};

#[derive(Parser)]
#[command(name = "race_headless")]
#[command(about = "Concurrent grid race between RoadRunner, Coyote and YosemiteSam")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Values that override the scenario's race configuration.
#[derive(Args, Debug, Default, Clone)]
struct RaceOverrides {
    /// Preset name (classic, sprint, duel) or RON scenario file
    #[arg(short, long, default_value = "classic")]
    scenario: String,

    /// Plain RON race configuration file, replaces the scenario's config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid rows (minimum 5)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns (minimum 20)
    #[arg(long)]
    cols: Option<usize>,

    /// Number of racers (1 to 3)
    #[arg(long)]
    agents: Option<usize>,

    /// Random seed (random unless given here or set in the loaded file)
    #[arg(long)]
    seed: Option<u64>,

    /// Pause after every tick, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Cancellation poll slice while sleeping, in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Step budget across all racers (minimum 100)
    #[arg(long)]
    max_steps: Option<u64>,

    /// Probability of a goal-directed move
    #[arg(long)]
    goal_bias: Option<f64>,

    /// RoadRunner burst probability
    #[arg(long)]
    burst_chance: Option<f64>,

    /// Coyote jump probability
    #[arg(long)]
    jump_chance: Option<f64>,

    /// YosemiteSam shot probability
    #[arg(long)]
    shoot_chance: Option<f64>,

    /// YosemiteSam shot cooldown, in milliseconds
    #[arg(long)]
    shoot_cooldown: Option<u64>,

    /// Freeze duration of a shot, in milliseconds
    #[arg(long)]
    freeze_ms: Option<u64>,
}

impl RaceOverrides {
    fn default_run() -> Self {
        Self {
            scenario: "classic".to_string(),
            ..Self::default()
        }
    }

    /// Resolve the scenario and apply every given override, then clamp.
    fn resolve(&self) -> Result<(Scenario, RaceConfig), String> {
        let (scenario, mut seed_pinned) =
            Scenario::resolve_pinned(&self.scenario).map_err(|e| e.to_string())?;
        let mut config = match &self.config {
            Some(path) => {
                let loaded = LoadedConfig::load(path).map_err(|e| e.to_string())?;
                seed_pinned = loaded.seed_pinned;
                loaded.config
            }
            None => scenario.config.clone(),
        };

        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(agents) = self.agents {
            config.agents = agents;
        }
        match self.seed {
            Some(seed) => config.seed = seed,
            None if seed_pinned => {}
            None => config.seed = rand::random(),
        }
        if let Some(delay) = self.delay_ms {
            config.tick_delay_ms = delay;
        }
        if let Some(poll) = self.poll_ms {
            config.poll_interval_ms = poll;
        }
        if let Some(max_steps) = self.max_steps {
            config.max_steps = max_steps;
        }
        if let Some(bias) = self.goal_bias {
            config.goal_bias = bias;
        }

        let tuning = &mut config.abilities;
        if let Some(p) = self.burst_chance {
            tuning.burst_chance = p;
        }
        if let Some(p) = self.jump_chance {
            tuning.jump_chance = p;
        }
        if let Some(p) = self.shoot_chance {
            tuning.shoot_chance = p;
        }
        if let Some(ms) = self.shoot_cooldown {
            tuning.shoot_cooldown_ms = ms;
        }
        if let Some(ms) = self.freeze_ms {
            tuning.freeze_ms = ms;
        }

        Ok((scenario, config.clamped()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single live race
    Run {
        #[command(flatten)]
        race: RaceOverrides,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Draw borders with box-drawing characters
        #[arg(long)]
        unicode: bool,

        /// Print a glyph legend under each frame
        #[arg(long)]
        legend: bool,

        /// Only print the final board and summary
        #[arg(short, long)]
        quiet: bool,

        /// Do not watch stdin for a quit command
        #[arg(long)]
        no_stdin: bool,
    },

    /// Run a batch of unpaced races for win-rate statistics
    Batch {
        #[command(flatten)]
        race: RaceOverrides,

        /// Number of races to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel races (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Print the effective race configuration as RON
    ShowConfig {
        #[command(flatten)]
        race: RaceOverrides,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, stdout is for frames
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            race,
            no_color,
            unicode,
            legend,
            quiet,
            no_stdin,
        }) => {
            let ascii = AsciiConfig {
                use_color: !no_color,
                unicode_borders: unicode,
                show_legend: legend,
            };
            cmd_run(&race, ascii, quiet, no_stdin);
        }
        Some(Commands::Batch {
            race,
            count,
            parallel,
            output,
        }) => {
            cmd_batch(&race, count, parallel, output);
        }
        Some(Commands::ShowConfig { race }) => {
            cmd_show_config(&race);
        }
        None => {
            // Default: live race with default settings
            cmd_run(&RaceOverrides::default_run(), AsciiConfig::default(), false, false);
        }
    }
}

fn resolve_or_exit(race: &RaceOverrides) -> (Scenario, RaceConfig) {
    match race.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single live race
fn cmd_run(race: &RaceOverrides, ascii: AsciiConfig, quiet: bool, no_stdin: bool) {
    let (scenario, config) = resolve_or_exit(race);
    tracing::info!(scenario = %scenario.name, seed = config.seed, "Starting race");

    let runner = HeadlessRunner::with_config(RunnerConfig {
        race: config,
        ascii,
        show_frames: !quiet,
        watch_stdin: !no_stdin,
    });

    if let Err(e) = runner.run() {
        tracing::error!(error = %e, "Race failed");
        eprintln!("FATAL: {}", e);
        std::process::exit(1);
    }
}

/// Run a batch of races
fn cmd_batch(race: &RaceOverrides, count: u32, parallel: u32, output: PathBuf) {
    let (scenario, config) = resolve_or_exit(race);

    tracing::info!(
        scenario = %scenario.name,
        count = count,
        parallel = parallel,
        seed = config.seed,
        output = %output.display(),
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let batch = BatchConfig {
        parallel_races: parallel,
        ..BatchConfig::new(&scenario.name, config.clone(), count)
            .with_output(output.clone())
            .with_seed(config.seed)
    };
    let results = run_batch(batch);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Races run: {}", summary.total_races);
    if !results.errors.is_empty() {
        eprintln!("Races FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} races/sec",
        f64::from(summary.total_races) / results.duration_seconds.max(0.001)
    );
    eprintln!("\nWin Rates:");
    for (kind, rate) in &summary.win_rates {
        eprintln!("  {}: {:.1}%", kind, rate * 100.0);
    }
    eprintln!("  no winner: {}", summary.no_winner);
    eprintln!("Average winner steps: {:.1}", summary.avg_winner_steps);

    if !results.errors.is_empty() {
        eprintln!("\nRACE FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Race {} (seed {}): {}",
                error.race_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Print the effective configuration
fn cmd_show_config(race: &RaceOverrides) {
    let (mut scenario, config) = resolve_or_exit(race);
    scenario.config = config;
    match scenario.to_ron_string() {
        Ok(ron) => println!("{}", ron),
        Err(e) => {
            eprintln!("FATAL: Failed to serialize config: {}", e);
            std::process::exit(1);
        }
    }
}
