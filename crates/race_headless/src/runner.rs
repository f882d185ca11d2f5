//! Headless race runner.
//!
//! Runs the race on a worker thread and prints frames, ability lines and
//! the final summary as the events arrive. A `q` or `quit` line on stdin
//! or Ctrl-C cancels the race; the final board and summary still print.

use std::io::{self, BufRead, Write};
use std::thread::{self, JoinHandle};

use race_core::error::RaceError;
use race_core::prelude::{CancelToken, EventSink, Race, RaceConfig, RaceEvent, RaceSummary};
use thiserror::Error;

use crate::ascii_visualizer::{render_event, render_frame, render_summary, AsciiConfig};

/// Error type for runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Race setup failed.
    #[error("Race setup failed: {0}")]
    Setup(#[from] RaceError),
    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
    /// The race thread panicked.
    #[error("Race worker thread panicked")]
    WorkerPanicked,
}

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Race settings.
    pub race: RaceConfig,
    /// Frame rendering settings.
    pub ascii: AsciiConfig,
    /// Print a frame for every board change (vs only the final board).
    pub show_frames: bool,
    /// Watch stdin for a quit command.
    pub watch_stdin: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            race: RaceConfig::default(),
            ascii: AsciiConfig::default(),
            show_frames: true,
            watch_stdin: true,
        }
    }
}

/// Returns true for lines that ask the race to stop.
#[must_use]
pub fn is_quit_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit")
}

/// Read lines from `input` until a quit command, then trip `cancel`.
///
/// End of input does not cancel.
pub fn spawn_quit_watcher<R>(input: R, cancel: CancelToken) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(line) if is_quit_command(&line) => {
                    tracing::info!("Quit requested");
                    cancel.cancel();
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Stopped reading stdin");
                    return;
                }
            }
        }
    })
}

fn on_interrupt(cancel: &CancelToken) {
    tracing::info!("Interrupt received, stopping race");
    cancel.cancel();
}

/// Route Ctrl-C to `cancel` instead of killing the process.
///
/// Only one handler can be installed per process.
pub fn install_interrupt_handler(cancel: CancelToken) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || on_interrupt(&cancel))
}

/// Headless runner for a single race.
pub struct HeadlessRunner {
    config: RunnerConfig,
}

impl HeadlessRunner {
    /// Create a runner for the given race settings.
    pub fn new(race: RaceConfig) -> Self {
        Self::with_config(RunnerConfig {
            race,
            ..RunnerConfig::default()
        })
    }

    /// Create a runner with custom configuration.
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run the race, printing to stdout.
    pub fn run(self) -> Result<RaceSummary, RunnerError> {
        let cancel = CancelToken::new();
        if let Err(e) = install_interrupt_handler(cancel.clone()) {
            tracing::warn!(error = %e, "Ctrl-C will not stop the race gracefully");
        }
        if self.config.watch_stdin {
            // Detached: a blocked stdin read must not keep the race alive.
            let _ = spawn_quit_watcher(io::BufReader::new(io::stdin()), cancel.clone());
        }
        let race = Race::new(self.config.race.clone())?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_race(race, &mut out, cancel)
    }

    /// Run a prepared race, writing all output to `out`.
    pub fn run_race<W: Write>(
        &self,
        race: Race,
        out: &mut W,
        cancel: CancelToken,
    ) -> Result<RaceSummary, RunnerError> {
        let (sink, rx) = EventSink::channel();
        let worker = thread::spawn(move || race.run(sink, cancel));

        let ascii = &self.config.ascii;
        // The channel closes once the race and every agent loop dropped their sinks.
        for event in rx {
            match event {
                RaceEvent::Started { view } => {
                    write!(out, "{}", render_frame(&view, ascii))?;
                    writeln!(out)?;
                }
                RaceEvent::Frame { view, .. } => {
                    if self.config.show_frames {
                        write!(out, "{}", render_frame(&view, ascii))?;
                        writeln!(out)?;
                    }
                }
                RaceEvent::Ability { event, view } => {
                    if self.config.show_frames {
                        write!(out, "{}", render_frame(&view, ascii))?;
                    }
                    writeln!(out, "{}", render_event(&event, ascii))?;
                    writeln!(out)?;
                }
                RaceEvent::Finished(summary) => {
                    write!(out, "{}", render_frame(&summary.final_view, ascii))?;
                    write!(out, "{}", render_summary(&summary, ascii))?;
                }
            }
            out.flush()?;
        }

        worker.join().map_err(|_| RunnerError::WorkerPanicked)
    }
}
