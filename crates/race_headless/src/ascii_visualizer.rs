//! ASCII race visualizer.
//!
//! Renders board snapshots, ability lines and the final summary as text
//! for terminal output.

use std::fmt::Write as _;

use race_core::prelude::*;
use race_core::snapshot::{FINISH_GLYPH, GOAL_GLYPH, WALL_GLYPH};

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Use colored output (ANSI).
    pub use_color: bool,
    /// Draw borders with box-drawing characters instead of `+-|`.
    pub unicode_borders: bool,
    /// Print a glyph legend under each frame.
    pub show_legend: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            unicode_borders: false,
            show_legend: false,
        }
    }
}

impl AsciiConfig {
    /// Plain output, no colors, no legend.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            use_color: false,
            ..Self::default()
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[90m";
}

fn kind_color(kind: AgentKind) -> &'static str {
    match kind {
        AgentKind::RoadRunner => colors::CYAN,
        AgentKind::Coyote => colors::YELLOW,
        AgentKind::YosemiteSam => colors::RED,
    }
}

struct Border {
    corner_tl: char,
    corner_tr: char,
    corner_bl: char,
    corner_br: char,
    horizontal: char,
    vertical: char,
}

impl Border {
    const fn for_config(config: &AsciiConfig) -> Self {
        if config.unicode_borders {
            Self {
                corner_tl: '╔',
                corner_tr: '╗',
                corner_bl: '╚',
                corner_br: '╝',
                horizontal: '═',
                vertical: '║',
            }
        } else {
            Self {
                corner_tl: '+',
                corner_tr: '+',
                corner_bl: '+',
                corner_br: '+',
                horizontal: '-',
                vertical: '|',
            }
        }
    }

    fn line(&self, left: char, right: char, width: usize) -> String {
        let mut line = String::with_capacity(width + 2);
        line.push(left);
        line.extend(std::iter::repeat(self.horizontal).take(width));
        line.push(right);
        line
    }
}

fn paint(out: &mut String, glyph: char, color: &str, config: &AsciiConfig) {
    if config.use_color && !color.is_empty() {
        out.push_str(color);
        out.push(glyph);
        out.push_str(colors::RESET);
    } else {
        out.push(glyph);
    }
}

fn glyph_color(view: &BoardView, pos: Position, glyph: char) -> String {
    if let Some(agent) = view.occupant(pos) {
        let base = kind_color(agent.kind);
        return if agent.frozen {
            format!("{}{}", colors::DIM, base)
        } else {
            format!("{}{}", colors::BOLD, base)
        };
    }
    match glyph {
        GOAL_GLYPH => format!("{}{}", colors::BOLD, colors::GREEN),
        WALL_GLYPH | FINISH_GLYPH => colors::GRAY.to_string(),
        _ => String::new(),
    }
}

/// Render one board frame followed by its step counter.
///
/// ```
/// use race_core::prelude::*;
/// use race_headless::ascii_visualizer::{render_frame, AsciiConfig};
///
/// let board = RaceBoard::new(Grid::open(5, 20).unwrap(), &[Position::new(2, 0)]).unwrap();
/// let frame = render_frame(&board.snapshot(), &AsciiConfig::plain());
/// assert!(frame.starts_with("+--------------------+"));
/// assert!(frame.contains("steps: 0"));
/// ```
pub fn render_frame(view: &BoardView, config: &AsciiConfig) -> String {
    let border = Border::for_config(config);
    let width = view.grid.cols();
    let mut output = String::new();

    output.push_str(&border.line(border.corner_tl, border.corner_tr, width));
    output.push('\n');

    for row in 0..view.grid.rows() as i32 {
        output.push(border.vertical);
        for col in 0..width as i32 {
            let pos = Position::new(row, col);
            let glyph = view.glyph_at(pos);
            let color = if config.use_color {
                glyph_color(view, pos, glyph)
            } else {
                String::new()
            };
            paint(&mut output, glyph, &color, config);
        }
        output.push(border.vertical);
        output.push('\n');
    }

    output.push_str(&border.line(border.corner_bl, border.corner_br, width));
    output.push('\n');

    if config.show_legend {
        let legend: Vec<String> = view
            .agents
            .iter()
            .map(|a| {
                let frozen = if a.frozen { " (frozen)" } else { "" };
                format!("{}={}{}", a.kind.glyph(), a.kind, frozen)
            })
            .collect();
        let _ = writeln!(
            output,
            "{}  {}=goal {}=finish {}=wall",
            legend.join(" "),
            GOAL_GLYPH,
            FINISH_GLYPH,
            WALL_GLYPH
        );
    }

    let _ = writeln!(output, "steps: {}", view.total_steps);
    output
}

/// Render an ability line such as `[Update] Coyote jumps to (2,7)`.
pub fn render_event(event: &AbilityEvent, config: &AsciiConfig) -> String {
    if config.use_color {
        format!("{}{}{}", kind_color(event.kind), event, colors::RESET)
    } else {
        event.to_string()
    }
}

/// Human-readable reason for a race without a winner.
#[must_use]
pub const fn describe_stop(reason: StopReason) -> &'static str {
    match reason {
        StopReason::Winner(_) => "finished",
        StopReason::Cancelled => "cancelled",
        StopReason::BudgetExhausted => "step budget exhausted",
    }
}

/// Render the final summary block.
pub fn render_summary(summary: &RaceSummary, config: &AsciiConfig) -> String {
    let (bold, reset) = if config.use_color {
        (colors::BOLD, colors::RESET)
    } else {
        ("", "")
    };
    let mut output = String::new();

    let _ = writeln!(output, "{bold}=== Final Summary ==={reset}");
    for agent in &summary.agents {
        let _ = writeln!(
            output,
            "{} ({}) steps: {}",
            agent.kind,
            agent.kind.glyph(),
            agent.steps
        );
    }
    match summary.outcome {
        RaceOutcome::Winner(agent) => {
            let _ = writeln!(output, "{bold}Winner: {}{reset}", agent.kind());
        }
        RaceOutcome::NoWinner(reason) => {
            let _ = writeln!(output, "No winner: {}", describe_stop(reason));
        }
    }
    let _ = writeln!(
        output,
        "Elapsed: {:.2}s ({} budget ticks)",
        summary.elapsed.as_secs_f64(),
        summary.ticks_used
    );
    output
}
