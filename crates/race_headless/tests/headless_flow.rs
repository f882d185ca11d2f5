//! Runner and batch flows driven the way the binary drives them.

use std::io::Cursor;

use race_core::prelude::{CancelToken, Race, RaceOutcome, StopReason};
use race_headless::ascii_visualizer::AsciiConfig;
use race_headless::batch::{run_batch, BatchConfig, BatchResults};
use race_headless::runner::{spawn_quit_watcher, HeadlessRunner, RunnerConfig};
use race_headless::scenario::Scenario;
use race_test_utils::fixtures::{
    assert_winner_consistent, board_on, open_board, plain_config, walled_grid,
};

fn runner(show_frames: bool) -> HeadlessRunner {
    HeadlessRunner::with_config(RunnerConfig {
        race: plain_config(),
        ascii: AsciiConfig::plain(),
        show_frames,
        watch_stdin: false,
    })
}

#[test]
fn test_every_frame_is_printed_before_the_summary() {
    let race = Race::with_board(plain_config(), open_board(&[(2, 0), (0, 0)]));
    let mut out = Vec::new();
    let summary = runner(true)
        .run_race(race, &mut out, CancelToken::new())
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_winner_consistent(&summary);
    // One frame per tick that moved, plus the start and the final board.
    let frames = text.matches("steps: ").count() as u64;
    assert!(frames >= 2);
    assert!(frames <= summary.total_steps + 2);

    let summary_at = text.find("=== Final Summary ===").unwrap();
    assert!(text.rfind("steps: ").unwrap() < summary_at);
    assert!(text.contains("RoadRunner (R) steps: "));
    assert!(text.contains("Coyote (C) steps: "));
}

#[test]
fn test_final_only_prints_two_boards() {
    let race = Race::with_board(plain_config(), open_board(&[(2, 0)]));
    let mut out = Vec::new();
    runner(false)
        .run_race(race, &mut out, CancelToken::new())
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(text.matches("steps: ").count(), 2);
    assert!(text.contains("Winner: RoadRunner"));
}

#[test]
fn test_quit_line_stops_the_race() {
    // Racer boxed in behind two wall columns never finishes on its own.
    let walls: Vec<(i32, i32)> = (0..5).flat_map(|r| [(r, 1), (r, 2)]).collect();
    let board = board_on(walled_grid(&walls), &[(2, 0)]);
    let config = race_core::config::RaceConfig {
        tick_delay_ms: 2,
        max_steps: 10_000_000,
        ..plain_config()
    };
    let race = Race::with_board(config, board);

    let cancel = CancelToken::new();
    let watcher = spawn_quit_watcher(Cursor::new(b"\nquit\n".to_vec()), cancel.clone());

    let mut out = Vec::new();
    let summary = runner(false).run_race(race, &mut out, cancel).unwrap();
    watcher.join().unwrap();

    assert_eq!(summary.outcome, RaceOutcome::NoWinner(StopReason::Cancelled));
    assert!(String::from_utf8(out).unwrap().contains("No winner: cancelled"));
}

#[test]
fn test_scenario_file_feeds_a_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.ron");
    let mut scenario = Scenario::sprint();
    scenario.name = "tiny".to_string();
    scenario.config.agents = 2;
    scenario.config.abilities.freeze_ms = 5;
    scenario.config.abilities.shoot_cooldown_ms = 10;
    std::fs::write(&path, scenario.to_ron_string().unwrap()).unwrap();

    let loaded = Scenario::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(loaded, scenario);

    let output = dir.path().join("out");
    let batch = BatchConfig::new(&loaded.name, loaded.config.clone(), 6)
        .with_output(output.clone())
        .with_seed(40);
    let results = run_batch(batch);
    let results_path = output.join("batch_results.json");
    results.save(&results_path).unwrap();

    let reloaded = BatchResults::load(&results_path).unwrap();
    assert_eq!(reloaded.config.scenario, "tiny");
    assert_eq!(reloaded.races.len(), 6);
    for record in &reloaded.races {
        assert_eq!(record.steps.len(), 2);
        assert_eq!(record.winner.is_some(), record.stop_reason.is_none());
    }
}
