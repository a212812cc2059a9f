//! End-to-end tests of the headless runner.
//!
//! Scenario files on disk, batch result persistence and map rendering.

use civ_core::civilization::CivId;
use civ_headless::ascii_visualizer::{render_ascii, AsciiConfig};
use civ_headless::batch::{run_batch, BatchConfig, BatchResults};
use civ_headless::metrics::EndCondition;
use civ_headless::runner::GameRunner;
use civ_headless::scenario::{Scenario, ScenarioError};

const SKIRMISH: &str = r#"Scenario(
    name: "skirmish",
    description: "Three civilizations on a small map",
    game: (
        map: (width: 18, height: 14, seed: 31),
        civs: [(name: "Rome"), (name: "Carthage"), (name: "Egypt", is_human: true)],
    ),
    max_rounds: 6,
    victory: (elimination: false),
)"#;

#[test]
fn scenario_file_loads_and_plays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skirmish.ron");
    std::fs::write(&path, SKIRMISH).unwrap();

    let scenario = Scenario::resolve(path.to_str().unwrap()).unwrap();
    assert_eq!(scenario.name, "skirmish");
    assert_eq!(scenario.game.civs.len(), 3);
    assert!(!scenario.victory.elimination);

    let metrics = GameRunner::new(scenario).run().unwrap();
    assert_eq!(metrics.rounds_played, 6);
    assert_eq!(metrics.end_condition, EndCondition::RoundLimit);
    assert_eq!(metrics.game_id, "skirmish-31");
    assert_eq!(metrics.civs["Egypt"].moves, 0);
}

#[test]
fn malformed_scenario_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "Scenario(name: ").unwrap();

    let err = Scenario::load(&path).unwrap_err();
    assert!(matches!(err, ScenarioError::ParseError(_)));
}

#[test]
fn batch_results_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig::new(Scenario::duel().with_max_rounds(2), 3)
        .with_seed(40)
        .with_output(dir.path().to_path_buf());
    let results = run_batch(config);
    assert!(results.errors.is_empty());

    let path = dir.path().join("nested").join("batch_results.json");
    results.save(&path).unwrap();
    let loaded = BatchResults::load(&path).unwrap();

    assert_eq!(loaded.games, results.games);
    assert_eq!(loaded.summary.games, 3);
    assert_eq!(loaded.config.seed_start, 40);
    assert_eq!(loaded.config.scenario.name, "duel");
}

#[test]
fn same_seed_same_game() {
    let scenario = Scenario::four_way().with_max_rounds(4).with_seed(77);
    let first = GameRunner::new(scenario.clone()).run().unwrap();
    let second = GameRunner::new(scenario).run().unwrap();
    assert_eq!(first.final_state_hash, second.final_state_hash);
    assert_eq!(first.events, second.events);
}

#[test]
fn rendered_map_has_a_row_per_tile_row() {
    let runner = GameRunner::new(Scenario::duel());
    let mut game = runner.build_game().unwrap();
    game.run_rounds(2).unwrap();

    let out = render_ascii(&game, &AsciiConfig::plain());
    let lines: Vec<&str> = out.lines().collect();
    // header, two borders, 20 map rows, one legend line per civ
    assert_eq!(lines.len(), 1 + 2 + 20 + 2);
    assert!(lines[0].starts_with("Round 2 | "));
    assert!(lines[1..23].iter().all(|l| l.chars().count() == 22));
}

#[test]
fn fogged_map_shows_own_units_and_hides_the_unknown() {
    let runner = GameRunner::new(Scenario::duel());
    let mut game = runner.build_game().unwrap();
    game.run_rounds(1).unwrap();

    let config = AsciiConfig {
        viewer: Some(CivId(0)),
        show_legend: false,
        use_color: false,
    };
    let out = render_ascii(&game, &config);
    let map: String = out.lines().skip(2).take(20).collect();
    assert!(map.contains('a') || map.contains('A'));
    assert!(map.contains(' '));
}
