//! Persistence round-trips for reward and Q matrices.

use gridchase::persist::{load_matrix, save_matrix};
use gridchase::{
    AgentParams, DiffusionParams, EpisodeConfig, Error, GridTopology, PursuerPair,
    QLearningAgent, RewardFieldBuilder,
};
use tempfile::tempdir;

fn walled_maze() -> GridTopology {
    GridTopology::parse("OOOO\nOXXO\nOOOO").unwrap()
}

#[test]
fn reward_matrix_round_trips_exactly() {
    let grid = walled_maze();
    let field = RewardFieldBuilder::new(&grid, DiffusionParams::default()).build();

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("rmatrix.txt");
    save_matrix(&field, &path).unwrap();
    let reloaded = load_matrix(&path, &grid).unwrap();

    assert_eq!(reloaded, field);
    // Spot-check that negative entries survived: capture states are all -1.
    let key = gridchase::PairKey::new(0, 1).unwrap();
    assert!(reloaded.row(0, key).unwrap().iter().all(|&r| r == -1));
}

#[test]
fn compounded_reward_matrix_round_trips_exactly() {
    let grid = walled_maze();
    let field = RewardFieldBuilder::new(&grid, DiffusionParams::default())
        .with_time_multiplier(0.3)
        .build();

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("compound.txt");
    save_matrix(&field, &path).unwrap();
    assert_eq!(load_matrix(&path, &grid).unwrap(), field);
}

#[test]
fn trained_q_matrix_round_trips_exactly() {
    let grid = walled_maze();
    let field = RewardFieldBuilder::new(&grid, DiffusionParams::default()).build();
    let params = AgentParams {
        seed: Some(99),
        ..AgentParams::default()
    };
    let mut agent = QLearningAgent::new(&grid, &field, PursuerPair::new(0, 3), 9, params).unwrap();
    let config = EpisodeConfig {
        episodes: 20,
        max_steps: 300,
        epsilon_delta: 0.7,
        randomize_start: true,
    };
    agent.train(&config, None).unwrap();

    let tmp = tempdir().unwrap();
    let path = tmp.path().join("qmatrix.txt");
    save_matrix(agent.q_table(), &path).unwrap();
    let reloaded = load_matrix(&path, &grid).unwrap();
    assert_eq!(&reloaded, agent.q_table());
}

#[test]
fn load_reports_file_and_line_for_malformed_input() {
    let grid = GridTopology::parse("OO").unwrap();
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("broken.txt");
    let good = format!("0|1|0 = 1{}", "|1".repeat(15));
    let bad = "0|1|1 = not-a-number";
    std::fs::write(&path, format!("{good}\n{bad}\n")).unwrap();

    let err = load_matrix(&path, &grid).unwrap_err();
    match err {
        Error::MalformedMatrixLine { file, line, .. } => {
            assert!(file.ends_with("broken.txt"));
            assert_eq!(line, 1);
        }
        other => panic!("expected MalformedMatrixLine, got {other}"),
    }
}

#[test]
fn load_rejects_duplicate_states() {
    let grid = GridTopology::parse("OO").unwrap();
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("dup.txt");
    let line = format!("0|1|0 = 5{}", "|5".repeat(15));
    std::fs::write(&path, format!("{line}\n{line}\n")).unwrap();

    let err = load_matrix(&path, &grid).unwrap_err();
    assert!(matches!(err, Error::MalformedMatrixLine { line: 1, .. }));
}

#[test]
fn load_accepts_blank_lines_between_records() {
    let grid = GridTopology::parse("OO").unwrap();
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("spaced.txt");
    let first = format!("0|1|0 = -1{}", "|-1".repeat(15));
    let second = format!("0|1|1 = 7{}", "|7".repeat(15));
    std::fs::write(&path, format!("{first}\n\n{second}\n")).unwrap();

    let table = load_matrix(&path, &grid).unwrap();
    let key = gridchase::PairKey::new(0, 1).unwrap();
    assert_eq!(table.row(0, key).unwrap()[0], -1);
    assert_eq!(table.row(1, key).unwrap()[0], 7);
}
