//! `play` command: drive the evader against trained pursuers over stdin.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::output::render_grid;
use crate::persist;
use crate::play::{PursuitGame, TurnOutcome};
use crate::table::PursuerPair;

#[derive(Debug, Parser)]
pub struct PlayArgs {
    /// Map file: fixed-width rows of 'O' (free) and 'X' (wall)
    #[arg(long)]
    pub map: PathBuf,

    /// Trained Q matrix produced by the `train` command
    #[arg(long)]
    pub q_matrix: PathBuf,

    /// Starting evader cell
    #[arg(long)]
    pub evader: usize,

    /// Starting cells of the two pursuers
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    pub pursuers: Vec<usize>,

    /// Random seed for pursuer tie-breaking
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn execute(args: PlayArgs) -> Result<()> {
    let topology = persist::load_topology(&args.map)
        .with_context(|| format!("loading map {}", args.map.display()))?;
    let q_table = persist::load_matrix(&args.q_matrix, &topology)
        .with_context(|| format!("loading Q matrix {}", args.q_matrix.display()))?;

    let pursuers = PursuerPair::new(args.pursuers[0], args.pursuers[1]);
    let mut game = PursuitGame::new(&topology, &q_table, pursuers, args.evader, args.seed)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    println!("Move the evader: -1 stay, 0 north, 1 east, 2 south, 3 west, q to quit.");
    loop {
        print!("{}", render_grid(&topology, game.pursuers(), game.evader()));
        print!("> ");
        stdout.flush().context("flushing prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("reading move")? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }
        let Ok(request) = line.parse::<i64>() else {
            println!("Enter -1, 0..3, or q.");
            continue;
        };

        match game.play_turn(request) {
            Ok(TurnOutcome::Blocked) => println!("Blocked. Pick another move."),
            Ok(TurnOutcome::Evaded) => {}
            Ok(TurnOutcome::Captured) => {
                print!("{}", render_grid(&topology, game.pursuers(), game.evader()));
                println!("Captured.");
                break;
            }
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}
