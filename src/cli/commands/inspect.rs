//! `inspect` command: render a maze and one diffusion heatmap.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use crate::cli::output::{render_grid, render_heatmap};
use crate::persist;
use crate::reward::{DiffusionParams, RewardFieldBuilder};
use crate::table::PursuerPair;

#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Map file: fixed-width rows of 'O' (free) and 'X' (wall)
    #[arg(long)]
    pub map: PathBuf,

    /// Evader cell the heat diffuses from
    #[arg(long)]
    pub evader: usize,

    /// Cells of the two pursuers blocking the diffusion
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    pub pursuers: Vec<usize>,

    /// Heat value at the evader cell
    #[arg(long, default_value_t = 400)]
    pub peak: i32,

    /// Heat lost per step away from the evader
    #[arg(long, default_value_t = 50)]
    pub decay: i32,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let topology = persist::load_topology(&args.map)
        .with_context(|| format!("loading map {}", args.map.display()))?;
    let pursuers = PursuerPair::new(args.pursuers[0], args.pursuers[1]);
    let key = pursuers
        .canonical()
        .ok_or_else(|| anyhow!("pursuer cells must be distinct"))?;

    let params = DiffusionParams {
        peak: args.peak,
        decay: args.decay,
    };
    let builder = RewardFieldBuilder::new(&topology, params);
    let heatmap = builder.heatmap(args.evader, key);

    println!("{}", render_grid(&topology, pursuers, args.evader));
    print!("{}", render_heatmap(&topology, &heatmap));
    Ok(())
}
