//! `build` command: construct the full reward matrix for a maze.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use crate::persist;
use crate::reward::{DiffusionParams, RewardFieldBuilder};

#[derive(Debug, Parser)]
pub struct BuildArgs {
    /// Map file: fixed-width rows of 'O' (free) and 'X' (wall)
    #[arg(long)]
    pub map: PathBuf,

    /// Output path for the reward matrix
    #[arg(long)]
    pub output: PathBuf,

    /// Heat value at the evader cell
    #[arg(long, default_value_t = 400)]
    pub peak: i32,

    /// Heat lost per step away from the evader
    #[arg(long, default_value_t = 50)]
    pub decay: i32,

    /// One-step-ahead reward compounding weight; disabled when not positive
    #[arg(long, default_value_t = -1.0)]
    pub time_multiplier: f64,
}

pub fn execute(args: BuildArgs) -> Result<()> {
    let topology = persist::load_topology(&args.map)
        .with_context(|| format!("loading map {}", args.map.display()))?;
    println!(
        "Map {}x{}: {} free cells, {} walls",
        topology.width(),
        topology.height(),
        topology.free_cells().len(),
        topology.wall_cells().len()
    );

    let params = DiffusionParams {
        peak: args.peak,
        decay: args.decay,
    };
    let mut builder = RewardFieldBuilder::new(&topology, params);
    if args.time_multiplier > 0.0 {
        builder = builder.with_time_multiplier(args.time_multiplier);
        println!("Temporal compounding enabled (t = {})", args.time_multiplier);
    }

    let bar = ProgressBar::new(topology.free_cells().len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} evader positions")?
            .progress_chars("=>-"),
    );
    let field = builder.build_with_progress(&bar);
    bar.finish_and_clear();

    persist::save_matrix(&field, &args.output)
        .with_context(|| format!("saving reward matrix to {}", args.output.display()))?;
    println!(
        "Saved {} states to {}",
        field.state_count(),
        args.output.display()
    );
    Ok(())
}
