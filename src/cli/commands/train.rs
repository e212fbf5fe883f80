//! `train` command: run a full training campaign over a reward matrix.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use crate::agent::{AgentParams, EpisodeConfig, QLearningAgent};
use crate::persist;
use crate::table::PursuerPair;
use crate::trainer::{CampaignConfig, TrainingOrchestrator};

#[derive(Debug, Parser)]
pub struct TrainArgs {
    /// Map file: fixed-width rows of 'O' (free) and 'X' (wall)
    #[arg(long)]
    pub map: PathBuf,

    /// Reward matrix produced by the `build` command
    #[arg(long)]
    pub rewards: PathBuf,

    /// Resume from a previously saved Q matrix instead of starting from zero
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Directory for Q-matrix checkpoints and error records
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Episodes per evader position
    #[arg(long, default_value_t = 10_000)]
    pub episodes: usize,

    /// Step cap per episode
    #[arg(long, default_value_t = 3_000)]
    pub max_steps: usize,

    /// Learning rate alpha
    #[arg(long, default_value_t = 0.05)]
    pub learning_rate: f64,

    /// Discount factor gamma
    #[arg(long, default_value_t = 0.15)]
    pub discount_factor: f64,

    /// Initial exploration rate
    #[arg(long, default_value_t = 1.0)]
    pub epsilon: f64,

    /// Total epsilon decay across each position's episodes
    #[arg(long, default_value_t = 0.7)]
    pub epsilon_delta: f64,

    /// Evader positions between Q-matrix checkpoints (0 disables)
    #[arg(long, default_value_t = 25)]
    pub checkpoint_every: usize,

    /// Keep the pursuers' fixed start instead of random respawns
    #[arg(long)]
    pub fixed_start: bool,

    /// Random seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Optional JSON summary output path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    pub quiet: bool,
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let topology = persist::load_topology(&args.map)
        .with_context(|| format!("loading map {}", args.map.display()))?;
    let rewards = persist::load_matrix(&args.rewards, &topology)
        .with_context(|| format!("loading reward matrix {}", args.rewards.display()))?;

    let free = topology.free_cells();
    let (&first, &second, &evader) = match (free.first(), free.get(1), free.get(2)) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => return Err(anyhow!("map needs at least 3 free cells")),
    };

    let params = AgentParams {
        learning_rate: args.learning_rate,
        discount_factor: args.discount_factor,
        epsilon: args.epsilon,
        seed: args.seed,
    };
    let mut agent = match &args.resume {
        Some(path) => {
            let q_table = persist::load_matrix(path, &topology)
                .with_context(|| format!("loading Q matrix {}", path.display()))?;
            QLearningAgent::with_q_table(
                &topology,
                &rewards,
                q_table,
                PursuerPair::new(first, second),
                evader,
                params,
            )?
        }
        None => QLearningAgent::new(
            &topology,
            &rewards,
            PursuerPair::new(first, second),
            evader,
            params,
        )?,
    };

    let config = CampaignConfig {
        episode: EpisodeConfig {
            episodes: args.episodes,
            max_steps: args.max_steps,
            epsilon_delta: args.epsilon_delta,
            randomize_start: !args.fixed_start,
        },
        checkpoint_every: args.checkpoint_every,
        progress: !args.quiet,
    };
    let orchestrator = TrainingOrchestrator::new(config)
        .with_checkpoint_dir(&args.output_dir)
        .with_error_record_dir(args.output_dir.join("error-records"));

    let summary = orchestrator.run(&mut agent)?;
    println!(
        "Trained {} evader positions over {} episodes",
        summary.positions.len(),
        summary.total_episodes
    );
    if let Some(worst) = summary
        .final_errors
        .iter()
        .cloned()
        .fold(None::<f64>, |acc, e| Some(acc.map_or(e, |a| a.max(e))))
    {
        println!("Worst final convergence error: {worst}");
    }

    if let Some(path) = &args.summary {
        summary
            .save(path)
            .with_context(|| format!("saving summary to {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }
    Ok(())
}
