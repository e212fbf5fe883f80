//! gridchase CLI - tabular Q-learning toolkit for two-pursuer grid pursuit
//!
//! This CLI provides a unified interface for:
//! - Building diffusion-based reward matrices from maze maps
//! - Inspecting a maze and its diffusion heatmaps
//! - Training the joint pursuer agent against a reward matrix
//! - Playing the evader interactively against a trained Q matrix

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gridchase")]
#[command(version, about = "Tabular Q-learning toolkit for two-pursuer grid pursuit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full reward matrix for a maze
    Build(gridchase::cli::commands::build::BuildArgs),

    /// Render a maze and one diffusion heatmap
    Inspect(gridchase::cli::commands::inspect::InspectArgs),

    /// Train the pursuer agent over every evader position
    Train(Box<gridchase::cli::commands::train::TrainArgs>),

    /// Play the evader against trained pursuers
    Play(gridchase::cli::commands::play::PlayArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => gridchase::cli::commands::build::execute(args),
        Commands::Inspect(args) => gridchase::cli::commands::inspect::execute(args),
        Commands::Train(args) => gridchase::cli::commands::train::execute(*args),
        Commands::Play(args) => gridchase::cli::commands::play::execute(args),
    }
}
