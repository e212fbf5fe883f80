//! Two-pursuer grid pursuit trained with tabular Q-learning.
//!
//! This crate provides:
//! - Maze topology with a legality resolver for joint two-pursuer moves
//! - Diffusion-based reward fields built per (evader, pursuer-pair) state
//! - A tabular Q-learning agent with a reward-shaped Bellman update
//! - A campaign orchestrator with checkpointing and error records
//! - Text persistence for reward/Q matrices and an interactive play loop

pub mod actions;
pub mod agent;
pub mod cli;
pub mod error;
pub mod grid;
pub mod persist;
pub mod play;
pub mod reward;
pub mod table;
pub mod trainer;

pub use actions::{ActionResolver, EvaderMove, JOINT_ACTION_COUNT, JointAction};
pub use agent::{AgentParams, EpisodeConfig, QLearningAgent, epsilon_for_episode};
pub use error::{Error, Result};
pub use grid::{Direction, GridTopology};
pub use play::{PursuitGame, TurnOutcome};
pub use reward::{DiffusionParams, ILLEGAL_REWARD, RewardField, RewardFieldBuilder, WALL_VALUE};
pub use table::{ActionRow, PairKey, PursuerPair, StateIndex, StateTable};
pub use trainer::{CampaignConfig, CampaignSummary, TrainingOrchestrator};
