//! Campaign driver: trains every evader position in turn and handles
//! checkpoint cadence.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::agent::{EpisodeConfig, QLearningAgent};
use crate::error::{Error, Result};
use crate::persist;

/// Configuration for a full training campaign over all evader positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Per-position episode run.
    pub episode: EpisodeConfig,
    /// Persist the Q matrix after every this many evader positions.
    /// Zero disables intermediate checkpoints; the final save still runs.
    pub checkpoint_every: usize,
    /// Show a progress bar over evader positions.
    pub progress: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            episode: EpisodeConfig::default(),
            checkpoint_every: 25,
            progress: true,
        }
    }
}

/// Summary of one finished campaign, serializable for run records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Evader positions trained, in order.
    pub positions: Vec<usize>,
    /// Final convergence error per evader position, parallel to `positions`.
    pub final_errors: Vec<f64>,
    /// Total episodes run across all positions.
    pub total_episodes: usize,
    /// Checkpoints written during the run.
    pub checkpoints: Vec<PathBuf>,
}

impl CampaignSummary {
    /// Save the summary as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref()).map_err(|source| Error::Io {
            operation: format!("create summary file {}", path.as_ref().display()),
            source,
        })?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Drives per-evader-position training runs and persists artifacts.
///
/// The orchestrator owns no learning state of its own; it iterates the
/// agent over every free cell, collects the per-episode error records, and
/// saves Q-matrix checkpoints at the configured cadence.
#[derive(Debug, Clone)]
pub struct TrainingOrchestrator {
    config: CampaignConfig,
    checkpoint_dir: Option<PathBuf>,
    error_record_dir: Option<PathBuf>,
}

impl TrainingOrchestrator {
    pub fn new(config: CampaignConfig) -> Self {
        Self {
            config,
            checkpoint_dir: None,
            error_record_dir: None,
        }
    }

    /// Write Q-matrix checkpoints (and the final matrix) under `dir`.
    pub fn with_checkpoint_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.checkpoint_dir = Some(dir.into());
        self
    }

    /// Write one CSV error record per evader position under `dir`.
    pub fn with_error_record_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.error_record_dir = Some(dir.into());
        self
    }

    fn save_checkpoint(&self, agent: &QLearningAgent<'_>, name: &str) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.checkpoint_dir else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir).map_err(|source| Error::Io {
            operation: format!("create checkpoint directory {}", dir.display()),
            source,
        })?;
        let path = dir.join(format!("{name}.txt"));
        persist::save_matrix(agent.q_table(), &path)?;
        Ok(Some(path))
    }

    /// Run a fixed episode count for every free cell as evader position.
    ///
    /// The agent's Q-table accumulates across positions; each position's
    /// sub-table is independent, so the order does not matter.
    pub fn run(&self, agent: &mut QLearningAgent<'_>) -> Result<CampaignSummary> {
        let positions = agent.topology().free_cells();
        let bar = if self.config.progress {
            let bar = ProgressBar::new((positions.len() * self.config.episode.episodes) as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})",
                    )
                    .map_err(|e| Error::InvalidConfiguration {
                        message: format!("progress bar template: {e}"),
                    })?
                    .progress_chars("=>-"),
            );
            Some(bar)
        } else {
            None
        };

        if let Some(dir) = &self.error_record_dir {
            std::fs::create_dir_all(dir).map_err(|source| Error::Io {
                operation: format!("create error record directory {}", dir.display()),
                source,
            })?;
        }

        let mut summary = CampaignSummary {
            positions: Vec::with_capacity(positions.len()),
            final_errors: Vec::with_capacity(positions.len()),
            total_episodes: 0,
            checkpoints: Vec::new(),
        };

        for (trained, &position) in positions.iter().enumerate() {
            if let Some(bar) = &bar {
                bar.set_message(format!("evader {position}"));
            }
            agent.set_evader(position)?;
            let errors = agent.train(&self.config.episode, bar.as_ref())?;

            summary.positions.push(position);
            summary.final_errors.push(errors.last().copied().unwrap_or(0.0));
            summary.total_episodes += errors.len();

            if let Some(dir) = &self.error_record_dir {
                let path = dir.join(format!("record-{position}.csv"));
                persist::save_error_record(&errors, path)?;
            }

            let cadence = self.config.checkpoint_every;
            if cadence > 0 && (trained + 1) % cadence == 0 {
                let name = format!("qmatrix-checkpoint-{}", trained + 1);
                if let Some(path) = self.save_checkpoint(agent, &name)? {
                    summary.checkpoints.push(path);
                }
            }
        }

        if let Some(path) = self.save_checkpoint(agent, "qmatrix")? {
            summary.checkpoints.push(path);
        }
        if let Some(bar) = &bar {
            bar.finish_and_clear();
        }
        Ok(summary)
    }
}
