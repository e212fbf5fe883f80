//! Tabular Q-learning agent for the joint pursuer pair.
//!
//! The agent owns one Q-table slice per evader position (same arena shape
//! as the reward field), picks joint actions epsilon-greedily, and applies
//! a reward-shaped Bellman update: the lookahead term is the reward
//! field's maximum at the successor state, not the Q-table's. That variant
//! is deliberate and must not be "corrected" to canonical Q-learning; it
//! changes convergence behavior.
//!
//! Positions are stored in physical-identity order. Canonical ordering
//! exists only at the table boundary: lookups derive the sorted key and,
//! when the identities are swapped by sorting, transpose the action index
//! so component 1 always means pursuer A's move.

use indicatif::ProgressBar;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::actions::{ActionResolver, JointAction};
use crate::error::{Error, Result};
use crate::grid::GridTopology;
use crate::reward::{ILLEGAL_REWARD, RewardField};
use crate::table::{ActionRow, PairKey, PursuerPair, StateTable};

/// Learning parameters for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    /// Learning rate alpha.
    pub learning_rate: f64,
    /// Discount factor gamma applied to the successor lookahead.
    pub discount_factor: f64,
    /// Initial exploration rate.
    pub epsilon: f64,
    /// Random seed; `None` draws one from the system generator.
    pub seed: Option<u64>,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            discount_factor: 0.15,
            epsilon: 1.0,
            seed: None,
        }
    }
}

/// Per-evader-position training run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Episodes per evader position.
    pub episodes: usize,
    /// Step cap per episode; hitting it ends the episode with a warning.
    pub max_steps: usize,
    /// Total epsilon decay over the run (epsilon ends near `epsilon - delta`).
    pub epsilon_delta: f64,
    /// Respawn the pursuers at a random legal placement each episode, or
    /// restore the fixed starting placement.
    pub randomize_start: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            max_steps: 3_000,
            epsilon_delta: 0.7,
            randomize_start: true,
        }
    }
}

/// Exploration rate in effect during 0-based episode `episode` of `total`.
///
/// A downward-opening parabola in index space: `epsilon` at episode 0,
/// then `delta * ((i - N) / N)^2 + (epsilon - delta)`, dropping steepest
/// early and flattening toward `epsilon - delta`. The bias toward heavy
/// early exploration is intentional.
pub fn epsilon_for_episode(episode: usize, total: usize, epsilon: f64, delta: f64) -> f64 {
    if episode == 0 || total == 0 {
        return epsilon;
    }
    let n = total as f64;
    let offset = (episode as f64 - n) / n;
    delta * offset * offset + (epsilon - delta)
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Greedy selection shared by training and interactive play: uniform over
/// the legal actions whose recorded value equals the row maximum taken over
/// all 16 entries, illegal ones included. `None` when no legal action
/// reaches the maximum (an illegal entry carries a spuriously high value);
/// callers fall back to uniform-over-legal.
pub(crate) fn exploit_action(
    rng: &mut StdRng,
    row: &ActionRow,
    swapped: bool,
    resolved: &[(JointAction, PursuerPair)],
) -> Option<(JointAction, PursuerPair)> {
    let max_value = row.iter().copied().max().unwrap_or(ILLEGAL_REWARD);
    let candidates: Vec<(JointAction, PursuerPair)> = resolved
        .iter()
        .copied()
        .filter(|(action, _)| row[action.oriented_index(swapped)] == max_value)
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}

/// Q-learning agent over a prebuilt reward field.
#[derive(Debug, Clone)]
pub struct QLearningAgent<'a> {
    topology: &'a GridTopology,
    resolver: ActionResolver<'a>,
    rewards: &'a RewardField,
    q_table: StateTable,
    free_cells: Vec<usize>,
    pursuers: PursuerPair,
    evader: usize,
    epsilon: f64,
    params: AgentParams,
    rng: StdRng,
}

impl<'a> QLearningAgent<'a> {
    /// Create an agent with a zero-initialized Q-table.
    pub fn new(
        topology: &'a GridTopology,
        rewards: &'a RewardField,
        pursuers: PursuerPair,
        evader: usize,
        params: AgentParams,
    ) -> Result<Self> {
        let q_table = StateTable::zeroed(rewards.index().clone());
        Self::with_q_table(topology, rewards, q_table, pursuers, evader, params)
    }

    /// Create an agent resuming from a previously persisted Q-table.
    pub fn with_q_table(
        topology: &'a GridTopology,
        rewards: &'a RewardField,
        q_table: StateTable,
        pursuers: PursuerPair,
        evader: usize,
        params: AgentParams,
    ) -> Result<Self> {
        if q_table.index() != rewards.index() {
            return Err(Error::InvalidConfiguration {
                message: "Q-table and reward field cover different state spaces".to_string(),
            });
        }
        let free_cells = topology.free_cells();
        if free_cells.len() < 3 {
            return Err(Error::InvalidConfiguration {
                message: "topology needs at least 3 free cells for two pursuers and an evader"
                    .to_string(),
            });
        }
        let mut agent = Self {
            topology,
            resolver: ActionResolver::new(topology),
            rewards,
            q_table,
            free_cells,
            pursuers,
            evader,
            epsilon: params.epsilon,
            params,
            rng: build_rng(params.seed),
        };
        agent.set_evader(evader)?;
        agent.set_positions(pursuers)?;
        Ok(agent)
    }

    pub fn topology(&self) -> &GridTopology {
        self.topology
    }

    /// Pursuer positions in physical-identity order.
    pub fn positions(&self) -> PursuerPair {
        self.pursuers
    }

    pub fn evader(&self) -> usize {
        self.evader
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Read view of the full Q-table across all evader positions.
    pub fn q_table(&self) -> &StateTable {
        &self.q_table
    }

    /// Read view of the Q rows for the current evader position, in pair
    /// slot order.
    pub fn current_q_rows(&self) -> Result<&[ActionRow]> {
        self.q_table.rows_for(self.evader)
    }

    /// Take the Q-table out of the agent, consuming it.
    pub fn into_q_table(self) -> StateTable {
        self.q_table
    }

    pub fn set_evader(&mut self, cell: usize) -> Result<()> {
        if !self.topology.is_free(cell) {
            return Err(Error::NotFreeCell { cell });
        }
        self.evader = cell;
        Ok(())
    }

    /// Place the pursuers, validating distinctness and freeness. A pursuer
    /// standing on the evader is allowed: that is the capture state.
    pub fn set_positions(&mut self, pursuers: PursuerPair) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidPlacement {
            first: pursuers.first,
            second: pursuers.second,
            reason: reason.to_string(),
        };
        if pursuers.first == pursuers.second {
            return Err(invalid("pursuers may never share a cell"));
        }
        if !self.topology.is_free(pursuers.first) || !self.topology.is_free(pursuers.second) {
            return Err(invalid("pursuers must stand on free cells"));
        }
        self.pursuers = pursuers;
        Ok(())
    }

    /// Move the pursuers to a uniformly random legal placement: two
    /// distinct free cells, neither equal to the evader, in random
    /// physical order.
    pub fn randomize_positions(&mut self) {
        let draw = |exclude: Option<usize>, rng: &mut StdRng| loop {
            let cell = self.free_cells[rng.random_range(0..self.free_cells.len())];
            if cell != self.evader && Some(cell) != exclude {
                return cell;
            }
        };
        let first = draw(None, &mut self.rng);
        let second = draw(Some(first), &mut self.rng);
        self.pursuers = PursuerPair::new(first, second);
    }

    /// Whether either pursuer currently stands on the evader.
    pub fn captured(&self) -> bool {
        self.pursuers.contains(self.evader)
    }

    fn canonical_key(&self, pair: PursuerPair) -> Result<PairKey> {
        pair.canonical().ok_or(Error::InvalidPlacement {
            first: pair.first,
            second: pair.second,
            reason: "pursuers may never share a cell".to_string(),
        })
    }

    /// Epsilon-greedy policy over the currently legal joint actions.
    ///
    /// Greedy ties are broken uniformly; if no legal action reaches the
    /// maximal Q-value (possible when an illegal entry holds a spuriously
    /// high default), fall back to uniform-over-legal with a diagnostic.
    pub fn select_action(&mut self, ignore_epsilon: bool) -> Result<(JointAction, PursuerPair)> {
        let resolved = self.resolver.resolved_actions(self.pursuers);
        if resolved.is_empty() {
            return Err(Error::NoLegalActions {
                first: self.pursuers.first,
                second: self.pursuers.second,
            });
        }

        if !ignore_epsilon && self.rng.random::<f64>() < self.epsilon {
            return Ok(resolved[self.rng.random_range(0..resolved.len())]);
        }

        let key = self.canonical_key(self.pursuers)?;
        let row = self.q_table.row(self.evader, key)?;
        match exploit_action(&mut self.rng, row, self.pursuers.is_swapped(), &resolved) {
            Some(choice) => Ok(choice),
            None => {
                eprintln!(
                    "Warning: no legal action reaches the maximal Q-value at state {}|{}|{}; \
                     falling back to a uniform choice over legal actions.",
                    key.low(),
                    key.high(),
                    self.evader
                );
                Ok(resolved[self.rng.random_range(0..resolved.len())])
            }
        }
    }

    /// One training step: pick an action, apply the update rule, advance.
    ///
    /// `Q(s,a) <- round(Q(s,a) + alpha * (R(s,a) + gamma * max R(s',.) - Q(s,a)))`
    pub fn step(&mut self) -> Result<()> {
        let (action, next) = self.select_action(false)?;
        let key = self.canonical_key(self.pursuers)?;
        let slot = action.oriented_index(self.pursuers.is_swapped());

        let reward = self.rewards.row(self.evader, key)?[slot];
        let next_key = self.canonical_key(next)?;
        let lookahead = self
            .rewards
            .row(self.evader, next_key)?
            .iter()
            .copied()
            .max()
            .unwrap_or(ILLEGAL_REWARD);

        let old = f64::from(self.q_table.row(self.evader, key)?[slot]);
        let target = f64::from(reward) + self.params.discount_factor * f64::from(lookahead);
        let updated = old + self.params.learning_rate * (target - old);
        self.q_table.row_mut(self.evader, key)?[slot] = updated.round() as i32;

        self.pursuers = next;
        Ok(())
    }

    /// Convergence error for the current evader position: summed
    /// `|r_norm - q_norm|` over every pair state and all 16 actions, with
    /// each row normalized by its own maximum clamped to at least 1.
    /// Entries with `r == -1` and `q == 0` are untouched illegal slots and
    /// carry no information, so they are skipped.
    pub fn convergence_error(&self) -> Result<f64> {
        let q_rows = self.q_table.rows_for(self.evader)?;
        let r_rows = self.rewards.rows_for(self.evader)?;
        let mut error = 0.0;
        for (q_row, r_row) in q_rows.iter().zip(r_rows) {
            let max_q = f64::from(q_row.iter().copied().max().unwrap_or(0).max(1));
            let max_r = f64::from(r_row.iter().copied().max().unwrap_or(0).max(1));
            for (&r, &q) in r_row.iter().zip(q_row) {
                if r == ILLEGAL_REWARD && q == 0 {
                    continue;
                }
                error += (f64::from(r) / max_r - f64::from(q) / max_q).abs();
            }
        }
        Ok(error)
    }

    /// Train the current evader position for `config.episodes` episodes.
    ///
    /// Each episode runs until capture or the step cap (a warned timeout,
    /// not an error), then decays epsilon along the parabolic schedule and
    /// records the convergence error. Starting positions and epsilon are
    /// restored afterwards so campaigns can chain positions.
    pub fn train(
        &mut self,
        config: &EpisodeConfig,
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<f64>> {
        let start_epsilon = self.epsilon;
        let start_positions = self.pursuers;
        let mut errors = Vec::with_capacity(config.episodes);

        for episode in 0..config.episodes {
            if config.randomize_start {
                self.randomize_positions();
            } else {
                self.pursuers = start_positions;
            }

            let mut steps = 0usize;
            while !self.captured() {
                self.step()?;
                steps += 1;
                if steps >= config.max_steps {
                    eprintln!(
                        "Warning: step cap {} hit in episode {} (evader {})",
                        config.max_steps,
                        episode + 1,
                        self.evader
                    );
                    break;
                }
            }

            self.epsilon = epsilon_for_episode(
                episode + 1,
                config.episodes,
                start_epsilon,
                config.epsilon_delta,
            );
            let error = self.convergence_error()?;
            errors.push((error * 1e6).round() / 1e6);
            if let Some(bar) = progress {
                bar.inc(1);
            }
        }

        self.pursuers = start_positions;
        self.epsilon = start_epsilon;
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::reward::{DiffusionParams, RewardFieldBuilder};

    fn open_3x3() -> GridTopology {
        GridTopology::parse("OOO\nOOO\nOOO").unwrap()
    }

    fn build_field(grid: &GridTopology) -> RewardField {
        RewardFieldBuilder::new(grid, DiffusionParams::default()).build()
    }

    fn seeded_params() -> AgentParams {
        AgentParams {
            seed: Some(7),
            ..AgentParams::default()
        }
    }

    #[test]
    fn test_epsilon_schedule_boundaries() {
        let n = 10_000;
        assert_eq!(epsilon_for_episode(0, n, 1.0, 0.7), 1.0);
        let last = epsilon_for_episode(n - 1, n, 1.0, 0.7);
        let expected = 0.7 * (1.0 / n as f64).powi(2) + (1.0 - 0.7);
        assert!((last - expected).abs() < 1e-12);
    }

    #[test]
    fn test_epsilon_schedule_decays_fastest_early() {
        let n = 1000;
        let early = epsilon_for_episode(1, n, 1.0, 0.7) - epsilon_for_episode(2, n, 1.0, 0.7);
        let late = epsilon_for_episode(n - 2, n, 1.0, 0.7) - epsilon_for_episode(n - 1, n, 1.0, 0.7);
        assert!(early > late);
        assert!(late > 0.0);
    }

    #[test]
    fn test_update_rule_uses_reward_field_lookahead() {
        let grid = open_3x3();
        let field = build_field(&grid);
        let params = AgentParams {
            learning_rate: 0.5,
            discount_factor: 0.5,
            epsilon: 0.0, // fully greedy, deterministic given all-zero Q ties broken by rng
            seed: Some(1),
        };
        let mut agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 4, params).unwrap();

        agent.step().unwrap();
        // Exactly one Q entry changed, and it follows the update rule with
        // the reward field's successor maximum as the lookahead.
        let key = PairKey::new(0, 8).unwrap();
        let touched: Vec<(usize, i32)> = agent
            .q_table()
            .row(4, key)
            .unwrap()
            .iter()
            .enumerate()
            .filter(|&(_, &q)| q != 0)
            .map(|(slot, &q)| (slot, q))
            .collect();
        assert_eq!(touched.len(), 1);
        let (slot, q) = touched[0];

        let reward = field.row(4, key).unwrap()[slot];
        assert!(reward >= 0);
        let next_key = agent.positions().canonical().unwrap();
        let lookahead = *field.row(4, next_key).unwrap().iter().max().unwrap();
        let expected = (0.5 * (f64::from(reward) + 0.5 * f64::from(lookahead))).round() as i32;
        assert_eq!(q, expected);
    }

    #[test]
    fn test_error_metric_zero_when_q_equals_r() {
        let grid = open_3x3();
        let field = build_field(&grid);
        let agent = QLearningAgent::with_q_table(
            &grid,
            &field,
            field.clone(),
            PursuerPair::new(0, 8),
            4,
            seeded_params(),
        )
        .unwrap();
        assert_eq!(agent.convergence_error().unwrap(), 0.0);
    }

    #[test]
    fn test_error_metric_skips_untouched_illegal_entries() {
        let grid = open_3x3();
        let field = build_field(&grid);
        let agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 4, seeded_params()).unwrap();
        // Zero Q against the fresh field: every legal entry contributes
        // r / max_r, every untouched illegal entry contributes nothing.
        let mut expected = 0.0;
        for row in field.rows_for(4).unwrap() {
            let max_r = f64::from(row.iter().copied().max().unwrap_or(0).max(1));
            for &r in row {
                if r != ILLEGAL_REWARD {
                    expected += f64::from(r) / max_r;
                }
            }
        }
        let got = agent.convergence_error().unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_falls_back_when_illegal_entry_dominates() {
        let grid = open_3x3();
        let field = build_field(&grid);
        // Doctor the Q row so an illegal slot holds the maximum: (N, N)
        // never resolves from (0, 8), yet its entry dominates the row.
        let mut q_table = StateTable::zeroed(field.index().clone());
        let key = PairKey::new(0, 8).unwrap();
        let illegal = JointAction::new(Direction::North, Direction::North);
        q_table.row_mut(4, key).unwrap()[illegal.index()] = 999;

        let params = AgentParams {
            epsilon: 0.0,
            ..seeded_params()
        };
        let mut agent =
            QLearningAgent::with_q_table(&grid, &field, q_table, PursuerPair::new(0, 8), 4, params)
                .unwrap();
        let resolver = ActionResolver::new(&grid);
        for _ in 0..20 {
            agent.set_positions(PursuerPair::new(0, 8)).unwrap();
            let (action, next) = agent.select_action(false).unwrap();
            assert_ne!(action, illegal);
            assert_eq!(resolver.resolve(PursuerPair::new(0, 8), action), Some(next));
        }
    }

    #[test]
    fn test_select_action_errors_without_legal_moves() {
        // Pursuer at 0 is sealed in by walls, so no joint action resolves.
        let grid = GridTopology::parse("OXO\nXOO\nOOO").unwrap();
        let field = build_field(&grid);
        let mut agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 2, seeded_params()).unwrap();
        assert!(matches!(
            agent.select_action(false),
            Err(Error::NoLegalActions { first: 0, second: 8 })
        ));
    }

    #[test]
    fn test_randomize_positions_is_legal() {
        let grid = GridTopology::parse("OOO\nOXO\nOOO").unwrap();
        let field = build_field(&grid);
        let mut agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 2, seeded_params()).unwrap();
        for _ in 0..200 {
            agent.randomize_positions();
            let pair = agent.positions();
            assert_ne!(pair.first, pair.second);
            assert!(grid.is_free(pair.first) && grid.is_free(pair.second));
            assert!(!pair.contains(2));
        }
    }

    #[test]
    fn test_set_positions_validation() {
        let grid = GridTopology::parse("OOO\nOXO\nOOO").unwrap();
        let field = build_field(&grid);
        let mut agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 2, seeded_params()).unwrap();
        assert!(agent.set_positions(PursuerPair::new(3, 3)).is_err());
        assert!(agent.set_positions(PursuerPair::new(0, 4)).is_err());
        assert!(agent.set_positions(PursuerPair::new(8, 0)).is_ok());
        assert!(agent.positions().is_swapped());
        assert!(agent.set_evader(4).is_err());
    }

    #[test]
    fn test_training_episode_reaches_capture_and_restores_state() {
        let grid = open_3x3();
        let field = build_field(&grid);
        let mut agent =
            QLearningAgent::new(&grid, &field, PursuerPair::new(0, 8), 4, seeded_params()).unwrap();
        let config = EpisodeConfig {
            episodes: 50,
            max_steps: 500,
            epsilon_delta: 0.7,
            randomize_start: true,
        };
        let errors = agent.train(&config, None).unwrap();
        assert_eq!(errors.len(), 50);
        // Epsilon and positions restored after the run.
        assert_eq!(agent.epsilon(), 1.0);
        assert_eq!(agent.positions(), PursuerPair::new(0, 8));
        // Training actually wrote Q-values for this evader position.
        let touched = agent
            .current_q_rows()
            .unwrap()
            .iter()
            .flatten()
            .filter(|&&q| q != 0)
            .count();
        assert!(touched > 0);
    }

    #[test]
    fn test_agent_rejects_mismatched_q_table() {
        let grid = open_3x3();
        let field = build_field(&grid);
        let other_grid = GridTopology::parse("OOO\nOXO\nOOO").unwrap();
        let other_q = StateTable::zeroed(crate::table::StateIndex::new(&other_grid));
        let result = QLearningAgent::with_q_table(
            &grid,
            &field,
            other_q,
            PursuerPair::new(0, 8),
            4,
            seeded_params(),
        );
        assert!(result.is_err());
    }
}
