//! Interactive pursuit over a trained Q matrix.
//!
//! The game consumes one integer move request per turn for the evader and
//! answers with whether the evader survived. The Q matrix is read-only
//! here; the pursuers act greedily on it with no exploration and no
//! updates.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::actions::{ActionResolver, EvaderMove};
use crate::agent::exploit_action;
use crate::error::{Error, Result};
use crate::grid::GridTopology;
use crate::table::{PursuerPair, StateTable};

/// Result of one interactive turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The requested evader move was illegal; nothing moved.
    Blocked,
    /// The turn played out and the evader survived.
    Evaded,
    /// A pursuer reached the evader's cell (or the evader walked into one).
    Captured,
}

/// A running pursuit: stationary-trained pursuers against a driven evader.
pub struct PursuitGame<'a> {
    topology: &'a GridTopology,
    resolver: ActionResolver<'a>,
    q_table: &'a StateTable,
    pursuers: PursuerPair,
    evader: usize,
    rng: StdRng,
}

impl<'a> PursuitGame<'a> {
    pub fn new(
        topology: &'a GridTopology,
        q_table: &'a StateTable,
        pursuers: PursuerPair,
        evader: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if !topology.is_free(evader) {
            return Err(Error::NotFreeCell { cell: evader });
        }
        if pursuers.first == pursuers.second
            || !topology.is_free(pursuers.first)
            || !topology.is_free(pursuers.second)
        {
            return Err(Error::InvalidPlacement {
                first: pursuers.first,
                second: pursuers.second,
                reason: "pursuers must stand on distinct free cells".to_string(),
            });
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            topology,
            resolver: ActionResolver::new(topology),
            q_table,
            pursuers,
            evader,
            rng,
        })
    }

    pub fn evader(&self) -> usize {
        self.evader
    }

    pub fn pursuers(&self) -> PursuerPair {
        self.pursuers
    }

    pub fn is_over(&self) -> bool {
        self.pursuers.contains(self.evader)
    }

    /// Play one full turn: apply the evader's move request, then let the
    /// pursuers respond greedily from the Q matrix.
    ///
    /// An illegal evader move is reported as [`TurnOutcome::Blocked`] and
    /// consumes no pursuer turn. A malformed request (outside `-1..=3`) is
    /// an error.
    pub fn play_turn(&mut self, request: i64) -> Result<TurnOutcome> {
        let evader_move = EvaderMove::from_request(request)?;
        let Some(destination) = evader_move.apply(self.topology, self.evader) else {
            return Ok(TurnOutcome::Blocked);
        };
        self.evader = destination;
        if self.is_over() {
            return Ok(TurnOutcome::Captured);
        }

        let resolved = self.resolver.resolved_actions(self.pursuers);
        if resolved.is_empty() {
            // Structurally possible only in degenerate mazes; the pursuers
            // simply hold position.
            eprintln!(
                "Warning: pursuers at ({}, {}) have no legal joint action; holding position.",
                self.pursuers.first, self.pursuers.second
            );
            return Ok(TurnOutcome::Evaded);
        }

        let key = self.pursuers.canonical().ok_or(Error::InvalidPlacement {
            first: self.pursuers.first,
            second: self.pursuers.second,
            reason: "pursuers may never share a cell".to_string(),
        })?;
        let row = self.q_table.row(self.evader, key)?;
        let (_, next) =
            match exploit_action(&mut self.rng, row, self.pursuers.is_swapped(), &resolved) {
                Some(choice) => choice,
                None => {
                    eprintln!(
                        "Warning: no legal action reaches the maximal Q-value at state \
                         {}|{}|{}; picking uniformly over legal actions.",
                        key.low(),
                        key.high(),
                        self.evader
                    );
                    resolved[self.rng.random_range(0..resolved.len())]
                }
            };
        self.pursuers = next;

        if self.is_over() {
            Ok(TurnOutcome::Captured)
        } else {
            Ok(TurnOutcome::Evaded)
        }
    }
}
