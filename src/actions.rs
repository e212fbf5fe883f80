//! Joint two-pursuer actions and the legality resolver.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Direction, GridTopology};
use crate::table::PursuerPair;

/// Number of joint actions: each pursuer independently picks one of four
/// directions.
pub const JOINT_ACTION_COUNT: usize = 16;

/// A simultaneous pair of single-pursuer moves, encoded as
/// `first * 4 + second` so that index order runs (N,N), (N,E), (N,S), ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JointAction(u8);

impl JointAction {
    pub fn new(first: Direction, second: Direction) -> Self {
        JointAction((first.index() * 4 + second.index()) as u8)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index < JOINT_ACTION_COUNT {
            Some(JointAction(index as u8))
        } else {
            None
        }
    }

    /// All 16 joint actions in index order.
    pub fn all() -> impl Iterator<Item = JointAction> {
        (0..JOINT_ACTION_COUNT as u8).map(JointAction)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Move of the first (physical) pursuer.
    pub fn first(self) -> Direction {
        Direction::ALL[self.0 as usize / 4]
    }

    /// Move of the second (physical) pursuer.
    pub fn second(self) -> Direction {
        Direction::ALL[self.0 as usize % 4]
    }

    /// The same joint move with the pursuer roles exchanged.
    pub fn transposed(self) -> Self {
        JointAction::new(self.second(), self.first())
    }

    /// Row index of this action in a canonically keyed table.
    ///
    /// Table rows order action components low-pursuer-first; when a pair's
    /// canonical ordering swaps the physical identities, the components must
    /// be swapped too.
    pub fn oriented_index(self, swapped: bool) -> usize {
        if swapped {
            self.transposed().index()
        } else {
            self.index()
        }
    }
}

impl std::fmt::Display for JointAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.first(), self.second())
    }
}

/// Resolves joint actions against the grid, enforcing legality and mutual
/// exclusion between the two pursuers.
#[derive(Debug, Clone, Copy)]
pub struct ActionResolver<'a> {
    topology: &'a GridTopology,
}

impl<'a> ActionResolver<'a> {
    pub fn new(topology: &'a GridTopology) -> Self {
        Self { topology }
    }

    /// Resolve one joint action from physical positions.
    ///
    /// Returns `None` if either candidate move leaves the grid or hits a
    /// wall, or if both pursuers would land on the same cell. The result
    /// preserves physical ordering; it is never re-sorted here.
    pub fn resolve(&self, pair: PursuerPair, action: JointAction) -> Option<PursuerPair> {
        let first = self.topology.neighbor(pair.first, action.first())?;
        let second = self.topology.neighbor(pair.second, action.second())?;
        if first == second {
            return None;
        }
        Some(PursuerPair::new(first, second))
    }

    /// Every joint action that resolves from `pair`, with its destination.
    ///
    /// May be empty in degenerate mazes with enclosed single-pursuer dead
    /// zones; callers decide whether that is an error.
    pub fn resolved_actions(&self, pair: PursuerPair) -> Vec<(JointAction, PursuerPair)> {
        JointAction::all()
            .filter_map(|action| self.resolve(pair, action).map(|next| (action, next)))
            .collect()
    }

    /// The subset of all 16 joint actions that resolve from `pair`.
    pub fn legal_actions(&self, pair: PursuerPair) -> Vec<JointAction> {
        self.resolved_actions(pair)
            .into_iter()
            .map(|(action, _)| action)
            .collect()
    }
}

/// One evader turn in the interactive protocol: `-1` stays put, `0..=3`
/// steps in a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaderMove {
    Stay,
    Step(Direction),
}

impl EvaderMove {
    /// Decode an integer move request.
    pub fn from_request(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(EvaderMove::Stay),
            0..=3 => Ok(EvaderMove::Step(Direction::ALL[value as usize])),
            _ => Err(Error::InvalidMoveRequest { value }),
        }
    }

    /// Target cell of this move, or `None` if it is blocked.
    pub fn apply(&self, topology: &GridTopology, cell: usize) -> Option<usize> {
        match self {
            EvaderMove::Stay => Some(cell),
            EvaderMove::Step(direction) => topology.neighbor(cell, *direction),
        }
    }
}
