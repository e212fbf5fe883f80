//! Diffusion heatmaps and joint-action reward assembly.
//!
//! For every (evader position, pursuer pair) state the builder diffuses a
//! reward peak outward from the evader cell, treating walls and both pursuer
//! cells as impassable, then scores each of the 16 joint actions by the heat
//! at the two destination cells. Fields for different evader positions are
//! fully independent, so the full build fans out one rayon task per evader
//! cell.

use std::collections::VecDeque;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::actions::{ActionResolver, JOINT_ACTION_COUNT, JointAction};
use crate::grid::{Direction, GridTopology};
use crate::table::{ActionRow, PairKey, PursuerPair, StateIndex, StateTable};

/// Heatmap value of wall cells. Also the reward assigned to illegal or
/// terminal-null joint actions.
pub const WALL_VALUE: i32 = -1;
pub const ILLEGAL_REWARD: i32 = -1;

/// Shape of the diffusion from the evader cell: the evader cell gets
/// `peak`, and each legal step away subtracts `decay`. Cells where the
/// value would drop to zero or below stay at the background value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionParams {
    pub peak: i32,
    pub decay: i32,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            peak: 400,
            decay: 50,
        }
    }
}

/// A fully built reward field has the same two-level shape as a Q-table.
pub type RewardField = StateTable;

/// Builds per-state heatmaps and reward rows over a fixed topology.
#[derive(Debug, Clone, Copy)]
pub struct RewardFieldBuilder<'a> {
    topology: &'a GridTopology,
    params: DiffusionParams,
    /// One-step-ahead compounding weight; disabled when not positive.
    time_multiplier: f64,
}

impl<'a> RewardFieldBuilder<'a> {
    pub fn new(topology: &'a GridTopology, params: DiffusionParams) -> Self {
        Self {
            topology,
            params,
            time_multiplier: -1.0,
        }
    }

    /// Enable temporal compounding: projected reward one evader step ahead
    /// is folded into each row, scaled by `multiplier`.
    pub fn with_time_multiplier(mut self, multiplier: f64) -> Self {
        self.time_multiplier = multiplier;
        self
    }

    pub fn params(&self) -> DiffusionParams {
        self.params
    }

    /// Diffuse heat from `evader` across the maze with the two pursuer
    /// cells removed from the traversable graph.
    ///
    /// A breadth-first relaxation from the single source: a cell at
    /// shortest-path distance `d` (over the wall- and pursuer-free
    /// subgraph) gets `peak - decay * d`, assigned only while positive.
    /// Walls are fixed at [`WALL_VALUE`]; unreached cells, including the
    /// pursuer cells themselves, keep the background `0`.
    pub fn heatmap(&self, evader: usize, pair: PairKey) -> Vec<i32> {
        let n = self.topology.cell_count();
        let mut field: Vec<i32> = (0..n)
            .map(|cell| if self.topology.is_wall(cell) { WALL_VALUE } else { 0 })
            .collect();

        let blocked = |cell: usize| cell == pair.low() || cell == pair.high();
        if self.params.peak <= 0 || evader >= n || blocked(evader) || self.topology.is_wall(evader)
        {
            return field;
        }

        let mut queued = vec![false; n];
        let mut frontier = VecDeque::new();
        queued[evader] = true;
        frontier.push_back((evader, self.params.peak));

        while let Some((cell, value)) = frontier.pop_front() {
            field[cell] = value;
            let next_value = value - self.params.decay;
            if next_value <= 0 {
                continue;
            }
            for direction in Direction::ALL {
                let Some(neighbor) = self.topology.neighbor(cell, direction) else {
                    continue;
                };
                if queued[neighbor] || blocked(neighbor) {
                    continue;
                }
                queued[neighbor] = true;
                frontier.push_back((neighbor, next_value));
            }
        }
        field
    }

    /// Assemble the 16-entry reward row for one state from its heatmap.
    ///
    /// A joint action earns [`ILLEGAL_REWARD`] when it does not resolve,
    /// when the heatmap carries no heat at all (the evader is walled in, so
    /// every action is terminal-null by convention), or when a destination
    /// cell is a wall in the heatmap (cannot happen once the resolver has
    /// rejected walls; kept as a defensive invariant). Otherwise the reward
    /// is the heat at the two destinations, plus the optional projection
    /// over `adjacent` heatmaps (one per legal evader step, same pair).
    ///
    /// Pass `adjacent = None` when compounding is not requested; a mismatch
    /// between the time multiplier and the adjacent maps is a caller
    /// misconfiguration that is warned about and skipped, never fatal.
    pub fn reward_row(
        &self,
        resolver: &ActionResolver<'_>,
        heatmap: &[i32],
        pair: PairKey,
        adjacent: Option<&[Vec<i32>]>,
    ) -> ActionRow {
        let projection = match adjacent {
            Some(maps) if self.time_multiplier > 0.0 => Some(maps),
            None if self.time_multiplier <= 0.0 => None,
            _ => {
                eprintln!(
                    "Warning: time multiplier (must be positive) and adjacent heatmaps must be \
                     supplied together; ignoring time projection."
                );
                None
            }
        };

        let peak_reached = heatmap.iter().copied().max().unwrap_or(0) >= 1;
        let start = PursuerPair::from(pair);
        let mut row = [ILLEGAL_REWARD; JOINT_ACTION_COUNT];

        for action in JointAction::all() {
            let Some(next) = resolver.resolve(start, action) else {
                continue;
            };
            if !peak_reached
                || heatmap[next.first] == WALL_VALUE
                || heatmap[next.second] == WALL_VALUE
            {
                continue;
            }
            let mut reward = heatmap[next.first] + heatmap[next.second];
            if let Some(maps) = projection {
                for future in maps {
                    let ahead = f64::from(future[next.first] + future[next.second]);
                    reward += (self.time_multiplier * ahead).round() as i32;
                }
            }
            row[action.index()] = reward;
        }
        row
    }

    /// Reward rows for every pursuer pair at one evader position, in pair
    /// slot order.
    fn evader_rows(&self, resolver: &ActionResolver<'_>, index: &StateIndex, evader: usize) -> Vec<ActionRow> {
        let adjacent_cells: Vec<usize> = if self.time_multiplier > 0.0 {
            Direction::ALL
                .iter()
                .filter_map(|&direction| self.topology.neighbor(evader, direction))
                .collect()
        } else {
            Vec::new()
        };

        index
            .pair_keys()
            .iter()
            .map(|&pair| {
                let heatmap = self.heatmap(evader, pair);
                let futures: Vec<Vec<i32>> = adjacent_cells
                    .iter()
                    .map(|&cell| self.heatmap(cell, pair))
                    .collect();
                let adjacent = (self.time_multiplier > 0.0).then_some(futures.as_slice());
                self.reward_row(resolver, &heatmap, pair, adjacent)
            })
            .collect()
    }

    /// Build the full reward field: every free evader cell crossed with
    /// every distinct free-cell pair. The dominant cost center; evader
    /// positions are built in parallel.
    pub fn build(&self) -> RewardField {
        self.build_inner(None)
    }

    /// As [`RewardFieldBuilder::build`], ticking `progress` once per evader
    /// position.
    pub fn build_with_progress(&self, progress: &ProgressBar) -> RewardField {
        self.build_inner(Some(progress))
    }

    fn build_inner(&self, progress: Option<&ProgressBar>) -> RewardField {
        let index = StateIndex::new(self.topology);
        let resolver = ActionResolver::new(self.topology);
        let rows: Vec<Vec<ActionRow>> = index
            .free_cells()
            .par_iter()
            .map(|&evader| {
                let rows = self.evader_rows(&resolver, &index, evader);
                if let Some(bar) = progress {
                    bar.inc(1);
                }
                rows
            })
            .collect();
        StateTable::from_rows(index, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_3x3() -> GridTopology {
        GridTopology::parse("OOO\nOOO\nOOO").unwrap()
    }

    #[test]
    fn test_heatmap_corner_pursuers() {
        // Evader at the center, pursuers in opposite corners: only the
        // pursuer cells block diffusion; the free corners sit two steps out.
        let grid = open_3x3();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let map = builder.heatmap(4, PairKey::new(0, 8).unwrap());
        assert_eq!(map[4], 400);
        for cell in [1, 3, 5, 7] {
            assert_eq!(map[cell], 350);
        }
        for cell in [2, 6] {
            assert_eq!(map[cell], 300);
        }
        for cell in [0, 8] {
            assert_eq!(map[cell], 0, "pursuer cell {cell} must stay cold");
        }
    }

    #[test]
    fn test_heatmap_walls_keep_wall_value() {
        let grid = GridTopology::parse("OOO\nOXO\nOOO").unwrap();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let map = builder.heatmap(0, PairKey::new(6, 8).unwrap());
        assert_eq!(map[4], WALL_VALUE);
        assert_eq!(map[0], 400);
        // 0 -> 1 -> 2 around the wall.
        assert_eq!(map[1], 350);
        assert_eq!(map[2], 300);
        // Pursuer cells never receive heat.
        assert_eq!(map[6], 0);
        assert_eq!(map[8], 0);
    }

    #[test]
    fn test_heatmap_does_not_spread_past_pursuers() {
        // 1x5 corridor, evader at 0, pursuer at 2 blocks everything beyond.
        let grid = GridTopology::parse("OOOOO").unwrap();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let map = builder.heatmap(0, PairKey::new(2, 4).unwrap());
        assert_eq!(map[0], 400);
        assert_eq!(map[1], 350);
        assert_eq!(map[2], 0);
        assert_eq!(map[3], 0);
        assert_eq!(map[4], 0);
    }

    #[test]
    fn test_heatmap_monotone_in_distance() {
        let grid = GridTopology::parse("OOOOO\nOOOOO\nOOOOO\nOOOOO\nOOOOO").unwrap();
        let builder = RewardFieldBuilder::new(
            &grid,
            DiffusionParams {
                peak: 400,
                decay: 50,
            },
        );
        let evader: usize = 12;
        let map = builder.heatmap(evader, PairKey::new(0, 24).unwrap());
        for cell in 0usize..25 {
            if cell == 0 || cell == 24 {
                continue;
            }
            let distance =
                (cell / 5).abs_diff(evader / 5) as i32 + (cell % 5).abs_diff(evader % 5) as i32;
            assert_eq!(map[cell], 400 - 50 * distance, "cell {cell}");
        }
    }

    #[test]
    fn test_heatmap_truncates_at_zero() {
        // decay 150: only the evader cell and its direct neighbors can hold
        // positive heat (400, 250, 100); two steps out would be -50.
        let grid = GridTopology::parse("OOOOO").unwrap();
        let builder = RewardFieldBuilder::new(
            &grid,
            DiffusionParams {
                peak: 400,
                decay: 150,
            },
        );
        let map = builder.heatmap(0, PairKey::new(3, 4).unwrap());
        assert_eq!(&map[..5], &[400, 250, 100, 0, 0]);
    }

    #[test]
    fn test_reward_row_scenario() {
        let grid = open_3x3();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let resolver = ActionResolver::new(&grid);
        let pair = PairKey::new(0, 8).unwrap();
        let map = builder.heatmap(4, pair);
        let row = builder.reward_row(&resolver, &map, pair, None);
        assert_eq!(row.len(), JOINT_ACTION_COUNT);
        // Pursuer 0 east, pursuer 8 west lands on (1, 7): 350 + 350.
        let action = JointAction::new(Direction::East, Direction::West);
        assert_eq!(row[action.index()], 700);
        // Pursuer 0 cannot move north off the grid.
        let blocked = JointAction::new(Direction::North, Direction::West);
        assert_eq!(row[blocked.index()], ILLEGAL_REWARD);
    }

    #[test]
    fn test_reward_row_captured_state_all_illegal() {
        // The evader stands on a pursuer cell, so no heat diffuses at all
        // and every action is terminal-null.
        let grid = open_3x3();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let resolver = ActionResolver::new(&grid);
        let pair = PairKey::new(0, 8).unwrap();
        let map = builder.heatmap(0, pair);
        assert!(map.iter().all(|&v| v < 1));
        let row = builder.reward_row(&resolver, &map, pair, None);
        assert_eq!(row, [ILLEGAL_REWARD; JOINT_ACTION_COUNT]);
    }

    #[test]
    fn test_reward_row_walled_in_evader_all_illegal() {
        // Degenerate maze where the evader cell is itself a wall: the
        // heatmap carries no heat, so every action is terminal-null.
        let grid = GridTopology::parse("OOO\nOXO\nOOO").unwrap();
        let builder = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let resolver = ActionResolver::new(&grid);
        let pair = PairKey::new(0, 8).unwrap();
        let map = builder.heatmap(4, pair);
        assert!(map.iter().all(|&v| v < 1));
        let row = builder.reward_row(&resolver, &map, pair, None);
        assert_eq!(row, [ILLEGAL_REWARD; JOINT_ACTION_COUNT]);
    }

    #[test]
    fn test_reward_row_compounding_adds_projection() {
        let grid = open_3x3();
        let pair = PairKey::new(0, 8).unwrap();
        let resolver = ActionResolver::new(&grid);
        let plain = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let builder = plain.with_time_multiplier(0.3);

        let map = plain.heatmap(4, pair);
        let futures: Vec<Vec<i32>> = [1, 5, 7, 3]
            .iter()
            .map(|&cell| plain.heatmap(cell, pair))
            .collect();
        let row = builder.reward_row(&resolver, &map, pair, Some(&futures));

        let action = JointAction::new(Direction::East, Direction::West);
        let base = map[1] + map[7];
        let mut expected = base;
        for future in &futures {
            expected += (0.3 * f64::from(future[1] + future[7])).round() as i32;
        }
        assert!(expected > base);
        assert_eq!(row[action.index()], expected);
    }

    #[test]
    fn test_reward_row_misconfigured_compounding_is_skipped() {
        let grid = open_3x3();
        let pair = PairKey::new(0, 8).unwrap();
        let resolver = ActionResolver::new(&grid);
        let plain = RewardFieldBuilder::new(&grid, DiffusionParams::default());
        let map = plain.heatmap(4, pair);
        let baseline = plain.reward_row(&resolver, &map, pair, None);

        // Multiplier without adjacent maps: warned and ignored.
        let compounding = plain.with_time_multiplier(0.3);
        assert_eq!(compounding.reward_row(&resolver, &map, pair, None), baseline);

        // Adjacent maps without a multiplier: warned and ignored.
        let futures = vec![plain.heatmap(1, pair)];
        assert_eq!(
            plain.reward_row(&resolver, &map, pair, Some(&futures)),
            baseline
        );
    }

    #[test]
    fn test_full_build_shape_and_values() {
        let grid = open_3x3();
        let field = RewardFieldBuilder::new(&grid, DiffusionParams::default()).build();
        assert_eq!(field.state_count(), 9 * 36);
        let row = field.row(4, PairKey::new(0, 8).unwrap()).unwrap();
        let action = JointAction::new(Direction::East, Direction::West);
        assert_eq!(row[action.index()], 700);
        // Every entry is either -1 or non-negative, per the field invariant.
        for (_, _, row) in field.states() {
            assert!(row.iter().all(|&r| r >= ILLEGAL_REWARD));
        }
    }
}
