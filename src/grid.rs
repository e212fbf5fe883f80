//! Static maze geometry and legal single-cell moves.
//!
//! Cells are row-major indices in `[0, width * height)`. A cell is either
//! free or a wall; walls never change after construction. All movement in
//! the crate funnels through [`GridTopology::neighbor`], which is a pure
//! function over the immutable grid.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single-agent move on the grid.
///
/// The set is closed: joint actions, heatmap diffusion and the interactive
/// protocol all iterate [`Direction::ALL`] rather than branching on raw
/// integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions, in wire order (north = 0, east = 1, south = 2, west = 3).
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Wire index of this direction.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Direction for a wire index, if in range.
    pub fn from_index(index: usize) -> Option<Direction> {
        Direction::ALL.get(index).copied()
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        write!(f, "{name}")
    }
}

/// Immutable walled grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    width: usize,
    height: usize,
    walls: Vec<bool>,
}

impl GridTopology {
    /// Create a topology from dimensions and an explicit wall set.
    pub fn new(width: usize, height: usize, wall_cells: &[usize]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::EmptyMap);
        }
        let mut walls = vec![false; width * height];
        for &cell in wall_cells {
            let slot = walls
                .get_mut(cell)
                .ok_or(Error::CellOutOfBounds { cell, width, height })?;
            *slot = true;
        }
        Ok(Self { width, height, walls })
    }

    /// Parse a topology from fixed-width rows of `O` (free) and `X` (wall).
    ///
    /// Non-rectangular input or any other character is a fatal
    /// configuration error.
    pub fn parse(text: &str) -> Result<Self> {
        let mut width: Option<usize> = None;
        let mut height = 0usize;
        let mut walls = Vec::new();

        for (row, line) in text.lines().enumerate() {
            let expected = *width.get_or_insert(line.chars().count());
            let got = line.chars().count();
            if got != expected {
                return Err(Error::RaggedMap { row, got, expected });
            }
            height += 1;
            for (column, character) in line.chars().enumerate() {
                match character {
                    'O' => walls.push(false),
                    'X' => walls.push(true),
                    _ => {
                        return Err(Error::InvalidMapCharacter {
                            character,
                            row,
                            column,
                        });
                    }
                }
            }
        }

        match width {
            None | Some(0) => Err(Error::EmptyMap),
            Some(width) => Ok(Self { width, height, walls }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells, walls included.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_wall(&self, cell: usize) -> bool {
        self.walls.get(cell).copied().unwrap_or(true)
    }

    /// Whether `cell` is inside the grid and not a wall.
    pub fn is_free(&self, cell: usize) -> bool {
        cell < self.cell_count() && !self.walls[cell]
    }

    /// All free cells in ascending index order.
    pub fn free_cells(&self) -> Vec<usize> {
        (0..self.cell_count()).filter(|&c| !self.walls[c]).collect()
    }

    /// All wall cells in ascending index order.
    pub fn wall_cells(&self) -> Vec<usize> {
        (0..self.cell_count()).filter(|&c| self.walls[c]).collect()
    }

    /// Target cell for a single step, or `None` if the move exits the grid
    /// or lands on a wall.
    pub fn neighbor(&self, cell: usize, direction: Direction) -> Option<usize> {
        if cell >= self.cell_count() {
            return None;
        }
        let candidate = match direction {
            Direction::North => cell.checked_sub(self.width)?,
            Direction::East => {
                if cell % self.width == self.width - 1 {
                    return None;
                }
                cell + 1
            }
            Direction::South => {
                let candidate = cell + self.width;
                if candidate >= self.cell_count() {
                    return None;
                }
                candidate
            }
            Direction::West => {
                if cell % self.width == 0 {
                    return None;
                }
                cell - 1
            }
        };
        if self.walls[candidate] { None } else { Some(candidate) }
    }
}
