//! Plain-text rendering of grids and heatmaps for the console.

use crate::grid::GridTopology;
use crate::reward::WALL_VALUE;
use crate::table::PursuerPair;

/// Render the maze with pursuers (`S`, `Z`), evader (`C`), walls (`#`) and
/// free cells (`.`).
pub fn render_grid(topology: &GridTopology, pursuers: PursuerPair, evader: usize) -> String {
    let mut out = String::with_capacity(topology.cell_count() + topology.height());
    for cell in 0..topology.cell_count() {
        let glyph = if cell == evader {
            'C'
        } else if cell == pursuers.first {
            'S'
        } else if cell == pursuers.second {
            'Z'
        } else if topology.is_wall(cell) {
            '#'
        } else {
            '.'
        };
        out.push(glyph);
        if cell % topology.width() == topology.width() - 1 {
            out.push('\n');
        }
    }
    out
}

/// Render a heatmap with per-cell intensity digits 0-9, normalized by the
/// map maximum. Walls show as `#`, cold cells as `.`.
pub fn render_heatmap(topology: &GridTopology, heatmap: &[i32]) -> String {
    let max_value = heatmap.iter().copied().max().unwrap_or(0);
    let mut out = String::with_capacity(heatmap.len() + topology.height());
    for (cell, &value) in heatmap.iter().enumerate() {
        let glyph = if value == WALL_VALUE {
            '#'
        } else if value <= 0 || max_value <= 0 {
            '.'
        } else {
            let scaled = (f64::from(value) / f64::from(max_value) * 9.0).round() as u32;
            char::from_digit(scaled.min(9), 10).unwrap_or('9')
        };
        out.push(glyph);
        if cell % topology.width() == topology.width() - 1 {
            out.push('\n');
        }
    }
    out
}
