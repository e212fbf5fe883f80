//! Line-oriented persistence for reward and Q matrices.
//!
//! The on-disk format is one line per state:
//!
//! ```text
//! g1|g2|evader = r0|r1|...|r15
//! ```
//!
//! with `g1 < g2` canonical pair cells and 16 pipe-separated signed
//! integers. Values round-trip exactly. Malformed lines are fatal parse
//! errors reported with file name and 0-based line index; there is no
//! silent recovery.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::grid::GridTopology;
use crate::table::{PairKey, StateIndex, StateTable};

fn io_error(operation: &str, path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        operation: format!("{operation} {}", path.display()),
        source,
    }
}

/// Load a topology from a map file of `O`/`X` rows.
pub fn load_topology<P: AsRef<Path>>(path: P) -> Result<GridTopology> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).map_err(|source| io_error("read map file", path, source))?;
    GridTopology::parse(&text)
}

/// Write a full matrix (reward field or Q-table) to `path`, one state per
/// line, grouped by evader position.
pub fn save_matrix<P: AsRef<Path>>(table: &StateTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| io_error("create matrix file", path, source))?;
    let mut writer = BufWriter::new(file);
    for (evader, key, row) in table.states() {
        write!(writer, "{}|{}|{} = ", key.low(), key.high(), evader)
            .map_err(|source| io_error("write matrix file", path, source))?;
        let mut first = true;
        for value in row {
            if !first {
                write!(writer, "|").map_err(|source| io_error("write matrix file", path, source))?;
            }
            write!(writer, "{value}").map_err(|source| io_error("write matrix file", path, source))?;
            first = false;
        }
        writeln!(writer).map_err(|source| io_error("write matrix file", path, source))?;
    }
    writer
        .flush()
        .map_err(|source| io_error("flush matrix file", path, source))?;
    Ok(())
}

/// Load a full matrix for `topology` from `path`.
///
/// Every state of the topology's state space must appear exactly once;
/// duplicates, unknown cells and incomplete coverage are fatal.
pub fn load_matrix<P: AsRef<Path>>(path: P, topology: &GridTopology) -> Result<StateTable> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let file = File::open(path).map_err(|source| io_error("open matrix file", path, source))?;
    let reader = BufReader::new(file);

    let index = StateIndex::new(topology);
    let mut table = StateTable::zeroed(index);
    let mut filled = vec![false; table.state_count()];
    let pair_count = table.index().pair_count();
    let mut loaded = 0usize;

    let malformed = |line: usize, message: String| Error::MalformedMatrixLine {
        file: file_name.clone(),
        line,
        message,
    };

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| io_error("read matrix file", path, source))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, '=');
        let state_part = parts.next().unwrap_or_default().trim();
        let Some(values_part) = parts.next() else {
            return Err(malformed(
                line_number,
                "expected a 'state = values' pair".to_string(),
            ));
        };

        let state_tokens: Vec<&str> = state_part.split('|').collect();
        if state_tokens.len() != 3 {
            return Err(malformed(
                line_number,
                format!("state must have 3 cells, got {}", state_tokens.len()),
            ));
        }
        let mut cells = [0usize; 3];
        for (slot, token) in cells.iter_mut().zip(&state_tokens) {
            *slot = token.trim().parse().map_err(|_| {
                malformed(
                    line_number,
                    format!("state cell '{}' is not an unsigned integer", token.trim()),
                )
            })?;
        }
        let [g1, g2, evader] = cells;
        for cell in cells {
            if cell >= topology.cell_count() {
                return Err(malformed(
                    line_number,
                    format!(
                        "cell {cell} is outside the {}x{} grid",
                        topology.width(),
                        topology.height()
                    ),
                ));
            }
            if topology.is_wall(cell) {
                return Err(malformed(line_number, format!("cell {cell} is a wall")));
            }
        }
        let Some(key) = PairKey::new(g1, g2) else {
            return Err(malformed(
                line_number,
                format!("pursuer cells must be distinct, got {g1} and {g2}"),
            ));
        };

        let value_tokens: Vec<&str> = values_part.trim().split('|').collect();
        let row = table.row_mut(evader, key)?;
        if value_tokens.len() != row.len() {
            return Err(malformed(
                line_number,
                format!(
                    "expected {} action rewards, got {}",
                    row.len(),
                    value_tokens.len()
                ),
            ));
        }
        for (slot, token) in row.iter_mut().zip(&value_tokens) {
            *slot = token.trim().parse().map_err(|_| {
                malformed(
                    line_number,
                    format!("reward '{}' is not an integer", token.trim()),
                )
            })?;
        }

        let evader_slot = table.index().evader_slot(evader)?;
        let pair_slot = table
            .index()
            .pair_slot(key)
            .ok_or_else(|| malformed(line_number, format!("unknown pair {g1}|{g2}")))?;
        let state_slot = evader_slot * pair_count + pair_slot;
        if filled[state_slot] {
            return Err(malformed(
                line_number,
                format!("duplicate state {g1}|{g2}|{evader}"),
            ));
        }
        filled[state_slot] = true;
        loaded += 1;
    }

    if loaded != table.state_count() {
        return Err(Error::IncompleteMatrix {
            file: file_name,
            got: loaded,
            expected: table.state_count(),
        });
    }
    Ok(table)
}

/// Write one training campaign's per-episode error sequence as a single
/// CSV row.
pub fn save_error_record<P: AsRef<Path>>(errors: &[f64], path: P) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).map_err(|source| io_error("create error record", path, source))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let record: Vec<String> = errors.iter().map(|value| value.to_string()).collect();
    writer.write_record(&record)?;
    writer.flush().map_err(|source| io_error("flush error record", path, source))?;
    Ok(())
}
