//! Error types for the gridchase crate

use thiserror::Error;

/// Main error type for the gridchase crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("map must be rectangular: row {row} has width {got}, expected {expected}")]
    RaggedMap {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("invalid map character '{character}' at row {row}, column {column} (expected 'O' or 'X')")]
    InvalidMapCharacter {
        character: char,
        row: usize,
        column: usize,
    },

    #[error("map has no rows")]
    EmptyMap,

    #[error("cell {cell} is out of bounds for a {width}x{height} grid")]
    CellOutOfBounds {
        cell: usize,
        width: usize,
        height: usize,
    },

    #[error("cell {cell} is not a free cell")]
    NotFreeCell { cell: usize },

    #[error("pursuer placement ({first}, {second}) is invalid: {reason}")]
    InvalidPlacement {
        first: usize,
        second: usize,
        reason: String,
    },

    #[error("no table entry for state {low}|{high}|{evader}")]
    StateNotFound {
        low: usize,
        high: usize,
        evader: usize,
    },

    #[error("no legal joint action from positions ({first}, {second})")]
    NoLegalActions { first: usize, second: usize },

    #[error("{file}:{line}: malformed matrix line: {message}")]
    MalformedMatrixLine {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}: incomplete matrix: {got} states loaded, expected {expected}")]
    IncompleteMatrix {
        file: String,
        got: usize,
        expected: usize,
    },

    #[error("invalid move request {value} (expected -1 to stay or 0..=3 for a direction)")]
    InvalidMoveRequest { value: i64 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
