use thiserror::Error;

use crate::room::Cell;
use crate::parser::StudentId;

/// Malformed room layouts or run configuration. Always raised before any
/// student is placed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("room `{room}`: {what} {row}:{col} is outside the {rows}x{cols} grid")]
    OutOfBounds {
        room: String,
        what: &'static str,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("room `{room}`: invalid coordinate `{value}` (expected `row:col`)")]
    BadCoordinate { room: String, value: String },
    #[error("room `{room}`: missing {what} specification")]
    Missing { room: String, what: &'static str },
    #[error("room `{0}` has no seats")]
    NoSeats(String),
    #[error("room `{0}` is not part of the catalog")]
    UnknownRoom(String),
    #[error("no designated room configured for {0} students")]
    NoDesignatedRoom(&'static str),
    #[error("the room catalog is empty")]
    EmptyCatalog,
    #[error("invalid spreadsheet window `{0}` (expected e.g. `B2:U20`)")]
    BadWindow(String),
    #[error("room `{room}`: delimiter `{delimiter}` is not a single ASCII character")]
    BadDelimiter { room: String, delimiter: char },
    #[error("invalid snake policy: phase {phase} must be below period {period}")]
    BadSnakePolicy { period: usize, phase: usize },
}

/// Placement failures. None of these are recoverable: the whole batch aborts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("designated rooms are not sufficient, {} students missing ({})", .unplaced.len(), join_ids(.unplaced))]
    Capacity { unplaced: Vec<StudentId> },
    #[error("student {0} is already assigned a seat")]
    DuplicateAssignment(StudentId),
    #[error("room `{room}`: cannot occupy {row}:{col}, cell is {cell:?}")]
    CellNotFree {
        room: String,
        row: usize,
        col: usize,
        cell: Cell,
    },
    #[error("run drained but {} on-site students are unassigned ({})", .missing.len(), join_ids(.missing))]
    Uncovered { missing: Vec<StudentId> },
}

impl PlacementError {
    /// Ids left without a seat, if this is a capacity shortfall.
    pub fn unplaced(&self) -> &[StudentId] {
        match self {
            PlacementError::Capacity { unplaced } => unplaced,
            _ => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("no roster files found in {0}")]
    NoFiles(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SeatingError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn join_ids(ids: &[StudentId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_lists_every_id() {
        let err = PlacementError::Capacity {
            unplaced: vec![StudentId::from("101"), StudentId::from("102")],
        };
        assert_eq!(
            err.to_string(),
            "designated rooms are not sufficient, 2 students missing (101, 102)"
        );
        assert_eq!(err.unplaced().len(), 2);
    }

    #[test]
    fn config_error_wraps_into_seating_error() {
        let err: SeatingError = ConfigError::NoSeats("R1".into()).into();
        assert!(matches!(err, SeatingError::Config(ConfigError::NoSeats(_))));
        assert_eq!(err.to_string(), "configuration error: room `R1` has no seats");
    }
}
